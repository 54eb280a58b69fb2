//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CertforgeError, CertforgeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where saved templates are stored.
    pub templates_dir: PathBuf,

    /// Default directory for generated artifacts.
    pub output_dir: PathBuf,

    /// Batch generation defaults.
    #[serde(default)]
    pub generation: GenerationDefaults,

    /// Template editor defaults.
    #[serde(default)]
    pub editor: EditorDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default parameters for batch generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    /// Supersampling factor used when capturing the rendered template.
    pub capture_scale: f32,

    /// Page size of generated PDF documents.
    pub page: PageSize,

    /// Base name (without extension) of the packaged archive.
    pub archive_name: String,
}

/// A fixed page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: u32,
    pub height_pt: u32,
}

impl PageSize {
    /// ISO A4, landscape orientation.
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width_pt: 842,
        height_pt: 595,
    };

    /// ISO A4, portrait orientation.
    pub const A4_PORTRAIT: PageSize = PageSize {
        width_pt: 595,
        height_pt: 842,
    };

    /// Parse a page name: `a4-landscape` (or `a4`) and `a4-portrait`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a4" | "a4-landscape" => Some(Self::A4_LANDSCAPE),
            "a4-portrait" => Some(Self::A4_PORTRAIT),
            _ => None,
        }
    }
}

/// Defaults applied by the template editor when creating documents and elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub variables: Vec<String>,
    pub font_size: f64,
    pub font_family: String,
    pub stroke_width: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "certforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            templates_dir: data_dir().join("templates"),
            output_dir: PathBuf::from("certforge-output"),
            generation: GenerationDefaults::default(),
            editor: EditorDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            capture_scale: 2.0,
            page: PageSize::A4_LANDSCAPE,
            archive_name: "certificates".to_string(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 500.0,
            variables: ["name", "date", "role", "event_name"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            font_size: 28.0,
            font_family: "sans-serif".to_string(),
            stroke_width: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(CertforgeError::FileNotFound { .. }) => Self::default(),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "Using default config");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> CertforgeResult<Self> {
        if !path.exists() {
            return Err(CertforgeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CertforgeError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("certforge").join("config.json")
}

/// Standard data directory.
fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local").join("share"));
    base.join("certforge")
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}
