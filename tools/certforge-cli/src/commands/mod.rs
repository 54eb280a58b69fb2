pub mod add_image;
pub mod export;
pub mod generate;
pub mod info;
pub mod init;
pub mod list;
pub mod preview;
pub mod validate;

use std::path::{Path, PathBuf};

use certforge_common::config::{AppConfig, PageSize};
use certforge_template_model::{
    read_document, write_document, DataTable, DirTemplateStore, Document, TemplateId,
    TemplateStore, VariableMapping,
};

/// Where a template argument points.
pub enum TemplateSource {
    File(PathBuf),
    Stored(TemplateId),
}

impl TemplateSource {
    /// A path to an existing file, or anything ending in `.json`, is a file;
    /// everything else is a store id.
    pub fn parse(arg: &str) -> Self {
        let path = Path::new(arg);
        if path.is_file() || path.extension().is_some_and(|ext| ext == "json") {
            TemplateSource::File(path.to_path_buf())
        } else {
            TemplateSource::Stored(TemplateId::new(arg))
        }
    }

    pub fn load(&self, config: &AppConfig) -> anyhow::Result<Document> {
        match self {
            TemplateSource::File(path) => read_document(path)
                .map_err(|e| anyhow::anyhow!("Failed to load template: {e}")),
            TemplateSource::Stored(id) => open_store(config)?
                .load(id)
                .map_err(|e| anyhow::anyhow!("Failed to load template: {e}")),
        }
    }

    pub fn save(&self, config: &AppConfig, document: &Document) -> anyhow::Result<()> {
        let saved = match self {
            TemplateSource::File(path) => write_document(path, document),
            TemplateSource::Stored(id) => open_store(config)?.update(id, document),
        };
        saved.map_err(|e| anyhow::anyhow!("Failed to save template: {e}"))
    }
}

/// Page size from `--page`, or the configured default.
pub fn page_size(config: &AppConfig, page: Option<&str>) -> anyhow::Result<PageSize> {
    match page {
        None => Ok(config.generation.page),
        Some(name) => PageSize::parse(name).ok_or_else(|| {
            anyhow::anyhow!("Unknown page size: {name}. Use: a4-landscape, a4-portrait")
        }),
    }
}

pub fn open_store(config: &AppConfig) -> anyhow::Result<DirTemplateStore> {
    DirTemplateStore::open(&config.templates_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open template store: {e}"))
}

pub fn load_table(path: &Path) -> anyhow::Result<DataTable> {
    DataTable::load(path).map_err(|e| anyhow::anyhow!("Failed to load data: {e}"))
}

/// Explicit `variable=Column` assignments, or an automatic mapping when none
/// are given.
pub fn build_mapping(
    document: &Document,
    table: &DataTable,
    assignments: &[String],
) -> anyhow::Result<VariableMapping> {
    if assignments.is_empty() {
        return Ok(VariableMapping::auto(&document.variables, &table.columns));
    }

    let mut mapping = VariableMapping::new();
    for assignment in assignments {
        let (variable, column) = VariableMapping::parse_assignment(assignment)
            .ok_or_else(|| anyhow::anyhow!("Invalid mapping '{assignment}', expected variable=Column"))?;
        if !table.has_column(&column) {
            anyhow::bail!("Column '{column}' not found in data");
        }
        mapping.set(variable, column);
    }
    Ok(mapping)
}
