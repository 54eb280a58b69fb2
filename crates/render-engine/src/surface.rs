//! Rendering surfaces.
//!
//! A surface displays one document at a time and hands back raster
//! snapshots of whatever it currently shows. The batch pipeline drives a
//! single surface sequentially: render, wait for it to settle, capture.

use std::sync::Arc;

use async_trait::async_trait;
use certforge_template_model::Document;
use resvg::tiny_skia;
use resvg::usvg;

use crate::svg;

/// A PNG snapshot of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterCapture {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
}

/// Errors raised by a rendering surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The surface is not mounted. Retrying will not help.
    #[error("Rendering surface unavailable: {0}")]
    Unavailable(String),

    /// Rendering or capturing the current document failed.
    #[error("Render failed: {0}")]
    Render(String),
}

/// A display surface that can be captured as a raster image.
#[async_trait]
pub trait RenderSurface: Send {
    /// Whether the surface is mounted and able to render.
    fn is_available(&self) -> bool;

    /// Replace the displayed content with `document`.
    async fn render(&mut self, document: &Document) -> Result<(), SurfaceError>;

    /// Resolve once the last render is visible to [`capture`](Self::capture).
    async fn settled(&mut self) -> Result<(), SurfaceError>;

    /// Snapshot the displayed content at `scale` times its canvas size.
    async fn capture(&mut self, scale: f32) -> Result<RasterCapture, SurfaceError>;

    /// Surface name for logs.
    fn name(&self) -> &str;
}

/// Off-screen surface that rasterizes the document's SVG markup.
pub struct SvgRasterSurface {
    fontdb: Arc<usvg::fontdb::Database>,
    markup: Option<String>,
}

impl SvgRasterSurface {
    /// Create a surface with system fonts loaded.
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "Loaded system fonts");
        Self::with_fontdb(Arc::new(fontdb))
    }

    /// Create a surface sharing an existing font database.
    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self {
            fontdb,
            markup: None,
        }
    }

    /// Markup of the currently displayed document.
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

}

fn parse_markup(
    markup: &str,
    fontdb: Arc<usvg::fontdb::Database>,
) -> Result<usvg::Tree, SurfaceError> {
    let options = usvg::Options {
        fontdb,
        ..usvg::Options::default()
    };
    usvg::Tree::from_str(markup, &options).map_err(|e| SurfaceError::Render(e.to_string()))
}

impl Default for SvgRasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderSurface for SvgRasterSurface {
    fn is_available(&self) -> bool {
        true
    }

    async fn render(&mut self, document: &Document) -> Result<(), SurfaceError> {
        let markup = svg::serialize(document);
        parse_markup(&markup, Arc::clone(&self.fontdb))?;
        self.markup = Some(markup);
        Ok(())
    }

    async fn settled(&mut self) -> Result<(), SurfaceError> {
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn capture(&mut self, scale: f32) -> Result<RasterCapture, SurfaceError> {
        let markup = self
            .markup
            .clone()
            .ok_or_else(|| SurfaceError::Render("Nothing has been rendered".to_string()))?;
        let fontdb = Arc::clone(&self.fontdb);

        // Rasterizing and PNG encoding are CPU-bound.
        tokio::task::spawn_blocking(move || rasterize(&parse_markup(&markup, fontdb)?, scale))
            .await
            .map_err(|e| SurfaceError::Render(format!("Capture task failed: {e}")))?
    }

    fn name(&self) -> &str {
        "svg-raster"
    }
}

/// Render a parsed tree to PNG at `scale`.
pub fn rasterize(tree: &usvg::Tree, scale: f32) -> Result<RasterCapture, SurfaceError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(SurfaceError::Render(format!("Invalid capture scale {scale}")));
    }

    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        SurfaceError::Render(format!("Failed to allocate {width}x{height} pixmap"))
    })?;

    resvg::render(
        tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| SurfaceError::Render(format!("PNG encoding failed: {e}")))?;

    Ok(RasterCapture { width, height, png })
}
