//! Export a single design without data substitution.

use std::path::PathBuf;

use certforge_common::config::AppConfig;
use certforge_render_engine::svg::serialize;
use certforge_render_engine::{encode_pdf, ArtifactKind, RenderSurface, SvgRasterSurface};

use super::{page_size, TemplateSource};

pub async fn run(
    config: &AppConfig,
    template: &str,
    format: &str,
    output: Option<PathBuf>,
    page: Option<&str>,
) -> anyhow::Result<()> {
    let kind = ArtifactKind::parse(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {format}. Use: svg, png, pdf"))?;
    let page = page_size(config, page)?;
    let document = TemplateSource::parse(template).load(config)?;

    let output_path = output.unwrap_or_else(|| {
        config
            .output_dir
            .join(format!("{}.{}", document.export_file_stem(), kind.extension()))
    });
    println!("Exporting '{}'", document.title);
    println!("  Output: {}", output_path.display());
    println!("  Format: {kind}");

    let bytes = match kind {
        ArtifactKind::Svg => serialize(&document).into_bytes(),
        ArtifactKind::Png | ArtifactKind::Pdf => {
            let mut surface = SvgRasterSurface::new();
            surface
                .render(&document)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to render design: {e}"))?;
            surface
                .settled()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to render design: {e}"))?;
            let capture = surface
                .capture(config.generation.capture_scale)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to capture design: {e}"))?;
            println!("  Resolution: {}x{}", capture.width, capture.height);

            if kind == ArtifactKind::Png {
                capture.png
            } else {
                encode_pdf(&capture, page)
                    .map_err(|e| anyhow::anyhow!("Failed to encode PDF: {e}"))?
            }
        }
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &bytes)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output_path.display()))?;

    println!("Export complete: {} ({} bytes)", output_path.display(), bytes.len());
    Ok(())
}
