//! Place an image on a template.

use std::path::PathBuf;

use certforge_common::config::AppConfig;
use certforge_render_engine::assets::load_image_asset;
use certforge_template_model::Editor;

use super::TemplateSource;

pub fn run(config: &AppConfig, template: &str, image: PathBuf) -> anyhow::Result<()> {
    let source = TemplateSource::parse(template);
    let document = source.load(config)?;

    let asset =
        load_image_asset(&image).map_err(|e| anyhow::anyhow!("Failed to load image: {e}"))?;
    let (width, height) = asset.display_size();

    let mut editor = Editor::with_defaults(document, config.editor.clone());
    let id = editor.add_image(asset);
    source.save(config, editor.document())?;

    println!("Image added: {id}");
    println!("  Source: {}", image.display());
    println!("  Size: {width:.0}x{height:.0}");
    Ok(())
}
