//! List stored templates.

use certforge_common::config::AppConfig;
use certforge_template_model::TemplateStore;

use super::open_store;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let templates = store
        .list()
        .map_err(|e| anyhow::anyhow!("Failed to list templates: {e}"))?;

    if templates.is_empty() {
        println!("No templates in {}", config.templates_dir.display());
        return Ok(());
    }

    for stored in &templates {
        println!(
            "{}  {}  ({} elements, edited {})",
            stored.id,
            stored.document.title,
            stored.document.elements.len(),
            stored.document.last_edited_at
        );
    }
    Ok(())
}
