//! Show template information.

use certforge_common::config::AppConfig;

use super::TemplateSource;

pub fn run(config: &AppConfig, template: &str) -> anyhow::Result<()> {
    let document = TemplateSource::parse(template).load(config)?;

    println!("Template: {}", document.title);
    println!("  Last edited: {}", document.last_edited_at);
    println!(
        "  Canvas: {}x{}",
        document.canvas.width, document.canvas.height
    );
    println!("  Export name: {}", document.export_file_stem());
    println!();

    println!("Variables:");
    if document.variables.is_empty() {
        println!("  (none)");
    }
    for variable in &document.variables {
        println!("  {{{{{variable}}}}}");
    }
    println!();

    // Top layer first, like a layers panel.
    println!("Layers ({}):", document.elements.len());
    for element in document.elements.iter().rev() {
        println!("  {:<20} {}", element.layer_label(), element.id);
    }

    Ok(())
}
