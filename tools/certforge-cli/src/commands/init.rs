//! Create a new template.

use std::path::PathBuf;

use certforge_common::config::AppConfig;
use certforge_template_model::{write_document, Editor, TemplateStore};

use super::open_store;

pub fn run(
    config: &AppConfig,
    title: String,
    output: Option<PathBuf>,
    width: Option<f64>,
    height: Option<f64>,
    variables: Vec<String>,
    sample: bool,
) -> anyhow::Result<()> {
    let mut defaults = config.editor.clone();
    if let Some(width) = width {
        defaults.canvas_width = width;
    }
    if let Some(height) = height {
        defaults.canvas_height = height;
    }
    if !variables.is_empty() {
        defaults.variables = Vec::new();
    }

    let mut editor = Editor::blank(&title, defaults);
    for variable in &variables {
        if editor.declare_variable(variable).is_none() {
            println!("Skipping variable '{variable}' (empty or duplicate)");
        }
    }

    if sample {
        let heading = editor.add_text();
        editor.set_text(&heading, &title);
        if editor.document().variables.iter().any(|v| v == "name") {
            editor.add_variable_token("name");
        }
    }

    let document = editor.into_document();

    match output {
        Some(path) => {
            write_document(&path, &document)
                .map_err(|e| anyhow::anyhow!("Failed to write template: {e}"))?;
            println!("Template created: {}", path.display());
        }
        None => {
            let mut store = open_store(config)?;
            let id = store
                .save(&document)
                .map_err(|e| anyhow::anyhow!("Failed to save template: {e}"))?;
            println!("Template created: {id}");
            println!("  Store: {}", config.templates_dir.display());
        }
    }

    println!("  Title: {}", document.title);
    println!(
        "  Canvas: {}x{}",
        document.canvas.width, document.canvas.height
    );
    println!("  Variables: {}", document.variables.join(", "));

    Ok(())
}
