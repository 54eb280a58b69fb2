//! Render one data row to SVG.

use std::path::PathBuf;

use certforge_common::config::AppConfig;
use certforge_render_engine::svg::serialize_instance;

use super::{build_mapping, load_table, TemplateSource};

pub fn run(
    config: &AppConfig,
    template: &str,
    data: PathBuf,
    row: usize,
    mappings: &[String],
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let document = TemplateSource::parse(template).load(config)?;
    let table = load_table(&data)?;
    let record = table.rows.get(row).ok_or_else(|| {
        anyhow::anyhow!("Row {row} out of range ({} rows in data)", table.len())
    })?;
    let mapping = build_mapping(&document, &table, mappings)?;

    for variable in &document.variables {
        if mapping.column_for(variable).is_none() {
            tracing::warn!(variable = %variable, "Variable is not mapped to a column");
        }
    }

    let markup = serialize_instance(&document, &mapping, record);
    match output {
        Some(path) => {
            std::fs::write(&path, markup)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
            println!("Preview written: {}", path.display());
        }
        None => println!("{markup}"),
    }
    Ok(())
}
