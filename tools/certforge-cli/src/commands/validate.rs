//! Check a template for problems.

use certforge_common::config::AppConfig;

use super::TemplateSource;

pub fn run(config: &AppConfig, template: &str) -> anyhow::Result<()> {
    let document = TemplateSource::parse(template).load(config)?;
    let issues = document.validate();

    if issues.is_empty() {
        println!("Template '{}' is valid.", document.title);
        return Ok(());
    }

    println!("Template '{}' has {} issue(s):", document.title, issues.len());
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("Validation failed")
}
