//! Generate certificates for every data row.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use certforge_common::config::AppConfig;
use certforge_render_engine::{
    ArtifactKind, BatchGenerator, DirectoryDelivery, DirectoryRemoteSaver, GenerationJob,
    GenerationOptions, GenerationProgress, JobState, LogLevel, OutboxNotifier, ProgressCallback,
    SvgRasterSurface,
};

use super::{build_mapping, load_table, page_size, TemplateSource};

pub struct GenerateArgs {
    pub template: String,
    pub data: PathBuf,
    pub mappings: Vec<String>,
    pub formats: String,
    pub output: Option<PathBuf>,
    pub page: Option<String>,
    pub archive: bool,
    pub email_column: Option<String>,
    pub outbox: Option<PathBuf>,
    pub save_to: Option<PathBuf>,
}

/// Parse a comma-separated format list, keeping first-seen order.
pub fn parse_formats(formats: &str) -> anyhow::Result<Vec<ArtifactKind>> {
    let mut kinds = Vec::new();
    for part in formats.split(',').filter(|p| !p.trim().is_empty()) {
        let kind = ArtifactKind::parse(part)
            .ok_or_else(|| anyhow::anyhow!("Unknown format: {part}. Use: pdf, png, svg"))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

pub async fn run(config: &AppConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let document = TemplateSource::parse(&args.template).load(config)?;
    let table = load_table(&args.data)?;
    let mapping = build_mapping(&document, &table, &args.mappings)?;

    let mut options = GenerationOptions::from_defaults(&config.generation);
    options.kinds = parse_formats(&args.formats)?;
    options.page = page_size(config, args.page.as_deref())?;
    options.archive = args.archive;
    options.send_email = args.email_column.is_some();
    options.email_column = args.email_column;
    options.remote_save = args.save_to.is_some();

    let output_dir = args.output.unwrap_or_else(|| config.output_dir.clone());

    println!("Generating '{}'", document.title);
    println!("  Records: {}", table.len());
    println!(
        "  Formats: {}",
        options
            .kinds
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for (variable, column) in mapping.iter() {
        println!("  {{{{{variable}}}}} <- {column}");
    }
    println!("  Output: {}", output_dir.display());

    let progress_cb: ProgressCallback = Box::new(|p: GenerationProgress| {
        print!(
            "\r  Progress: {}% ({}/{} records, ETA: {:.0}s)  ",
            p.percent, p.processed, p.total, p.eta_secs,
        );
    });

    let mut generator = BatchGenerator::new(
        Box::new(SvgRasterSurface::new()),
        Box::new(DirectoryDelivery::new(&output_dir)),
    )
    .with_progress(progress_cb);

    if options.send_email {
        let outbox = args.outbox.unwrap_or_else(|| output_dir.join("outbox"));
        println!("  Outbox: {}", outbox.display());
        generator = generator.with_notifier(Box::new(OutboxNotifier::new(outbox)));
    }
    if let Some(save_to) = args.save_to {
        generator = generator.with_remote_saver(Box::new(DirectoryRemoteSaver::new(save_to)));
    }

    let cancel = generator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let job = GenerationJob::new(document, table, mapping).with_options(options);
    let report = generator.run(&job).await;
    println!();

    for entry in &report.log {
        match entry.level {
            LogLevel::Info => println!("{entry}"),
            LogLevel::Warn | LogLevel::Error => eprintln!("{entry}"),
        }
    }
    for path in &report.delivered {
        println!("  Wrote: {}", path.display());
    }

    let status = serde_json::to_string_pretty(&report.status())?;
    println!("{status}");

    match report.state {
        JobState::Completed => {
            if !report.failed_rows.is_empty() {
                println!("{} row(s) failed", report.failed_rows.len());
            }
            Ok(())
        }
        JobState::Cancelled => {
            println!("Generation cancelled after {} records", report.processed);
            Ok(())
        }
        JobState::Failed | JobState::Idle | JobState::Running { .. } => {
            let reason = report
                .errors()
                .last()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            Err(anyhow::anyhow!("Generation failed: {reason}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_keep_order_and_drop_duplicates() {
        let kinds = parse_formats("png, pdf,png,,SVG").unwrap();
        assert_eq!(
            kinds,
            vec![ArtifactKind::Png, ArtifactKind::Pdf, ArtifactKind::Svg]
        );
    }

    #[test]
    fn unknown_format_is_an_error() {
        assert!(parse_formats("pdf,docx").is_err());
        assert!(parse_formats("").unwrap().is_empty());
    }
}
