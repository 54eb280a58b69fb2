//! Certforge CLI: command-line interface for certificate templates.
//!
//! Usage:
//!   certforge init <TITLE>              Create a new template
//!   certforge list                      List stored templates
//!   certforge info <TEMPLATE>           Show template information
//!   certforge validate <TEMPLATE>       Check a template for problems
//!   certforge add-image <TEMPLATE> <IMAGE>
//!   certforge export <TEMPLATE>         Export the design as SVG, PNG, or PDF
//!   certforge preview <TEMPLATE>        Render one data row to SVG
//!   certforge generate <TEMPLATE>       Generate certificates for every data row
//!
//! `<TEMPLATE>` is a path to a template JSON file or the id of a stored template.

use std::path::PathBuf;

use certforge_common::config::AppConfig;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "certforge",
    about = "Design certificate templates and generate them from data",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Template store directory (overrides the configured one)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new template
    Init {
        /// Template title
        title: String,

        /// Write to this file instead of the template store
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Canvas width in pixels
        #[arg(long)]
        width: Option<f64>,

        /// Canvas height in pixels
        #[arg(long)]
        height: Option<f64>,

        /// Declared variables (defaults from config when omitted)
        #[arg(long = "var")]
        variables: Vec<String>,

        /// Add a title text and a `{{name}}` token
        #[arg(long)]
        sample: bool,
    },

    /// List stored templates, most recently edited first
    List,

    /// Show template information
    Info {
        /// Template file or stored id
        template: String,
    },

    /// Check a template for problems
    Validate {
        /// Template file or stored id
        template: String,
    },

    /// Place an image on a template
    AddImage {
        /// Template file or stored id
        template: String,

        /// PNG, JPEG, or SVG file
        image: PathBuf,
    },

    /// Export the design without data substitution
    Export {
        /// Template file or stored id
        template: String,

        /// Output format: svg|png|pdf
        #[arg(long, default_value = "svg")]
        format: String,

        /// Output file (defaults to <title>.<format> in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// PDF page: a4-landscape|a4-portrait (defaults from config)
        #[arg(long)]
        page: Option<String>,
    },

    /// Render one data row to SVG
    Preview {
        /// Template file or stored id
        template: String,

        /// JSON data table
        #[arg(short, long)]
        data: PathBuf,

        /// Zero-based row index
        #[arg(long, default_value = "0")]
        row: usize,

        /// Variable mapping `variable=Column` (repeatable, auto-mapped when omitted)
        #[arg(short, long = "map")]
        mappings: Vec<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate certificates for every data row
    Generate {
        /// Template file or stored id
        template: String,

        /// JSON data table
        #[arg(short, long)]
        data: PathBuf,

        /// Variable mapping `variable=Column` (repeatable, auto-mapped when omitted)
        #[arg(short, long = "map")]
        mappings: Vec<String>,

        /// Comma-separated formats: pdf,png,svg
        #[arg(long, default_value = "pdf")]
        formats: String,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// PDF page: a4-landscape|a4-portrait (defaults from config)
        #[arg(long)]
        page: Option<String>,

        /// Write individual files instead of one zip archive
        #[arg(long)]
        no_archive: bool,

        /// Column holding recipient email addresses
        #[arg(long)]
        email_column: Option<String>,

        /// Queue emails as JSON messages in this directory
        #[arg(long, requires = "email_column")]
        outbox: Option<PathBuf>,

        /// Also copy results and a manifest into this directory
        #[arg(long)]
        save_to: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    certforge_common::logging::init_logging(&config.logging);

    if let Some(store) = cli.store {
        config.templates_dir = store;
    }

    match cli.command {
        Commands::Init {
            title,
            output,
            width,
            height,
            variables,
            sample,
        } => commands::init::run(&config, title, output, width, height, variables, sample),
        Commands::List => commands::list::run(&config),
        Commands::Info { template } => commands::info::run(&config, &template),
        Commands::Validate { template } => commands::validate::run(&config, &template),
        Commands::AddImage { template, image } => {
            commands::add_image::run(&config, &template, image)
        }
        Commands::Export {
            template,
            format,
            output,
            page,
        } => commands::export::run(&config, &template, &format, output, page.as_deref()).await,
        Commands::Preview {
            template,
            data,
            row,
            mappings,
            output,
        } => commands::preview::run(&config, &template, data, row, &mappings, output),
        Commands::Generate {
            template,
            data,
            mappings,
            formats,
            output,
            page,
            no_archive,
            email_column,
            outbox,
            save_to,
        } => {
            commands::generate::run(
                &config,
                commands::generate::GenerateArgs {
                    template,
                    data,
                    mappings,
                    formats,
                    output,
                    page,
                    archive: !no_archive,
                    email_column,
                    outbox,
                    save_to,
                },
            )
            .await
        }
    }
}
