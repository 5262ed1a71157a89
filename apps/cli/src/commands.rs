//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tenderscan_core::{
    BatchConfig, ProgressReporter, SkipReason, extract_document, run_batch,
};
use tenderscan_shared::{
    AppConfig, GridSourceKind, RunStats, StoreBackend, TenderNumber, TenderScanError,
    init_config, load_config, load_config_from,
};
use tenderscan_sources::{
    CommandConverter, CommandGridSource, ContentConverter, GridSource, NoConversion,
    SidecarGridSource, SourceDocument,
};
use tenderscan_storage::{Store, TenderStore};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TenderScan: tender documents in, normalized records out.
#[derive(Parser)]
#[command(
    name = "tenderscan",
    version,
    about = "Extract structured records from tender documents into CSV or libSQL.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.tenderscan/tenderscan.toml).
    #[arg(long, global = true, env = "TENDERSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract every new document in the input directory into the store.
    Run {
        /// Directory of tender documents.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Store backend: sql or csv.
        #[arg(long)]
        backend: Option<StoreBackend>,

        /// Database file for the sql backend.
        #[arg(long)]
        db: Option<String>,

        /// Dataset file for the csv backend.
        #[arg(long)]
        csv: Option<String>,

        /// Leave HTMLcontent empty instead of converting each document.
        #[arg(long)]
        no_html: bool,
    },

    /// Print the record for one document as JSON without storing it.
    Extract {
        /// Document path.
        file: PathBuf,

        /// Leave HTMLcontent empty.
        #[arg(long)]
        no_html: bool,
    },

    /// List tender numbers already in the store.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tenderscan=info",
        1 => "tenderscan=debug",
        _ => "tenderscan=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries per-document lines and JSON output.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            input,
            backend,
            db,
            csv,
            no_html,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(input) = input {
                config.defaults.input_dir = input.to_string_lossy().into_owned();
            }
            if let Some(backend) = backend {
                config.store.backend = backend;
            }
            if let Some(db) = db {
                config.store.db_path = db;
            }
            if let Some(csv) = csv {
                config.store.csv_path = csv;
            }
            if no_html {
                config.tools.convert_html = false;
            }
            cmd_run(&config).await
        }
        Command::Extract { file, no_html } => {
            let mut config = resolve_config(config_path)?;
            if no_html {
                config.tools.convert_html = false;
            }
            cmd_extract(&config, &file)
        }
        Command::List => cmd_list(&resolve_config(config_path)?).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn grid_source(config: &AppConfig) -> Box<dyn GridSource> {
    match config.tools.grid_source {
        GridSourceKind::Command => Box::new(CommandGridSource::new(
            config.tools.grid_cmd.clone(),
            config.tools.grid_args.clone(),
        )),
        GridSourceKind::Sidecar => {
            Box::new(SidecarGridSource::new(config.tools.sidecar_suffix.clone()))
        }
    }
}

fn converter(config: &AppConfig) -> Box<dyn ContentConverter> {
    if config.tools.convert_html {
        Box::new(CommandConverter::new(
            config.tools.html_cmd.clone(),
            config.tools.html_args.clone(),
        ))
    } else {
        Box::new(NoConversion)
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    let batch = BatchConfig::from_app_config(config);
    let grids = grid_source(config);
    let converter = converter(config);

    info!(
        input = %batch.input_dir.display(),
        backend = ?config.store.backend,
        grids = grids.name(),
        converter = converter.name(),
        "starting run"
    );

    let mut store = Store::open(&config.store).await?;
    let progress = CliProgress::new();
    let stats = run_batch(
        &batch,
        &mut store,
        grids.as_ref(),
        converter.as_ref(),
        &progress,
    )
    .await?;

    println!(
        "{} documents: {} inserted, {} skipped, {} failed",
        stats.discovered, stats.inserted, stats.skipped_duplicates, stats.failed
    );
    Ok(())
}

fn cmd_extract(config: &AppConfig, file: &Path) -> Result<()> {
    let suffix = &config.defaults.document_suffix;
    let tender_number = TenderNumber::from_path(file, suffix).ok_or_else(|| {
        eyre!(
            "cannot derive a tender number from '{}': expected a name ending in '{suffix}'",
            file.display()
        )
    })?;
    let doc = SourceDocument {
        path: file.to_path_buf(),
        tender_number,
    };

    let batch = BatchConfig::from_app_config(config);
    let record = extract_document(
        &doc,
        grid_source(config).as_ref(),
        converter(config).as_ref(),
        &batch.defaults,
        Local::now().naive_local(),
    )?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let store = Store::open_readonly(&config.store).await?;
    let mut ids: Vec<TenderNumber> = store.load_existing_identities().await?.into_iter().collect();
    ids.sort();

    for id in &ids {
        println!("{id}");
    }
    info!(count = ids.len(), backend = store.name(), "listed tenders");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner for the current document plus one printed line per outcome.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}") {
            bar.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn discovered(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn document_inserted(&self, tender_number: &TenderNumber) {
        self.bar.println(format!("inserted  {tender_number}"));
        self.bar.inc(1);
    }

    fn document_skipped(&self, tender_number: &TenderNumber, reason: SkipReason) {
        let why = match reason {
            SkipReason::KnownIdentity => "already stored",
            SkipReason::AlreadyStored => "present in store",
        };
        self.bar.println(format!("skipped   {tender_number} ({why})"));
        self.bar.inc(1);
    }

    fn document_failed(&self, tender_number: &TenderNumber, error: &TenderScanError) {
        self.bar.println(format!("error     {tender_number}: {error}"));
        self.bar.inc(1);
    }

    fn done(&self, _stats: &RunStats) {
        self.bar.finish_and_clear();
    }
}
