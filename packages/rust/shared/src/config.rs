//! Application configuration for TenderScan.
//!
//! User config lives at `~/.tenderscan/tenderscan.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TenderScanError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tenderscan.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tenderscan";

// ---------------------------------------------------------------------------
// Config structs (matching tenderscan.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input discovery defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Constant record columns.
    #[serde(default)]
    pub record: RecordConfig,

    /// Destination store.
    #[serde(default)]
    pub store: StoreConfig,

    /// External extraction tools.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding one downloaded document per tender.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// File name suffix of documents; stripped to form the tender number.
    #[serde(default = "default_document_suffix")]
    pub document_suffix: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            document_suffix: default_document_suffix(),
        }
    }
}

fn default_input_dir() -> String {
    "GEM/2024/B".into()
}
fn default_document_suffix() -> String {
    ".pdf".into()
}

/// `[record]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Value of the `TenderType` column.
    #[serde(default = "default_tender_type")]
    pub tender_type: String,

    /// Value of the `NameOfWebSite` column.
    #[serde(default = "default_website")]
    pub website: String,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            tender_type: default_tender_type(),
            website: default_website(),
        }
    }
}

fn default_tender_type() -> String {
    "buy".into()
}
fn default_website() -> String {
    "https://bidplus.gem.gov.in/all-bids".into()
}

/// Which persistence backend to write to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local libSQL database, one row per tender.
    #[default]
    Sql,
    /// Flat CSV file rewritten on every append.
    Csv,
}

impl std::str::FromStr for StoreBackend {
    type Err = TenderScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sql" => Ok(Self::Sql),
            "csv" => Ok(Self::Csv),
            other => Err(TenderScanError::config(format!(
                "unknown store backend '{other}': expected 'sql' or 'csv'"
            ))),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file for the `sql` backend.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Dataset file for the `csv` backend.
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
            csv_path: default_csv_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/tenders.db".into()
}
fn default_csv_path() -> String {
    "var/tenders.csv".into()
}

/// How table grids are obtained for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSourceKind {
    /// Run an external extractor that prints JSON grids.
    #[default]
    Command,
    /// Read pre-extracted JSON grids stored next to the document.
    Sidecar,
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub grid_source: GridSourceKind,

    /// Table extractor executable; the document path is appended to `grid_args`.
    #[serde(default = "default_grid_cmd")]
    pub grid_cmd: String,

    #[serde(default = "default_grid_args")]
    pub grid_args: Vec<String>,

    /// Suffix appended to the document path to find its sidecar grids.
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: String,

    /// Whether to populate `HTMLcontent`.
    #[serde(default = "default_true")]
    pub convert_html: bool,

    /// Document-to-HTML converter; the document path is appended to `html_args`.
    #[serde(default = "default_html_cmd")]
    pub html_cmd: String,

    #[serde(default = "default_html_args")]
    pub html_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            grid_source: GridSourceKind::default(),
            grid_cmd: default_grid_cmd(),
            grid_args: default_grid_args(),
            sidecar_suffix: default_sidecar_suffix(),
            convert_html: true,
            html_cmd: default_html_cmd(),
            html_args: default_html_args(),
        }
    }
}

fn default_grid_cmd() -> String {
    "python3".into()
}
fn default_grid_args() -> Vec<String> {
    vec!["scripts/extract_tables.py".into()]
}
fn default_sidecar_suffix() -> String {
    ".tables.json".into()
}
fn default_true() -> bool {
    true
}
fn default_html_cmd() -> String {
    "pdftohtml".into()
}
fn default_html_args() -> Vec<String> {
    vec!["-stdout".into()]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tenderscan/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TenderScanError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tenderscan/tenderscan.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TenderScanError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TenderScanError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TenderScanError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TenderScanError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TenderScanError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs that would produce unusable records or identities.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    Url::parse(&config.record.website).map_err(|e| {
        TenderScanError::config(format!(
            "record.website '{}' is not a valid URL: {e}",
            config.record.website
        ))
    })?;

    if config.defaults.document_suffix.is_empty() {
        return Err(TenderScanError::config(
            "defaults.document_suffix must not be empty",
        ));
    }

    Ok(())
}
