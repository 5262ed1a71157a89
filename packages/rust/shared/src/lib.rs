//! Shared types, error model, and configuration for TenderScan.
//!
//! This crate is the foundation depended on by all other TenderScan crates.
//! It provides:
//! - [`TenderScanError`]: the unified error type
//! - Domain types ([`TableGrid`], [`RawFieldMap`], [`TenderNumber`], [`TenderRecord`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GridSourceKind, RecordConfig, StoreBackend, StoreConfig,
    ToolsConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_config,
};
pub use error::{Result, TenderScanError};
pub use types::{
    Flag, IDENTITY_COLUMN, RawField, RawFieldMap, RunStats, TENDER_COLUMNS, TableGrid,
    TenderNumber, TenderRecord,
};
