//! Tender record persistence.
//!
//! Two backends sit behind [`TenderStore`]:
//! - [`SqlStore`]: a local libSQL database with a `tenders` table and a run log
//! - [`CsvStore`]: a single CSV table rewritten once per run
//!
//! **Access rules:** a store is owned by one process for the duration of a
//! run. Two concurrent runs against the same store may both pass the
//! existence check for a document and insert it twice.

mod csv_store;
mod migrations;
mod sql;

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use tenderscan_shared::{
    Result, RunStats, StoreBackend, StoreConfig, TenderNumber, TenderRecord,
};
use tracing::info;

pub use csv_store::CsvStore;
pub use sql::SqlStore;

/// Result of offering one record to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same tender number already exists; nothing was written.
    AlreadyPresent,
}

/// A tabular destination for [`TenderRecord`]s keyed by tender number.
#[allow(async_fn_in_trait)]
pub trait TenderStore {
    /// Every tender number currently stored.
    async fn load_existing_identities(&self) -> Result<HashSet<TenderNumber>>;

    /// Write `record` unless its tender number is already stored. Backends
    /// may stage the write until [`finish`](Self::finish).
    async fn append(&mut self, record: &TenderRecord) -> Result<AppendOutcome>;

    /// Make every staged append durable. Called once at the end of a run.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Keep a summary of a finished run. Backends without a run log ignore it.
    async fn record_run(&mut self, _stats: &RunStats, _started_at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// The backend chosen by configuration.
pub enum Store {
    Sql(SqlStore),
    Csv(CsvStore),
}

impl Store {
    /// Open the configured backend for writing.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let store = match config.backend {
            StoreBackend::Sql => Self::Sql(SqlStore::open(Path::new(&config.db_path)).await?),
            StoreBackend::Csv => Self::Csv(CsvStore::open(Path::new(&config.csv_path))?),
        };
        info!(backend = store.name(), "store opened");
        Ok(store)
    }

    /// Open the configured backend without write access. The CSV backend
    /// only writes on append, so it opens the same way.
    pub async fn open_readonly(config: &StoreConfig) -> Result<Self> {
        Ok(match config.backend {
            StoreBackend::Sql => {
                Self::Sql(SqlStore::open_readonly(Path::new(&config.db_path)).await?)
            }
            StoreBackend::Csv => Self::Csv(CsvStore::open(Path::new(&config.csv_path))?),
        })
    }
}

impl TenderStore for Store {
    async fn load_existing_identities(&self) -> Result<HashSet<TenderNumber>> {
        match self {
            Self::Sql(s) => s.load_existing_identities().await,
            Self::Csv(s) => s.load_existing_identities().await,
        }
    }

    async fn append(&mut self, record: &TenderRecord) -> Result<AppendOutcome> {
        match self {
            Self::Sql(s) => s.append(record).await,
            Self::Csv(s) => s.append(record).await,
        }
    }

    async fn finish(&mut self) -> Result<()> {
        match self {
            Self::Sql(s) => s.finish().await,
            Self::Csv(s) => s.finish().await,
        }
    }

    async fn record_run(&mut self, stats: &RunStats, started_at: DateTime<Utc>) -> Result<()> {
        match self {
            Self::Sql(s) => s.record_run(stats, started_at).await,
            Self::Csv(s) => s.record_run(stats, started_at).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Sql(s) => s.name(),
            Self::Csv(s) => s.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config(backend: StoreBackend) -> StoreConfig {
        let dir = std::env::temp_dir().join(format!("ts_store_{}", Uuid::now_v7()));
        StoreConfig {
            backend,
            db_path: dir.join("tenders.db").to_string_lossy().into_owned(),
            csv_path: dir.join("tenders.csv").to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn opens_configured_backend() {
        let sql = Store::open(&config(StoreBackend::Sql)).await.unwrap();
        assert_eq!(sql.name(), "sql");
        assert!(matches!(sql, Store::Sql(_)));

        let csv = Store::open(&config(StoreBackend::Csv)).await.unwrap();
        assert_eq!(csv.name(), "csv");
        assert!(csv.load_existing_identities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn csv_ignores_run_log() {
        let mut csv = Store::open(&config(StoreBackend::Csv)).await.unwrap();
        csv.record_run(&RunStats::default(), Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn finish_reaches_the_backend() {
        let config = config(StoreBackend::Csv);
        let mut csv = Store::open(&config).await.unwrap();
        assert!(!Path::new(&config.csv_path).exists());
        csv.finish().await.unwrap();
        assert!(Path::new(&config.csv_path).exists());

        let mut sql = Store::open(&StoreConfig {
            backend: StoreBackend::Sql,
            ..config
        })
        .await
        .unwrap();
        sql.finish().await.unwrap();
    }

    #[tokio::test]
    async fn readonly_sql_needs_existing_database() {
        assert!(Store::open_readonly(&config(StoreBackend::Sql)).await.is_err());
    }
}
