//! libSQL backend (local file, offline mode).
//!
//! One `tenders` row per record. Every insert is preceded by an existence
//! check on `TenderNumber`, so a stale in-memory identity set cannot cause a
//! duplicate row. The check and the insert are not atomic: one process must
//! own the database for the duration of a run.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Value, params};
use tenderscan_shared::{
    IDENTITY_COLUMN, Result, RunStats, TENDER_COLUMNS, TenderNumber, TenderRecord, TenderScanError,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::migrations;
use crate::{AppendOutcome, TenderStore};

static INSERT_SQL: LazyLock<String> = LazyLock::new(|| {
    let placeholders: Vec<String> = (1..=TENDER_COLUMNS.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO tenders ({}) VALUES ({})",
        TENDER_COLUMNS.join(", "),
        placeholders.join(", ")
    )
});

fn storage_err(e: libsql::Error) -> TenderScanError {
    TenderScanError::Storage(e.to_string())
}

/// Tender table handle wrapping a libSQL database.
pub struct SqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl SqlStore {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TenderScanError::Setup(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let store = Self::connect(path, false).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an existing database at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TenderScanError::Setup(format!(
                "database {} does not exist",
                path.display()
            )));
        }
        Self::connect(path, true).await
    }

    async fn connect(path: &Path, readonly: bool) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TenderScanError::Setup(format!("{}: {e}", path.display())))?;

        let conn = db
            .connect()
            .map_err(|e| TenderScanError::Setup(format!("{}: {e}", path.display())))?;

        Ok(Self { db, conn, readonly })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    TenderScanError::Setup(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TenderScanError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Whether a row with this tender number is already stored.
    pub async fn exists(&self, tender_number: &TenderNumber) -> Result<bool> {
        let sql = format!("SELECT 1 FROM tenders WHERE {IDENTITY_COLUMN} = ?1 LIMIT 1");
        let mut rows = self
            .conn
            .query(&sql, params![tender_number.as_str()])
            .await
            .map_err(storage_err)?;

        Ok(rows.next().await.map_err(storage_err)?.is_some())
    }

    /// Number of stored rows, duplicates included.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM tenders", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<u64>(0).map_err(storage_err),
            None => Ok(0),
        }
    }
}

impl TenderStore for SqlStore {
    async fn load_existing_identities(&self) -> Result<HashSet<TenderNumber>> {
        let sql = format!(
            "SELECT DISTINCT {IDENTITY_COLUMN} FROM tenders WHERE {IDENTITY_COLUMN} IS NOT NULL"
        );
        let mut rows = self.conn.query(&sql, params![]).await.map_err(storage_err)?;

        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let id: String = row.get(0).map_err(storage_err)?;
            ids.insert(TenderNumber::new(id));
        }
        debug!(count = ids.len(), "loaded existing tender numbers");
        Ok(ids)
    }

    async fn append(&mut self, record: &TenderRecord) -> Result<AppendOutcome> {
        self.check_writable()?;

        if self.exists(&record.tender_number).await? {
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let values: Vec<Value> = record
            .columns()
            .into_iter()
            .map(|(_, value)| match value {
                Some(text) => Value::Text(text.to_string()),
                None => Value::Null,
            })
            .collect();

        self.conn
            .execute(
                INSERT_SQL.as_str(),
                libsql::params::Params::Positional(values),
            )
            .await
            .map_err(storage_err)?;
        Ok(AppendOutcome::Inserted)
    }

    async fn record_run(&mut self, stats: &RunStats, started_at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let stats_json = serde_json::to_string(stats)
            .map_err(|e| TenderScanError::Storage(format!("serialize run stats: {e}")))?;
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, started_at, finished_at, stats_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.as_str(),
                    started_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    stats_json.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sql"
    }
}
