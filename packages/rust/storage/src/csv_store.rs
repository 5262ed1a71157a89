//! Flat-file backend: one CSV table with a header row.
//!
//! An existing file keeps its own column order. Schema columns it lacks are
//! appended to the header and existing rows are padded, so every record is
//! stored in full. Appends are staged in memory; [`TenderStore::finish`]
//! rewrites the whole table once through a sibling temp file and a rename,
//! so a crash mid-write leaves the previous table intact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tenderscan_shared::{
    IDENTITY_COLUMN, Result, TENDER_COLUMNS, TenderNumber, TenderRecord, TenderScanError,
};
use tracing::{debug, info};

use crate::{AppendOutcome, TenderStore};

/// A CSV table held in memory and written back by `finish`.
pub struct CsvStore {
    path: PathBuf,
    headers: StringRecord,
    rows: Vec<StringRecord>,
    id_index: usize,
    /// Rows known to be on disk; everything after is staged.
    persisted: usize,
    /// Header differs from the file on disk.
    header_changed: bool,
}

impl CsvStore {
    /// Load the table at `path`, or start an empty one with the default
    /// column order when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "csv table not found, starting empty");
            return Ok(Self {
                path: path.to_path_buf(),
                headers: StringRecord::from(TENDER_COLUMNS.to_vec()),
                rows: Vec::new(),
                id_index: 0,
                persisted: 0,
                header_changed: true,
            });
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| TenderScanError::Setup(format!("{}: {e}", path.display())))?;

        let mut headers = reader
            .headers()
            .map_err(|e| TenderScanError::Setup(format!("{}: {e}", path.display())))?
            .clone();

        let id_index = headers
            .iter()
            .position(|h| h.trim() == IDENTITY_COLUMN)
            .ok_or_else(|| {
                TenderScanError::Setup(format!(
                    "{} has no {IDENTITY_COLUMN} column",
                    path.display()
                ))
            })?;

        let mut rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TenderScanError::Setup(format!("{}: {e}", path.display())))?;

        let missing: Vec<&str> = TENDER_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h.trim() == *col))
            .collect();
        if !missing.is_empty() {
            info!(
                path = %path.display(),
                columns = %missing.join(","),
                "adding missing columns to csv table"
            );
            for col in &missing {
                headers.push_field(col);
            }
            for row in &mut rows {
                while row.len() < headers.len() {
                    row.push_field("");
                }
            }
        }

        debug!(path = %path.display(), rows = rows.len(), "loaded csv table");
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            persisted: rows.len(),
            rows,
            id_index,
            header_changed: !missing.is_empty(),
        })
    }

    /// Rows in the table, staged ones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows appended since the table was last written.
    pub fn pending(&self) -> usize {
        self.rows.len() - self.persisted
    }

    fn contains(&self, tender_number: &TenderNumber) -> bool {
        self.rows
            .iter()
            .any(|row| row.get(self.id_index) == Some(tender_number.as_str()))
    }

    fn row_for(&self, record: &TenderRecord) -> StringRecord {
        self.headers
            .iter()
            .map(|h| record.column(h.trim()).unwrap_or(""))
            .collect()
    }

    fn write_table(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| TenderScanError::io(parent.to_path_buf(), e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write = || -> std::result::Result<(), csv::Error> {
            let mut writer = WriterBuilder::new().flexible(true).from_path(&tmp)?;
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
            Ok(())
        };
        write().map_err(|e| TenderScanError::Storage(format!("{}: {e}", tmp.display())))?;

        std::fs::rename(&tmp, &self.path)
            .map_err(|e| TenderScanError::Storage(format!("{}: {e}", self.path.display())))
    }
}

impl TenderStore for CsvStore {
    async fn load_existing_identities(&self) -> Result<HashSet<TenderNumber>> {
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(self.id_index))
            .filter(|id| !id.is_empty())
            .map(TenderNumber::new)
            .collect())
    }

    async fn append(&mut self, record: &TenderRecord) -> Result<AppendOutcome> {
        if self.contains(&record.tender_number) {
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let row = self.row_for(record);
        self.rows.push(row);
        Ok(AppendOutcome::Inserted)
    }

    /// Write the table once if anything changed. On failure the staged rows
    /// are dropped so the table matches the file again.
    async fn finish(&mut self) -> Result<()> {
        if self.pending() == 0 && !self.header_changed {
            return Ok(());
        }

        if let Err(e) = self.write_table() {
            self.rows.truncate(self.persisted);
            return Err(e);
        }
        debug!(path = %self.path.display(), rows = self.rows.len(), "csv table written");
        self.persisted = self.rows.len();
        self.header_changed = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}
