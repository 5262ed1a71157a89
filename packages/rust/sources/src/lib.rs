//! Document discovery and the external extraction collaborators.
//!
//! This crate provides:
//! - [`list_documents`]: finds tender documents in an input directory
//! - [`GridSource`]: table grids per document ([`CommandGridSource`], [`SidecarGridSource`])
//! - [`ContentConverter`]: passthrough content per document ([`CommandConverter`], [`NoConversion`])

pub mod convert;
pub mod grids;

use std::path::{Path, PathBuf};

use tenderscan_shared::{Result, TenderNumber, TenderScanError};
use tracing::{debug, warn};

pub use convert::{CommandConverter, ContentConverter, NoConversion};
pub use grids::{CommandGridSource, GridSource, SidecarGridSource, parse_grids};

/// A document found in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Identity derived from the file name.
    pub tender_number: TenderNumber,
}

/// List the documents in `dir` whose file name ends with `suffix`, sorted by
/// path so runs are reproducible.
pub fn list_documents(dir: &Path, suffix: &str) -> Result<Vec<SourceDocument>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TenderScanError::io(dir, e))?;

    let mut docs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TenderScanError::io(dir, e))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let matches_suffix = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix));
        if !matches_suffix {
            continue;
        }

        match TenderNumber::from_path(&path, suffix) {
            Some(tender_number) => docs.push(SourceDocument {
                path,
                tender_number,
            }),
            None => warn!(path = %path.display(), "cannot derive tender number, skipping"),
        }
    }

    docs.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(dir = %dir.display(), count = docs.len(), "documents discovered");
    Ok(docs)
}
