//! Table grid sources.
//!
//! Grids come from an external table extractor. Two adapters are provided:
//! one that runs the extractor per document, one that reads grids the
//! extractor already wrote next to the document. Both speak the same JSON
//! shape: an array of grids, each an array of rows of `string | null` cells.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tenderscan_shared::{Result, TableGrid, TenderScanError};
use tracing::debug;

/// A source of table grids for one document.
///
/// Failing to open or parse a document is an error; an `Ok` with no grids
/// means the document genuinely has no tables.
pub trait GridSource: Send + Sync {
    /// Read all grids of the document at `path`, in document order.
    fn grids(&self, path: &Path) -> Result<Vec<TableGrid>>;

    /// Human-readable source name for tracing.
    fn name(&self) -> &str;
}

/// Parse the JSON grid array emitted by an extractor.
pub fn parse_grids(path: &Path, json: &[u8]) -> Result<Vec<TableGrid>> {
    serde_json::from_slice(json)
        .map_err(|e| TenderScanError::source_read(path, format!("invalid grid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Runs `cmd args… <document>` and reads grids from its stdout.
#[derive(Debug, Clone)]
pub struct CommandGridSource {
    pub cmd: String,
    pub args: Vec<String>,
}

impl CommandGridSource {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }
}

impl GridSource for CommandGridSource {
    fn grids(&self, path: &Path) -> Result<Vec<TableGrid>> {
        let output = Command::new(&self.cmd)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| {
                TenderScanError::source_read(
                    path,
                    format!("failed to spawn table extractor: {e}. Is `{}` installed?", self.cmd),
                )
            })?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(200)
                .collect();
            return Err(TenderScanError::source_read(
                path,
                format!("table extractor exited with {}: {stderr}", output.status),
            ));
        }

        let grids = parse_grids(path, &output.stdout)?;
        debug!(path = %path.display(), grids = grids.len(), "grids extracted");
        Ok(grids)
    }

    fn name(&self) -> &str {
        "command"
    }
}

// ---------------------------------------------------------------------------
// Sidecar
// ---------------------------------------------------------------------------

/// Reads grids from `<document><suffix>`, e.g. `GEM_1.pdf.tables.json`.
#[derive(Debug, Clone)]
pub struct SidecarGridSource {
    pub suffix: String,
}

impl SidecarGridSource {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Location of the sidecar file for a document.
    pub fn sidecar_path(&self, document: &Path) -> PathBuf {
        let mut name = OsString::from(document.as_os_str());
        name.push(&self.suffix);
        PathBuf::from(name)
    }
}

impl GridSource for SidecarGridSource {
    fn grids(&self, path: &Path) -> Result<Vec<TableGrid>> {
        let sidecar = self.sidecar_path(path);
        let bytes = std::fs::read(&sidecar).map_err(|e| {
            TenderScanError::source_read(
                path,
                format!("cannot read grids from {}: {e}", sidecar.display()),
            )
        })?;
        parse_grids(path, &bytes)
    }

    fn name(&self) -> &str {
        "sidecar"
    }
}
