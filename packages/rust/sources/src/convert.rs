//! Document-to-text conversion for the `HTMLcontent` passthrough column.

use std::path::Path;
use std::process::Command;

use tenderscan_shared::{Result, TenderScanError};

/// Converts a document into a text representation.
///
/// Callers treat a failure as "no content" rather than a failed document.
pub trait ContentConverter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<String>;

    /// Human-readable converter name for tracing.
    fn name(&self) -> &str;

    /// `false` when conversion is switched off and should not be attempted.
    fn enabled(&self) -> bool {
        true
    }
}

/// Runs `cmd args… <document>` and returns its stdout, e.g. `pdftohtml -stdout`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    pub cmd: String,
    pub args: Vec<String>,
}

impl CommandConverter {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }
}

impl ContentConverter for CommandConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.cmd)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| {
                TenderScanError::Conversion(format!(
                    "failed to spawn `{}` for {}: {e}",
                    self.cmd,
                    path.display()
                ))
            })?;

        if !output.status.success() {
            return Err(TenderScanError::Conversion(format!(
                "`{}` exited with {} for {}",
                self.cmd,
                output.status,
                path.display()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        &self.cmd
    }
}

/// Conversion switched off; every document yields no content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConversion;

impl ContentConverter for NoConversion {
    fn convert(&self, _path: &Path) -> Result<String> {
        Err(TenderScanError::Conversion("conversion disabled".into()))
    }

    fn name(&self) -> &str {
        "none"
    }

    fn enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn command_converter_returns_stdout() {
        let fixture = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../../fixtures/grids/GEM_2024_B_4929290.pdf.tables.json"
        );
        let converter = CommandConverter::new("cat", vec![]);
        let text = converter.convert(Path::new(fixture)).expect("cat fixture");
        assert!(text.contains("EMD Amount"));
    }

    #[cfg(unix)]
    #[test]
    fn command_converter_reports_exit_status() {
        let converter = CommandConverter::new("false", vec![]);
        let err = converter.convert(Path::new("a.pdf")).unwrap_err();
        assert!(matches!(err, TenderScanError::Conversion(_)));
    }

    #[test]
    fn no_conversion_always_fails() {
        assert!(NoConversion.convert(Path::new("a.pdf")).is_err());
        assert_eq!(NoConversion.name(), "none");
        assert!(!NoConversion.enabled());
        assert!(CommandConverter::new("pdftohtml", vec![]).enabled());
    }
}
