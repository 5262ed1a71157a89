//! Batch orchestration for TenderScan.
//!
//! [`run_batch`] walks an input directory and feeds each document through
//! extraction, the [`ProcessedIdentitySet`] gate, and a
//! [`TenderStore`](tenderscan_storage::TenderStore).

pub mod dedup;
pub mod pipeline;

pub use dedup::{GateOutcome, ProcessedIdentitySet};
pub use pipeline::{
    BatchConfig, ProgressReporter, SilentProgress, SkipReason, extract_document, run_batch,
};
