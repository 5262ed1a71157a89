//! Batch pipeline: directory → grids → fields → record → gate → store.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDateTime, Utc};
use tracing::{debug, info, instrument, warn};

use tenderscan_extract::{NormalizeInput, RecordDefaults, build_record, scan};
use tenderscan_shared::{
    AppConfig, Result, RunStats, TenderNumber, TenderRecord, TenderScanError,
};
use tenderscan_sources::{ContentConverter, GridSource, SourceDocument, list_documents};
use tenderscan_storage::TenderStore;

use crate::dedup::{GateOutcome, ProcessedIdentitySet};

/// Configuration for one `run_batch` call.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding one document per tender.
    pub input_dir: PathBuf,
    /// File-name suffix stripped to obtain the tender number.
    pub document_suffix: String,
    pub defaults: RecordDefaults,
}

impl BatchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&config.defaults.input_dir),
            document_suffix: config.defaults.document_suffix.clone(),
            defaults: RecordDefaults {
                tender_type: config.record.tender_type.clone(),
                website: config.record.website.clone(),
            },
        }
    }
}

/// Why a document was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Identity was in the store before extraction started.
    KnownIdentity,
    /// The store already held the identity when the record was offered.
    AlreadyStored,
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the document list is known.
    fn discovered(&self, total: usize);
    /// Called after a record is written.
    fn document_inserted(&self, tender_number: &TenderNumber);
    /// Called when a document produces no write because it is a duplicate.
    fn document_skipped(&self, tender_number: &TenderNumber, reason: SkipReason);
    /// Called when a document fails to read, classify, or persist.
    fn document_failed(&self, tender_number: &TenderNumber, error: &TenderScanError);
    /// Called when the batch completes.
    fn done(&self, stats: &RunStats);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn discovered(&self, _total: usize) {}
    fn document_inserted(&self, _tender_number: &TenderNumber) {}
    fn document_skipped(&self, _tender_number: &TenderNumber, _reason: SkipReason) {}
    fn document_failed(&self, _tender_number: &TenderNumber, _error: &TenderScanError) {}
    fn done(&self, _stats: &RunStats) {}
}

/// Build the record for one document without touching any store.
///
/// A grid-source failure fails the document. A conversion failure only
/// leaves `HTMLcontent` empty.
#[instrument(skip_all, fields(tender = %doc.tender_number, grids = grids.name()))]
pub fn extract_document(
    doc: &SourceDocument,
    grids: &dyn GridSource,
    converter: &dyn ContentConverter,
    defaults: &RecordDefaults,
    crawled_at: NaiveDateTime,
) -> Result<TenderRecord> {
    let tables = grids.grids(&doc.path)?;
    debug!(tables = tables.len(), "grids read");

    let fields = scan(&tables);
    for warning in &fields.classification.warnings {
        warn!(tender = %doc.tender_number, "{warning}");
    }

    let html_content = if converter.enabled() {
        match converter.convert(&doc.path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(converter = converter.name(), error = %e, "content conversion failed");
                None
            }
        }
    } else {
        None
    };

    Ok(build_record(
        NormalizeInput {
            tender_number: doc.tender_number.clone(),
            fields: &fields.classification.fields,
            addresses: &fields.addresses,
            html_content,
            crawled_at,
        },
        defaults,
    ))
}

/// Process every document in the input directory, one at a time.
///
/// 1. Load the identities already in the store (failure aborts the run)
/// 2. List the input documents (failure aborts the run)
/// 3. Per document: skip known identities, extract, gate, append
/// 4. Flush staged appends, then record the run summary
///
/// Per-document failures are counted and the batch continues. A fatal store
/// error or a failed flush ends the run with an error.
#[instrument(skip_all, fields(input = %config.input_dir.display(), store = store.name()))]
pub async fn run_batch<S: TenderStore>(
    config: &BatchConfig,
    store: &mut S,
    grids: &dyn GridSource,
    converter: &dyn ContentConverter,
    progress: &dyn ProgressReporter,
) -> Result<RunStats> {
    let start = Instant::now();
    let started_at = Utc::now();

    progress.phase("Loading stored tender numbers");
    let mut gate = ProcessedIdentitySet::load(&*store).await?;

    progress.phase("Scanning input directory");
    let documents = list_documents(&config.input_dir, &config.document_suffix).map_err(|e| {
        TenderScanError::Setup(format!(
            "cannot read input directory {}: {e}",
            config.input_dir.display()
        ))
    })?;

    let mut stats = RunStats {
        discovered: documents.len(),
        ..RunStats::default()
    };
    info!(
        documents = stats.discovered,
        known = gate.len(),
        "starting batch"
    );
    progress.discovered(stats.discovered);

    progress.phase("Extracting tenders");
    for doc in &documents {
        if gate.contains(&doc.tender_number) {
            info!(tender = %doc.tender_number, "already stored, skipping");
            stats.skipped_duplicates += 1;
            progress.document_skipped(&doc.tender_number, SkipReason::KnownIdentity);
            continue;
        }

        let crawled_at = Local::now().naive_local();
        let record =
            match extract_document(doc, grids, converter, &config.defaults, crawled_at) {
                Ok(record) => record,
                Err(e) => {
                    warn!(tender = %doc.tender_number, error = %e, "extraction failed");
                    stats.failed += 1;
                    progress.document_failed(&doc.tender_number, &e);
                    continue;
                }
            };

        match gate.offer(&record, store).await {
            Ok(GateOutcome::Inserted) => {
                info!(tender = %doc.tender_number, "inserted");
                stats.inserted += 1;
                progress.document_inserted(&doc.tender_number);
            }
            Ok(GateOutcome::SkippedDuplicate) => {
                info!(tender = %doc.tender_number, "store already holds tender, skipping");
                stats.skipped_duplicates += 1;
                progress.document_skipped(&doc.tender_number, SkipReason::AlreadyStored);
            }
            Err(e) if e.is_fatal() => {
                warn!(tender = %doc.tender_number, error = %e, "store failed, aborting run");
                return Err(e);
            }
            Err(e) => {
                warn!(tender = %doc.tender_number, error = %e, "persist failed");
                stats.failed += 1;
                progress.document_failed(&doc.tender_number, &e);
            }
        }
    }

    // Staged appends are lost if this fails; the next run retries them.
    if let Err(e) = store.finish().await {
        warn!(error = %e, pending = stats.inserted, "could not write staged records");
        return Err(e);
    }

    if let Err(e) = store.record_run(&stats, started_at).await {
        warn!(error = %e, "could not record run summary");
    }

    info!(
        inserted = stats.inserted,
        skipped = stats.skipped_duplicates,
        failed = stats.failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch complete"
    );
    progress.done(&stats);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use tenderscan_shared::{Flag, StoreBackend, StoreConfig};
    use tenderscan_sources::{CommandConverter, NoConversion, SidecarGridSource};
    use tenderscan_storage::{CsvStore, SqlStore, Store};
    use uuid::Uuid;

    const FIXTURE_ID: &str = "GEM_2024_B_4929290";
    const SIDECAR: &str = ".tables.json";

    fn fixture_sidecar() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../../fixtures/grids"))
            .join(format!("{FIXTURE_ID}.pdf{SIDECAR}"))
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ts_{tag}_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Input dir with the fixture document, an empty-grid document, and a
    /// document whose grids cannot be read.
    fn input_dir() -> PathBuf {
        let dir = temp_dir("input");
        std::fs::write(dir.join(format!("{FIXTURE_ID}.pdf")), b"%PDF-1.4").unwrap();
        std::fs::copy(
            fixture_sidecar(),
            dir.join(format!("{FIXTURE_ID}.pdf{SIDECAR}")),
        )
        .unwrap();

        std::fs::write(dir.join("GEM_2024_B_1000001.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.join(format!("GEM_2024_B_1000001.pdf{SIDECAR}")), b"[]").unwrap();

        std::fs::write(dir.join("GEM_2024_B_1000002.pdf"), b"%PDF-1.4").unwrap();
        dir
    }

    fn batch_config(input: &Path) -> BatchConfig {
        BatchConfig {
            input_dir: input.to_path_buf(),
            document_suffix: ".pdf".into(),
            defaults: RecordDefaults {
                tender_type: "buy".into(),
                website: "https://bidplus.gem.gov.in/all-bids".into(),
            },
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn discovered(&self, total: usize) {
            self.events.lock().unwrap().push(format!("discovered {total}"));
        }
        fn document_inserted(&self, id: &TenderNumber) {
            self.events.lock().unwrap().push(format!("inserted {id}"));
        }
        fn document_skipped(&self, id: &TenderNumber, _reason: SkipReason) {
            self.events.lock().unwrap().push(format!("skipped {id}"));
        }
        fn document_failed(&self, id: &TenderNumber, _error: &TenderScanError) {
            self.events.lock().unwrap().push(format!("failed {id}"));
        }
        fn done(&self, stats: &RunStats) {
            self.events.lock().unwrap().push(format!("done {}", stats.inserted));
        }
    }

    #[test]
    fn extracts_fixture_record() {
        let input = input_dir();
        let doc = SourceDocument {
            path: input.join(format!("{FIXTURE_ID}.pdf")),
            tender_number: TenderNumber::new(FIXTURE_ID),
        };
        let crawled_at = NaiveDateTime::parse_from_str("2024-04-20 09:15", "%Y-%m-%d %H:%M").unwrap();

        let record = extract_document(
            &doc,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &batch_config(&input).defaults,
            crawled_at,
        )
        .unwrap();

        assert_eq!(record.tender_number.as_str(), FIXTURE_ID);
        assert_eq!(record.tender_end_submission_date_time, "2024-05-01");
        assert_eq!(record.tender_opening_date_time, "2024-05-01");
        assert_eq!(record.contact_address, "Ministry of Railways, Northern Railway");
        assert_eq!(record.organization_name, "Indian Railways");
        assert_eq!(record.contact_number, "25");
        assert_eq!(record.earnest_money_deposite, "20000");
        assert_eq!(record.tender_estimated_cost, "1000000");
        assert_eq!(record.address, "New Delhi, Plot 5, Sector 9, Noida");
        assert_eq!(record.tender_prod_no, Flag::Yes);
        assert_eq!(record.contact_phone2, Flag::No);
        assert_eq!(record.tender_detail_work_description, "Office Chairs - Office Chair (Q2)");
        assert_eq!(record.crawling_date_time, "2024-04-20 09:15");
        assert_eq!(record.tender_type, "buy");
        assert_eq!(record.html_content, None);
        assert_eq!(record.document, "");
    }

    #[cfg(unix)]
    #[test]
    fn converter_output_becomes_content() {
        let input = input_dir();
        let doc = SourceDocument {
            path: input.join(format!("{FIXTURE_ID}.pdf")),
            tender_number: TenderNumber::new(FIXTURE_ID),
        };
        let record = extract_document(
            &doc,
            &SidecarGridSource::new(SIDECAR),
            &CommandConverter::new("cat", vec![]),
            &batch_config(&input).defaults,
            Local::now().naive_local(),
        )
        .unwrap();
        assert_eq!(record.html_content.as_deref(), Some("%PDF-1.4"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_conversion_keeps_record() {
        let input = input_dir();
        let doc = SourceDocument {
            path: input.join(format!("{FIXTURE_ID}.pdf")),
            tender_number: TenderNumber::new(FIXTURE_ID),
        };
        let record = extract_document(
            &doc,
            &SidecarGridSource::new(SIDECAR),
            &CommandConverter::new("false", vec![]),
            &batch_config(&input).defaults,
            Local::now().naive_local(),
        )
        .unwrap();
        assert_eq!(record.html_content, None);
        assert_eq!(record.earnest_money_deposite, "20000");
    }

    #[test]
    fn empty_grids_give_empty_fields_and_no_flags() {
        let input = input_dir();
        let doc = SourceDocument {
            path: input.join("GEM_2024_B_1000001.pdf"),
            tender_number: TenderNumber::new("GEM_2024_B_1000001"),
        };
        let record = extract_document(
            &doc,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &batch_config(&input).defaults,
            Local::now().naive_local(),
        )
        .unwrap();

        assert_eq!(record.contact_address, "");
        assert_eq!(record.organization_name, "");
        assert_eq!(record.address, "");
        assert_eq!(record.earnest_money_deposite, "");
        assert_eq!(record.tender_end_submission_date_time, "");
        assert_eq!(record.tender_prod_no, Flag::No);
        assert_eq!(record.contact_phone2, Flag::No);
    }

    #[tokio::test]
    async fn batch_is_idempotent_on_sql() {
        let input = input_dir();
        let db = temp_dir("db").join("tenders.db");
        let config = batch_config(&input);
        let grids = SidecarGridSource::new(SIDECAR);

        let mut store = SqlStore::open(&db).await.unwrap();
        let first = run_batch(&config, &mut store, &grids, &NoConversion, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(
            first,
            RunStats {
                discovered: 3,
                inserted: 2,
                skipped_duplicates: 0,
                failed: 1,
            }
        );
        drop(store);

        let mut store = SqlStore::open(&db).await.unwrap();
        let second = run_batch(&config, &mut store, &grids, &NoConversion, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_duplicates, 2);
        assert_eq!(second.failed, 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn batch_is_idempotent_on_csv() {
        let input = input_dir();
        let csv = temp_dir("csv").join("tenders.csv");
        let config = batch_config(&input);
        let grids = SidecarGridSource::new(SIDECAR);

        let mut store = CsvStore::open(&csv).unwrap();
        let first = run_batch(&config, &mut store, &grids, &NoConversion, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);

        let mut store = CsvStore::open(&csv).unwrap();
        let second = run_batch(&config, &mut store, &grids, &NoConversion, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn stored_identity_is_skipped_before_extraction() {
        let input = input_dir();
        let csv = temp_dir("csv").join("tenders.csv");
        std::fs::write(
            &csv,
            format!("TenderNumber,OrganizationName\n{FIXTURE_ID},Someone Else\n"),
        )
        .unwrap();

        let mut store = CsvStore::open(&csv).unwrap();
        let progress = RecordingProgress::default();
        let stats = run_batch(
            &batch_config(&input),
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &progress,
        )
        .await
        .unwrap();

        assert_eq!(stats.skipped_duplicates, 1);
        assert_eq!(stats.inserted, 1);
        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.contains("Someone Else"));
        assert!(!text.contains("Indian Railways"));

        let events = progress.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "discovered 3".to_string(),
                "inserted GEM_2024_B_1000001".to_string(),
                "failed GEM_2024_B_1000002".to_string(),
                "skipped GEM_2024_B_4929290".to_string(),
                "done 1".to_string(),
            ]
        );
    }

    /// Store that accepts nothing: `append` fails with `append_error`, and
    /// `finish` fails when `fail_finish` is set.
    struct BrokenStore {
        append_error: fn() -> TenderScanError,
        fail_finish: bool,
        appends: usize,
    }

    impl TenderStore for BrokenStore {
        async fn load_existing_identities(
            &self,
        ) -> Result<std::collections::HashSet<TenderNumber>> {
            Ok(Default::default())
        }

        async fn append(
            &mut self,
            _record: &TenderRecord,
        ) -> Result<tenderscan_storage::AppendOutcome> {
            self.appends += 1;
            Err((self.append_error)())
        }

        async fn finish(&mut self) -> Result<()> {
            if self.fail_finish {
                return Err(TenderScanError::Storage("disk full".into()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn rejected_writes_are_counted_and_batch_continues() {
        let input = input_dir();
        let mut store = BrokenStore {
            append_error: || TenderScanError::Storage("write rejected".into()),
            fail_finish: false,
            appends: 0,
        };
        let stats = run_batch(
            &batch_config(&input),
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(store.appends, 2);
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.failed, 3);
    }

    #[tokio::test]
    async fn fatal_store_error_stops_the_batch() {
        let input = input_dir();
        let mut store = BrokenStore {
            append_error: || TenderScanError::Setup("connection lost".into()),
            fail_finish: false,
            appends: 0,
        };
        let err = run_batch(
            &batch_config(&input),
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TenderScanError::Setup(_)));
        assert_eq!(store.appends, 1);
    }

    #[tokio::test]
    async fn failed_flush_fails_the_run() {
        let input = input_dir();
        let mut store = BrokenStore {
            append_error: || TenderScanError::Storage("write rejected".into()),
            fail_finish: true,
            appends: 0,
        };
        let err = run_batch(
            &batch_config(&input),
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn csv_batch_writes_table_at_the_end() {
        let input = input_dir();
        let csv = temp_dir("csv").join("tenders.csv");
        let mut store = CsvStore::open(&csv).unwrap();
        run_batch(
            &batch_config(&input),
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(store.pending(), 0);
        let text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Indian Railways"));
    }

    #[tokio::test]
    async fn store_without_identity_column_is_fatal() {
        let csv = temp_dir("csv").join("tenders.csv");
        std::fs::write(&csv, "Foo,Bar\n").unwrap();

        let config = StoreConfig {
            backend: StoreBackend::Csv,
            db_path: String::new(),
            csv_path: csv.to_string_lossy().into_owned(),
        };
        let err = Store::open(&config).await.err().expect("setup failure");
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn missing_input_directory_is_fatal() {
        let db = temp_dir("db").join("tenders.db");
        let mut store = SqlStore::open(&db).await.unwrap();
        let config = batch_config(Path::new("/nonexistent/tenderscan/input"));

        let err = run_batch(
            &config,
            &mut store,
            &SidecarGridSource::new(SIDECAR),
            &NoConversion,
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TenderScanError::Setup(_)));
    }
}
