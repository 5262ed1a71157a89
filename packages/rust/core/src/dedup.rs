//! At-most-once gate in front of the store.

use std::collections::HashSet;

use tenderscan_shared::{Result, TenderNumber, TenderRecord, TenderScanError};
use tenderscan_storage::{AppendOutcome, TenderStore};
use tracing::debug;

/// What the gate did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Inserted,
    SkippedDuplicate,
}

/// Tender numbers already present in the destination store.
///
/// Loaded once per run and grown as records are accepted. It never shrinks,
/// and an identity is only added once the store holds a row for it.
#[derive(Debug, Clone, Default)]
pub struct ProcessedIdentitySet {
    ids: HashSet<TenderNumber>,
}

impl ProcessedIdentitySet {
    pub fn new(ids: HashSet<TenderNumber>) -> Self {
        Self { ids }
    }

    /// Read the existing identities from `store`. Any failure is a setup
    /// error: without the set the run cannot be idempotent.
    pub async fn load<S: TenderStore>(store: &S) -> Result<Self> {
        let ids = store.load_existing_identities().await.map_err(|e| {
            TenderScanError::Setup(format!("cannot read identities from {}: {e}", store.name()))
        })?;
        debug!(count = ids.len(), store = store.name(), "identity set loaded");
        Ok(Self { ids })
    }

    pub fn contains(&self, tender_number: &TenderNumber) -> bool {
        self.ids.contains(tender_number)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Persist `record` unless its identity is known.
    ///
    /// On a store error the identity stays out of the set so a later run
    /// retries the document.
    pub async fn offer<S: TenderStore>(
        &mut self,
        record: &TenderRecord,
        store: &mut S,
    ) -> Result<GateOutcome> {
        if self.contains(&record.tender_number) {
            return Ok(GateOutcome::SkippedDuplicate);
        }

        let outcome = store.append(record).await?;
        self.ids.insert(record.tender_number.clone());

        Ok(match outcome {
            AppendOutcome::Inserted => GateOutcome::Inserted,
            AppendOutcome::AlreadyPresent => GateOutcome::SkippedDuplicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderscan_shared::Flag;

    /// In-memory store that can be told to reject writes.
    #[derive(Default)]
    struct MemoryStore {
        rows: Vec<TenderRecord>,
        reject_writes: bool,
        fail_load: bool,
    }

    impl TenderStore for MemoryStore {
        async fn load_existing_identities(&self) -> Result<HashSet<TenderNumber>> {
            if self.fail_load {
                return Err(TenderScanError::Storage("unreachable".into()));
            }
            Ok(self.rows.iter().map(|r| r.tender_number.clone()).collect())
        }

        async fn append(&mut self, record: &TenderRecord) -> Result<AppendOutcome> {
            if self.reject_writes {
                return Err(TenderScanError::Storage("write rejected".into()));
            }
            if self.rows.iter().any(|r| r.tender_number == record.tender_number) {
                return Ok(AppendOutcome::AlreadyPresent);
            }
            self.rows.push(record.clone());
            Ok(AppendOutcome::Inserted)
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn record(id: &str, emd: &str) -> TenderRecord {
        TenderRecord {
            tender_number: TenderNumber::new(id),
            tender_end_submission_date_time: String::new(),
            contact_number: String::new(),
            tender_type: "buy".into(),
            tender_opening_date_time: String::new(),
            contact_address: String::new(),
            name_of_web_site: String::new(),
            crawling_date_time: String::new(),
            earnest_money_deposite: emd.into(),
            tender_estimated_cost: String::new(),
            address: String::new(),
            requirement_work_brief: String::new(),
            tender_prod_no: Flag::No,
            contact_phone2: Flag::No,
            tender_detail_work_description: String::new(),
            html_content: None,
            document: String::new(),
            organization_name: String::new(),
        }
    }

    #[tokio::test]
    async fn accepts_then_rejects_same_identity() {
        let mut store = MemoryStore::default();
        let mut gate = ProcessedIdentitySet::load(&store).await.unwrap();
        assert!(gate.is_empty());

        let first = gate.offer(&record("A", "1"), &mut store).await.unwrap();
        let second = gate.offer(&record("A", "2"), &mut store).await.unwrap();

        assert_eq!(first, GateOutcome::Inserted);
        assert_eq!(second, GateOutcome::SkippedDuplicate);
        assert_eq!(store.rows.len(), 1);
        assert_eq!(store.rows[0].earnest_money_deposite, "1");
    }

    #[tokio::test]
    async fn stale_set_falls_back_to_store_check() {
        let mut store = MemoryStore::default();
        store.rows.push(record("A", "1"));
        let mut gate = ProcessedIdentitySet::default();

        let outcome = gate.offer(&record("A", "9"), &mut store).await.unwrap();
        assert_eq!(outcome, GateOutcome::SkippedDuplicate);
        assert!(gate.contains(&TenderNumber::new("A")));
        assert_eq!(store.rows.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_identity_unknown() {
        let mut store = MemoryStore {
            reject_writes: true,
            ..Default::default()
        };
        let mut gate = ProcessedIdentitySet::default();

        assert!(gate.offer(&record("A", "1"), &mut store).await.is_err());
        assert!(!gate.contains(&TenderNumber::new("A")));

        store.reject_writes = false;
        let retry = gate.offer(&record("A", "1"), &mut store).await.unwrap();
        assert_eq!(retry, GateOutcome::Inserted);
    }

    #[tokio::test]
    async fn load_failure_is_setup_error() {
        let store = MemoryStore {
            fail_load: true,
            ..Default::default()
        };
        let err = ProcessedIdentitySet::load(&store).await.unwrap_err();
        assert!(matches!(err, TenderScanError::Setup(_)));
        assert!(err.is_fatal());
    }
}
