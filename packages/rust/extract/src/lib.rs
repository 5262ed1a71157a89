//! Field extraction and record normalization for tender documents.
//!
//! Two independent scans run over the same table grids:
//! - [`classifier`] maps `label | value` rows onto the fixed field set
//! - [`address`] collects address fragments from vertical address blocks
//!
//! [`normalize`] joins both into one [`TenderRecord`](tenderscan_shared::TenderRecord).

pub mod address;
pub mod classifier;
mod clean;
pub mod normalize;

use tenderscan_shared::TableGrid;
use tracing::instrument;

pub use address::{ADDRESS_SEPARATOR, ADDRESS_TOKENS, AddressSet, collect_addresses};
pub use classifier::{Classification, ClassifyWarning, LABEL_RULES, LabelRule, classify};
pub use clean::{clean_fragment, clean_value};
pub use normalize::{CRAWL_TIME_FORMAT, NormalizeInput, RecordDefaults, build_record};

/// Output of scanning one document's grids.
#[derive(Debug, Clone, Default)]
pub struct DocumentFields {
    pub classification: Classification,
    pub addresses: AddressSet,
}

/// Run both scans over a document's grids.
#[instrument(skip_all, fields(grids = grids.len()))]
pub fn scan(grids: &[TableGrid]) -> DocumentFields {
    DocumentFields {
        classification: classify(grids),
        addresses: collect_addresses(grids),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tenderscan_shared::{Flag, RawField, TenderNumber};

    #[test]
    fn scan_feeds_normalizer() {
        let grids = vec![
            TableGrid::from_text([
                ["Bid Opening Date", "2024-05-01 10:00 AM"],
                ["MSME Exemption", "yes "],
            ]),
            TableGrid::from_text([["पता"], ["New Delhi"]]),
        ];

        let scanned = scan(&grids);
        assert_eq!(
            scanned.classification.fields.get(RawField::BidOpeningDate),
            Some("2024-05-01")
        );

        let record = build_record(
            NormalizeInput {
                tender_number: TenderNumber::new("GEM_2024_B_7"),
                fields: &scanned.classification.fields,
                addresses: &scanned.addresses,
                html_content: None,
                crawled_at: NaiveDate::from_ymd_opt(2024, 4, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            },
            &RecordDefaults {
                tender_type: "buy".into(),
                website: "https://bidplus.gem.gov.in/all-bids".into(),
            },
        );

        assert_eq!(record.tender_end_submission_date_time, "2024-05-01");
        assert_eq!(record.tender_opening_date_time, "2024-05-01");
        assert_eq!(record.tender_prod_no, Flag::Yes);
        assert_eq!(record.address, "New Delhi");
        assert_eq!(record.html_content, None);
    }
}
