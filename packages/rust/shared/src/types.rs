//! Core domain types for TenderScan.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TableGrid
// ---------------------------------------------------------------------------

/// One table recovered from a document: rows of optional text cells.
///
/// Serialized as a bare nested array, `[["label", "value"], [null, "x"]]`,
/// which is the shape external table extractors emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableGrid {
    rows: Vec<Vec<Option<String>>>,
}

impl TableGrid {
    /// Build a grid from row-major cells.
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Convenience constructor for tests and fixtures: every cell present.
    pub fn from_text<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = &'static str>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|c| Some(c.to_string())).collect())
                .collect(),
        )
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Text of the cell at `(row, col)`, if the cell exists and has text.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Raw fields
// ---------------------------------------------------------------------------

/// The fixed set of labeled fields recognized in bid documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawField {
    BidOpeningDate,
    TotalQuantity,
    Ministry,
    DepartmentName,
    OrganisationName,
    EmdAmount,
    EstimatedBidValue,
    BoqTitle,
    ItemCategory,
    MsmeExemption,
    StartupExemption,
}

impl RawField {
    /// Stable key used in logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BidOpeningDate => "bid-opening-date",
            Self::TotalQuantity => "total-quantity",
            Self::Ministry => "ministry",
            Self::DepartmentName => "department-name",
            Self::OrganisationName => "organisation-name",
            Self::EmdAmount => "emd-amount",
            Self::EstimatedBidValue => "estimated-bid-value",
            Self::BoqTitle => "boq-title",
            Self::ItemCategory => "item-category",
            Self::MsmeExemption => "msme-exemption",
            Self::StartupExemption => "startup-exemption",
        }
    }
}

impl std::fmt::Display for RawField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cleaned values found for each [`RawField`] in one document.
///
/// A field whose label never appeared is absent, which is distinct from a
/// label that appeared with an empty value cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFieldMap {
    values: BTreeMap<RawField, String>,
}

impl RawFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the one it replaced.
    pub fn insert(&mut self, field: RawField, value: impl Into<String>) -> Option<String> {
        self.values.insert(field, value.into())
    }

    /// The value for `field`, or `None` if the label was never found.
    pub fn get(&self, field: RawField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// The value for `field`, rendering an absent field as the empty string.
    pub fn text(&self, field: RawField) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TenderNumber
// ---------------------------------------------------------------------------

/// Stable tender identity derived from a document's file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenderNumber(String);

impl TenderNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive the identity from a document path by stripping `suffix` from
    /// the file name. Returns `None` when the name does not end with
    /// `suffix` or nothing is left after stripping it.
    pub fn from_path(path: &Path, suffix: &str) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(suffix)?;
        if stem.is_empty() {
            None
        } else {
            Some(Self(stem.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Flag
// ---------------------------------------------------------------------------

/// A categorical `Y`/`N` column. Defaults to `N`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "Y")]
    Yes,
    #[default]
    #[serde(rename = "N")]
    No,
}

impl Flag {
    /// `Y` only when the answer is "yes" ignoring case and surrounding
    /// whitespace. A missing answer is `N`.
    pub fn from_answer(answer: Option<&str>) -> Self {
        match answer {
            Some(text) if text.trim().eq_ignore_ascii_case("yes") => Self::Yes,
            _ => Self::No,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
        }
    }
}

// ---------------------------------------------------------------------------
// TenderRecord
// ---------------------------------------------------------------------------

/// Column names of the destination schema, in storage order.
pub const TENDER_COLUMNS: [&str; 18] = [
    "TenderNumber",
    "TenderEndSubmissionDateTime",
    "ContactNumber",
    "TenderType",
    "TenderOpeningDateTime",
    "ContactAddress",
    "NameOfWebSite",
    "CrawlingDateTime",
    "EarnestMoneyDeposite",
    "TenderEstimatedCost",
    "Address",
    "RequirementWorkBrief",
    "TenderProdNo",
    "ContactPhone2",
    "TenderDetailWorkDescription",
    "HTMLcontent",
    "Document",
    "OrganizationName",
];

/// Name of the identity column.
pub const IDENTITY_COLUMN: &str = "TenderNumber";

/// One normalized record per source document.
///
/// Field order matches [`TENDER_COLUMNS`]; serde names match the column
/// names so the same struct serializes straight into either backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TenderRecord {
    pub tender_number: TenderNumber,
    pub tender_end_submission_date_time: String,
    pub contact_number: String,
    pub tender_type: String,
    pub tender_opening_date_time: String,
    pub contact_address: String,
    pub name_of_web_site: String,
    pub crawling_date_time: String,
    pub earnest_money_deposite: String,
    pub tender_estimated_cost: String,
    pub address: String,
    pub requirement_work_brief: String,
    pub tender_prod_no: Flag,
    pub contact_phone2: Flag,
    pub tender_detail_work_description: String,
    #[serde(rename = "HTMLcontent")]
    pub html_content: Option<String>,
    pub document: String,
    pub organization_name: String,
}

impl TenderRecord {
    /// `(column, value)` pairs in [`TENDER_COLUMNS`] order. Only
    /// `HTMLcontent` can be `None`.
    pub fn columns(&self) -> [(&'static str, Option<&str>); 18] {
        let values = [
            Some(self.tender_number.as_str()),
            Some(self.tender_end_submission_date_time.as_str()),
            Some(self.contact_number.as_str()),
            Some(self.tender_type.as_str()),
            Some(self.tender_opening_date_time.as_str()),
            Some(self.contact_address.as_str()),
            Some(self.name_of_web_site.as_str()),
            Some(self.crawling_date_time.as_str()),
            Some(self.earnest_money_deposite.as_str()),
            Some(self.tender_estimated_cost.as_str()),
            Some(self.address.as_str()),
            Some(self.requirement_work_brief.as_str()),
            Some(self.tender_prod_no.as_str()),
            Some(self.contact_phone2.as_str()),
            Some(self.tender_detail_work_description.as_str()),
            self.html_content.as_deref(),
            Some(self.document.as_str()),
            Some(self.organization_name.as_str()),
        ];
        let mut out = [("", None); 18];
        for (i, value) in values.into_iter().enumerate() {
            out[i] = (TENDER_COLUMNS[i], value);
        }
        out
    }

    /// Value of a column by name, `None` for unknown columns or null content.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns()
            .into_iter()
            .find(|(col, _)| *col == name)
            .and_then(|(_, value)| value)
    }
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Documents found in the input directory.
    pub discovered: usize,
    /// Records written to the store.
    pub inserted: usize,
    /// Documents skipped because their identity was already stored.
    pub skipped_duplicates: usize,
    /// Documents that failed to read, classify, or persist.
    pub failed: usize,
}
