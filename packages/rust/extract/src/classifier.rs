//! Label/value field classification over a document's table grids.
//!
//! Every row with at least two cells is read as `label | value`. The label is
//! tested against [`LABEL_RULES`] in order and the first rule whose pattern
//! occurs in the label decides the field.

use tenderscan_shared::{RawField, RawFieldMap, TableGrid};
use tracing::debug;

use crate::clean::{clean_value, date_token, normalize_label};

/// A substring pattern (lowercase) and the field it identifies.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub pattern: &'static str,
    pub field: RawField,
}

/// Classification rules in priority order.
pub const LABEL_RULES: &[LabelRule] = &[
    LabelRule { pattern: "bid opening date", field: RawField::BidOpeningDate },
    LabelRule { pattern: "total quantity", field: RawField::TotalQuantity },
    LabelRule { pattern: "ministry", field: RawField::Ministry },
    LabelRule { pattern: "department name", field: RawField::DepartmentName },
    LabelRule { pattern: "organisation name", field: RawField::OrganisationName },
    LabelRule { pattern: "emd amount", field: RawField::EmdAmount },
    LabelRule { pattern: "estimated bid value", field: RawField::EstimatedBidValue },
    LabelRule { pattern: "boq title", field: RawField::BoqTitle },
    LabelRule { pattern: "item category", field: RawField::ItemCategory },
    LabelRule { pattern: "msme exemption", field: RawField::MsmeExemption },
    LabelRule { pattern: "mse exemption", field: RawField::MsmeExemption },
    LabelRule { pattern: "startup exemption", field: RawField::StartupExemption },
];

/// Outcome of matching one label against the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    /// Field chosen by the highest-priority rule.
    pub field: RawField,
    /// Lower-priority fields whose patterns also occur in the label.
    pub shadowed: Vec<RawField>,
}

/// Something odd seen while classifying; never fails the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyWarning {
    /// The label contains patterns for more than one field.
    AmbiguousLabel {
        label: String,
        chosen: RawField,
        shadowed: Vec<RawField>,
    },
    /// The same field matched again with a different value; the later value
    /// replaced the earlier one.
    ConflictingValue {
        field: RawField,
        previous: String,
        replacement: String,
    },
}

impl std::fmt::Display for ClassifyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmbiguousLabel {
                label,
                chosen,
                shadowed,
            } => {
                let others: Vec<&str> = shadowed.iter().map(RawField::as_str).collect();
                write!(
                    f,
                    "label '{label}' matched {chosen}, also matches {}",
                    others.join(", ")
                )
            }
            Self::ConflictingValue {
                field,
                previous,
                replacement,
            } => write!(f, "{field} '{previous}' replaced by '{replacement}'"),
        }
    }
}

/// Classified fields plus any warnings raised along the way.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub fields: RawFieldMap,
    pub warnings: Vec<ClassifyWarning>,
}

/// Match a normalized (trimmed, lowercased) label against [`LABEL_RULES`].
pub fn match_label(label: &str) -> Option<LabelMatch> {
    let mut hits = LABEL_RULES
        .iter()
        .filter(|rule| label.contains(rule.pattern))
        .map(|rule| rule.field);

    let field = hits.next()?;
    let mut shadowed: Vec<RawField> = hits.filter(|f| *f != field).collect();
    shadowed.dedup();
    Some(LabelMatch { field, shadowed })
}

/// Scan every `label | value` row of every grid and build the field map.
pub fn classify(grids: &[TableGrid]) -> Classification {
    let mut out = Classification::default();

    for grid in grids {
        for row in grid.rows() {
            if row.len() < 2 {
                continue;
            }
            let Some(raw_label) = row[0].as_deref() else {
                continue;
            };
            let label = normalize_label(raw_label);
            let Some(hit) = match_label(&label) else {
                continue;
            };

            if !hit.shadowed.is_empty() {
                out.warnings.push(ClassifyWarning::AmbiguousLabel {
                    label: label.clone(),
                    chosen: hit.field,
                    shadowed: hit.shadowed,
                });
            }

            let cleaned = clean_value(row[1].as_deref());
            let value = match hit.field {
                RawField::BidOpeningDate => date_token(&cleaned).to_string(),
                _ => cleaned,
            };

            debug!(field = %hit.field, %value, "classified row");

            if let Some(previous) = out.fields.insert(hit.field, value.clone()) {
                if previous != value {
                    out.warnings.push(ClassifyWarning::ConflictingValue {
                        field: hit.field,
                        previous,
                        replacement: value,
                    });
                }
            }
        }
    }

    out
}
