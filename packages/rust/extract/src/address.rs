//! Address aggregation.
//!
//! Address blocks are laid out vertically: a header cell containing an
//! address token, and the address itself in the cell directly below it. Every
//! such pair across all grids contributes one fragment.

use std::collections::BTreeSet;

use tenderscan_shared::TableGrid;

use crate::clean::clean_fragment;

/// Tokens marking an address header cell (English, Hindi).
pub const ADDRESS_TOKENS: [&str; 2] = ["Address", "पता"];

/// Separator used when a set of fragments is written into a record.
///
/// Fragments often contain ", " themselves, so the joined `Address` column
/// is for reading only. Use [`AddressSet`] when fragments are needed.
pub const ADDRESS_SEPARATOR: &str = ", ";

/// Deduplicated address fragments for one document.
///
/// Backed by a sorted set so serialization does not depend on grid or row
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    fragments: BTreeSet<String>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cleaned fragment. Empty fragments are dropped.
    pub fn insert(&mut self, fragment: String) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.fragments.insert(fragment)
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: AddressSet) {
        self.fragments.extend(other.fragments);
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.fragments.contains(fragment)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in sorted order joined with [`ADDRESS_SEPARATOR`].
    pub fn join(&self) -> String {
        self.iter().collect::<Vec<_>>().join(ADDRESS_SEPARATOR)
    }
}

fn is_address_header(text: &str) -> bool {
    ADDRESS_TOKENS.iter().any(|token| text.contains(token))
}

/// Collect address fragments from a single grid.
pub fn collect_from_grid(grid: &TableGrid) -> AddressSet {
    let mut set = AddressSet::new();

    for (row_idx, row) in grid.rows().iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let Some(text) = cell.as_deref() else {
                continue;
            };
            if !is_address_header(text) {
                continue;
            }
            match grid.cell(row_idx + 1, col_idx) {
                Some(below) if !below.is_empty() => {
                    set.insert(clean_fragment(below));
                }
                _ => {}
            }
        }
    }

    set
}

/// Collect address fragments from every grid of a document.
pub fn collect_addresses(grids: &[TableGrid]) -> AddressSet {
    let mut set = AddressSet::new();
    for grid in grids {
        set.extend(collect_from_grid(grid));
    }
    set
}
