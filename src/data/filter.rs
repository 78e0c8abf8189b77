use std::collections::BTreeSet;

use super::census::NON_CONTINENTAL;
use super::model::{AttributeValue, Record, Table};

// ---------------------------------------------------------------------------
// Exclusion by key set
// ---------------------------------------------------------------------------

/// Rows whose postal abbreviation is not in `keys`, in their original order.
pub fn exclude_keys<S: AsRef<str>>(table: &Table, keys: &[S]) -> Table {
    let mut out = table.clone();
    exclude_keys_in_place(&mut out, keys);
    out
}

pub fn exclude_keys_in_place<S: AsRef<str>>(table: &mut Table, keys: &[S]) {
    let excluded: BTreeSet<&str> = keys.iter().map(|k| k.as_ref()).collect();
    let before = table.len();
    table.retain(|r| !excluded.contains(r.stusps.as_str()));
    log::debug!("excluded {} of {before} records", before - table.len());
}

/// The contiguous states plus DC.
pub fn continental(table: &Table) -> Table {
    exclude_keys(table, &NON_CONTINENTAL[..])
}

// ---------------------------------------------------------------------------
// Selection by attribute
// ---------------------------------------------------------------------------

/// Equality predicate over one attribute of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Region(u8),
    Division(u8),
    State(String),
    /// Match a pass-through column; a record without the column only
    /// matches `AttributeValue::Null`.
    Attribute { column: String, value: AttributeValue },
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Region(code) => record.region == *code,
            Predicate::Division(code) => record.division == *code,
            Predicate::State(stusps) => record.stusps == *stusps,
            Predicate::Attribute { column, value } => match record.attributes.get(column) {
                Some(v) => v == value,
                None => value.is_null(),
            },
        }
    }
}

/// Return indices of records matching `predicate`.
pub fn selected_indices(table: &Table, predicate: &Predicate) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| predicate.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// The matching subset, preserving relative order. No match is an empty
/// table, not an error.
pub fn select(table: &Table, predicate: &Predicate) -> Table {
    let records: Vec<Record> = table
        .records()
        .iter()
        .filter(|r| predicate.matches(r))
        .cloned()
        .collect();
    if records.is_empty() {
        log::info!("selection {predicate:?} matched no records");
    }
    table.with_records(records)
}
