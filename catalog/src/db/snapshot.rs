//! Existing rows keyed by primary key.

use super::schema::format_table_name;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Primary-key values of one existing row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataRow {
    pub values: BTreeMap<String, Value>,
}

impl DataRow {
    pub fn new<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }
}

/// Tables whose primary keys changed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub inserted: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// Refreshable snapshot of existing rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSnapshot {
    tables: BTreeMap<String, Vec<DataRow>>,
}

impl DbSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, possibly with no rows yet.
    pub fn with_table(mut self, table: &str) -> Self {
        self.tables.entry(format_table_name(table)).or_default();
        self
    }

    pub fn insert_row(&mut self, table: &str, row: DataRow) {
        self.tables.entry(format_table_name(table)).or_default().push(row);
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(&format_table_name(table))
    }

    pub fn rows(&self, table: &str) -> &[DataRow] {
        self.tables
            .get(&format_table_name(table))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `None` when the table is unknown to the snapshot.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(&format_table_name(table)).map(Vec::len)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn diff(before: &DbSnapshot, after: &DbSnapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        let names: BTreeSet<&String> = before.tables.keys().chain(after.tables.keys()).collect();
        for name in names {
            let old = before.rows(name);
            let new = after.rows(name);
            if new.iter().any(|row| !old.contains(row)) {
                diff.inserted.insert(name.clone());
            }
            if old.iter().any(|row| !new.contains(row)) {
                diff.deleted.insert(name.clone());
            }
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(id: i64) -> DataRow {
        DataRow::new([("ID", Value::Int(id))])
    }

    #[test]
    fn diff_reports_inserted_and_deleted_tables() {
        let mut before = DbSnapshot::new().with_table("INVOICE");
        before.insert_row("USERS", row(1));
        let mut after = before.clone();
        after.insert_row("invoice", row(7));
        after = DbSnapshot {
            tables: after
                .tables
                .into_iter()
                .map(|(k, v)| if k == "users" { (k, Vec::new()) } else { (k, v) })
                .collect(),
        };

        let diff = DbSnapshot::diff(&before, &after);
        assert_eq!(diff.inserted, BTreeSet::from(["invoice".to_string()]));
        assert_eq!(diff.deleted, BTreeSet::from(["users".to_string()]));
    }

    #[test]
    fn unknown_table_has_no_count() {
        let snapshot = DbSnapshot::new().with_table("A");
        assert_eq!(snapshot.row_count("a"), Some(0));
        assert_eq!(snapshot.row_count("b"), None);
        assert!(snapshot.rows("b").is_empty());
    }
}
