//! Database evidence observed while executing one action.

use resdep_catalog::{format_table_name, SnapshotDiff};
use std::collections::{BTreeMap, BTreeSet};

/// How an action touched a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SqlAccess {
    Insert,
    Update,
    Delete,
    Select,
}

impl SqlAccess {
    pub fn is_write(self) -> bool {
        matches!(self, SqlAccess::Insert | SqlAccess::Update)
    }
}

/// Tables an action inserted into, updated, deleted from or queried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbExecution {
    pub inserted: BTreeSet<String>,
    /// Updated columns per table.
    pub updated: BTreeMap<String, BTreeSet<String>>,
    pub deleted: BTreeSet<String>,
    pub queried: BTreeSet<String>,
}

impl DbExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert(mut self, table: &str) -> Self {
        self.inserted.insert(format_table_name(table));
        self
    }

    pub fn with_update(mut self, table: &str, columns: &[&str]) -> Self {
        self.updated
            .entry(format_table_name(table))
            .or_default()
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_delete(mut self, table: &str) -> Self {
        self.deleted.insert(format_table_name(table));
        self
    }

    pub fn with_query(mut self, table: &str) -> Self {
        self.queried.insert(format_table_name(table));
        self
    }

    /// Evidence from the primary keys gained and lost around one action.
    pub fn from_diff(diff: &SnapshotDiff) -> Self {
        Self {
            inserted: diff.inserted.iter().map(|t| format_table_name(t)).collect(),
            deleted: diff.deleted.iter().map(|t| format_table_name(t)).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.queried.is_empty()
    }

    /// Every touched table with its accesses.
    pub fn accesses(&self) -> BTreeMap<String, BTreeSet<SqlAccess>> {
        let mut out: BTreeMap<String, BTreeSet<SqlAccess>> = BTreeMap::new();
        let mut add = |table: &String, access| {
            out.entry(table.clone()).or_default().insert(access);
        };
        self.inserted.iter().for_each(|t| add(t, SqlAccess::Insert));
        self.updated.keys().for_each(|t| add(t, SqlAccess::Update));
        self.deleted.iter().for_each(|t| add(t, SqlAccess::Delete));
        self.queried.iter().for_each(|t| add(t, SqlAccess::Select));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diff_becomes_insert_and_delete_evidence() {
        let diff = SnapshotDiff {
            inserted: BTreeSet::from(["INVOICE".to_string()]),
            deleted: BTreeSet::from(["cart".to_string()]),
        };
        let execution = DbExecution::from_diff(&diff);
        assert_eq!(
            execution.accesses(),
            BTreeMap::from([
                ("cart".to_string(), BTreeSet::from([SqlAccess::Delete])),
                ("invoice".to_string(), BTreeSet::from([SqlAccess::Insert])),
            ])
        );
    }

    #[test]
    fn accesses_merge_per_table() {
        let execution = DbExecution::new()
            .with_update("users", &["name"])
            .with_query("USERS");
        assert_eq!(
            execution.accesses()["users"],
            BTreeSet::from([SqlAccess::Update, SqlAccess::Select])
        );
        assert!(DbExecution::new().is_empty());
    }
}
