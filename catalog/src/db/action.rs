//! Database actions seeding calls, and foreign-key ordering over them.

use super::schema::format_table_name;
use super::snapshot::DataRow;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DbActionId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DbActionKind {
    /// Insert a fresh row.
    Insert,
    /// Refer to a row that already exists.
    Select(DataRow),
}

/// Reference from an action's foreign-key columns to an earlier action.
/// `target == None` refers to data already present in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub columns: Vec<String>,
    pub target_table: String,
    pub target: Option<DbActionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbAction {
    pub id: DbActionId,
    pub table: String,
    pub kind: DbActionKind,
    pub values: BTreeMap<String, Value>,
    pub references: Vec<ForeignKeyRef>,
}

impl DbAction {
    pub fn select(id: DbActionId, table: &str, row: DataRow) -> Self {
        let values = row.values.clone();
        Self {
            id,
            table: table.to_string(),
            kind: DbActionKind::Select(row),
            values,
            references: Vec::new(),
        }
    }

    pub fn represents_existing_data(&self) -> bool {
        matches!(self.kind, DbActionKind::Select(_))
    }

    pub fn is_on(&self, table: &str) -> bool {
        format_table_name(&self.table) == format_table_name(table)
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }
}

/// Every reference in `actions` points to an earlier action, in
/// `preceding` or `actions`, on the referenced table.
pub fn verify_foreign_keys(preceding: &[DbAction], actions: &[DbAction]) -> bool {
    let mut seen: Vec<(DbActionId, String)> = preceding
        .iter()
        .map(|a| (a.id, format_table_name(&a.table)))
        .collect();
    for action in actions {
        for reference in &action.references {
            if let Some(target) = reference.target {
                let table = format_table_name(&reference.target_table);
                if !seen.iter().any(|(id, t)| *id == target && *t == table) {
                    return false;
                }
            }
        }
        seen.push((action.id, format_table_name(&action.table)));
    }
    true
}

/// Rebind forward or dangling references to the latest earlier action on
/// the referenced table, or unbind them when there is none.
pub fn repair_foreign_keys(preceding: &[DbAction], actions: &mut [DbAction]) {
    let mut seen: Vec<(DbActionId, String)> = preceding
        .iter()
        .map(|a| (a.id, format_table_name(&a.table)))
        .collect();
    for action in actions.iter_mut() {
        for reference in action.references.iter_mut() {
            let table = format_table_name(&reference.target_table);
            let valid = reference
                .target
                .map(|target| seen.iter().any(|(id, t)| *id == target && *t == table))
                .unwrap_or(true);
            if !valid {
                reference.target = seen
                    .iter()
                    .rev()
                    .find(|(_, t)| *t == table)
                    .map(|(id, _)| *id);
            }
        }
        seen.push((action.id, format_table_name(&action.table)));
    }
}
