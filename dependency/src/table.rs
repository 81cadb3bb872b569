//! Resource to table relations, derived statically and confirmed at runtime.

use crate::execution::SqlAccess;
use std::collections::{BTreeMap, BTreeSet};

/// One name matched against a table.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedInfo {
    /// The token, reference type or parameter that matched.
    pub input: String,
    pub target: String,
    pub similarity: f64,
    /// Path level of the input; 0 for body reference types.
    pub input_level: usize,
}

impl MatchedInfo {
    pub fn new(input: &str, target: &str, similarity: f64, input_level: usize) -> Self {
        Self {
            input: input.to_string(),
            target: target.to_string(),
            similarity,
            input_level,
        }
    }
}

/// A column a parameter or field may carry the value of.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    pub table: String,
    pub column: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamToTable {
    Simple { matches: Vec<ColumnMatch> },
    /// Matches per body field.
    Body {
        fields: BTreeMap<String, Vec<ColumnMatch>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceToTable {
    pub derived: BTreeMap<String, Vec<MatchedInfo>>,
    /// Runtime verdict per table; `false` marks a table seen but not
    /// corroborated by a write.
    pub confirmed: BTreeMap<String, bool>,
    /// Keyed by `param_key`.
    pub params: BTreeMap<String, ParamToTable>,
    /// Accesses per action name, then per table.
    pub actions: BTreeMap<String, BTreeMap<String, BTreeSet<SqlAccess>>>,
}

impl ResourceToTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&mut self, table: &str, info: MatchedInfo) {
        let infos = self.derived.entry(table.to_string()).or_default();
        if !infos.iter().any(|i| i.input == info.input) {
            infos.push(info);
        }
    }

    pub fn is_derived(&self, table: &str) -> bool {
        self.derived.contains_key(table)
    }

    pub fn is_confirmed(&self, table: &str) -> bool {
        self.confirmed.get(table).copied().unwrap_or(false)
    }

    /// Returns true when the table was not confirmed before.
    pub fn confirm(&mut self, table: &str) -> bool {
        if !self.is_derived(table) {
            self.derive(table, MatchedInfo::new(table, table, 1.0, 0));
        }
        !self.confirmed.insert(table.to_string(), true).unwrap_or(false)
    }

    /// Tables confirmed, or derived and not refuted.
    pub fn related_tables(&self) -> BTreeSet<String> {
        let mut tables: BTreeSet<String> = self
            .derived
            .keys()
            .filter(|t| self.confirmed.get(*t).copied().unwrap_or(true))
            .cloned()
            .collect();
        tables.extend(
            self.confirmed
                .iter()
                .filter(|(_, c)| **c)
                .map(|(t, _)| t.clone()),
        );
        tables
    }

    pub fn confirmed_tables(&self) -> BTreeSet<String> {
        self.confirmed
            .iter()
            .filter(|(_, c)| **c)
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn best_similarity(&self, table: &str) -> f64 {
        self.derived
            .get(table)
            .into_iter()
            .flatten()
            .map(|i| i.similarity)
            .fold(0.0, f64::max)
    }

    pub fn record_access(&mut self, action: &str, table: &str, accesses: &BTreeSet<SqlAccess>) {
        self.actions
            .entry(action.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .extend(accesses.iter().copied());
    }

    /// Some action of the resource inserted into or updated the table.
    pub fn writes(&self, table: &str) -> bool {
        self.actions
            .values()
            .filter_map(|tables| tables.get(table))
            .any(|accesses| accesses.iter().any(|a| a.is_write()))
    }

    /// Rank candidate columns: confirmed tables first, then similarity.
    pub fn best_column<'a>(&self, matches: &'a [ColumnMatch]) -> Option<&'a ColumnMatch> {
        matches.iter().max_by(|a, b| {
            self.is_confirmed(&a.table)
                .cmp(&self.is_confirmed(&b.table))
                .then(a.similarity.total_cmp(&b.similarity))
                .then(b.table.cmp(&a.table))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, column: &str, similarity: f64) -> ColumnMatch {
        ColumnMatch {
            table: table.into(),
            column: column.into(),
            similarity,
        }
    }

    #[test]
    fn confirmation_adds_a_derived_entry() {
        let mut t = ResourceToTable::new();
        assert!(t.confirm("invoice"));
        assert!(!t.confirm("invoice"));
        assert!(t.is_derived("invoice"));
        assert_eq!(t.best_similarity("invoice"), 1.0);
    }

    #[test]
    fn refuted_tables_are_not_related() {
        let mut t = ResourceToTable::new();
        t.derive("users", MatchedInfo::new("users", "users", 1.0, 1));
        t.derive("orders", MatchedInfo::new("order", "orders", 1.0, 1));
        t.confirmed.insert("orders".into(), false);
        assert_eq!(t.related_tables(), BTreeSet::from(["users".to_string()]));
    }

    #[test]
    fn confirmed_column_beats_similarity() {
        let mut t = ResourceToTable::new();
        t.confirm("b");
        let matches = vec![column("a", "id", 1.0), column("b", "id", 0.7)];
        assert_eq!(t.best_column(&matches).map(|m| m.table.as_str()), Some("b"));
    }

    #[test]
    fn writes_require_insert_or_update() {
        let mut t = ResourceToTable::new();
        t.record_access("GET:/a", "a", &BTreeSet::from([SqlAccess::Select]));
        assert!(!t.writes("a"));
        t.record_access("POST:/a", "a", &BTreeSet::from([SqlAccess::Insert]));
        assert!(t.writes("a"));
    }
}
