//! Database schema as seen by the engine.

use crate::value::ValueType;
use serde::{Deserialize, Serialize};

/// Table names are compared in this form.
pub fn format_table_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: ValueType,
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
        }
    }

    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Integer,
            primary_key: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub target_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, columns: &[&str], target_table: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            target_table: target_table.to_string(),
        });
        self
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn is_foreign_key_column(&self, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSchema {
    pub tables: Vec<Table>,
}

impl DbSchema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        let wanted = format_table_name(name);
        self.tables
            .iter()
            .find(|t| format_table_name(&t.name) == wanted)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let schema = DbSchema::new(vec![Table::new("INVOICE").with_column(Column::primary("ID"))]);
        assert!(schema.table("invoice").is_some());
        assert_eq!(schema.table("Invoice").unwrap().primary_keys().count(), 1);
        assert!(schema.table("orders").is_none());
    }
}
