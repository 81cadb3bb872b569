//! Building insertions together with the rows they reference.

use super::action::{DbAction, DbActionId, DbActionKind, ForeignKeyRef};
use super::schema::{format_table_name, DbSchema};
use super::snapshot::DataRow;
use crate::error::{CatalogError, CatalogResult};
use rand::Rng;
use std::collections::BTreeMap;

/// Hands out unique DB action ids.
#[derive(Debug, Clone, Default)]
pub struct DbActionIdGen {
    next: DbActionId,
}

impl DbActionIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> DbActionId {
        let id = self.next.max(1);
        self.next = id + 1;
        id
    }
}

/// Creates DB actions against one schema.
pub struct InsertBuilder<'a> {
    schema: &'a DbSchema,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(schema: &'a DbSchema) -> Self {
        Self { schema }
    }

    /// Insert a row into `table`, preceded by inserts for every table it
    /// references. Referenced tables come first.
    pub fn insert_with_references(
        &self,
        table: &str,
        ids: &mut DbActionIdGen,
        rng: &mut impl Rng,
    ) -> CatalogResult<Vec<DbAction>> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.insert_into(table, ids, rng, &mut visiting, &mut out)?;
        Ok(out)
    }

    fn insert_into(
        &self,
        table: &str,
        ids: &mut DbActionIdGen,
        rng: &mut impl Rng,
        visiting: &mut Vec<String>,
        out: &mut Vec<DbAction>,
    ) -> CatalogResult<DbActionId> {
        let definition = self
            .schema
            .table(table)
            .ok_or_else(|| CatalogError::unknown_table(table))?;
        visiting.push(format_table_name(&definition.name));

        let mut references = Vec::new();
        for fk in &definition.foreign_keys {
            let target_name = format_table_name(&fk.target_table);
            let target = if visiting.contains(&target_name) {
                None
            } else {
                Some(self.insert_into(&fk.target_table, ids, rng, visiting, out)?)
            };
            references.push(ForeignKeyRef {
                columns: fk.columns.clone(),
                target_table: fk.target_table.clone(),
                target,
            });
        }

        let values: BTreeMap<String, _> = definition
            .columns
            .iter()
            .filter(|c| !definition.is_foreign_key_column(&c.name))
            .map(|c| (c.name.clone(), c.ty.random(rng)))
            .collect();

        visiting.pop();
        let id = ids.next_id();
        out.push(DbAction {
            id,
            table: definition.name.clone(),
            kind: DbActionKind::Insert,
            values,
            references,
        });
        Ok(id)
    }

    pub fn select_existing(&self, table: &str, row: DataRow, ids: &mut DbActionIdGen) -> DbAction {
        DbAction::select(ids.next_id(), table, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::action::verify_foreign_keys;
    use crate::db::schema::{Column, Table};
    use crate::value::ValueType;
    use rand::SeedableRng;

    fn schema() -> DbSchema {
        DbSchema::new(vec![
            Table::new("USERS").with_column(Column::primary("ID")),
            Table::new("ORDERS")
                .with_column(Column::primary("ID"))
                .with_column(Column::new("USER_ID", ValueType::Integer))
                .with_foreign_key(&["USER_ID"], "USERS"),
            Table::new("NODE")
                .with_column(Column::primary("ID"))
                .with_column(Column::new("PARENT", ValueType::Integer))
                .with_foreign_key(&["PARENT"], "NODE"),
        ])
    }

    #[test]
    fn referenced_tables_are_inserted_first() {
        let schema = schema();
        let mut ids = DbActionIdGen::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let actions = InsertBuilder::new(&schema)
            .insert_with_references("orders", &mut ids, &mut rng)
            .unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].table, "USERS");
        assert_eq!(actions[1].references[0].target, Some(actions[0].id));
        assert!(actions[1].value("USER_ID").is_none());
        assert!(verify_foreign_keys(&[], &actions));
    }

    #[test]
    fn self_reference_is_left_unbound() {
        let schema = schema();
        let mut ids = DbActionIdGen::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let actions = InsertBuilder::new(&schema)
            .insert_with_references("NODE", &mut ids, &mut rng)
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].references[0].target, None);
    }

    #[test]
    fn unknown_table_is_an_error() {
        let schema = schema();
        let mut ids = DbActionIdGen::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(InsertBuilder::new(&schema)
            .insert_with_references("missing", &mut ids, &mut rng)
            .is_err());
    }

    #[test]
    fn ids_are_unique() {
        let mut ids = DbActionIdGen::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(a >= 1);
    }
}
