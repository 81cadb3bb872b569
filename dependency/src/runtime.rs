//! Refining resource to table relations from executed actions.

use crate::execution::{DbExecution, SqlAccess};
use crate::manager::DependencyManager;
use log::{debug, warn};
use resdep_catalog::HttpVerb;
use resdep_resource::Call;
use std::collections::{BTreeMap, BTreeSet};

impl DependencyManager {
    /// Record what each action did to the database. `executions` is keyed
    /// by the action position across all calls.
    ///
    /// Returns the tables that became confirmed for some resource.
    pub fn update_resource_tables(
        &mut self,
        calls: &[Call],
        executions: &BTreeMap<usize, DbExecution>,
    ) -> BTreeSet<String> {
        let mut newly_confirmed = BTreeSet::new();
        let mut index = 0;
        for call in calls {
            for action in &call.actions {
                let position = index;
                index += 1;
                let Some(execution) = executions.get(&position) else {
                    continue;
                };
                for (table, accesses) in execution.accesses() {
                    if !self.snapshot.contains_table(&table) {
                        if self.schema.table(&table).is_some() {
                            debug!(
                                "{} touched {} before any snapshot of it, evidence ignored",
                                action.name(),
                                table
                            );
                        } else {
                            warn!("{} touched unknown table {}", action.name(), table);
                        }
                        continue;
                    }
                    let tables = self.tables.entry(call.resource_key().to_string()).or_default();
                    tables.record_access(&action.name(), &table, &accesses);
                    let writes = accesses.iter().any(|a| a.is_write());
                    match action.verb {
                        HttpVerb::Post | HttpVerb::Put if writes => {
                            if tables.confirm(&table) {
                                debug!("{} confirmed table {}", call.resource_key(), table);
                                newly_confirmed.insert(table);
                            }
                        }
                        HttpVerb::Get if accesses.contains(&SqlAccess::Select) => {
                            if !tables.confirmed.contains_key(&table) {
                                let derived = tables.is_derived(&table);
                                tables.confirmed.insert(table, derived);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        for table in &newly_confirmed {
            let members: BTreeSet<String> = self
                .tables
                .iter()
                .filter(|(_, t)| t.is_confirmed(table) && t.writes(table))
                .map(|(k, _)| k.clone())
                .collect();
            if members.len() > 1 {
                let name = self
                    .schema
                    .table(table)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| table.clone());
                self.upsert_mutual(&members, table, 1.0, true, &format!("table:{}", name));
            }
        }
        newly_confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use resdep_catalog::{
        Catalogue, Column, DbSchema, DbSnapshot, RestCallAction, RestPath, Table,
    };
    use resdep_resource::{CallStatus, CallsTemplate, ResourceCluster, ResourceInstance};

    fn call(verb: HttpVerb, path: &str) -> Call {
        let action = RestCallAction::new(verb, RestPath::parse(path).unwrap());
        let instance = ResourceInstance::of(path, &action);
        Call::new(
            CallsTemplate::new(verb.as_str(), false, 1),
            instance,
            vec![action],
            CallStatus::NotExisting,
        )
    }

    fn manager() -> DependencyManager {
        let actions = vec![
            RestCallAction::new(HttpVerb::Post, RestPath::parse("/orders").unwrap()),
            RestCallAction::new(HttpVerb::Get, RestPath::parse("/reports").unwrap()),
        ];
        let cluster = ResourceCluster::from_catalogue(&Catalogue::new(actions).unwrap()).unwrap();
        let schema = DbSchema::new(vec![Table::new("ORDERS").with_column(Column::primary("id"))]);
        let mut m = DependencyManager::default();
        m.init(&cluster, schema, DbSnapshot::new().with_table("ORDERS"));
        m
    }

    #[test]
    fn unknown_tables_are_skipped() {
        let mut m = manager();
        let calls = vec![call(HttpVerb::Post, "/orders")];
        let executions = BTreeMap::from([(0, DbExecution::new().with_insert("audit"))]);
        assert!(m.update_resource_tables(&calls, &executions).is_empty());
        assert!(!m.related_tables("/orders").contains("audit"));
    }

    #[test]
    fn schema_tables_missing_from_the_snapshot_wait_for_a_refresh() {
        let actions = vec![RestCallAction::new(HttpVerb::Post, RestPath::parse("/orders").unwrap())];
        let cluster = ResourceCluster::from_catalogue(&Catalogue::new(actions).unwrap()).unwrap();
        let schema = DbSchema::new(vec![
            Table::new("ORDERS").with_column(Column::primary("id")),
            Table::new("AUDIT").with_column(Column::primary("id")),
        ]);
        let mut m = DependencyManager::default();
        m.init(&cluster, schema, DbSnapshot::new().with_table("ORDERS"));

        let calls = vec![call(HttpVerb::Post, "/orders")];
        let executions = BTreeMap::from([(0, DbExecution::new().with_insert("AUDIT"))]);
        assert!(m.update_resource_tables(&calls, &executions).is_empty());
        assert!(!m.tables_of("/orders").unwrap().is_confirmed("audit"));

        m.refresh_snapshot(DbSnapshot::new().with_table("ORDERS").with_table("AUDIT"));
        assert_eq!(
            m.update_resource_tables(&calls, &executions),
            BTreeSet::from(["audit".to_string()])
        );
    }

    #[test]
    fn get_only_confirms_derived_tables() {
        let mut m = manager();
        let calls = vec![call(HttpVerb::Get, "/reports")];
        let executions = BTreeMap::from([(0, DbExecution::new().with_query("orders"))]);
        m.update_resource_tables(&calls, &executions);
        let tables = m.tables_of("/reports").unwrap();
        assert_eq!(tables.confirmed.get("orders"), Some(&false));
        assert!(!m.related_tables("/reports").contains("orders"));
    }

    #[test]
    fn post_insert_confirms_once() {
        let mut m = manager();
        let calls = vec![call(HttpVerb::Post, "/orders")];
        let executions = BTreeMap::from([(0, DbExecution::new().with_insert("ORDERS"))]);
        assert_eq!(
            m.update_resource_tables(&calls, &executions),
            BTreeSet::from(["orders".to_string()])
        );
        assert!(m.update_resource_tables(&calls, &executions).is_empty());
        assert!(m.tables_of("/orders").unwrap().is_confirmed("orders"));
    }
}
