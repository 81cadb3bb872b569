//! Binding call parameters to the rows seeded by database actions.

use crate::manager::DependencyManager;
use crate::table::{ColumnMatch, ParamToTable, ResourceToTable};
use resdep_catalog::{DbAction, RestCallAction, Value};
use resdep_resource::{Call, CallStatus, Resource};
use std::collections::BTreeMap;

/// Where one parameter, or one of its body fields, takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBindMap {
    pub param_key: String,
    pub field: Option<String>,
    pub table: String,
    pub column: String,
}

/// Table chosen by most body fields; ties go to the first table by name.
fn majority_table(tables: &ResourceToTable, fields: &BTreeMap<String, Vec<ColumnMatch>>) -> Option<String> {
    let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
    for matches in fields.values() {
        if let Some(best) = tables.best_column(matches) {
            *votes.entry(best.table.as_str()).or_default() += 1;
        }
    }
    let top = votes.values().copied().max()?;
    votes
        .into_iter()
        .find(|(_, count)| *count == top)
        .map(|(table, _)| table.to_string())
}

impl DependencyManager {
    pub fn bind_maps(&self, resource_key: &str) -> Vec<ParamBindMap> {
        let Some(tables) = self.tables.get(resource_key) else {
            return Vec::new();
        };
        let mut maps = Vec::new();
        for (key, mapping) in &tables.params {
            match mapping {
                ParamToTable::Simple { matches } => {
                    if let Some(best) = tables.best_column(matches) {
                        maps.push(ParamBindMap {
                            param_key: key.clone(),
                            field: None,
                            table: best.table.clone(),
                            column: best.column.clone(),
                        });
                    }
                }
                ParamToTable::Body { fields } => {
                    let Some(table) = majority_table(tables, fields) else {
                        continue;
                    };
                    for (field, matches) in fields {
                        let on_table: Vec<ColumnMatch> =
                            matches.iter().filter(|m| m.table == table).cloned().collect();
                        if let Some(best) = tables.best_column(&on_table) {
                            maps.push(ParamBindMap {
                                param_key: key.clone(),
                                field: Some(field.clone()),
                                table: table.clone(),
                                column: best.column.clone(),
                            });
                        }
                    }
                }
            }
        }
        maps
    }

    /// Copy values of the call's DB actions into the parameters `resource`
    /// binds from the database. Values the DB actions leave unset are kept,
    /// and so are values a creating POST of the call supplies.
    pub fn bind_call_with_db(&self, resource: &Resource, call: &mut Call) -> usize {
        let maps = self.bind_maps(call.resource_key());
        if maps.is_empty() || call.db_actions.is_empty() {
            return 0;
        }
        let created = call.status == CallStatus::Created;
        let mut bound = 0;
        let db_actions: &[DbAction] = &call.db_actions;
        for action in call.actions.iter_mut() {
            let shared: &RestCallAction = action;
            let keys: Vec<Option<String>> = shared
                .params
                .iter()
                .map(|p| {
                    resource
                        .param_info_of(shared, p)
                        .filter(|info| info.is_bound_from_db(created))
                        .map(|info| info.key.clone())
                })
                .collect();
            for (param, key) in action.params.iter_mut().zip(keys) {
                let Some(key) = key else {
                    continue;
                };
                for map in maps.iter().filter(|m| m.param_key == key) {
                    let Some(value) = latest_value(db_actions, &map.table, &map.column) else {
                        continue;
                    };
                    match &map.field {
                        None => param.value = value,
                        Some(field) => match param.field_mut(field) {
                            Some(field) => field.value = value,
                            None => continue,
                        },
                    }
                    bound += 1;
                }
            }
        }
        if bound > 0 {
            call.repair_bindings();
        }
        bound
    }
}

fn latest_value(actions: &[DbAction], table: &str, column: &str) -> Option<Value> {
    actions
        .iter()
        .rev()
        .filter(|a| a.is_on(table))
        .find_map(|a| a.value(column).filter(|v| !v.is_null()).cloned())
}
