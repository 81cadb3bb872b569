//! Static derivation of resource to table relations from names.

use crate::manager::DependencyManager;
use crate::table::{ColumnMatch, MatchedInfo, ParamToTable, ResourceToTable};
use log::debug;
use resdep_catalog::similarity::{best_matches, string_similarity, tokenize};
use resdep_catalog::{format_table_name, DbSchema, Param, RestCallAction, Table};
use resdep_resource::{Resource, ResourceCluster};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) fn derive_tables(
    cluster: &ResourceCluster,
    schema: &DbSchema,
    threshold: f64,
    apply_token_parser: bool,
) -> BTreeMap<String, ResourceToTable> {
    cluster
        .resources()
        .map(|resource| {
            let mut tables = ResourceToTable::new();
            derive_from_segments(resource, schema, threshold, apply_token_parser, &mut tables);
            derive_from_ref_types(resource, schema, threshold, &mut tables);
            derive_params(resource, schema, threshold, &mut tables);
            (resource.key().to_string(), tables)
        })
        .collect()
}

fn table_names(schema: &DbSchema) -> Vec<String> {
    schema.table_names().map(format_table_name).collect()
}

fn derive_from_segments(
    resource: &Resource,
    schema: &DbSchema,
    threshold: f64,
    apply_token_parser: bool,
    tables: &mut ResourceToTable,
) {
    let names = table_names(schema);
    for (level, token) in resource.path.static_tokens().into_iter().enumerate() {
        let (similarity, found) = best_matches(token, names.iter().map(String::as_str), threshold);
        if !found.is_empty() {
            for table in found {
                tables.derive(table, MatchedInfo::new(token, table, similarity, level + 1));
            }
            continue;
        }
        if !apply_token_parser {
            continue;
        }
        for word in tokenize(token) {
            let (similarity, found) =
                best_matches(&word, names.iter().map(String::as_str), threshold);
            for table in found {
                tables.derive(table, MatchedInfo::new(&word, table, similarity, level + 1));
            }
        }
    }
}

fn derive_from_ref_types(
    resource: &Resource,
    schema: &DbSchema,
    threshold: f64,
    tables: &mut ResourceToTable,
) {
    let names = table_names(schema);
    for ref_type in resource.actions.iter().filter_map(RestCallAction::body_ref_type) {
        let (similarity, found) =
            best_matches(ref_type, names.iter().map(String::as_str), threshold);
        for table in found {
            tables.derive(table, MatchedInfo::new(ref_type, table, similarity, 0));
        }
    }
}

/// Columns matching `name`, scored by the column name alone or prefixed
/// with its table name.
fn match_columns<'a, I>(name: &str, candidates: I, threshold: f64) -> Vec<ColumnMatch>
where
    I: IntoIterator<Item = &'a Table>,
{
    let mut matches = Vec::new();
    for table in candidates {
        let table_name = format_table_name(&table.name);
        for column in &table.columns {
            let similarity = string_similarity(name, &column.name)
                .max(string_similarity(name, &format!("{}{}", table_name, column.name)));
            if similarity >= threshold {
                matches.push(ColumnMatch {
                    table: table_name.clone(),
                    column: column.name.clone(),
                    similarity,
                });
            }
        }
    }
    matches
}

/// Derived tables matched from `input`.
fn matched_by<'a>(tables: &ResourceToTable, schema: &'a DbSchema, input: Option<&str>) -> Vec<&'a Table> {
    let Some(input) = input else {
        return Vec::new();
    };
    tables
        .derived
        .iter()
        .filter(|(_, matches)| matches.iter().any(|m| m.input == input))
        .filter_map(|(name, _)| schema.table(name))
        .collect()
}

/// Map every parameter bound from the database onto columns. Candidates
/// are the tables matched by the body reference type or else by the
/// parameter's segment, then any derived table, then the whole schema.
fn derive_params(resource: &Resource, schema: &DbSchema, threshold: f64, tables: &mut ResourceToTable) {
    let derived: Vec<&Table> = tables
        .derived
        .keys()
        .filter_map(|name| schema.table(name))
        .collect();
    let fallback: Vec<&Table> = if derived.is_empty() {
        schema.tables.iter().collect()
    } else {
        derived
    };

    let mut params = BTreeMap::new();
    for (key, info) in &resource.params_info {
        if !info.is_bound_from_db(false) {
            continue;
        }
        let mut candidates = matched_by(tables, schema, info.source.ref_type());
        if candidates.is_empty() {
            candidates = matched_by(tables, schema, info.segment.as_deref());
        }
        let mapping = map_param(&info.source, &candidates, threshold)
            .or_else(|| map_param(&info.source, &fallback, threshold));
        if let Some(mapping) = mapping {
            params.insert(key.clone(), mapping);
        }
    }
    tables.params.extend(params);
}

fn map_param(param: &Param, candidates: &[&Table], threshold: f64) -> Option<ParamToTable> {
    if param.is_body() {
        let fields: BTreeMap<String, Vec<ColumnMatch>> = param
            .fields()
            .iter()
            .map(|f| (f.name.clone(), match_columns(&f.name, candidates.iter().copied(), threshold)))
            .filter(|(_, m)| !m.is_empty())
            .collect();
        return (!fields.is_empty()).then_some(ParamToTable::Body { fields });
    }
    let matches = match_columns(&param.name, candidates.iter().copied(), threshold);
    (!matches.is_empty()).then_some(ParamToTable::Simple { matches })
}

/// Mutual relations between resources deriving the same table, and simple
/// relations from body reference types naming another resource.
pub(crate) fn derive_relations(manager: &mut DependencyManager, cluster: &ResourceCluster) {
    let mut by_table: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key, tables) in &manager.tables {
        for table in tables.derived.keys() {
            by_table.entry(table.clone()).or_default().insert(key.clone());
        }
    }
    let threshold = manager.threshold;
    for (table, members) in by_table.into_iter().filter(|(_, m)| m.len() > 1) {
        let tag = format!("table:{}", table);
        manager.upsert_mutual(&members, &table, threshold, false, &tag);
    }

    for resource in cluster.resources() {
        for ref_type in resource.actions.iter().filter_map(RestCallAction::body_ref_type) {
            for other in cluster.resources() {
                if other.key() == resource.key()
                    || other.path.is_ancestor_of(&resource.path)
                    || resource.path.is_ancestor_of(&other.path)
                {
                    continue;
                }
                let Some(token) = other.path.last_static_token() else {
                    continue;
                };
                let similarity = string_similarity(ref_type, token);
                if similarity >= threshold {
                    debug!("{} refers to {} by type {}", resource.key(), other.key(), ref_type);
                    manager.update_dependency(
                        resource.key(),
                        BTreeSet::from([other.key().to_string()]),
                        &format!("ref:{}", ref_type),
                        similarity,
                    );
                }
            }
        }
    }
}
