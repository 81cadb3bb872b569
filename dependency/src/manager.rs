//! The dependency manager: owner of every resource, table and dependency
//! relation the engine learns.

use crate::derive;
use crate::relation::{Relation, RelationKind};
use crate::table::ResourceToTable;
use log::{debug, info};
use resdep_catalog::{DbSchema, DbSnapshot};
use resdep_resource::{Call, ResourceCluster};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct DependencyManager {
    pub(crate) threshold: f64,
    pub(crate) apply_token_parser: bool,
    pub(crate) schema: DbSchema,
    pub(crate) snapshot: DbSnapshot,
    pub(crate) tables: BTreeMap<String, ResourceToTable>,
    dependencies: BTreeMap<String, Vec<Relation>>,
    non_dependencies: BTreeMap<String, BTreeSet<String>>,
    initialized: bool,
}

impl Default for DependencyManager {
    fn default() -> Self {
        Self::new(resdep_catalog::SIMILARITY_THRESHOLD, true)
    }
}

impl DependencyManager {
    pub fn new(threshold: f64, apply_token_parser: bool) -> Self {
        Self {
            threshold,
            apply_token_parser,
            schema: DbSchema::default(),
            snapshot: DbSnapshot::default(),
            tables: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            non_dependencies: BTreeMap::new(),
            initialized: false,
        }
    }

    /// Derive resource to table relations and the relations they imply.
    /// Runs once per schema.
    pub fn init(&mut self, cluster: &ResourceCluster, schema: DbSchema, snapshot: DbSnapshot) {
        self.schema = schema;
        self.snapshot = snapshot;
        self.tables = derive::derive_tables(cluster, &self.schema, self.threshold, self.apply_token_parser);
        derive::derive_relations(self, cluster);
        self.initialized = true;
        info!(
            "dependency model initialized: {} tables, {} resources linked, {} relations",
            self.schema.tables.len(),
            self.tables.values().filter(|t| !t.derived.is_empty()).count(),
            self.dependencies.values().map(Vec::len).sum::<usize>()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn refresh_snapshot(&mut self, snapshot: DbSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn schema(&self) -> &DbSchema {
        &self.schema
    }

    pub fn snapshot(&self) -> &DbSnapshot {
        &self.snapshot
    }

    pub fn tables_of(&self, key: &str) -> Option<&ResourceToTable> {
        self.tables.get(key)
    }

    /// Record or reinforce `source` depending on `targets`.
    pub fn update_dependency(
        &mut self,
        source: &str,
        targets: BTreeSet<String>,
        tag: &str,
        probability: f64,
    ) {
        if targets.is_empty() {
            return;
        }
        let conflicting = self
            .non_dependencies
            .get(source)
            .map(|n| targets.iter().any(|t| n.contains(t)))
            .unwrap_or(false);
        let relations = self.dependencies.entry(source.to_string()).or_default();
        match relations.iter_mut().find(|r| r.targets == targets) {
            Some(relation) => relation.reinforce(probability, tag, conflicting),
            None => {
                let relation = Relation::simple(source, targets, probability, tag);
                debug!("new relation {}", relation);
                relations.push(relation);
            }
        }
    }

    /// Record that `source` was observed not to depend on `target`.
    /// Existing relations are kept.
    pub fn record_non_dependency(&mut self, source: &str, target: &str) {
        self.non_dependencies
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    /// Members sharing `table`. An existing mutual relation covering them
    /// is reinforced, otherwise a new one is created. Any other relation of
    /// a member whose targets fall inside the mutual one, simple relations
    /// on the same targets included, is folded into it.
    pub fn upsert_mutual(
        &mut self,
        members: &BTreeSet<String>,
        table: &str,
        probability: f64,
        confirmed: bool,
        tag: &str,
    ) {
        for member in members {
            let relations = self.dependencies.entry(member.clone()).or_default();
            let mut existing = std::mem::take(relations);
            let covering = existing
                .iter()
                .position(|r| r.is_mutual() && members.is_subset(&r.members()));
            let mut merged = match covering {
                Some(index) => {
                    let mut relation = existing.remove(index);
                    relation.reinforce(probability, tag, false);
                    if let RelationKind::Mutual {
                        tables,
                        confirmed: was_confirmed,
                    } = &mut relation.kind
                    {
                        tables.insert(table.to_string());
                        *was_confirmed = *was_confirmed || confirmed;
                    }
                    relation
                }
                None => Relation::mutual(member, members, table, probability, confirmed, tag),
            };

            let scope = merged.members();
            let (narrower, rest): (Vec<Relation>, Vec<Relation>) = existing
                .into_iter()
                .partition(|r| !r.is_self() && r.members().is_subset(&scope));
            for relation in &narrower {
                merged.absorb(relation);
            }
            if !narrower.is_empty() {
                debug!("mutual relation {} merged {} narrower", merged, narrower.len());
            }
            *relations = rest;
            relations.push(merged);
        }
    }

    pub fn relations_of(&self, key: &str) -> &[Relation] {
        self.dependencies
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_dependencies(&self, key: &str) -> bool {
        !self.relations_of(key).is_empty()
    }

    /// Keys with at least one recorded relation.
    pub fn keys_with_dependencies(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|(_, r)| !r.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn is_dependent(&self, source: &str, target: &str) -> bool {
        self.relations_of(source)
            .iter()
            .any(|r| r.targets.contains(target))
    }

    pub fn is_non_dependent(&self, source: &str, target: &str) -> bool {
        self.non_dependencies
            .get(source)
            .map(|n| n.contains(target))
            .unwrap_or(false)
    }

    pub fn non_dependencies_of(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.non_dependencies.get(key)
    }

    /// Positions of calls, other than `position`, whose resource the call
    /// at `position` depends on.
    pub fn find_dependent_calls(&self, calls: &[Call], position: usize) -> Vec<usize> {
        let Some(call) = calls.get(position) else {
            return Vec::new();
        };
        calls
            .iter()
            .enumerate()
            .filter(|(i, other)| {
                *i != position && self.is_dependent(call.resource_key(), other.resource_key())
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Positions of calls the call at `position` was observed not to depend on.
    pub fn find_non_dependent_calls(&self, calls: &[Call], position: usize) -> Vec<usize> {
        let Some(call) = calls.get(position) else {
            return Vec::new();
        };
        calls
            .iter()
            .enumerate()
            .filter(|(i, other)| {
                *i != position && self.is_non_dependent(call.resource_key(), other.resource_key())
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn related_tables(&self, key: &str) -> BTreeSet<String> {
        self.tables
            .get(key)
            .map(ResourceToTable::related_tables)
            .unwrap_or_default()
    }

    pub fn exist_related_table(&self, key: &str) -> bool {
        !self.related_tables(key).is_empty()
    }
}
