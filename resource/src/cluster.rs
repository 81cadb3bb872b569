//! The authoritative table of resources, keyed by path template.

use crate::chain::{needs_parent, ChainStatus, CreationChain};
use crate::error::{ResourceError, ResourceResult};
use crate::resource::Resource;
use crate::template::{grow_creating_templates, init_templates};
use log::{debug, info, warn};
use resdep_catalog::{Catalogue, HttpVerb, RestCallAction, RestPath};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ResourceCluster {
    pub(crate) resources: BTreeMap<String, Resource>,
}

impl ResourceCluster {
    /// Build the resource model once per schema.
    pub fn from_catalogue(catalogue: &Catalogue) -> ResourceResult<Self> {
        catalogue.validate()?;

        let mut resources: BTreeMap<String, Resource> = catalogue
            .group_by_path()
            .into_iter()
            .filter_map(|(key, actions)| {
                let path = actions.first()?.path.clone();
                Some((key, Resource::new(path, actions)))
            })
            .collect();

        let paths: Vec<(String, RestPath)> = resources
            .iter()
            .map(|(k, r)| (k.clone(), r.path.clone()))
            .collect();
        for resource in resources.values_mut() {
            let mut ancestors: Vec<&(String, RestPath)> = paths
                .iter()
                .filter(|(_, p)| p.is_ancestor_of(&resource.path))
                .collect();
            ancestors.sort_by(|a, b| b.1.levels().cmp(&a.1.levels()).then(a.0.cmp(&b.0)));
            resource.ancestors = ancestors.into_iter().map(|(k, _)| k.clone()).collect();
        }

        let mut cluster = Self { resources };
        let keys: Vec<String> = cluster.resources.keys().cloned().collect();
        for key in &keys {
            let (chain, creatable) = match cluster.resources.get(key) {
                Some(resource) => (cluster.resolve_chain(resource), cluster.is_creatable(resource)),
                None => continue,
            };
            if let ChainStatus::Incomplete { unresolved } = &chain.status {
                warn!("creation chain of {} is incomplete at {}", key, unresolved);
            }
            if let Some(resource) = cluster.resources.get_mut(key) {
                resource.creation = chain;
                resource.init_verbs(creatable);
                let mut templates = init_templates(&resource.own_verbs(), creatable);
                grow_creating_templates(&mut templates, resource.creation.len());
                resource.templates = templates;
                resource.init_params_info();
                debug!(
                    "resource {} templates {:?}",
                    key,
                    resource.templates.keys().collect::<Vec<_>>()
                );
            }
        }

        info!(
            "resource model built: {} resources from {} actions",
            cluster.resources.len(),
            catalogue.len()
        );
        Ok(cluster)
    }

    pub fn get(&self, key: &str) -> Option<&Resource> {
        self.resources.get(key)
    }

    pub fn resource(&self, key: &str) -> ResourceResult<&Resource> {
        self.resources
            .get(key)
            .ok_or_else(|| ResourceError::unknown_resource(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources with at least one template.
    pub fn sampleable_keys(&self) -> Vec<&str> {
        self.resources
            .values()
            .filter(|r| r.is_sampleable())
            .map(Resource::key)
            .collect()
    }

    fn is_creatable(&self, resource: &Resource) -> bool {
        resource.has_action(HttpVerb::Post)
            || resource
                .ancestors
                .iter()
                .filter_map(|k| self.resources.get(k))
                .any(|a| a.has_action(HttpVerb::Post))
    }

    /// POSTs on `path` or its ancestors that could create it, closest first.
    /// Only the longest paths are kept; `exclude` names an action to skip.
    pub fn creators_for(&self, path: &RestPath, exclude: &str) -> Vec<&RestCallAction> {
        let owners: Vec<&Resource> = match self.resources.get(path.as_str()) {
            Some(resource) => std::iter::once(resource)
                .chain(resource.ancestors.iter().filter_map(|k| self.resources.get(k)))
                .collect(),
            None => self
                .resources
                .values()
                .filter(|r| r.path.is_same_or_ancestor_of(path))
                .collect(),
        };
        let posts: Vec<&RestCallAction> = owners
            .into_iter()
            .filter_map(|r| r.action(HttpVerb::Post))
            .filter(|a| a.name() != exclude)
            .collect();
        let longest = posts.iter().map(|a| a.path.levels()).max().unwrap_or(0);
        posts
            .into_iter()
            .filter(|a| a.path.levels() == longest)
            .collect()
    }

    fn resolve_chain(&self, resource: &Resource) -> CreationChain {
        let start = resource
            .action(HttpVerb::Post)
            .or_else(|| self.creators_for(&resource.path, "").into_iter().next());
        let Some(first) = start else {
            return if resource.path.has_variables() {
                CreationChain::incomplete(Vec::new(), &resource.path)
            } else {
                CreationChain::complete(Vec::new())
            };
        };

        let mut actions = vec![first.clone()];
        let mut current = first;
        while needs_parent(&current.path) {
            let next = self
                .creators_for(&current.path, &current.name())
                .into_iter()
                .next()
                .filter(|a| a.path.levels() < current.path.levels());
            match next {
                Some(next) => {
                    actions.insert(0, next.clone());
                    current = next;
                }
                None => return CreationChain::incomplete(actions, &current.path),
            }
        }
        CreationChain::complete(actions)
    }
}
