//! Calls: realized template instances inside a chromosome.

use crate::template::CallsTemplate;
use resdep_catalog::{format_table_name, DbAction, HttpVerb, Param, RestCallAction, RestPath};
use std::collections::BTreeSet;

/// Outcome of resolving the creation a call needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Creation was not requested.
    NotExisting,
    Created,
    /// No ancestor POST was found.
    NotFound,
    /// The action budget was too small for the chain.
    NotEnoughLength,
    /// A nested creation could not be resolved.
    NotFoundDependent,
    /// Bound to data that already exists.
    Existing,
}

/// The resource a call works on, identified by its path values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    pub resource_key: String,
    pub path: RestPath,
    pub params: Vec<Param>,
}

impl ResourceInstance {
    pub fn of(resource_key: &str, action: &RestCallAction) -> Self {
        Self {
            resource_key: resource_key.to_string(),
            path: action.path.clone(),
            params: action.params.iter().filter(|p| p.is_path()).cloned().collect(),
        }
    }

    /// Resolved path, e.g. `/users/12`; equal keys denote the same instance.
    pub fn key(&self) -> String {
        self.path.resolve(&self.params)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub template: CallsTemplate,
    pub instance: ResourceInstance,
    pub actions: Vec<RestCallAction>,
    pub db_actions: Vec<DbAction>,
    pub status: CallStatus,
    pub deletable: bool,
    /// DB seeding was wanted but could not be done.
    pub unlinked: bool,
}

impl Call {
    pub fn new(
        template: CallsTemplate,
        instance: ResourceInstance,
        actions: Vec<RestCallAction>,
        status: CallStatus,
    ) -> Self {
        Self {
            template,
            instance,
            actions,
            db_actions: Vec::new(),
            status,
            deletable: true,
            unlinked: false,
        }
    }

    pub fn resource_key(&self) -> &str {
        &self.instance.resource_key
    }

    pub fn instance_key(&self) -> String {
        self.instance.key()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_independent(&self) -> bool {
        self.template.independent
    }

    pub fn verbs(&self) -> Vec<HttpVerb> {
        self.actions.iter().map(|a| a.verb).collect()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.iter().map(RestCallAction::name).collect()
    }

    pub fn db_tables(&self) -> BTreeSet<String> {
        self.db_actions
            .iter()
            .map(|a| format_table_name(&a.table))
            .collect()
    }

    /// Index of the action with the most specific path.
    pub fn target_index(&self) -> Option<usize> {
        let longest = self.actions.iter().map(|a| a.path.levels()).max()?;
        self.actions.iter().position(|a| a.path.levels() == longest)
    }

    /// Re-align path values of every action with the most specific one.
    pub fn repair_bindings(&mut self) {
        let Some(index) = self.target_index() else {
            return;
        };
        let target = self.actions[index].clone();
        for (i, action) in self.actions.iter_mut().enumerate() {
            if i != index {
                action.bind_to_same_path_resolution(&target);
            }
            action.repair_duplicate_params();
        }
        self.instance = ResourceInstance::of(&self.instance.resource_key, &target);
    }

    /// Bind this call's parameters to the actions of `front`.
    pub fn bind_with(&mut self, front: &[RestCallAction]) {
        for action in self.actions.iter_mut() {
            for other in front {
                if other.path.is_same_or_ancestor_of(&action.path) {
                    action.bind_params_from(other);
                }
            }
        }
        self.repair_bindings();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use resdep_catalog::Value;

    fn action(verb: HttpVerb, path: &str, id: i64) -> RestCallAction {
        let path = RestPath::parse(path).unwrap();
        let mut action = RestCallAction::new(verb, path.clone());
        for name in path.variable_names() {
            let mut p = Param::path(name);
            p.value = Value::Int(id);
            action = action.with_param(p);
        }
        action
    }

    fn call(actions: Vec<RestCallAction>) -> Call {
        let instance = ResourceInstance::of("/users/{id}", &actions[actions.len() - 1]);
        Call::new(CallsTemplate::new("GET-DELETE", true, 2), instance, actions, CallStatus::NotExisting)
    }

    #[test]
    fn repair_aligns_with_longest_path() {
        let mut c = call(vec![
            action(HttpVerb::Get, "/users/{id}/orders/{oid}", 3),
            action(HttpVerb::Delete, "/users/{id}", 9),
        ]);
        c.repair_bindings();
        assert_eq!(c.actions[1].resolved_path(), "/users/3");
        assert_eq!(c.instance_key(), "/users/3/orders/3");

        let once = c.clone();
        c.repair_bindings();
        assert_eq!(c, once);
    }

    #[test]
    fn bind_with_front_reuses_existing_ids() {
        let front = vec![action(HttpVerb::Get, "/users/{id}", 4)];
        let mut c = call(vec![action(HttpVerb::Delete, "/users/{id}", 1)]);
        c.bind_with(&front);
        assert_eq!(c.actions[0].resolved_path(), "/users/4");
        assert_eq!(c.instance_key(), "/users/4");
    }

    #[test]
    fn new_calls_are_deletable_and_unseeded() {
        let c = call(vec![action(HttpVerb::Get, "/users/{id}", 2)]);
        assert!(c.deletable);
        assert!(!c.unlinked);
        assert!(c.db_actions.is_empty());
        assert_eq!(c.target_index(), Some(0));
    }
}
