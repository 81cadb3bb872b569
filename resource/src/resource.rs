//! A resource: every action sharing one path template.

use crate::chain::CreationChain;
use crate::error::{ResourceError, ResourceResult};
use crate::param_info::{param_key, ParamInfo};
use crate::template::CallsTemplate;
use resdep_catalog::{HttpVerb, Param, RestCallAction, RestPath};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub path: RestPath,
    pub actions: Vec<RestCallAction>,
    /// Ancestor resource keys, nearest first.
    pub ancestors: Vec<String>,
    pub creation: CreationChain,
    pub templates: BTreeMap<String, CallsTemplate>,
    pub params_info: BTreeMap<String, ParamInfo>,
    /// Indexed by `HttpVerb::index`; POST is set when any ancestor creates.
    pub verbs: [bool; 7],
}

impl Resource {
    pub fn new(path: RestPath, actions: Vec<RestCallAction>) -> Self {
        Self {
            path,
            actions,
            ancestors: Vec::new(),
            creation: CreationChain::complete(Vec::new()),
            templates: BTreeMap::new(),
            params_info: BTreeMap::new(),
            verbs: [false; 7],
        }
    }

    pub fn key(&self) -> &str {
        self.path.as_str()
    }

    pub fn own_verbs(&self) -> Vec<HttpVerb> {
        self.actions.iter().map(|a| a.verb).collect()
    }

    pub fn action(&self, verb: HttpVerb) -> Option<&RestCallAction> {
        self.actions.iter().find(|a| a.verb == verb)
    }

    pub fn has_action(&self, verb: HttpVerb) -> bool {
        self.action(verb).is_some()
    }

    pub fn is_creatable(&self) -> bool {
        self.verbs[HttpVerb::Post.index()]
    }

    /// Only GET, and nothing can create it.
    pub fn is_independent(&self) -> bool {
        !self.is_creatable() && self.actions.iter().all(|a| a.verb == HttpVerb::Get)
    }

    pub fn has_independent_action(&self) -> bool {
        self.actions.iter().any(|a| a.verb != HttpVerb::Post)
    }

    pub fn is_sampleable(&self) -> bool {
        !self.templates.is_empty()
    }

    pub fn template(&self, name: &str) -> ResourceResult<&CallsTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| ResourceError::unknown_template(self.key(), name))
    }

    pub fn independent_templates(&self) -> impl Iterator<Item = &CallsTemplate> {
        self.templates.values().filter(|t| t.independent)
    }

    pub fn non_independent_templates(&self) -> impl Iterator<Item = &CallsTemplate> {
        self.templates.values().filter(|t| !t.independent)
    }

    pub fn param_info_of(&self, action: &RestCallAction, param: &Param) -> Option<&ParamInfo> {
        self.params_info.get(&param_key(action, param))
    }

    /// Recompute binding metadata from the actions and creation chain.
    pub fn init_params_info(&mut self) {
        let mut infos: BTreeMap<String, ParamInfo> = BTreeMap::new();
        for action in &self.actions {
            for param in &action.params {
                let key = param_key(action, param);
                match infos.get_mut(&key) {
                    Some(info) => info.involve(action.verb),
                    None => {
                        infos.insert(key, ParamInfo::new(action, param, &self.creation));
                    }
                }
            }
        }
        self.params_info = infos;
    }

    /// Verb flags set from own verbs plus the creatable bit.
    pub fn init_verbs(&mut self, creatable: bool) {
        let mut verbs = [false; 7];
        for action in &self.actions {
            verbs[action.verb.index()] = true;
        }
        verbs[HttpVerb::Post.index()] = verbs[HttpVerb::Post.index()] || creatable;
        self.verbs = verbs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_without_creator_is_independent() {
        let path = RestPath::parse("/health").unwrap();
        let mut r = Resource::new(path.clone(), vec![RestCallAction::new(HttpVerb::Get, path)]);
        r.init_verbs(false);
        assert!(r.is_independent());
        r.init_verbs(true);
        assert!(!r.is_independent());
        assert!(r.is_creatable());
    }

    #[test]
    fn unknown_template_is_an_error() {
        let path = RestPath::parse("/a").unwrap();
        let r = Resource::new(path, Vec::new());
        assert!(matches!(
            r.template("GET"),
            Err(ResourceError::UnknownTemplate { .. })
        ));
    }
}
