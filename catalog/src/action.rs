//! REST call actions.

use crate::param::{Param, ParamKind};
use crate::path::{PathElement, RestPath};
use crate::verb::HttpVerb;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Authentication attached to generated actions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthInfo {
    pub name: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl AuthInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers: Vec::new(),
        }
    }
}

/// One REST call: a catalogue entry, or a concrete instance of one inside a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestCallAction {
    pub verb: HttpVerb,
    pub path: RestPath,
    #[serde(default)]
    pub params: Vec<Param>,
    /// The response location of this action is saved for later actions.
    #[serde(default)]
    pub save_location: bool,
    /// Location saved by an earlier action that this action targets.
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthInfo>,
}

impl RestCallAction {
    pub fn new(verb: HttpVerb, path: RestPath) -> Self {
        Self {
            verb,
            path,
            params: Vec::new(),
            save_location: false,
            location_id: None,
            auth: None,
        }
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Stable identifier, e.g. `POST:/users`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.verb, self.path)
    }

    pub fn resolved_path(&self) -> String {
        self.path.resolve(&self.params)
    }

    pub fn body(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.is_body())
    }

    pub fn body_ref_type(&self) -> Option<&str> {
        self.body().and_then(Param::ref_type)
    }

    pub fn randomize(&mut self, rng: &mut impl Rng) {
        for param in self.params.iter_mut() {
            param.randomize(rng);
        }
        self.repair_duplicate_params();
    }

    /// Parameters sharing a name carry the value of the first of them;
    /// body fields named like a plain parameter follow that parameter.
    pub fn repair_duplicate_params(&mut self) {
        for i in 1..self.params.len() {
            let (before, rest) = self.params.split_at_mut(i);
            let current = &mut rest[0];
            if current.is_body() {
                continue;
            }
            if let Some(first) = before
                .iter()
                .find(|p| !p.is_body() && p.name == current.name)
            {
                current.value = first.value.clone();
            }
        }

        let plain: Vec<(String, crate::value::Value)> = self
            .params
            .iter()
            .filter(|p| !p.is_body())
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        for param in self.params.iter_mut().filter(|p| p.is_body()) {
            for (name, value) in &plain {
                if let Some(field) = param.field_mut(name) {
                    field.value = value.clone();
                }
            }
        }
    }

    /// Copy path values from `other` where both templates resolve the same
    /// leading elements.
    pub fn bind_to_same_path_resolution(&mut self, other: &RestCallAction) {
        let pairs: Vec<(String, String)> = self
            .path
            .elements()
            .iter()
            .zip(other.path.elements())
            .take_while(|(a, b)| match (a, b) {
                (PathElement::Static(x), PathElement::Static(y)) => x.eq_ignore_ascii_case(y),
                (PathElement::Variable(_), PathElement::Variable(_)) => true,
                _ => false,
            })
            .filter_map(|(a, b)| match (a, b) {
                (PathElement::Variable(x), PathElement::Variable(y)) => Some((x.clone(), y.clone())),
                _ => None,
            })
            .collect();

        for (mine, theirs) in pairs {
            let source = other.params.iter().find(|p| p.is_path() && p.name == theirs);
            let target = self.params.iter_mut().find(|p| p.is_path() && p.name == mine);
            if let (Some(source), Some(target)) = (source, target) {
                target.value = source.value.clone();
            }
        }
    }

    /// Bind every parameter of this action to the matching one of `other`.
    pub fn bind_params_from(&mut self, other: &RestCallAction) {
        self.bind_to_same_path_resolution(other);

        for param in self.params.iter_mut() {
            match &mut param.kind {
                ParamKind::Path => {}
                ParamKind::Query | ParamKind::Header => {
                    if let Some(value) = other.plain_or_field_value(&param.name) {
                        param.value = value;
                    }
                }
                ParamKind::Body { fields, .. } => {
                    for field in fields.iter_mut() {
                        if let Some(value) = other.plain_or_field_value(&field.name) {
                            field.value = value;
                        }
                    }
                }
            }
        }
    }

    fn plain_or_field_value(&self, name: &str) -> Option<crate::value::Value> {
        self.params
            .iter()
            .find(|p| !p.is_body() && !p.is_path() && p.name == name)
            .map(|p| p.value.clone())
            .or_else(|| {
                self.params
                    .iter()
                    .find_map(|p| p.field(name))
                    .map(|f| f.value.clone())
            })
    }
}
