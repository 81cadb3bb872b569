//! Call templates: named verb combinations that exercise one resource.

use resdep_catalog::HttpVerb;
use std::collections::BTreeMap;

pub const SEPARATOR: &str = "-";

/// A legal verb combination such as `POST-GET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallsTemplate {
    pub name: String,
    /// No creation or DB coupling is needed to run it.
    pub independent: bool,
    /// Minimum number of actions once the creation chain is included.
    pub size: usize,
    /// How many times it has been sampled.
    pub times: usize,
}

impl CallsTemplate {
    pub fn new(name: impl Into<String>, independent: bool, size: usize) -> Self {
        Self {
            name: name.into(),
            independent,
            size,
            times: 0,
        }
    }

    pub fn verbs(&self) -> Option<Vec<HttpVerb>> {
        parse_template(&self.name)
    }

    pub fn contains(&self, verb: HttpVerb) -> bool {
        self.name.split(SEPARATOR).any(|v| v == verb.as_str())
    }

    pub fn is_multi_verb(&self) -> bool {
        self.name.contains(SEPARATOR)
    }
}

pub fn parse_template(name: &str) -> Option<Vec<HttpVerb>> {
    if name.is_empty() {
        return None;
    }
    name.split(SEPARATOR).map(|v| v.parse().ok()).collect()
}

pub fn format_template(verbs: &[HttpVerb]) -> String {
    verbs
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Templates derivable from a resource's own verbs; `creatable` is set when
/// the resource or one of its ancestors has a POST.
pub fn init_templates(own: &[HttpVerb], creatable: bool) -> BTreeMap<String, CallsTemplate> {
    let mut templates = BTreeMap::new();
    for verb in own.iter().filter(|v| **v != HttpVerb::Post) {
        let name = verb.as_str().to_string();
        templates.insert(name.clone(), CallsTemplate::new(name, true, 1));
    }
    if creatable {
        let post = HttpVerb::Post.as_str().to_string();
        templates.insert(post.clone(), CallsTemplate::new(post, false, 1));
        for verb in own.iter().filter(|v| **v != HttpVerb::Post) {
            let name = format_template(&[HttpVerb::Post, *verb]);
            templates.insert(name.clone(), CallsTemplate::new(name, false, 2));
        }
    }
    templates
}

/// Account for ancestor POSTs that precede the resource's own creation.
pub fn grow_creating_templates(templates: &mut BTreeMap<String, CallsTemplate>, chain_len: usize) {
    if chain_len <= 1 {
        return;
    }
    for template in templates.values_mut() {
        if template.contains(HttpVerb::Post) {
            template.size += chain_len - 1;
        }
    }
}
