//! Per-parameter binding metadata of a resource.

use crate::chain::CreationChain;
use resdep_catalog::similarity::string_similarity;
use resdep_catalog::{HttpVerb, Param, RestCallAction};
use std::collections::BTreeSet;

const CHAIN_SEGMENT_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub key: String,
    pub name: String,
    /// Static path token the parameter belongs to.
    pub segment: Option<String>,
    /// Must reuse an existing value rather than a random one.
    pub required_to_bind: bool,
    /// Some POST of the creation chain already provides it.
    pub in_creation_chain: bool,
    pub source: Param,
    pub involved_verbs: BTreeSet<HttpVerb>,
}

/// Segment a parameter of `action` belongs to.
pub fn segment_of(action: &RestCallAction, param: &Param) -> Option<String> {
    if param.is_path() {
        action.path.segment_of(&param.name).map(str::to_string)
    } else {
        action.path.last_static_token().map(str::to_string)
    }
}

/// Key under which the parameter is recorded, e.g. `PathParam:users_id`.
pub fn param_key(action: &RestCallAction, param: &Param) -> String {
    match segment_of(action, param) {
        Some(segment) => format!("{}:{}_{}", param.kind.tag(), segment, param.name),
        None => format!("{}:{}", param.kind.tag(), param.name),
    }
}

impl ParamInfo {
    pub fn new(action: &RestCallAction, param: &Param, chain: &CreationChain) -> Self {
        let segment = segment_of(action, param);
        let in_creation_chain = provided_by_chain(action, param, segment.as_deref(), chain);
        let mut involved_verbs = BTreeSet::new();
        involved_verbs.insert(action.verb);
        Self {
            key: param_key(action, param),
            name: param.name.clone(),
            segment,
            required_to_bind: param.is_required_to_bind(),
            in_creation_chain,
            source: param.clone(),
            involved_verbs,
        }
    }

    pub fn involve(&mut self, verb: HttpVerb) {
        self.involved_verbs.insert(verb);
    }

    /// Takes its value from a seeded row: values required to bind and body
    /// fields, unless a creating POST of the same call already supplies it.
    pub fn is_bound_from_db(&self, created: bool) -> bool {
        (self.required_to_bind || self.source.is_body()) && !(created && self.in_creation_chain)
    }
}

fn provided_by_chain(
    action: &RestCallAction,
    param: &Param,
    segment: Option<&str>,
    chain: &CreationChain,
) -> bool {
    let own = action.name();
    chain
        .actions
        .iter()
        .rev()
        .filter(|post| post.name() != own)
        .any(|post| {
            post.params.iter().any(|candidate| {
                let same_name =
                    candidate.name == param.name || candidate.field(&param.name).is_some();
                if !same_name {
                    return false;
                }
                match (segment, segment_of(post, candidate)) {
                    (Some(mine), Some(theirs)) => {
                        string_similarity(mine, &theirs) > CHAIN_SEGMENT_SIMILARITY
                    }
                    (None, None) => true,
                    _ => false,
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use resdep_catalog::{Field, RestPath, ValueType};

    fn action(verb: HttpVerb, path: &str) -> RestCallAction {
        RestCallAction::new(verb, RestPath::parse(path).unwrap())
    }

    #[test]
    fn keys_carry_kind_and_segment() {
        let get = action(HttpVerb::Get, "/users/{id}").with_param(Param::path("id"));
        assert_eq!(param_key(&get, &get.params[0]), "PathParam:users_id");
    }

    #[test]
    fn chain_post_with_matching_field_satisfies_param() {
        let post = action(HttpVerb::Post, "/users/{uid}/orders")
            .with_param(Param::path("uid"))
            .with_param(Param::body(
                "body",
                Some("Order"),
                vec![Field::new("code", ValueType::Text)],
            ));
        let chain = CreationChain::complete(vec![post]);

        let get = action(HttpVerb::Get, "/users/{uid}/orders")
            .with_param(Param::path("uid"))
            .with_param(Param::query("code"));
        let uid = ParamInfo::new(&get, &get.params[0], &chain);
        let code = ParamInfo::new(&get, &get.params[1], &chain);
        let missing = ParamInfo::new(&get, &Param::query("other"), &chain);

        assert!(uid.required_to_bind);
        assert!(uid.in_creation_chain);
        assert!(code.in_creation_chain);
        assert!(!missing.in_creation_chain);

        assert!(uid.is_bound_from_db(false));
        assert!(!uid.is_bound_from_db(true));
        assert!(missing.is_bound_from_db(true));
        let page = ParamInfo::new(&get, &Param::query("page").optional(), &chain);
        assert!(!page.is_bound_from_db(false));
    }

    #[test]
    fn headers_are_never_bound_and_bodies_always_are() {
        let chain = CreationChain::complete(Vec::new());
        let post = action(HttpVerb::Post, "/users")
            .with_param(Param::header("token"))
            .with_param(Param::body("body", Some("User"), Vec::new()));
        let header = ParamInfo::new(&post, &post.params[0], &chain);
        let body = ParamInfo::new(&post, &post.params[1], &chain);
        assert!(!header.is_bound_from_db(false));
        assert!(body.is_bound_from_db(false));
        assert!(body.is_bound_from_db(true));
    }
}
