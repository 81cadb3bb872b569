//! Properties of creation chains and creating calls over generated path trees.

use proptest::prelude::*;
use rand::SeedableRng;
use resdep_catalog::{Catalogue, HttpVerb, Param, RestCallAction, RestPath};
use resdep_resource::{ChainStatus, ResourceCluster, SamplingOptions};
use std::collections::BTreeSet;

fn action(verb: HttpVerb, path: &str) -> RestCallAction {
    let path = RestPath::parse(path).unwrap();
    let mut action = RestCallAction::new(verb, path.clone());
    for name in path.variable_names() {
        action = action.with_param(Param::path(name));
    }
    action
}

/// A chain of nested collections `/c0/{id0}/c1/{id1}/...` where each level
/// randomly offers POST on the collection and GET/PATCH/DELETE on the item.
fn catalogue(levels: &[(bool, bool, bool)]) -> Catalogue {
    let mut actions = Vec::new();
    let mut prefix = String::new();
    for (depth, (post, patch, delete)) in levels.iter().enumerate() {
        let collection = format!("{}/c{}", prefix, depth);
        let item = format!("{}/{{id{}}}", collection, depth);
        if *post {
            actions.push(action(HttpVerb::Post, &collection));
        }
        actions.push(action(HttpVerb::Get, &item));
        if *patch {
            actions.push(action(HttpVerb::Patch, &item));
        }
        if *delete {
            actions.push(action(HttpVerb::Delete, &item));
        }
        prefix = item;
    }
    Catalogue::new(actions).unwrap()
}

proptest! {
    #[test]
    fn chains_are_resolved_and_acyclic(
        levels in prop::collection::vec(any::<(bool, bool, bool)>(), 1..5)
    ) {
        let cluster = ResourceCluster::from_catalogue(&catalogue(&levels)).unwrap();
        for resource in cluster.resources() {
            if !resource.path.has_variables() {
                continue;
            }
            let names: BTreeSet<String> = resource.creation.actions.iter().map(|a| a.name()).collect();
            prop_assert_eq!(names.len(), resource.creation.len());
            for pair in resource.creation.actions.windows(2) {
                prop_assert!(pair[0].path.levels() < pair[1].path.levels());
            }
            match &resource.creation.status {
                ChainStatus::Complete => prop_assert!(!resource.creation.is_empty()),
                ChainStatus::Incomplete { unresolved } => prop_assert!(!unresolved.is_empty()),
            }
        }
    }

    #[test]
    fn creating_calls_span_chain_plus_trailing_verbs(
        levels in prop::collection::vec(any::<(bool, bool, bool)>(), 1..5),
        seed in any::<u64>(),
    ) {
        let catalogue = catalogue(&levels);
        let mut first = ResourceCluster::from_catalogue(&catalogue).unwrap();
        let mut second = first.clone();
        let keys: Vec<String> = first.keys().map(str::to_string).collect();
        let mut rng_a = rand::rngs::StdRng::seed_from_u64(seed);
        let mut rng_b = rand::rngs::StdRng::seed_from_u64(seed);

        for key in keys {
            let resource = first.get(&key).unwrap().clone();
            for template in resource.templates.values().filter(|t| t.contains(HttpVerb::Post)) {
                let options = SamplingOptions::new(100);
                let call = first.gen_calls(&key, &template.name, options, &mut rng_a).unwrap();
                let again = second.gen_calls(&key, &template.name, options, &mut rng_b).unwrap();
                let trailing = template.verbs().unwrap().iter().filter(|v| **v != HttpVerb::Post).count();

                prop_assert_eq!(call.len(), resource.creation.len() + trailing);
                prop_assert_eq!(&call, &again);
            }
        }
    }
}
