//! Structural mutation of individuals.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::individual::Individual;
use crate::manager::ResourceManager;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use resdep_dependency::MutationKind;

/// Result of one structural mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied {
        kind: MutationKind,
        /// Call positions touched, in the mutated individual.
        positions: Vec<usize>,
    },
    NotApplicable {
        reason: String,
    },
}

impl MutationOutcome {
    fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }

    pub fn kind(&self) -> Option<MutationKind> {
        match self {
            MutationOutcome::Applied { kind, .. } => Some(*kind),
            MutationOutcome::NotApplicable { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructureMutator {
    max_test_size: usize,
    prob_of_dependency_heuristics: f64,
}

impl StructureMutator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_test_size: config.max_test_size,
            prob_of_dependency_heuristics: config.prob_of_dependency_heuristics,
        }
    }

    /// Kinds whose preconditions `individual` meets.
    pub fn applicable_kinds(&self, manager: &ResourceManager, individual: &Individual) -> Vec<MutationKind> {
        let has_unused = !manager.unused_keys(individual).is_empty();
        MutationKind::ALL
            .into_iter()
            .filter(|kind| individual.sample_type.allows(*kind))
            .filter(|kind| individual.len() >= kind.min_calls())
            .filter(|kind| match kind {
                MutationKind::Add => individual.size() < self.max_test_size && has_unused,
                MutationKind::Replace => has_unused,
                MutationKind::Delete | MutationKind::Swap | MutationKind::Modify => true,
            })
            .collect()
    }

    /// Apply one applicable kind chosen uniformly, then repair.
    pub fn mutate(
        &self,
        manager: &mut ResourceManager,
        individual: &mut Individual,
    ) -> EngineResult<MutationOutcome> {
        let kinds = self.applicable_kinds(manager, individual);
        let Some(&kind) = kinds.choose(manager.rng()) else {
            return Ok(MutationOutcome::not_applicable(format!(
                "no structural mutation applies to {} calls of {:?}",
                individual.len(),
                individual.sample_type
            )));
        };
        self.apply(kind, manager, individual)
    }

    /// Apply `kind`, then repair.
    pub fn apply(
        &self,
        kind: MutationKind,
        manager: &mut ResourceManager,
        individual: &mut Individual,
    ) -> EngineResult<MutationOutcome> {
        if !self.applicable_kinds(manager, individual).contains(&kind) {
            return Ok(MutationOutcome::not_applicable(format!(
                "{} does not apply to {} calls",
                kind,
                individual.len()
            )));
        }
        let positions = match kind {
            MutationKind::Add => self.add(manager, individual)?,
            MutationKind::Delete => manager.handle_delete(individual)?.map(|p| vec![p]),
            MutationKind::Swap => manager.handle_swap(individual)?.map(|(a, b)| vec![a, b]),
            MutationKind::Replace => manager.handle_replace(individual)?.map(|p| vec![p]),
            MutationKind::Modify => manager.handle_modify(individual)?.map(|p| vec![p]),
        };
        let Some(positions) = positions else {
            return Ok(MutationOutcome::not_applicable(format!("{} found no candidate", kind)));
        };
        manager.repair_individual(individual);
        debug!("{} applied at {:?}", kind, positions);
        Ok(MutationOutcome::Applied { kind, positions })
    }

    /// Dependency-guided first with the configured chance, random
    /// otherwise. Front when every call is independent, back otherwise.
    fn add(&self, manager: &mut ResourceManager, individual: &mut Individual) -> EngineResult<Option<Vec<usize>>> {
        let guided = self.prob_of_dependency_heuristics > 0.0
            && manager.rng().gen_bool(self.prob_of_dependency_heuristics);
        let mut call = None;
        if guided {
            call = manager.handle_add_dep_resource(individual)?.map(|(call, _)| call);
        }
        if call.is_none() {
            call = manager.handle_add_resource(individual)?;
        }
        let Some(mut call) = call else {
            return Ok(None);
        };

        let position = if individual.all_independent() { 0 } else { individual.len() };
        let front_db = individual.db_actions_before(position);
        manager.bind_call_with_front(&mut call, &individual.calls()[..position], &front_db);
        individual.add_call(position, call)?;
        Ok(Some(vec![position]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_type::SampleType;
    use resdep_catalog::{Catalogue, HttpVerb, Param, RestCallAction, RestPath};

    fn action(verb: HttpVerb, path: &str) -> RestCallAction {
        let path = RestPath::parse(path).unwrap();
        let mut action = RestCallAction::new(verb, path.clone());
        for name in path.variable_names() {
            action = action.with_param(Param::path(name));
        }
        action
    }

    fn setup() -> (ResourceManager, StructureMutator) {
        let config = EngineConfig::minimal();
        let mut manager = ResourceManager::new(config.clone()).unwrap();
        let catalogue = Catalogue::new(vec![
            action(HttpVerb::Get, "/a"),
            action(HttpVerb::Get, "/b"),
            action(HttpVerb::Get, "/c"),
        ])
        .unwrap();
        manager.init_resources(&catalogue, None).unwrap();
        (manager, StructureMutator::new(&config))
    }

    #[test]
    fn single_call_allows_no_delete_or_swap() {
        let (mut manager, mutator) = setup();
        let seeds = manager.create_ad_hoc_individuals(None).unwrap();
        let kinds = mutator.applicable_kinds(&manager, &seeds[0]);
        assert!(!kinds.contains(&MutationKind::Delete));
        assert!(!kinds.contains(&MutationKind::Swap));
        assert!(kinds.contains(&MutationKind::Add));
    }

    #[test]
    fn smart_individuals_are_not_mutated() {
        let (mut manager, mutator) = setup();
        let mut ind = manager.create_ad_hoc_individuals(None).unwrap().remove(0);
        ind.sample_type = SampleType::Smart;
        let outcome = mutator.mutate(&mut manager, &mut ind).unwrap();
        assert!(!outcome.is_applied());
    }

    #[test]
    fn add_of_independent_calls_goes_to_the_front() {
        let (mut manager, mutator) = setup();
        let mut ind = manager.create_ad_hoc_individuals(None).unwrap().remove(0);
        let before = ind.calls()[0].resource_key().to_string();
        let outcome = mutator.apply(MutationKind::Add, &mut manager, &mut ind).unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Applied {
                kind: MutationKind::Add,
                positions: vec![0]
            }
        );
        assert_eq!(ind.len(), 2);
        assert_eq!(ind.calls()[1].resource_key(), before);
    }
}
