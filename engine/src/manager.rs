//! The resource manager: samples calls and individuals out of the resource
//! model, guided by the dependencies learned so far.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::individual::Individual;
use crate::sample_type::SampleType;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use resdep_catalog::{
    format_table_name, repair_foreign_keys, AuthInfo, Catalogue, DbAction, DbActionIdGen, DbSchema,
    DbSnapshot, HttpVerb, InsertBuilder, RestCallAction,
};
use resdep_dependency::{
    DbExecution, DependencyManager, EvaluatedCalls, FitnessSnapshot, FitnessVerdict, MutationKind,
};
use resdep_resource::{Call, CallStatus, ResourceCluster, SamplingOptions};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

pub struct ResourceManager {
    config: EngineConfig,
    cluster: ResourceCluster,
    dependencies: DependencyManager,
    rng: StdRng,
    ids: DbActionIdGen,
    initialized: bool,
}

impl ResourceManager {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            dependencies: DependencyManager::new(config.similarity_threshold, config.apply_token_parser),
            cluster: ResourceCluster::default(),
            ids: DbActionIdGen::new(),
            initialized: false,
            config,
        })
    }

    /// Build the resource model and seed the dependency model from the
    /// database, when one is given.
    pub fn init_resources(
        &mut self,
        catalogue: &Catalogue,
        database: Option<(DbSchema, DbSnapshot)>,
    ) -> EngineResult<()> {
        self.cluster = ResourceCluster::from_catalogue(catalogue)?;
        let (schema, snapshot) = database.unwrap_or_default();
        self.dependencies.init(&self.cluster, schema, snapshot);
        self.initialized = true;
        info!(
            "{} resources ready, {} sampleable",
            self.cluster.len(),
            self.cluster.sampleable_keys().len()
        );
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cluster(&self) -> &ResourceCluster {
        &self.cluster
    }

    pub fn dependencies(&self) -> &DependencyManager {
        &self.dependencies
    }

    pub fn dependencies_mut(&mut self) -> &mut DependencyManager {
        &mut self.dependencies
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn options(&self, budget: usize) -> SamplingOptions {
        SamplingOptions::new(budget).with_extra_patch(self.config.prob_extra_patch)
    }

    /// Actions still available to `individual`.
    pub fn remaining_budget(&self, individual: &Individual) -> usize {
        self.config.max_test_size.saturating_sub(individual.size())
    }

    /// Sampleable resources not used by `individual`.
    pub fn unused_keys(&self, individual: &Individual) -> Vec<String> {
        let used = individual.resource_keys();
        self.cluster
            .sampleable_keys()
            .into_iter()
            .filter(|k| !used.contains(*k))
            .map(str::to_string)
            .collect()
    }

    /// One single-call individual per action, post chain, PUT and
    /// multi-verb template. Deepest resources come first.
    pub fn create_ad_hoc_individuals(&mut self, auth: Option<&AuthInfo>) -> EngineResult<Vec<Individual>> {
        self.ensure_initialized()?;
        let mut keys: Vec<(usize, String)> = self
            .cluster
            .resources()
            .filter(|r| r.is_sampleable())
            .map(|r| (r.path.levels(), r.key().to_string()))
            .collect();
        keys.sort_by_key(|(levels, key)| (Reverse(*levels), key.clone()));

        let options = self.options(self.config.max_test_size);
        let mut calls = Vec::new();
        for (_, key) in &keys {
            let resource = self.cluster.resource(key)?;
            let verbs = resource.own_verbs();
            let multi: Vec<String> = resource
                .templates
                .values()
                .filter(|t| t.is_multi_verb())
                .map(|t| t.name.clone())
                .collect();

            for verb in verbs.iter().filter(|v| !matches!(v, HttpVerb::Post | HttpVerb::Put)) {
                calls.push(self.cluster.sample_action_with_verb(key, *verb, &mut self.rng)?);
            }
            if verbs.contains(&HttpVerb::Post) {
                calls.push(self.cluster.sample_action_with_verb(key, HttpVerb::Post, &mut self.rng)?);
            }
            let chain = self.cluster.gen_post_chain(key, options.unchecked(), &mut self.rng)?;
            if let Some(call) = chain.filter(|c| c.len() > 1) {
                calls.push(call);
            }
            if verbs.contains(&HttpVerb::Put) {
                calls.push(self.cluster.sample_action_with_verb(key, HttpVerb::Put, &mut self.rng)?);
            }
            for name in multi {
                calls.push(self.cluster.gen_calls(key, &name, options, &mut self.rng)?);
            }
        }

        let mut individuals = Vec::with_capacity(calls.len());
        for mut call in calls {
            for action in call.actions.iter_mut() {
                action.auth = auth.cloned();
            }
            self.generate_db_actions_for_call(&mut call, false);
            let mut individual = Individual::new(vec![call], SampleType::SmartResourceWithoutDep);
            self.repair_individual(&mut individual);
            individuals.push(individual);
        }
        info!("{} ad-hoc individuals from {} resources", individuals.len(), keys.len());
        Ok(individuals)
    }

    /// Sample a call on `key` within `budget` actions. With `must_create`
    /// creating templates are preferred; an independent template chosen
    /// instead is seeded by insertion. `None` when nothing fits.
    pub fn sample_call(
        &mut self,
        key: &str,
        must_create: bool,
        budget: usize,
        force_insert: bool,
        bind_with: Option<&[Call]>,
    ) -> EngineResult<Option<Call>> {
        self.ensure_initialized()?;
        let options = self.options(budget);
        let mut insert = force_insert;
        let sampled = if must_create {
            let creating: Vec<String> = self
                .cluster
                .resource(key)?
                .non_independent_templates()
                .filter(|t| t.size <= budget)
                .map(|t| t.name.clone())
                .collect();
            match creating.choose(&mut self.rng).cloned() {
                Some(name) => Some(self.cluster.gen_calls(key, &name, options, &mut self.rng)?),
                None => {
                    insert = true;
                    self.cluster.sample_independent(key, options, &mut self.rng)?
                }
            }
        } else {
            self.cluster.sample_independent(key, options, &mut self.rng)?
        };
        let Some(mut call) = sampled else {
            debug!("no template of {} fits {} actions", key, budget);
            return Ok(None);
        };

        self.generate_db_actions_for_call(&mut call, insert);
        if let Some(front) = bind_with {
            self.bind_call_with_front(&mut call, front, &[]);
        }
        Ok(Some(call))
    }

    fn sample_any_call(&mut self, key: &str, budget: usize) -> EngineResult<Option<Call>> {
        let options = self.options(budget);
        let sampled = self.cluster.sample_any(key, options, &mut self.rng)?;
        Ok(sampled.map(|mut call| {
            self.generate_db_actions_for_call(&mut call, false);
            call
        }))
    }

    /// A call on a uniformly chosen resource `individual` does not use yet.
    pub fn handle_add_resource(&mut self, individual: &Individual) -> EngineResult<Option<Call>> {
        let budget = self.remaining_budget(individual);
        let unused = self.unused_keys(individual);
        let Some(key) = unused.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };
        self.sample_any_call(&key, budget)
    }

    /// A call on a resource some included call depends on, as
    /// `(call, key of the dependent resource)`.
    pub fn handle_add_dep_resource(
        &mut self,
        individual: &Individual,
    ) -> EngineResult<Option<(Call, String)>> {
        let budget = self.remaining_budget(individual);
        let included = individual.resource_keys();
        let mut candidates: Vec<(String, String, f64, bool)> = Vec::new();
        for source in &included {
            for relation in self.dependencies.relations_of(source) {
                for target in &relation.targets {
                    if relation.is_self() || !included.contains(target) {
                        candidates.push((
                            source.clone(),
                            target.clone(),
                            relation.probability(),
                            relation.is_self(),
                        ));
                    }
                }
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let self_probability = self.config.prob_self_relation;
        let passed: Vec<(String, String)> = candidates
            .iter()
            .filter(|(_, _, probability, is_self)| {
                let chance = if *is_self { self_probability } else { *probability };
                self.rng.gen_bool(chance.clamp(0.0, 1.0))
            })
            .map(|(s, t, _, _)| (s.clone(), t.clone()))
            .collect();
        let pool: Vec<(String, String)> = if passed.is_empty() {
            candidates.into_iter().map(|(s, t, _, _)| (s, t)).collect()
        } else {
            passed
        };
        let Some((source, target)) = pool.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };
        debug!("adding {} for dependent {}", target, source);
        Ok(self
            .sample_call(&target, true, budget, false, None)?
            .map(|call| (call, source)))
    }

    /// Remove a uniformly chosen deletable call.
    pub fn handle_delete(&mut self, individual: &mut Individual) -> EngineResult<Option<usize>> {
        if individual.len() < MutationKind::Delete.min_calls() {
            return Ok(None);
        }
        let deletable: Vec<usize> = individual
            .calls()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.deletable)
            .map(|(i, _)| i)
            .collect();
        let Some(&position) = deletable.choose(&mut self.rng) else {
            return Ok(None);
        };
        individual.remove_call(position)?;
        Ok(Some(position))
    }

    pub fn handle_swap(&mut self, individual: &mut Individual) -> EngineResult<Option<(usize, usize)>> {
        if individual.len() < MutationKind::Swap.min_calls() {
            return Ok(None);
        }
        let positions: Vec<usize> = (0..individual.len()).collect();
        let chosen: Vec<usize> = positions.choose_multiple(&mut self.rng, 2).copied().collect();
        let (a, b) = match chosen.as_slice() {
            [a, b] if a < b => (*a, *b),
            [a, b] => (*b, *a),
            _ => return Ok(None),
        };
        individual.swap_calls(a, b)?;
        Ok(Some((a, b)))
    }

    /// Substitute a call with one on a different, unused resource.
    pub fn handle_replace(&mut self, individual: &mut Individual) -> EngineResult<Option<usize>> {
        if individual.is_empty() {
            return Ok(None);
        }
        let position = self.rng.gen_range(0..individual.len());
        let old = individual.call(position)?;
        let budget = self.remaining_budget(individual) + old.len();
        let old_key = old.resource_key().to_string();
        let unused: Vec<String> = self
            .unused_keys(individual)
            .into_iter()
            .filter(|k| *k != old_key)
            .collect();
        let Some(key) = unused.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };
        let Some(mut call) = self.sample_any_call(&key, budget)? else {
            return Ok(None);
        };
        let front_db = individual.db_actions_before(position);
        self.bind_call_with_front(&mut call, &individual.calls()[..position], &front_db);
        individual.replace_call(position, call)?;
        Ok(Some(position))
    }

    /// Resample a call's resource under another template, or as a single
    /// action when no other template fits.
    pub fn handle_modify(&mut self, individual: &mut Individual) -> EngineResult<Option<usize>> {
        if individual.is_empty() {
            return Ok(None);
        }
        let position = self.rng.gen_range(0..individual.len());
        let old = individual.call(position)?.clone();
        let budget = self.remaining_budget(individual) + old.len();
        let options = self.options(budget);
        let mut call = match self.cluster.generate_another(&old, options, &mut self.rng)? {
            Some(call) => call,
            None => self.cluster.sample_one_action(old.resource_key(), &mut self.rng)?,
        };
        self.generate_db_actions_for_call(&mut call, false);
        let front_db = individual.db_actions_before(position);
        self.bind_call_with_front(&mut call, &individual.calls()[..position], &front_db);
        individual.replace_call(position, call)?;
        Ok(Some(position))
    }

    /// Rebind `call` to the path values of `front` and drop its inserts on
    /// tables `front` already provides.
    pub fn bind_call_with_front(&self, call: &mut Call, front: &[Call], front_db: &[DbAction]) {
        let actions: Vec<RestCallAction> = front.iter().flat_map(|c| c.actions.iter().cloned()).collect();
        if !actions.is_empty() {
            call.bind_with(&actions);
        }

        let mut preceding: Vec<DbAction> = front_db.to_vec();
        for other in front {
            for action in &other.db_actions {
                if !preceding.iter().any(|p| p.id == action.id) {
                    preceding.push(action.clone());
                }
            }
        }
        if preceding.is_empty() || call.db_actions.is_empty() {
            return;
        }
        let provided: BTreeSet<String> = preceding.iter().map(|a| format_table_name(&a.table)).collect();
        let before = call.db_actions.len();
        call.db_actions
            .retain(|a| a.represents_existing_data() || !provided.contains(&format_table_name(&a.table)));
        if call.db_actions.len() != before {
            debug!(
                "{} reuses {} rows provided earlier",
                call.resource_key(),
                before - call.db_actions.len()
            );
            repair_foreign_keys(&preceding, &mut call.db_actions);
        }
    }

    /// Seed `call` with inserts or selects on its related tables. A call
    /// that wanted seeding but got none is flagged unlinked.
    pub fn generate_db_actions_for_call(&mut self, call: &mut Call, force_insert: bool) {
        if !self.config.involve_db || self.dependencies.schema().tables.is_empty() {
            return;
        }
        let key = call.resource_key().to_string();
        let tables = self.dependencies.related_tables(&key);
        let wanted = call.status != CallStatus::Created || !tables.is_empty() || force_insert;
        if !wanted {
            return;
        }

        let schema = self.dependencies.schema().clone();
        let builder = InsertBuilder::new(&schema);
        let mut actions: Vec<DbAction> = Vec::new();
        for table in &tables {
            let rows = self.dependencies.snapshot().rows(table).to_vec();
            let select = !force_insert
                && rows.len() >= self.config.min_row_of_table
                && self.rng.gen_bool(self.config.prob_of_select_from_db);
            if select {
                if let Some(row) = rows.choose(&mut self.rng).cloned() {
                    actions.push(builder.select_existing(table, row, &mut self.ids));
                    continue;
                }
            }
            match builder.insert_with_references(table, &mut self.ids, &mut self.rng) {
                Ok(inserted) => actions.extend(inserted),
                Err(e) => warn!("cannot seed {} for {}: {}", table, key, e),
            }
        }

        let mut seen = BTreeSet::new();
        let before = actions.len();
        actions.retain(|a| seen.insert(format_table_name(&a.table)));
        if actions.len() != before {
            repair_foreign_keys(&[], &mut actions);
        }

        if actions.is_empty() {
            if !tables.is_empty() || force_insert {
                warn!("{} proceeds without database seeding", key);
                call.unlinked = true;
            }
            return;
        }
        call.db_actions = actions;
        call.unlinked = false;
        if call.status != CallStatus::Created {
            call.status = CallStatus::Existing;
        }
        match self.cluster.get(&key) {
            Some(resource) => {
                self.dependencies.bind_call_with_db(resource, call);
            }
            None => warn!("{} is not a known resource, parameters left unbound", key),
        }
    }

    /// A dependency-aware individual: a resource with recorded
    /// dependencies, preceded by calls on what it depends on.
    pub fn sample_related_resources(&mut self) -> EngineResult<Option<Individual>> {
        self.ensure_initialized()?;
        let keys: Vec<String> = self
            .dependencies
            .keys_with_dependencies()
            .into_iter()
            .filter(|k| self.cluster.get(k).map(|r| r.is_sampleable()).unwrap_or(false))
            .map(str::to_string)
            .collect();
        let Some(key) = keys.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };
        let budget = self.config.max_test_size;
        let Some(main) = self.sample_call(&key, true, budget, false, None)? else {
            return Ok(None);
        };

        let targets: BTreeSet<String> = self
            .dependencies
            .relations_of(&key)
            .iter()
            .flat_map(|r| r.targets.iter().cloned())
            .filter(|t| *t != key && self.cluster.get(t).map(|r| r.is_sampleable()).unwrap_or(false))
            .collect();
        let mut used = main.len();
        let mut calls = Vec::new();
        for target in targets {
            if used >= budget {
                break;
            }
            if let Some(call) = self.sample_call(&target, true, budget - used, false, None)? {
                used += call.len();
                calls.push(call);
            }
        }
        calls.push(main);

        let mut individual = Individual::new(Vec::new(), SampleType::SmartResource);
        for call in calls {
            let mut call = call;
            let position = individual.len();
            let front_db = individual.db_actions_before(position);
            self.bind_call_with_front(&mut call, individual.calls(), &front_db);
            individual.add_call(position, call)?;
        }
        self.repair_individual(&mut individual);
        Ok(Some(individual))
    }

    /// Re-align path bindings inside every call and foreign keys across
    /// the individual. Idempotent.
    pub fn repair_individual(&self, individual: &mut Individual) {
        for call in individual.calls_mut() {
            call.repair_bindings();
        }
        individual.repair_db_actions();
    }

    /// Learn from the evaluation of `current`, obtained by structurally
    /// mutating `previous`.
    pub fn detect_dependency(
        &mut self,
        previous: (&Individual, &FitnessSnapshot),
        current: (&Individual, &FitnessSnapshot),
        verdict: FitnessVerdict,
    ) -> EngineResult<MutationKind> {
        let kind = self.dependencies.detect_dependency(
            EvaluatedCalls::new(previous.0.calls(), previous.1),
            EvaluatedCalls::new(current.0.calls(), current.1),
            verdict,
        )?;
        Ok(kind)
    }

    pub fn update_resource_tables(
        &mut self,
        individual: &Individual,
        executions: &BTreeMap<usize, DbExecution>,
    ) -> BTreeSet<String> {
        self.dependencies.update_resource_tables(individual.calls(), executions)
    }

    pub fn refresh_snapshot(&mut self, snapshot: DbSnapshot) {
        self.dependencies.refresh_snapshot(snapshot);
    }
}
