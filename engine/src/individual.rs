//! The chromosome: an ordered list of calls plus database initialization.

use crate::error::{EngineError, EngineResult};
use crate::sample_type::SampleType;
use resdep_catalog::{repair_foreign_keys, verify_foreign_keys, DbAction};
use resdep_resource::Call;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    calls: Vec<Call>,
    pub sample_type: SampleType,
    /// Executed once before the first call.
    pub db_initialization: Vec<DbAction>,
}

impl Individual {
    pub fn new(calls: Vec<Call>, sample_type: SampleType) -> Self {
        Self {
            calls,
            sample_type,
            db_initialization: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn calls_mut(&mut self) -> &mut [Call] {
        &mut self.calls
    }

    pub fn call(&self, position: usize) -> EngineResult<&Call> {
        self.calls
            .get(position)
            .ok_or_else(|| EngineError::position_out_of_range(position, self.calls.len()))
    }

    /// Number of calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of REST actions across all calls.
    pub fn size(&self) -> usize {
        self.calls.iter().map(Call::len).sum()
    }

    pub fn resource_keys(&self) -> BTreeSet<String> {
        self.calls
            .iter()
            .map(|c| c.resource_key().to_string())
            .collect()
    }

    pub fn all_independent(&self) -> bool {
        self.calls.iter().all(Call::is_independent)
    }

    pub fn action_names(&self) -> Vec<String> {
        self.calls.iter().flat_map(Call::action_names).collect()
    }

    /// `position == len()` appends.
    pub fn add_call(&mut self, position: usize, call: Call) -> EngineResult<()> {
        if position > self.calls.len() {
            return Err(EngineError::position_out_of_range(position, self.calls.len()));
        }
        self.calls.insert(position, call);
        Ok(())
    }

    pub fn remove_call(&mut self, position: usize) -> EngineResult<Call> {
        if position >= self.calls.len() {
            return Err(EngineError::position_out_of_range(position, self.calls.len()));
        }
        Ok(self.calls.remove(position))
    }

    pub fn replace_call(&mut self, position: usize, call: Call) -> EngineResult<Call> {
        let len = self.calls.len();
        let slot = self
            .calls
            .get_mut(position)
            .ok_or_else(|| EngineError::position_out_of_range(position, len))?;
        Ok(std::mem::replace(slot, call))
    }

    pub fn swap_calls(&mut self, a: usize, b: usize) -> EngineResult<()> {
        let len = self.calls.len();
        for position in [a, b] {
            if position >= len {
                return Err(EngineError::position_out_of_range(position, len));
            }
        }
        self.calls.swap(a, b);
        Ok(())
    }

    /// DB actions executed before the call at `position`.
    pub fn db_actions_before(&self, position: usize) -> Vec<DbAction> {
        let mut actions = self.db_initialization.clone();
        for call in self.calls.iter().take(position) {
            actions.extend(call.db_actions.iter().cloned());
        }
        actions
    }

    /// Every DB action in execution order.
    pub fn db_actions(&self) -> Vec<DbAction> {
        self.db_actions_before(self.calls.len())
    }

    pub fn verify_db_actions(&self) -> bool {
        let mut preceding = Vec::new();
        if !verify_foreign_keys(&preceding, &self.db_initialization) {
            return false;
        }
        preceding.extend(self.db_initialization.iter().cloned());
        for call in &self.calls {
            if !verify_foreign_keys(&preceding, &call.db_actions) {
                return false;
            }
            preceding.extend(call.db_actions.iter().cloned());
        }
        true
    }

    /// Rebind forward foreign-key references across the whole individual.
    pub fn repair_db_actions(&mut self) {
        repair_foreign_keys(&[], &mut self.db_initialization);
        let mut preceding = self.db_initialization.clone();
        for call in self.calls.iter_mut() {
            repair_foreign_keys(&preceding, &mut call.db_actions);
            preceding.extend(call.db_actions.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use resdep_catalog::{DbActionKind, ForeignKeyRef, HttpVerb, RestCallAction, RestPath};
    use resdep_resource::{CallStatus, CallsTemplate, ResourceInstance};
    use std::collections::BTreeMap;

    fn call(path: &str) -> Call {
        let action = RestCallAction::new(HttpVerb::Get, RestPath::parse(path).unwrap());
        Call::new(
            CallsTemplate::new("GET", true, 1),
            ResourceInstance::of(path, &action),
            vec![action],
            CallStatus::NotExisting,
        )
    }

    fn insert(id: u64, table: &str, target: Option<(u64, &str)>) -> DbAction {
        DbAction {
            id,
            table: table.to_string(),
            kind: DbActionKind::Insert,
            values: BTreeMap::new(),
            references: target
                .map(|(t, table)| ForeignKeyRef {
                    columns: vec!["ref".into()],
                    target_table: table.into(),
                    target: Some(t),
                })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn positions_are_checked() {
        let mut ind = Individual::new(vec![call("/a")], SampleType::Random);
        assert!(matches!(
            ind.remove_call(1),
            Err(EngineError::PositionOutOfRange { position: 1, len: 1 })
        ));
        assert!(ind.swap_calls(0, 3).is_err());
        assert!(ind.replace_call(2, call("/b")).is_err());
        assert!(ind.add_call(2, call("/b")).is_err());
        ind.add_call(1, call("/b")).unwrap();
        ind.swap_calls(0, 1).unwrap();
        assert_eq!(
            ind.calls().iter().map(|c| c.resource_key()).collect::<Vec<_>>(),
            vec!["/b", "/a"]
        );
    }

    #[test]
    fn swapped_calls_get_their_references_repaired() {
        let mut a = call("/a");
        a.db_actions.push(insert(1, "users", None));
        let mut b = call("/b");
        b.db_actions.push(insert(2, "orders", Some((1, "users"))));
        let mut ind = Individual::new(vec![a, b], SampleType::Random);
        assert!(ind.verify_db_actions());

        ind.swap_calls(0, 1).unwrap();
        assert!(!ind.verify_db_actions());
        ind.repair_db_actions();
        assert!(ind.verify_db_actions());
        assert_eq!(ind.calls()[0].db_actions[0].references[0].target, None);

        let once = ind.clone();
        ind.repair_db_actions();
        assert_eq!(ind, once);
    }
}
