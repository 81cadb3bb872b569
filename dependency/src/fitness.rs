//! Fitness feedback and the comparator driving dependency inference.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Heuristic value of one covered target, reached at an action position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetHeuristic {
    /// Normalized in [0,1]; 1.0 means covered.
    pub value: f64,
    pub action_index: usize,
}

impl TargetHeuristic {
    pub fn new(value: f64, action_index: usize) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            action_index,
        }
    }
}

/// Per-target heuristics of one evaluated individual.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitnessSnapshot {
    targets: BTreeMap<u32, TargetHeuristic>,
}

impl FitnessSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: u32, value: f64, action_index: usize) -> Self {
        self.record(target, value, action_index);
        self
    }

    /// Keep the best value seen for a target.
    pub fn record(&mut self, target: u32, value: f64, action_index: usize) {
        let heuristic = TargetHeuristic::new(value, action_index);
        match self.targets.get(&target) {
            Some(old) if old.value >= heuristic.value => {}
            _ => {
                self.targets.insert(target, heuristic);
            }
        }
    }

    pub fn get(&self, target: u32) -> Option<&TargetHeuristic> {
        self.targets.get(&target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets reached by any of the given actions.
    pub fn targets_at(&self, indices: &[usize]) -> BTreeMap<u32, f64> {
        self.targets
            .iter()
            .filter(|(_, h)| indices.contains(&h.action_index))
            .map(|(id, h)| (*id, h.value))
            .collect()
    }
}

/// Caller-supplied verdict of a mutated individual against its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitnessVerdict {
    Better,
    Equal,
    Worse,
}

impl FitnessVerdict {
    pub fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => FitnessVerdict::Better,
            Ordering::Equal => FitnessVerdict::Equal,
            Ordering::Less => FitnessVerdict::Worse,
        }
    }
}

/// Compare the targets reached at `a_indices` in `a` with those reached at
/// `b_indices` in `b`. `Greater` means `a` does better.
///
/// More targets wins; then reaching a target the other misses; then a
/// higher value on a shared target.
pub fn compare_actions(
    a: &FitnessSnapshot,
    a_indices: &[usize],
    b: &FitnessSnapshot,
    b_indices: &[usize],
) -> Ordering {
    let a_targets = a.targets_at(a_indices);
    let b_targets = b.targets_at(b_indices);

    match a_targets.len().cmp(&b_targets.len()) {
        Ordering::Equal => {}
        other => return other,
    }

    let a_keys: BTreeSet<u32> = a_targets.keys().copied().collect();
    let b_keys: BTreeSet<u32> = b_targets.keys().copied().collect();
    if a_keys.difference(&b_keys).next().is_some() {
        return Ordering::Greater;
    }
    if b_keys.difference(&a_keys).next().is_some() {
        return Ordering::Less;
    }

    for (id, a_value) in &a_targets {
        let b_value = b_targets.get(id).copied().unwrap_or(0.0);
        if a_value > &b_value {
            return Ordering::Greater;
        }
        if a_value < &b_value {
            return Ordering::Less;
        }
    }
    Ordering::Equal
}

/// Like [`compare_actions`], over every action named `name` in each
/// individual. Action names are given in execution order.
pub fn compare_by_action_name(
    name: &str,
    a: &FitnessSnapshot,
    a_names: &[String],
    b: &FitnessSnapshot,
    b_names: &[String],
) -> Ordering {
    let positions = |names: &[String]| -> Vec<usize> {
        names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(i, _)| i)
            .collect()
    };
    compare_actions(a, &positions(a_names), b, &positions(b_names))
}
