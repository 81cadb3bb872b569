//! Inferring dependencies from fitness changes after a structural mutation.
//!
//! The mutated individual is compared with its origin call by call. Every
//! call placed after the edit is compared at the action positions it held
//! before and after; a change in the targets it reaches is credited to the
//! edited resource(s), no change records a non-dependency.

use crate::error::{DependencyError, DependencyResult};
use crate::fitness::{compare_actions, compare_by_action_name, FitnessSnapshot, FitnessVerdict};
use crate::manager::DependencyManager;
use crate::mutation::MutationKind;
use log::debug;
use resdep_resource::Call;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Probability recorded when a change has a single explanation.
const OBSERVED_PROBABILITY: f64 = 1.0;

/// Probability recorded for each of two calls explaining a change equally.
const SHARED_PROBABILITY: f64 = OBSERVED_PROBABILITY / 2.0;

/// An individual's calls together with the fitness they reached.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatedCalls<'a> {
    pub calls: &'a [Call],
    pub fitness: &'a FitnessSnapshot,
}

impl<'a> EvaluatedCalls<'a> {
    pub fn new(calls: &'a [Call], fitness: &'a FitnessSnapshot) -> Self {
        Self { calls, fitness }
    }

    fn keys(&self) -> Vec<&'a str> {
        self.calls.iter().map(Call::resource_key).collect()
    }

    fn action_names(&self) -> Vec<String> {
        self.calls.iter().flat_map(Call::action_names).collect()
    }

    /// Position of the first action of call `index`.
    fn start_of(&self, index: usize) -> usize {
        self.calls.iter().take(index).map(Call::len).sum()
    }

    fn range_of(&self, index: usize) -> std::ops::Range<usize> {
        let start = self.start_of(index);
        start..start + self.calls.get(index).map(Call::len).unwrap_or(0)
    }
}

/// Identity of a call inside an individual.
fn same_call(a: &Call, b: &Call) -> bool {
    a.resource_key() == b.resource_key()
        && a.template.name == b.template.name
        && a.instance_key() == b.instance_key()
}

fn mismatches(previous: &[Call], current: &[Call]) -> Vec<usize> {
    previous
        .iter()
        .zip(current)
        .enumerate()
        .filter(|(_, (p, c))| !same_call(p, c))
        .map(|(i, _)| i)
        .collect()
}

fn first_mismatch(previous: &[Call], current: &[Call]) -> usize {
    mismatches(previous, current)
        .first()
        .copied()
        .unwrap_or_else(|| previous.len().min(current.len()))
}

/// Classify the edit turning `previous` into `current`.
pub fn classify(previous: &[Call], current: &[Call]) -> DependencyResult<MutationKind> {
    let before: Vec<&str> = previous.iter().map(Call::resource_key).collect();
    let after: Vec<&str> = current.iter().map(Call::resource_key).collect();
    match current.len() as isize - previous.len() as isize {
        0 if before == after => Ok(MutationKind::Modify),
        0 if before.len() > 1 && sorted(&before) == sorted(&after) => Ok(MutationKind::Swap),
        0 => Ok(MutationKind::Replace),
        1 => Ok(MutationKind::Add),
        -1 => Ok(MutationKind::Delete),
        _ => Err(DependencyError::undefined_mutation(previous.len(), current.len())),
    }
}

fn sorted<'a>(keys: &[&'a str]) -> Vec<&'a str> {
    let mut keys = keys.to_vec();
    keys.sort_unstable();
    keys
}

/// Sum of per-action comparisons of call `index` of `current` against the
/// actions `distance` positions earlier in `previous`. Actions also named
/// in `edited` are compared by name.
fn change_degree(
    previous: &EvaluatedCalls<'_>,
    current: &EvaluatedCalls<'_>,
    index: usize,
    distance: isize,
    edited: &BTreeSet<String>,
) -> (bool, i32) {
    let prev_names = previous.action_names();
    let cur_names = current.action_names();
    let mut changed = false;
    let mut degree = 0;
    for position in current.range_of(index) {
        let Some(name) = cur_names.get(position) else {
            continue;
        };
        let ordering = if edited.contains(name) {
            compare_by_action_name(name, current.fitness, &cur_names, previous.fitness, &prev_names)
        } else {
            let old = position as isize - distance;
            if old < 0 {
                continue;
            }
            compare_actions(current.fitness, &[position], previous.fitness, &[old as usize])
        };
        match ordering {
            Ordering::Greater => degree += 1,
            Ordering::Less => degree -= 1,
            Ordering::Equal => continue,
        }
        changed = true;
    }
    (changed, degree)
}

/// Compare call `a` of `current` with call `b` of `previous` in full.
fn call_changed(previous: &EvaluatedCalls<'_>, b: usize, current: &EvaluatedCalls<'_>, a: usize) -> bool {
    let after: Vec<usize> = current.range_of(a).collect();
    let before: Vec<usize> = previous.range_of(b).collect();
    compare_actions(current.fitness, &after, previous.fitness, &before) != Ordering::Equal
}

fn names_of(calls: &[&Call]) -> BTreeSet<String> {
    calls.iter().flat_map(|c| c.action_names()).collect()
}

impl DependencyManager {
    /// Update dependencies after `previous` was structurally mutated into
    /// `current` and evaluated with `verdict`. Returns the inferred kind.
    pub fn detect_dependency(
        &mut self,
        previous: EvaluatedCalls<'_>,
        current: EvaluatedCalls<'_>,
        verdict: FitnessVerdict,
    ) -> DependencyResult<MutationKind> {
        let kind = classify(previous.calls, current.calls)?;
        debug!(
            "{} detected: {:?} -> {:?} ({:?})",
            kind,
            previous.keys(),
            current.keys(),
            verdict
        );
        match kind {
            MutationKind::Add => self.after_add(&previous, &current, verdict),
            MutationKind::Delete => self.after_delete(&previous, &current, verdict),
            MutationKind::Replace => self.after_replace(&previous, &current, verdict)?,
            MutationKind::Swap => self.after_swap(&previous, &current, verdict)?,
            MutationKind::Modify => self.after_modify(&previous, &current, verdict),
        }
        Ok(kind)
    }

    /// Shifted calls `range` of `current` gain a dependency on `target`
    /// when their targets changed, a non-dependency otherwise.
    #[allow(clippy::too_many_arguments)]
    fn credit_single(
        &mut self,
        previous: &EvaluatedCalls<'_>,
        current: &EvaluatedCalls<'_>,
        range: std::ops::Range<usize>,
        distance: isize,
        target: &Call,
        verdict: FitnessVerdict,
        tag: &str,
    ) {
        let edited = names_of(&[target]);
        for index in range {
            let source = current.calls[index].resource_key();
            let changed = verdict != FitnessVerdict::Equal
                && change_degree(previous, current, index, distance, &edited).0;
            if changed {
                self.update_dependency(
                    source,
                    BTreeSet::from([target.resource_key().to_string()]),
                    tag,
                    OBSERVED_PROBABILITY,
                );
            } else {
                self.record_non_dependency(source, target.resource_key());
            }
        }
    }

    /// Shifted calls `range` of `current` credit `gained` when they got
    /// better, `lost` when worse, and both equally on a tie.
    #[allow(clippy::too_many_arguments)]
    fn credit_pair(
        &mut self,
        previous: &EvaluatedCalls<'_>,
        current: &EvaluatedCalls<'_>,
        range: std::ops::Range<usize>,
        distance: isize,
        gained: &Call,
        lost: &Call,
        verdict: FitnessVerdict,
        tag: &str,
    ) {
        let edited = names_of(&[gained, lost]);
        for index in range {
            let source = current.calls[index].resource_key().to_string();
            let (changed, degree) = if verdict == FitnessVerdict::Equal {
                (false, 0)
            } else {
                change_degree(previous, current, index, distance, &edited)
            };
            let one = |call: &Call| BTreeSet::from([call.resource_key().to_string()]);
            match (changed, degree.cmp(&0)) {
                (false, _) => {
                    self.record_non_dependency(&source, gained.resource_key());
                    self.record_non_dependency(&source, lost.resource_key());
                }
                (true, Ordering::Greater) => {
                    self.update_dependency(&source, one(gained), tag, OBSERVED_PROBABILITY)
                }
                (true, Ordering::Less) => {
                    self.update_dependency(&source, one(lost), tag, OBSERVED_PROBABILITY)
                }
                (true, Ordering::Equal) => {
                    self.update_dependency(&source, one(gained), tag, SHARED_PROBABILITY);
                    self.update_dependency(&source, one(lost), tag, SHARED_PROBABILITY);
                }
            }
        }
    }

    fn after_add(&mut self, previous: &EvaluatedCalls<'_>, current: &EvaluatedCalls<'_>, verdict: FitnessVerdict) {
        let location = first_mismatch(previous.calls, current.calls);
        let added = &current.calls[location];
        let distance = added.len() as isize;
        self.credit_single(
            previous,
            current,
            location + 1..current.calls.len(),
            distance,
            added,
            verdict,
            "ADD",
        );
    }

    fn after_delete(&mut self, previous: &EvaluatedCalls<'_>, current: &EvaluatedCalls<'_>, verdict: FitnessVerdict) {
        let location = first_mismatch(previous.calls, current.calls);
        let deleted = &previous.calls[location];
        let distance = -(deleted.len() as isize);
        self.credit_single(
            previous,
            current,
            location..current.calls.len(),
            distance,
            deleted,
            verdict,
            "DELETE",
        );
    }

    fn after_modify(&mut self, previous: &EvaluatedCalls<'_>, current: &EvaluatedCalls<'_>, verdict: FitnessVerdict) {
        let changed = mismatches(previous.calls, current.calls);
        let Some(&location) = changed.first() else {
            return;
        };
        let modified = &current.calls[location];
        let distance = modified.len() as isize - previous.calls[location].len() as isize;
        self.credit_single(
            previous,
            current,
            location + 1..current.calls.len(),
            distance,
            modified,
            verdict,
            "MODIFY",
        );
    }

    fn after_replace(
        &mut self,
        previous: &EvaluatedCalls<'_>,
        current: &EvaluatedCalls<'_>,
        verdict: FitnessVerdict,
    ) -> DependencyResult<()> {
        let changed = mismatches(previous.calls, current.calls);
        let [location] = changed.as_slice() else {
            return Err(DependencyError::ambiguous_edit(MutationKind::Replace, changed.len()));
        };
        let location = *location;
        let new = &current.calls[location];
        let old = &previous.calls[location];
        let distance = new.len() as isize - old.len() as isize;
        self.credit_pair(
            previous,
            current,
            location + 1..current.calls.len(),
            distance,
            new,
            old,
            verdict,
            "REPLACE",
        );
        Ok(())
    }

    fn after_swap(
        &mut self,
        previous: &EvaluatedCalls<'_>,
        current: &EvaluatedCalls<'_>,
        verdict: FitnessVerdict,
    ) -> DependencyResult<()> {
        let changed = mismatches(previous.calls, current.calls);
        let [p, q] = changed.as_slice() else {
            return Err(DependencyError::ambiguous_edit(MutationKind::Swap, changed.len()));
        };
        let (p, q) = (*p, *q);
        let front = &current.calls[p];
        let back = &current.calls[q];
        let judged = verdict != FitnessVerdict::Equal;

        // the call moved to the front now precedes p+1..=q
        let passed: Vec<&Call> = current.calls[p + 1..=q].iter().collect();
        if judged && call_changed(previous, q, current, p) {
            let probability = 1.0 / passed.len() as f64;
            for other in &passed {
                self.update_dependency(
                    front.resource_key(),
                    BTreeSet::from([other.resource_key().to_string()]),
                    "SWAP",
                    probability,
                );
            }
        } else {
            for other in &passed {
                self.record_non_dependency(front.resource_key(), other.resource_key());
            }
        }

        // the call moved to the back now follows p..q
        let preceding: Vec<&Call> = current.calls[p..q].iter().collect();
        if judged && call_changed(previous, p, current, q) {
            let probability = 1.0 / preceding.len() as f64;
            for other in &preceding {
                self.update_dependency(
                    back.resource_key(),
                    BTreeSet::from([other.resource_key().to_string()]),
                    "SWAP",
                    probability,
                );
            }
        } else {
            for other in &preceding {
                self.record_non_dependency(back.resource_key(), other.resource_key());
            }
        }

        let distance = front.len() as isize - back.len() as isize;
        self.credit_pair(previous, current, p + 1..q, distance, front, back, verdict, "SWAP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resdep_catalog::{HttpVerb, RestCallAction, RestPath};
    use resdep_resource::{CallStatus, CallsTemplate, ResourceInstance};

    fn call(path: &str) -> Call {
        let action = RestCallAction::new(HttpVerb::Get, RestPath::parse(path).unwrap());
        Call::new(
            CallsTemplate::new("GET", true, 1),
            ResourceInstance::of(path, &action),
            vec![action],
            CallStatus::NotExisting,
        )
    }

    fn calls(paths: &[&str]) -> Vec<Call> {
        paths.iter().map(|p| call(p)).collect()
    }

    #[test]
    fn classification_follows_size_and_keys() {
        let ab = calls(&["/a", "/b"]);
        assert_eq!(classify(&ab, &calls(&["/a", "/b"])).unwrap(), MutationKind::Modify);
        assert_eq!(classify(&ab, &calls(&["/b", "/a"])).unwrap(), MutationKind::Swap);
        assert_eq!(classify(&ab, &calls(&["/a", "/c"])).unwrap(), MutationKind::Replace);
        assert_eq!(classify(&ab, &calls(&["/a", "/c", "/b"])).unwrap(), MutationKind::Add);
        assert_eq!(classify(&ab, &calls(&["/b"])).unwrap(), MutationKind::Delete);
    }

    #[test]
    fn size_jump_is_an_error() {
        let err = classify(&calls(&["/a"]), &calls(&["/a", "/b", "/c"])).unwrap_err();
        assert!(matches!(
            err,
            DependencyError::UndefinedMutation {
                previous: 1,
                current: 3
            }
        ));
    }

    #[test]
    fn replace_improvement_credits_the_new_call() {
        let previous = calls(&["/a", "/c"]);
        let current = calls(&["/b", "/c"]);
        // /c reaches a target it never reached after /a
        let before = FitnessSnapshot::new().with_target(1, 1.0, 1);
        let after = FitnessSnapshot::new().with_target(2, 1.0, 1);

        let mut m = DependencyManager::default();
        let kind = m
            .detect_dependency(
                EvaluatedCalls::new(&previous, &before),
                EvaluatedCalls::new(&current, &after),
                FitnessVerdict::Better,
            )
            .unwrap();
        assert_eq!(kind, MutationKind::Replace);
        assert!(m.is_dependent("/c", "/b"));
        assert!(!m.is_dependent("/c", "/a"));
    }

    #[test]
    fn replace_tie_credits_both_candidates_equally() {
        let mut previous = calls(&["/a", "/c"]);
        let second = RestCallAction::new(HttpVerb::Delete, RestPath::parse("/c").unwrap());
        previous[1].actions.push(second);
        let mut current = calls(&["/b"]);
        current.push(previous[1].clone());

        // the first action of /c got worse, the second one better
        let before = FitnessSnapshot::new()
            .with_target(1, 1.0, 1)
            .with_target(2, 0.5, 2);
        let after = FitnessSnapshot::new()
            .with_target(1, 0.5, 1)
            .with_target(2, 1.0, 2);

        let mut m = DependencyManager::default();
        m.detect_dependency(
            EvaluatedCalls::new(&previous, &before),
            EvaluatedCalls::new(&current, &after),
            FitnessVerdict::Better,
        )
        .unwrap();
        assert!(m.is_dependent("/c", "/a"));
        assert!(m.is_dependent("/c", "/b"));
        assert!(m
            .relations_of("/c")
            .iter()
            .all(|r| r.probability() == SHARED_PROBABILITY));
    }

    #[test]
    fn swap_moving_a_call_forward_credits_what_it_passed() {
        let previous = calls(&["/a", "/b"]);
        let current = calls(&["/b", "/a"]);
        // /b lost its target once placed before /a
        let before = FitnessSnapshot::new().with_target(1, 1.0, 1);
        let after = FitnessSnapshot::new();

        let mut m = DependencyManager::default();
        m.detect_dependency(
            EvaluatedCalls::new(&previous, &before),
            EvaluatedCalls::new(&current, &after),
            FitnessVerdict::Worse,
        )
        .unwrap();
        assert!(m.is_dependent("/b", "/a"));
        assert_eq!(m.relations_of("/b")[0].probability(), 1.0);
        assert!(m.is_non_dependent("/a", "/b"));
    }
}
