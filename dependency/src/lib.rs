//! resdep Dependency
//!
//! Probabilistic knowledge about how resources relate: which tables each
//! resource works on, which resources depend on each other, and how that
//! knowledge is refined from runtime evidence and fitness feedback.
//!
//! # Module Structure
//!
//! - `manager` - The dependency manager owning all relations
//! - `relation` - Simple, mutual and self relations with monotonic reinforcement
//! - `table` - Resource to table mappings, derived and confirmed
//! - `derive` - Static derivation from names, reference types and columns
//! - `runtime` - Refinement from per-action database evidence
//! - `execution` - Per-action database evidence
//! - `fitness` - Fitness snapshots and the action comparator
//! - `inference` - Dependency detection after structural mutations
//! - `binding` - Parameter to column bindings
//! - `mutation` - Structural mutation kinds

pub mod binding;
mod derive;
pub mod error;
pub mod execution;
pub mod fitness;
pub mod inference;
pub mod manager;
pub mod mutation;
pub mod relation;
mod runtime;
pub mod table;

pub use binding::ParamBindMap;
pub use error::{DependencyError, DependencyResult};
pub use execution::{DbExecution, SqlAccess};
pub use fitness::{
    compare_actions, compare_by_action_name, FitnessSnapshot, FitnessVerdict, TargetHeuristic,
};
pub use inference::{classify, EvaluatedCalls};
pub use manager::DependencyManager;
pub use mutation::MutationKind;
pub use relation::{key_of, Relation, RelationKind};
pub use table::{ColumnMatch, MatchedInfo, ParamToTable, ResourceToTable};
