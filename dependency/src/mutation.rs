//! Structural mutation kinds.

use std::fmt;

/// The five structural edits of a chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationKind {
    Add,
    Delete,
    Swap,
    Replace,
    Modify,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::Delete,
        MutationKind::Swap,
        MutationKind::Add,
        MutationKind::Replace,
        MutationKind::Modify,
    ];

    /// Calls an individual needs before the edit applies.
    pub fn min_calls(self) -> usize {
        match self {
            MutationKind::Delete | MutationKind::Swap => 2,
            MutationKind::Add | MutationKind::Replace | MutationKind::Modify => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Add => "ADD",
            MutationKind::Delete => "DELETE",
            MutationKind::Swap => "SWAP",
            MutationKind::Replace => "REPLACE",
            MutationKind::Modify => "MODIFY",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
