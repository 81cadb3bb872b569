//! Creation chains: the POSTs that must run before a resource exists.

use resdep_catalog::{RestCallAction, RestPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Complete,
    /// No creating action was found for `unresolved`.
    Incomplete { unresolved: String },
}

/// Ordered creating actions, outermost first and innermost last.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationChain {
    pub actions: Vec<RestCallAction>,
    pub status: ChainStatus,
}

impl CreationChain {
    pub fn complete(actions: Vec<RestCallAction>) -> Self {
        Self {
            actions,
            status: ChainStatus::Complete,
        }
    }

    pub fn incomplete(actions: Vec<RestCallAction>, unresolved: &RestPath) -> Self {
        Self {
            actions,
            status: ChainStatus::Incomplete {
                unresolved: unresolved.to_string(),
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ChainStatus::Complete
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A POST on `path` still needs an earlier creation: its path has variables
/// but does not end in one, or it has several of them.
pub fn needs_parent(path: &RestPath) -> bool {
    (path.has_variables() && !path.is_last_element_variable()) || path.variable_names().len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_needed_for_nested_collections() {
        let p = |s: &str| RestPath::parse(s).unwrap();
        assert!(!needs_parent(&p("/users")));
        assert!(!needs_parent(&p("/users/{id}")));
        assert!(needs_parent(&p("/users/{id}/orders")));
        assert!(needs_parent(&p("/users/{id}/orders/{oid}")));
    }
}
