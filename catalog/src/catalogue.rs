//! The action catalogue consumed by the resource model.

use crate::action::RestCallAction;
use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Every action the API under test exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    pub actions: Vec<RestCallAction>,
}

impl Catalogue {
    pub fn new(actions: Vec<RestCallAction>) -> CatalogResult<Self> {
        let catalogue = Self { actions };
        catalogue.validate()?;
        Ok(catalogue)
    }

    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        let catalogue: Catalogue = serde_json::from_str(json)?;
        catalogue.validate()?;
        Ok(catalogue)
    }

    /// Reject two actions with the same verb and path.
    pub fn validate(&self) -> CatalogResult<()> {
        let mut seen = BTreeSet::new();
        for action in &self.actions {
            if !seen.insert(action.name()) {
                return Err(CatalogError::duplicate_action(action.name()));
            }
        }
        Ok(())
    }

    /// Actions grouped by their normalized path template.
    pub fn group_by_path(&self) -> BTreeMap<String, Vec<RestCallAction>> {
        let mut groups: BTreeMap<String, Vec<RestCallAction>> = BTreeMap::new();
        for action in &self.actions {
            groups
                .entry(action.path.as_str().to_string())
                .or_default()
                .push(action.clone());
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
