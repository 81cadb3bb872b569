//! HTTP verbs in their canonical order.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An HTTP verb. The declaration order is the index used by verb-flag arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Post,
    Get,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Post,
        HttpVerb::Get,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
        HttpVerb::Options,
        HttpVerb::Head,
    ];

    pub fn index(self) -> usize {
        match self {
            HttpVerb::Post => 0,
            HttpVerb::Get => 1,
            HttpVerb::Put => 2,
            HttpVerb::Patch => 3,
            HttpVerb::Delete => 4,
            HttpVerb::Options => 5,
            HttpVerb::Head => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Post => "POST",
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::unknown_verb(s))
    }
}
