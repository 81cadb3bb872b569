//! Path templates split into static and variable elements.

use crate::error::{CatalogError, CatalogResult};
use crate::param::Param;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static VARIABLE: OnceLock<Result<Regex, regex_lite::Error>> = OnceLock::new();

fn variable_regex() -> CatalogResult<&'static Regex> {
    VARIABLE
        .get_or_init(|| Regex::new(r"\{([^{}/]+)\}"))
        .as_ref()
        .map_err(|e| CatalogError::pattern(e.to_string()))
}

/// One `/`-separated element of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Static(String),
    Variable(String),
}

impl PathElement {
    pub fn is_variable(&self) -> bool {
        matches!(self, PathElement::Variable(_))
    }

    /// Element compatibility used by prefix and equivalence checks.
    fn matches(&self, other: &PathElement) -> bool {
        match (self, other) {
            (PathElement::Static(a), PathElement::Static(b)) => a.eq_ignore_ascii_case(b),
            (PathElement::Variable(_), PathElement::Variable(_)) => true,
            _ => false,
        }
    }
}

/// A REST path template such as `/users/{id}/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestPath {
    raw: String,
    elements: Vec<PathElement>,
}

impl RestPath {
    pub fn parse(path: &str) -> CatalogResult<Self> {
        let regex = variable_regex()?;
        let mut elements = Vec::new();

        for part in path.trim().split('/').filter(|p| !p.is_empty()) {
            let opens = part.matches('{').count();
            let closes = part.matches('}').count();
            if opens != closes {
                return Err(CatalogError::invalid_path(path, "unbalanced braces"));
            }
            if opens == 0 {
                elements.push(PathElement::Static(part.to_string()));
                continue;
            }
            if opens > 1 {
                return Err(CatalogError::invalid_path(
                    path,
                    format!("more than one variable in element {}", part),
                ));
            }
            let name = regex
                .captures(part)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| CatalogError::invalid_path(path, "empty variable name"))?;
            elements.push(PathElement::Variable(name));
        }

        let raw = Self::render(&elements);
        Ok(Self { raw, elements })
    }

    fn render(elements: &[PathElement]) -> String {
        if elements.is_empty() {
            return "/".to_string();
        }
        elements
            .iter()
            .map(|e| match e {
                PathElement::Static(s) => format!("/{}", s),
                PathElement::Variable(v) => format!("/{{{}}}", v),
            })
            .collect()
    }

    /// Normalized template string; used as the resource key.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn levels(&self) -> usize {
        self.elements.len()
    }

    /// Same length and element-wise match; variable names are ignored.
    pub fn is_equivalent(&self, other: &RestPath) -> bool {
        self.levels() == other.levels()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.matches(b))
    }

    /// `self` is a strict, non-equivalent prefix of `other`.
    pub fn is_ancestor_of(&self, other: &RestPath) -> bool {
        self.levels() < other.levels()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.matches(b))
    }

    pub fn is_same_or_ancestor_of(&self, other: &RestPath) -> bool {
        self.is_equivalent(other) || self.is_ancestor_of(other)
    }

    pub fn has_variables(&self) -> bool {
        self.elements.iter().any(PathElement::is_variable)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                PathElement::Variable(v) => Some(v.as_str()),
                PathElement::Static(_) => None,
            })
            .collect()
    }

    pub fn is_last_element_variable(&self) -> bool {
        self.elements.last().map(PathElement::is_variable).unwrap_or(false)
    }

    pub fn static_tokens(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                PathElement::Static(s) => Some(s.as_str()),
                PathElement::Variable(_) => None,
            })
            .collect()
    }

    pub fn last_static_token(&self) -> Option<&str> {
        self.static_tokens().last().copied()
    }

    /// The static element a variable belongs to: the nearest one before it.
    pub fn segment_of(&self, variable: &str) -> Option<&str> {
        let position = self
            .elements
            .iter()
            .position(|e| matches!(e, PathElement::Variable(v) if v == variable))?;
        self.elements[..position].iter().rev().find_map(|e| match e {
            PathElement::Static(s) => Some(s.as_str()),
            PathElement::Variable(_) => None,
        })
    }

    /// Distinct segments owning a variable, or the last static token when
    /// the path has no variables.
    pub fn segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = Vec::new();
        for name in self.variable_names() {
            if let Some(segment) = self.segment_of(name) {
                if !segments.iter().any(|s| s == segment) {
                    segments.push(segment.to_string());
                }
            }
        }
        if segments.is_empty() {
            if let Some(last) = self.last_static_token() {
                segments.push(last.to_string());
            }
        }
        segments
    }

    /// Substitute path parameter values for the variables.
    pub fn resolve(&self, params: &[Param]) -> String {
        let elements: Vec<PathElement> = self
            .elements
            .iter()
            .map(|e| match e {
                PathElement::Variable(v) => {
                    let value = params
                        .iter()
                        .find(|p| p.is_path() && p.name == *v)
                        .map(|p| p.value.to_string())
                        .unwrap_or_else(|| format!("{{{}}}", v));
                    PathElement::Static(value)
                }
                PathElement::Static(s) => PathElement::Static(s.clone()),
            })
            .collect();
        Self::render(&elements)
    }
}

impl fmt::Display for RestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for RestPath {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RestPath::parse(&value)
    }
}

impl From<RestPath> for String {
    fn from(path: RestPath) -> Self {
        path.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> RestPath {
        RestPath::parse(s).unwrap()
    }

    #[test]
    fn parses_static_and_variable_elements() {
        let p = path("/users/{id}/orders/");
        assert_eq!(
            p.elements(),
            &[
                PathElement::Static("users".into()),
                PathElement::Variable("id".into()),
                PathElement::Static("orders".into()),
            ]
        );
        assert_eq!(p.as_str(), "/users/{id}/orders");
        assert!(p.has_variables());
        assert!(!p.is_last_element_variable());
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert!(RestPath::parse("/users/{id").is_err());
        assert!(RestPath::parse("/users/{}").is_err());
    }

    #[test]
    fn ancestor_is_strict_non_equivalent_prefix() {
        let users = path("/users");
        let user = path("/users/{id}");
        let other_user = path("/users/{uid}");
        let items = path("/items/{id}");

        assert!(users.is_ancestor_of(&user));
        assert!(!user.is_ancestor_of(&users));
        assert!(!user.is_ancestor_of(&other_user));
        assert!(user.is_equivalent(&other_user));
        assert!(!users.is_ancestor_of(&items));
    }

    #[test]
    fn segments_follow_preceding_static_token() {
        let p = path("/users/{uid}/orders/{oid}");
        assert_eq!(p.segment_of("uid"), Some("users"));
        assert_eq!(p.segment_of("oid"), Some("orders"));
        assert_eq!(p.segments(), vec!["users".to_string(), "orders".to_string()]);
        assert_eq!(path("/users").segments(), vec!["users".to_string()]);
    }

    #[test]
    fn resolve_substitutes_path_values() {
        let mut id = Param::path("id");
        id.value = Value::Int(5);
        assert_eq!(path("/users/{id}").resolve(&[id]), "/users/5");
        assert_eq!(path("/users/{id}").resolve(&[]), "/users/{id}");
    }
}
