//! Dependency relations between resources.

use std::collections::BTreeSet;
use std::fmt;

/// Shape of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationKind {
    /// `source` depends on `targets`.
    Simple,
    /// All members share `tables`.
    Mutual {
        tables: BTreeSet<String>,
        confirmed: bool,
    },
    /// `source` depends on another instance of itself.
    SelfRelation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub source: String,
    pub targets: BTreeSet<String>,
    probability: f64,
    pub kind: RelationKind,
    pub provenance: Vec<String>,
}

/// `a` for one key, `{a,b}` for several.
pub fn key_of<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let keys: Vec<&str> = keys.into_iter().map(String::as_str).collect();
    match keys.as_slice() {
        [single] => single.to_string(),
        many => format!("{{{}}}", many.join(",")),
    }
}

impl Relation {
    pub fn simple(source: &str, targets: BTreeSet<String>, probability: f64, tag: &str) -> Self {
        let kind = if targets.len() == 1 && targets.contains(source) {
            RelationKind::SelfRelation
        } else {
            RelationKind::Simple
        };
        Self {
            source: source.to_string(),
            targets,
            probability: probability.clamp(0.0, 1.0),
            kind,
            provenance: vec![tag.to_string()],
        }
    }

    /// A mutual relation is stored under each member; `source` is the
    /// member owning this copy.
    pub fn mutual(
        source: &str,
        members: &BTreeSet<String>,
        table: &str,
        probability: f64,
        confirmed: bool,
        tag: &str,
    ) -> Self {
        let targets = members.iter().filter(|m| *m != source).cloned().collect();
        Self {
            source: source.to_string(),
            targets,
            probability: probability.clamp(0.0, 1.0),
            kind: RelationKind::Mutual {
                tables: BTreeSet::from([table.to_string()]),
                confirmed,
            },
            provenance: vec![tag.to_string()],
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn is_self(&self) -> bool {
        matches!(self.kind, RelationKind::SelfRelation)
    }

    pub fn is_mutual(&self) -> bool {
        matches!(self.kind, RelationKind::Mutual { .. })
    }

    /// Source and targets together.
    pub fn members(&self) -> BTreeSet<String> {
        let mut members = self.targets.clone();
        members.insert(self.source.clone());
        members
    }

    pub fn covers(&self, targets: &BTreeSet<String>) -> bool {
        targets.is_subset(&self.targets)
    }

    pub fn name(&self) -> String {
        format!("{}$->${}", self.source, key_of(&self.targets))
    }

    pub fn provenance_tag(&self) -> String {
        self.provenance.join(";")
    }

    /// Raise the probability with new evidence. Conflicting evidence is
    /// averaged with the current value first. Never decreases.
    pub fn reinforce(&mut self, probability: f64, tag: &str, conflicting: bool) {
        let incoming = probability.clamp(0.0, 1.0);
        let candidate = if conflicting {
            (self.probability + incoming) / 2.0
        } else {
            incoming
        };
        self.probability = self.probability.max(candidate).min(1.0);
        if !tag.is_empty() && !self.provenance.iter().any(|t| t == tag) {
            self.provenance.push(tag.to_string());
        }
    }

    /// Fold a narrower relation of the same source into this one.
    pub fn absorb(&mut self, other: &Relation) {
        self.targets
            .extend(other.members().into_iter().filter(|m| *m != self.source));
        if let (
            RelationKind::Mutual { tables, confirmed },
            RelationKind::Mutual {
                tables: other_tables,
                confirmed: other_confirmed,
            },
        ) = (&mut self.kind, &other.kind)
        {
            tables.extend(other_tables.iter().cloned());
            *confirmed = *confirmed || *other_confirmed;
        }
        self.probability = self.probability.max(other.probability);
        for tag in &other.provenance {
            if !self.provenance.contains(tag) {
                self.provenance.push(tag.clone());
            }
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}, {})",
            self.name(),
            self.probability,
            self.provenance_tag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn names_use_brace_notation() {
        let r = Relation::simple("/a", set(&["/b", "/c"]), 0.5, "t");
        assert_eq!(r.name(), "/a$->${/b,/c}");
        assert_eq!(key_of(&set(&["/b"])), "/b");
    }

    #[test]
    fn relation_on_itself_is_self() {
        let r = Relation::simple("/a", set(&["/a"]), 0.5, "t");
        assert!(r.is_self());
    }

    #[test]
    fn conflicting_evidence_never_lowers() {
        let mut r = Relation::simple("/a", set(&["/b"]), 0.5, "first");
        r.reinforce(0.25, "second", true);
        assert_eq!(r.probability(), 0.5);
        r.reinforce(1.0, "third", true);
        assert_eq!(r.probability(), 0.75);
        assert_eq!(r.provenance_tag(), "first;second;third");
    }

    #[test]
    fn absorb_merges_members_and_tables() {
        let mut broad = Relation::mutual("/a", &set(&["/a", "/b"]), "x", 0.6, false, "table:x");
        let narrow = Relation::mutual("/c", &set(&["/a", "/c"]), "y", 1.0, true, "table:y");
        broad.absorb(&narrow);
        assert_eq!(broad.targets, set(&["/b", "/c"]));
        assert_eq!(broad.probability(), 1.0);
        assert_eq!(
            broad.kind,
            RelationKind::Mutual {
                tables: set(&["x", "y"]),
                confirmed: true
            }
        );
    }
}
