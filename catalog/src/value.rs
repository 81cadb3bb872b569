//! Minimal parameter and column values.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete value carried by a parameter, body field or DB column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Declared type of a parameter, field or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Integer,
    Float,
    Boolean,
    Text,
}

impl ValueType {
    /// Draw a random value of this type.
    pub fn random(self, rng: &mut impl Rng) -> Value {
        match self {
            ValueType::Integer => Value::Int(rng.gen_range(1..10_000)),
            ValueType::Float => Value::Float(rng.gen_range(0.0..1000.0)),
            ValueType::Boolean => Value::Bool(rng.gen_bool(0.5)),
            ValueType::Text => {
                let len = rng.gen_range(3..9);
                let text: String = (0..len)
                    .map(|_| (b'a' + rng.gen_range(0..26u8)) as char)
                    .collect();
                Value::Text(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_values_match_their_type() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert!(matches!(ValueType::Integer.random(&mut rng), Value::Int(_)));
        assert!(matches!(ValueType::Boolean.random(&mut rng), Value::Bool(_)));
        match ValueType::Text.random(&mut rng) {
            Value::Text(s) => assert!((3..9).contains(&s.len())),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn untagged_json_round_trip_keeps_variants() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 7, 1.5, "abc"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(7),
                Value::Float(1.5),
                Value::Text("abc".into())
            ]
        );
    }
}
