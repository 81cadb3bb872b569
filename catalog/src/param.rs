//! Action parameters and body schemas.

use crate::value::{Value, ValueType};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A named field of a body object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: ValueType,
    #[serde(default)]
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            value: Value::Null,
        }
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Path,
    Query,
    Header,
    Body {
        #[serde(default)]
        ref_type: Option<String>,
        #[serde(default)]
        fields: Vec<Field>,
    },
}

impl ParamKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ParamKind::Path => "PathParam",
            ParamKind::Query => "QueryParam",
            ParamKind::Header => "HeaderParam",
            ParamKind::Body { .. } => "BodyParam",
        }
    }
}

fn default_required() -> bool {
    true
}

/// One parameter of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "in")]
    pub kind: ParamKind,
    #[serde(default, rename = "type")]
    pub ty: ValueType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub value: Value,
}

impl Param {
    fn with_kind(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: ValueType::Integer,
            required: true,
            default: None,
            value: Value::Null,
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Path)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Query)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Header)
    }

    pub fn body(name: impl Into<String>, ref_type: Option<&str>, fields: Vec<Field>) -> Self {
        Self::with_kind(
            name,
            ParamKind::Body {
                ref_type: ref_type.map(str::to_string),
                fields,
            },
        )
    }

    pub fn with_type(mut self, ty: ValueType) -> Self {
        self.ty = ty;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_path(&self) -> bool {
        matches!(self.kind, ParamKind::Path)
    }

    pub fn is_body(&self) -> bool {
        matches!(self.kind, ParamKind::Body { .. })
    }

    pub fn ref_type(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Body { ref_type, .. } => ref_type.as_deref(),
            ParamKind::Path | ParamKind::Query | ParamKind::Header => None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            ParamKind::Body { fields, .. } => fields,
            ParamKind::Path | ParamKind::Query | ParamKind::Header => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        match &mut self.kind {
            ParamKind::Body { fields, .. } => fields.iter_mut().find(|f| f.name == name),
            ParamKind::Path | ParamKind::Query | ParamKind::Header => None,
        }
    }

    /// Whether the value must be bound to an already existing one.
    pub fn is_required_to_bind(&self) -> bool {
        match self.kind {
            ParamKind::Path => true,
            ParamKind::Query => self.required && self.default.is_none(),
            ParamKind::Header | ParamKind::Body { .. } => false,
        }
    }

    pub fn randomize(&mut self, rng: &mut impl Rng) {
        match &mut self.kind {
            ParamKind::Body { fields, .. } => {
                for field in fields.iter_mut() {
                    field.value = field.ty.random(rng);
                }
            }
            ParamKind::Path | ParamKind::Query | ParamKind::Header => {
                self.value = self.ty.random(rng);
            }
        }
    }

    /// Copy the value of `other`, field by field for bodies.
    pub fn copy_value_from(&mut self, other: &Param) {
        match &mut self.kind {
            ParamKind::Body { fields, .. } => {
                for field in fields.iter_mut() {
                    if let Some(source) = other.field(&field.name) {
                        field.value = source.value.clone();
                    }
                }
            }
            ParamKind::Path | ParamKind::Query | ParamKind::Header => {
                self.value = other.value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn binding_requirement_depends_on_kind() {
        assert!(Param::path("id").is_required_to_bind());
        assert!(Param::query("q").is_required_to_bind());
        assert!(!Param::query("q").optional().is_required_to_bind());
        assert!(!Param::query("q").with_default(Value::Int(1)).is_required_to_bind());
        assert!(!Param::header("x-token").is_required_to_bind());
    }

    #[test]
    fn randomize_fills_body_fields() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut body = Param::body(
            "body",
            Some("User"),
            vec![Field::new("name", ValueType::Text), Field::new("age", ValueType::Integer)],
        );
        body.randomize(&mut rng);
        assert!(body.fields().iter().all(|f| !f.value.is_null()));
        assert!(body.value.is_null());
    }

    #[test]
    fn deserializes_body_kind() {
        let p: Param = serde_json::from_str(
            r#"{"name":"body","in":{"body":{"ref_type":"Order","fields":[{"name":"id"}]}}}"#,
        )
        .unwrap();
        assert_eq!(p.ref_type(), Some("Order"));
        assert_eq!(p.fields().len(), 1);
        assert!(p.required);
    }
}
