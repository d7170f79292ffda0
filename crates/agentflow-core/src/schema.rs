//! Lightweight JSON-Schema-like descriptions of agent inputs, outputs and config.
//!
//! Agents declare their contracts as data so the input adapter and the
//! execution engine can reason about them at runtime:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "transcript": { "type": "string", "description": "Meeting transcript" },
//!     "assignee":   { "type": ["string", "null"] }
//!   },
//!   "required": ["transcript"]
//! }
//! ```
//!
//! Only the subset the engine needs is supported: property types (single or
//! union), `required`, `default`, `enum`, `items` and nested `properties`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Payload;

/// A primitive JSON type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
                }
                _ => false,
            },
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }

    /// The empty value used when a required field has to be synthesized.
    pub fn empty_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Number | Self::Integer => Value::from(0),
            Self::Boolean => Value::Bool(false),
            Self::Array => Value::Array(Vec::new()),
            Self::Object => Value::Object(Payload::new()),
            Self::Null => Value::Null,
        }
    }
}

/// `"type": "string"` or `"type": ["string", "null"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Single(SchemaType),
    Union(Vec<SchemaType>),
}

impl TypeSpec {
    pub fn types(&self) -> Vec<SchemaType> {
        match self {
            Self::Single(t) => vec![*t],
            Self::Union(ts) => ts.clone(),
        }
    }

    /// The first non-null type, used to pick an empty value.
    pub fn primary(&self) -> SchemaType {
        self.types()
            .into_iter()
            .find(|t| *t != SchemaType::Null)
            .unwrap_or(SchemaType::Null)
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.types().iter().any(|t| t.matches(value))
    }

    fn describe(&self) -> String {
        match self {
            Self::Single(t) => format!("'{}'", t.as_str()),
            Self::Union(ts) => {
                let names: Vec<String> = ts.iter().map(|t| format!("'{}'", t.as_str())).collect();
                format!("[{}]", names.join(", "))
            }
        }
    }
}

/// Description of a single property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySpec>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,
}

impl PropertySpec {
    pub fn of(t: SchemaType) -> Self {
        Self {
            types: Some(TypeSpec::Single(t)),
            ..Default::default()
        }
    }

    pub fn one_of(ts: &[SchemaType]) -> Self {
        Self {
            types: Some(TypeSpec::Union(ts.to_vec())),
            ..Default::default()
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| Value::from(*v)).collect());
        self
    }

    pub fn with_items(mut self, items: PropertySpec) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, spec: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    /// The type used when synthesizing a value; untyped properties are strings.
    pub fn primary_type(&self) -> SchemaType {
        self.types
            .as_ref()
            .map(|t| t.primary())
            .unwrap_or(SchemaType::String)
    }

    fn check(&self, path: &str, value: &Value) -> Result<(), SchemaViolation> {
        if let Some(ref types) = self.types {
            if !types.matches(value) {
                return Err(SchemaViolation::new(
                    path,
                    format!("{} is not of type {}", short_json(value), types.describe()),
                ));
            }
        }
        if let Some(ref allowed) = self.enum_values {
            if !allowed.contains(value) {
                return Err(SchemaViolation::new(
                    path,
                    format!("{} is not one of {}", short_json(value), Value::from(allowed.clone())),
                ));
            }
        }
        if let (Some(items), Value::Array(elements)) = (self.items.as_ref(), value) {
            for (i, element) in elements.iter().enumerate() {
                items.check(&format!("{}[{}]", path, i), element)?;
            }
        }
        if let Value::Object(map) = value {
            for (name, spec) in &self.properties {
                if let Some(nested) = map.get(name) {
                    spec.check(&format!("{}.{}", path, name), nested)?;
                }
            }
        }
        Ok(())
    }
}

/// A declared object contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    #[serde(rename = "type", default = "default_object_type")]
    pub schema_type: SchemaType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn default_object_type() -> SchemaType {
    SchemaType::Object
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self::object()
    }
}

/// A structural mismatch between a payload and a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (at '{path}')")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: &str, message: String) -> Self {
        Self {
            path: path.to_string(),
            message,
        }
    }
}

impl SchemaSpec {
    /// An object schema with no declared properties.
    pub fn object() -> Self {
        Self {
            schema_type: SchemaType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, spec: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    pub fn require(mut self, name: &str) -> Self {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Parse a schema from its stored JSON form.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Payload::new()))
    }

    /// Structural check: required presence, declared types, enum membership.
    ///
    /// Undeclared keys are allowed.
    pub fn validate(&self, input: &Payload) -> Result<(), SchemaViolation> {
        for name in &self.required {
            if !input.contains_key(name) {
                return Err(SchemaViolation::new(
                    name,
                    format!("'{}' is a required property", name),
                ));
            }
        }
        for (name, spec) in &self.properties {
            if let Some(value) = input.get(name) {
                spec.check(name, value)?;
            }
        }
        Ok(())
    }

    /// Reshape `input` to the declared properties.
    ///
    /// Present values are kept, absent ones take the declared default, and
    /// absent required ones get an empty value of their type. Undeclared keys
    /// are dropped. Fails only when a declared default contradicts its own
    /// declared type.
    pub fn repair(&self, input: &Payload) -> Result<Payload, SchemaViolation> {
        let mut repaired = Payload::new();
        for (name, spec) in &self.properties {
            if let Some(value) = input.get(name) {
                repaired.insert(name.clone(), value.clone());
            } else if let Some(ref default) = spec.default {
                if let Some(ref types) = spec.types {
                    if !types.matches(default) {
                        return Err(SchemaViolation::new(
                            name,
                            format!(
                                "default {} is not of type {}",
                                short_json(default),
                                types.describe()
                            ),
                        ));
                    }
                }
                repaired.insert(name.clone(), default.clone());
            } else if self.required.iter().any(|r| r == name) {
                repaired.insert(name.clone(), spec.primary_type().empty_value());
            }
        }
        Ok(repaired)
    }

    /// Empty value for a declared property, `""` when the property is unknown.
    pub fn type_default(&self, name: &str) -> Value {
        self.properties
            .get(name)
            .map(|p| p.primary_type())
            .unwrap_or(SchemaType::String)
            .empty_value()
    }
}

fn short_json(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 60 {
        let cut: String = text.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_repair_fills_missing_required_string() {
        let schema = SchemaSpec::object()
            .property("task", PropertySpec::of(SchemaType::String))
            .property("assignee", PropertySpec::of(SchemaType::String))
            .require("assignee");
        let repaired = schema.repair(&payload(json!({"task": "ship it"}))).unwrap();
        assert_eq!(repaired["assignee"], json!(""));
        assert_eq!(repaired["task"], json!("ship it"));
    }

    #[test]
    fn test_repair_uses_default_and_drops_undeclared() {
        let schema = SchemaSpec::object()
            .property(
                "tone",
                PropertySpec::of(SchemaType::String).with_default(json!("professional")),
            )
            .property("count", PropertySpec::of(SchemaType::Integer))
            .require("count");
        let repaired = schema.repair(&payload(json!({"extra": 1}))).unwrap();
        assert_eq!(repaired.len(), 2);
        assert_eq!(repaired["tone"], json!("professional"));
        assert_eq!(repaired["count"], json!(0));
        assert!(!repaired.contains_key("extra"));
    }

    #[test]
    fn test_repair_rejects_mistyped_default() {
        let schema = SchemaSpec::object().property(
            "count",
            PropertySpec::of(SchemaType::Integer).with_default(json!("ten")),
        );
        let err = schema.repair(&Payload::new()).unwrap_err();
        assert_eq!(err.path, "count");
    }

    #[test]
    fn test_repair_empty_values_per_type() {
        let schema = SchemaSpec::object()
            .property("a", PropertySpec::of(SchemaType::Array))
            .property("o", PropertySpec::of(SchemaType::Object))
            .property("b", PropertySpec::of(SchemaType::Boolean))
            .property("n", PropertySpec::of(SchemaType::Number))
            .property("u", PropertySpec::one_of(&[SchemaType::Null, SchemaType::String]))
            .require("a")
            .require("o")
            .require("b")
            .require("n")
            .require("u");
        let repaired = schema.repair(&Payload::new()).unwrap();
        assert_eq!(repaired["a"], json!([]));
        assert_eq!(repaired["o"], json!({}));
        assert_eq!(repaired["b"], json!(false));
        assert_eq!(repaired["n"], json!(0));
        assert_eq!(repaired["u"], json!(""));
    }

    #[test]
    fn test_validate_required_and_types() {
        let schema = SchemaSpec::object()
            .property("transcript", PropertySpec::of(SchemaType::String))
            .require("transcript");

        let err = schema.validate(&Payload::new()).unwrap_err();
        assert!(err.message.contains("required"));

        let err = schema.validate(&payload(json!({"transcript": 5}))).unwrap_err();
        assert!(err.message.contains("not of type 'string'"));

        assert!(schema
            .validate(&payload(json!({"transcript": "hi", "other": true})))
            .is_ok());
    }

    #[test]
    fn test_validate_integer_union_and_enum() {
        let schema = SchemaSpec::object()
            .property("minutes", PropertySpec::of(SchemaType::Integer))
            .property("assignee", PropertySpec::one_of(&[SchemaType::String, SchemaType::Null]))
            .property(
                "mode",
                PropertySpec::of(SchemaType::String).with_enum(&["categorize", "prioritize"]),
            );

        assert!(schema.validate(&payload(json!({"minutes": 5}))).is_ok());
        assert!(schema.validate(&payload(json!({"minutes": 5.0}))).is_ok());
        assert!(schema.validate(&payload(json!({"minutes": 5.5}))).is_err());
        assert!(schema.validate(&payload(json!({"assignee": null}))).is_ok());
        assert!(schema.validate(&payload(json!({"mode": "prioritize"}))).is_ok());
        assert!(schema.validate(&payload(json!({"mode": "shout"}))).is_err());
    }

    #[test]
    fn test_validate_nested_properties_and_items() {
        let schema = SchemaSpec::object()
            .property(
                "email",
                PropertySpec::of(SchemaType::Object)
                    .with_property("subject", PropertySpec::of(SchemaType::String)),
            )
            .property(
                "keywords",
                PropertySpec::of(SchemaType::Array).with_items(PropertySpec::of(SchemaType::String)),
            );

        let err = schema
            .validate(&payload(json!({"email": {"subject": 3}})))
            .unwrap_err();
        assert_eq!(err.path, "email.subject");

        let err = schema
            .validate(&payload(json!({"keywords": ["seo", 7]})))
            .unwrap_err();
        assert_eq!(err.path, "keywords[1]");
    }

    #[test]
    fn test_schema_json_round_shape() {
        let stored = json!({
            "type": "object",
            "properties": {
                "content": {"type": "string"},
                "keywords": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["content"]
        });
        let schema = SchemaSpec::from_value(&stored).unwrap();
        assert!(schema.has_property("keywords"));
        assert_eq!(schema.required, vec!["content".to_string()]);
        assert_eq!(schema.to_value(), stored);

        let bare = SchemaSpec::from_value(&json!({"type": "object"})).unwrap();
        assert!(bare.properties.is_empty());
    }
}
