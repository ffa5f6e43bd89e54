//! Schema - Define type schemas for resources
//!
//! Providers declare a schema for every field they map, enabling
//! validation of configuration documents before anything is expanded.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Boolean
    Bool,
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered collection without duplicates
    Set(Box<AttributeType>),
    /// Map with string keys
    Map(Box<AttributeType>),
    /// Nested block with named attributes
    Block(HashMap<String, AttributeSchema>),
}

impl AttributeType {
    /// Block type built from a list of attribute schemas
    pub fn block(attributes: Vec<AttributeSchema>) -> Self {
        AttributeType::Block(
            attributes
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect(),
        )
    }

    /// Check if a value conforms to this type, including required and
    /// computed rules of nested blocks
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        self.check(value, true)
    }

    /// Check only the shape of a value. Used when storing values read back
    /// from the SDK, where requiredness does not apply.
    pub fn check_type(&self, value: &Value) -> Result<(), TypeError> {
        self.check(value, false)
    }

    fn check(&self, value: &Value, strict: bool) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.check(v, strict)?;
                // zero values read back from the SDK stand for unset attributes
                if !strict && v.is_zero() {
                    return Ok(());
                }
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner
                        .check(item, strict)
                        .map_err(|e| TypeError::ListItemError {
                            index: i,
                            inner: Box::new(e),
                        })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.check(v, strict).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(attributes), Value::Map(map)) => {
                check_block(attributes, map, strict)
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// The value a framework presents for an attribute that was never set
    pub fn zero_value(&self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Int => Value::Int(0),
            AttributeType::Float => Value::Float(0.0),
            AttributeType::Bool => Value::Bool(false),
            AttributeType::Custom { base, .. } => base.zero_value(),
            AttributeType::List(_) | AttributeType::Set(_) => Value::List(Vec::new()),
            AttributeType::Map(_) => Value::Map(HashMap::new()),
            AttributeType::Block(attributes) => Value::Map(
                attributes
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.attr_type.zero_value()))
                    .collect(),
            ),
        }
    }

    /// Bring a value into the canonical shape for this type:
    /// - integers stored in float attributes become floats
    /// - nested blocks carry every declared attribute (zero values fill gaps)
    ///   and lose undeclared ones
    /// - sets keep the first occurrence of equal items
    pub fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (AttributeType::Float, Value::Int(i)) => Value::Float(i as f64),
            (AttributeType::Custom { base, .. }, v) => base.normalize(v),
            (AttributeType::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| inner.normalize(v)).collect())
            }
            (AttributeType::Set(inner), Value::List(items)) => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let item = inner.normalize(item);
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Value::List(unique)
            }
            (AttributeType::Map(inner), Value::Map(map)) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, inner.normalize(v)))
                    .collect(),
            ),
            (AttributeType::Block(attributes), Value::Map(mut map)) => Value::Map(
                attributes
                    .iter()
                    .map(|(name, schema)| {
                        let value = match map.remove(name) {
                            Some(v) => schema.attr_type.normalize(v),
                            None => schema.attr_type.zero_value(),
                        };
                        (name.clone(), value)
                    })
                    .collect(),
            ),
            (_, v) => v,
        }
    }

    /// Compare two normalized values of this type. Sets match regardless of
    /// item order.
    pub fn equivalent(&self, a: &Value, b: &Value) -> bool {
        match (self, a, b) {
            (AttributeType::Custom { base, .. }, a, b) => base.equivalent(a, b),
            (AttributeType::List(inner), Value::List(xs), Value::List(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| inner.equivalent(x, y))
            }
            (AttributeType::Set(inner), Value::List(xs), Value::List(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|x| ys.iter().any(|y| inner.equivalent(x, y)))
                    && ys.iter().all(|y| xs.iter().any(|x| inner.equivalent(x, y)))
            }
            (AttributeType::Map(inner), Value::Map(xs), Value::Map(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .all(|(k, x)| ys.get(k).is_some_and(|y| inner.equivalent(x, y)))
            }
            (AttributeType::Block(attributes), Value::Map(xs), Value::Map(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|(k, x)| match (attributes.get(k), ys.get(k)) {
                        (Some(schema), Some(y)) => schema.attr_type.equivalent(x, y),
                        (None, Some(y)) => x == y,
                        (_, None) => false,
                    })
            }
            (_, a, b) => a == b,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(attributes) => {
                let mut names: Vec<&str> = attributes.keys().map(String::as_str).collect();
                names.sort_unstable();
                format!("Block{{{}}}", names.join(", "))
            }
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn check_block(
    attributes: &HashMap<String, AttributeSchema>,
    map: &HashMap<String, Value>,
    strict: bool,
) -> Result<(), TypeError> {
    let wrap = |name: &str, inner: TypeError| TypeError::BlockAttributeError {
        name: name.to_string(),
        inner: Box::new(inner),
    };

    for (name, value) in map {
        let schema = attributes.get(name).ok_or_else(|| {
            wrap(name.as_str(), TypeError::UnknownAttribute { name: name.clone() })
        })?;
        if strict {
            schema.check_constraints(value).map_err(|e| wrap(name.as_str(), e))?;
        }
        schema
            .attr_type
            .check(value, strict)
            .map_err(|e| wrap(name.as_str(), e))?;
    }

    if strict {
        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort_unstable();
        for name in names {
            if attributes[name].required && !map.contains_key(name) {
                return Err(wrap(name.as_str(), TypeError::MissingRequired { name: name.clone() }));
            }
        }
    }

    Ok(())
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' allows at most {max} item(s), got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    BlockAttributeError { name: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    /// Value may be filled in by the cloud side
    pub computed: bool,
    pub max_items: Option<usize>,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "imageId" in the Spotinst API)
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            max_items: None,
            default: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Computed attributes the user may not set themselves
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    /// Short flag summary, e.g. "optional, computed"
    pub fn flags(&self) -> String {
        let mut flags = Vec::new();
        if self.required {
            flags.push("required");
        }
        if self.optional {
            flags.push("optional");
        }
        if self.computed {
            flags.push("computed");
        }
        flags.join(", ")
    }

    fn check_constraints(&self, value: &Value) -> Result<(), TypeError> {
        if self.is_computed_only() {
            return Err(TypeError::ComputedAttribute {
                name: self.name.clone(),
            });
        }
        if let (Some(max), Value::List(items)) = (self.max_items, value)
            && items.len() > max
        {
            return Err(TypeError::TooManyItems {
                name: self.name.clone(),
                max,
                got: items.len(),
            });
        }
        Ok(())
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Attribute names in a stable order
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for name in self.attribute_names() {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired {
                    name: name.to_string(),
                });
            }
        }

        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort_unstable();

        // Type check each attribute
        for name in names {
            let value = &attributes[name];
            match self.attributes.get(name) {
                Some(schema) => {
                    if let Err(e) = schema.check_constraints(value) {
                        errors.push(e);
                    } else if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::BlockAttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimension_block() -> AttributeType {
        AttributeType::block(vec![
            AttributeSchema::new("name", AttributeType::String).required(),
            AttributeSchema::new("value", AttributeType::String).optional(),
        ])
    }

    fn map_of(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn float_accepts_int() {
        let t = AttributeType::Float;
        assert!(t.validate(&Value::Int(80)).is_ok());
        assert!(t.validate(&Value::Float(80.5)).is_ok());
        assert!(t.validate(&Value::String("80".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::Bool(true)).is_err());
        // unset values read back from the SDK
        assert!(t.check_type(&Value::Int(0)).is_ok());
        assert!(t.check_type(&Value::Int(-1)).is_err());
    }

    #[test]
    fn block_rejects_unknown_attribute() {
        let t = dimension_block();
        let value = map_of(&[("name", "a".into()), ("colour", "red".into())]);
        let err = t.validate(&value).unwrap_err();
        assert!(err.to_string().contains("Unknown attribute 'colour'"));
    }

    #[test]
    fn block_requires_nested_attributes_only_when_strict() {
        let t = dimension_block();
        let value = map_of(&[("value", "x".into())]);
        assert!(matches!(
            t.validate(&value),
            Err(TypeError::BlockAttributeError { .. })
        ));
        assert!(t.check_type(&value).is_ok());
    }

    #[test]
    fn list_item_errors_carry_index() {
        let t = AttributeType::List(Box::new(dimension_block()));
        let value = Value::List(vec![map_of(&[("name", "a".into())]), Value::Int(3)]);
        match t.validate(&value) {
            Err(TypeError::ListItemError { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn normalize_fills_block_zero_values() {
        let t = AttributeType::Set(Box::new(AttributeType::block(vec![
            AttributeSchema::new("threshold", AttributeType::Float),
            AttributeSchema::new("unit", AttributeType::String),
            AttributeSchema::new("dimensions", AttributeType::List(Box::new(dimension_block()))),
        ])));

        let normalized = t.normalize(Value::List(vec![map_of(&[("threshold", Value::Int(5))])]));
        let items = normalized.as_list().unwrap();
        let item = items[0].as_map().unwrap();
        assert_eq!(item.get("threshold"), Some(&Value::Float(5.0)));
        assert_eq!(item.get("unit"), Some(&Value::String(String::new())));
        assert_eq!(item.get("dimensions"), Some(&Value::List(vec![])));
    }

    #[test]
    fn sets_are_equivalent_in_any_order() {
        let t = AttributeType::Set(Box::new(AttributeType::block(vec![
            AttributeSchema::new("name", AttributeType::String),
            AttributeSchema::new("tags", AttributeType::Set(Box::new(AttributeType::String))),
        ])));
        let a = map_of(&[("name", "a".into()), ("tags", Value::List(vec!["x".into(), "y".into()]))]);
        let b = map_of(&[("name", "b".into()), ("tags", Value::List(vec![]))]);
        let a_reordered = map_of(&[("name", "a".into()), ("tags", Value::List(vec!["y".into(), "x".into()]))]);

        assert!(t.equivalent(
            &Value::List(vec![a.clone(), b.clone()]),
            &Value::List(vec![b.clone(), a_reordered])
        ));
        assert!(!t.equivalent(&Value::List(vec![a.clone(), b]), &Value::List(vec![a])));

        let list = AttributeType::List(Box::new(AttributeType::String));
        assert!(!list.equivalent(
            &Value::List(vec!["x".into(), "y".into()]),
            &Value::List(vec!["y".into(), "x".into()])
        ));
    }

    #[test]
    fn normalize_deduplicates_sets() {
        let t = AttributeType::Set(Box::new(AttributeType::String));
        let normalized = t.normalize(Value::List(vec!["a".into(), "b".into(), "a".into()]));
        assert_eq!(normalized, Value::List(vec!["a".into(), "b".into()]));

        let list = AttributeType::List(Box::new(AttributeType::String));
        let kept = list.normalize(Value::List(vec!["a".into(), "a".into()]));
        assert_eq!(kept.as_list().unwrap().len(), 2);
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()).optional())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).optional());

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::MissingRequired { .. }));
    }

    #[test]
    fn computed_only_attribute_cannot_be_set() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("statistic", AttributeType::String)
                    .optional()
                    .computed(),
            );

        let mut attrs = HashMap::new();
        attrs.insert("statistic".to_string(), Value::from("average"));
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("id".to_string(), Value::from("sig-1"));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ComputedAttribute { .. }));
    }

    #[test]
    fn max_items_is_enforced() {
        let schema = ResourceSchema::new("cluster").attribute(
            AttributeSchema::new("options", AttributeType::List(Box::new(AttributeType::String)))
                .optional()
                .with_max_items(1),
        );

        let mut attrs = HashMap::new();
        attrs.insert(
            "options".to_string(),
            Value::List(vec!["a".into(), "b".into()]),
        );
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(
            errors[0],
            TypeError::TooManyItems { max: 1, got: 2, .. }
        ));
    }

    #[test]
    fn unknown_top_level_attribute() {
        let schema = ResourceSchema::new("cluster");
        let mut attrs = HashMap::new();
        attrs.insert("mystery".to_string(), Value::Bool(true));
        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors[0].to_string(), "Unknown attribute 'mystery'");
    }

    #[test]
    fn flags_summary() {
        let attr = AttributeSchema::new("cooldown", AttributeType::Int)
            .optional()
            .computed();
        assert_eq!(attr.flags(), "optional, computed");
    }
}
