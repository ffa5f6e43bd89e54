//! ResourceData - The configuration map one resource presents to field handlers
//!
//! Expand handlers read the desired configuration through `get`/`get_ok`;
//! flatten handlers write what the SDK returned through `set`.

use std::collections::HashMap;

use crate::resource::Value;
use crate::schema::{ResourceSchema, TypeError};

/// Errors raised when storing a value
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataError {
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("Invalid value for '{name}': {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: TypeError,
    },
}

/// Configuration and prior state of a single resource
#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: ResourceSchema,
    id: Option<String>,
    attributes: HashMap<String, Value>,
    prior: HashMap<String, Value>,
}

impl ResourceData {
    pub fn new(schema: ResourceSchema) -> Self {
        Self {
            schema,
            id: None,
            attributes: HashMap::new(),
            prior: HashMap::new(),
        }
    }

    /// Desired configuration. Attributes unknown to the schema are kept out.
    pub fn with_config(mut self, attributes: HashMap<String, Value>) -> Self {
        self.attributes = self.normalize_all(attributes);
        self
    }

    /// Prior state, compared against the configuration by `has_change`
    pub fn with_state(mut self, attributes: HashMap<String, Value>) -> Self {
        self.prior = self.normalize_all(attributes);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// The stored value, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The stored value, unless it is missing or a zero value
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_zero())
    }

    /// Store a value after checking it against the attribute schema
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), DataError> {
        let schema = self
            .schema
            .attributes
            .get(key)
            .ok_or_else(|| DataError::UnknownAttribute(key.to_string()))?;

        schema
            .attr_type
            .check_type(&value)
            .map_err(|source| DataError::InvalidValue {
                name: key.to_string(),
                source,
            })?;

        let value = schema.attr_type.normalize(value);
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Whether the configured value differs from the prior state.
    /// A missing value is the same as the attribute's zero value, and set
    /// items are compared regardless of order.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(schema) = self.schema.attributes.get(key) else {
            return false;
        };
        let zero = schema.attr_type.zero_value();
        let current = self.attributes.get(key).unwrap_or(&zero);
        let prior = self.prior.get(key).unwrap_or(&zero);
        !schema.attr_type.equivalent(current, prior)
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// JSON object of all stored attributes
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    fn normalize_all(&self, attributes: HashMap<String, Value>) -> HashMap<String, Value> {
        attributes
            .into_iter()
            .filter_map(|(name, value)| match self.schema.attributes.get(&name) {
                Some(schema) => Some((name, schema.attr_type.normalize(value))),
                None => {
                    log::warn!(
                        "Ignoring attribute '{}' not declared by {}",
                        name,
                        self.schema.resource_type
                    );
                    None
                }
            })
            .collect()
    }
}
