//! Provider - Traits exposing a provider's resource types
//!
//! A Provider groups the resource types of one cloud (Spotinst, ...).
//! Each resource type converts configuration into SDK request documents
//! and SDK response documents back into configuration.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::data::ResourceData;
use crate::field::GenericResource;
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_type: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref resource_type) = self.resource_type {
            write!(f, "[{}] {}", resource_type, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_type: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Definition of a resource type a Provider can map
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "elastigroup_azure")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Build the SDK create request from the configuration
    fn expand_create(&self, data: &ResourceData) -> ProviderResult<serde_json::Value>;

    /// Build the SDK update request from the configuration changes
    fn expand_update(&self, data: &ResourceData) -> ProviderResult<serde_json::Value>;

    /// Write an SDK response into the configuration
    fn flatten(&self, response: &serde_json::Value, data: &mut ResourceData)
    -> ProviderResult<()>;
}

impl<T> ResourceType for GenericResource<T>
where
    T: Default + Serialize + DeserializeOwned + Send + Sync,
{
    fn name(&self) -> &'static str {
        GenericResource::name(self)
    }

    fn schema(&self) -> ResourceSchema {
        GenericResource::schema(self)
    }

    fn expand_create(&self, data: &ResourceData) -> ProviderResult<serde_json::Value> {
        let mut object = T::default();
        self.on_create(&mut object, data).map_err(|e| {
            ProviderError::new("Failed to expand configuration")
                .for_resource(self.name())
                .with_cause(e)
        })?;
        to_document(self.name(), &object)
    }

    fn expand_update(&self, data: &ResourceData) -> ProviderResult<serde_json::Value> {
        let mut object = T::default();
        let has_changed = self.on_update(&mut object, data).map_err(|e| {
            ProviderError::new("Failed to expand configuration")
                .for_resource(self.name())
                .with_cause(e)
        })?;
        if !has_changed {
            log::info!("{}: no changes to update", self.name());
        }
        to_document(self.name(), &object)
    }

    fn flatten(
        &self,
        response: &serde_json::Value,
        data: &mut ResourceData,
    ) -> ProviderResult<()> {
        let object: T = serde_json::from_value(response.clone()).map_err(|e| {
            ProviderError::new("Failed to parse SDK response")
                .for_resource(self.name())
                .with_cause(e)
        })?;
        self.on_read(&object, data).map_err(|e| {
            ProviderError::new("Failed to flatten SDK response")
                .for_resource(self.name())
                .with_cause(e)
        })
    }
}

fn to_document<T: Serialize>(resource_type: &str, object: &T) -> ProviderResult<serde_json::Value> {
    serde_json::to_value(object).map_err(|e| {
        ProviderError::new("Failed to serialize SDK request")
            .for_resource(resource_type)
            .with_cause(e)
    })
}

/// Main Provider trait
///
/// Each cloud provider implements this trait to expose its resource types.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "spotinst")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Look up a resource type by name
    fn resource_type(&self, name: &str) -> Option<Box<dyn ResourceType>> {
        self.resource_types().into_iter().find(|t| t.name() == name)
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::field::{FieldName, FieldsMap, GenericField, set_field};
    use crate::resource::Value;
    use crate::schema::{AttributeSchema, AttributeType};

    const SIZE: FieldName = FieldName::new("size");

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Volume {
        #[serde(skip_serializing_if = "Option::is_none")]
        size_gb: Option<i64>,
    }

    fn volume_type() -> GenericResource<Volume> {
        let mut fields = FieldsMap::new();
        fields.insert(
            SIZE,
            GenericField::new(
                "volume",
                SIZE,
                AttributeSchema::new("size", AttributeType::Int).optional(),
            )
            .on_read(|volume: &Volume, data| {
                set_field(data, SIZE, Value::Int(volume.size_gb.unwrap_or_default()))
            })
            .on_create(|volume: &mut Volume, data| {
                volume.size_gb = data.get_ok(SIZE.as_str()).and_then(Value::as_int);
                Ok(())
            })
            .on_update(|volume: &mut Volume, data| {
                volume.size_gb = data.get(SIZE.as_str()).and_then(Value::as_int);
                Ok(())
            }),
        );
        GenericResource::new("volume", fields)
    }

    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![Box::new(volume_type())]
        }
    }

    #[test]
    fn provider_looks_up_resource_types() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        assert_eq!(provider.name(), "mock");
        assert!(provider.resource_type("volume").is_some());
        assert!(provider.resource_type("bucket").is_none());
    }

    #[test]
    fn expand_create_serializes_object() {
        let volume = volume_type();
        let mut attrs = HashMap::new();
        attrs.insert("size".to_string(), Value::Int(30));
        let data = ResourceData::new(ResourceType::schema(&volume)).with_config(attrs);

        let request = volume.expand_create(&data).unwrap();
        assert_eq!(request, json!({"sizeGb": 30}));
    }

    #[test]
    fn expand_update_without_changes_is_empty() {
        let volume = volume_type();
        let data = ResourceData::new(ResourceType::schema(&volume));
        assert_eq!(volume.expand_update(&data).unwrap(), json!({}));
    }

    #[test]
    fn flatten_reads_response() {
        let volume = volume_type();
        let mut data = ResourceData::new(ResourceType::schema(&volume));
        volume
            .flatten(&json!({"sizeGb": 12}), &mut data)
            .unwrap();
        assert_eq!(data.get("size"), Some(&Value::Int(12)));
    }

    #[test]
    fn flatten_rejects_malformed_response() {
        let volume = volume_type();
        let mut data = ResourceData::new(ResourceType::schema(&volume));
        let err = volume
            .flatten(&json!({"sizeGb": "big"}), &mut data)
            .unwrap_err();
        assert_eq!(err.to_string(), "[volume] Failed to parse SDK response");
        assert!(std::error::Error::source(&err).is_some());
    }
}
