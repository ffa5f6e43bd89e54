//! Field - Generic fields tying a schema to its expand and flatten handlers
//!
//! A field group registers one `GenericField` per configuration attribute.
//! A `GenericResource` runs the handlers of all registered fields against a
//! typed SDK object.

use std::collections::BTreeMap;
use std::fmt;

use crate::data::{DataError, ResourceData};
use crate::resource::Value;
use crate::schema::{AttributeSchema, ResourceSchema};

/// Name of a configuration attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldName(&'static str);

impl FieldName {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        self.0
    }
}

/// Errors raised by field handlers
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Writing a flattened value into the resource data failed
    #[error("failed to set field {field}: {source}")]
    Read {
        field: FieldName,
        #[source]
        source: DataError,
    },

    /// The configuration could not be turned into an SDK value
    #[error("failed to expand field {field}: {message}")]
    Expand { field: FieldName, message: String },
}

impl FieldError {
    pub fn expand(field: FieldName, message: impl Into<String>) -> Self {
        FieldError::Expand {
            field,
            message: message.into(),
        }
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Store a flattened value, reporting failures against the field
pub fn set_field(data: &mut ResourceData, field: FieldName, value: Value) -> FieldResult<()> {
    data.set(field.as_str(), value)
        .map_err(|source| FieldError::Read { field, source })
}

/// Flatten handler: SDK object -> resource data
pub type ReadHandler<T> = Box<dyn Fn(&T, &mut ResourceData) -> FieldResult<()> + Send + Sync>;

/// Expand handler: resource data -> SDK object
pub type WriteHandler<T> = Box<dyn Fn(&mut T, &ResourceData) -> FieldResult<()> + Send + Sync>;

/// A single configuration attribute with its mapping handlers
pub struct GenericField<T> {
    /// Field group this field belongs to
    pub affinity: &'static str,
    pub name: FieldName,
    pub schema: AttributeSchema,
    on_read: Option<ReadHandler<T>>,
    on_create: Option<WriteHandler<T>>,
    on_update: Option<WriteHandler<T>>,
}

impl<T> GenericField<T> {
    /// The schema's attribute name is forced to the field name
    pub fn new(affinity: &'static str, name: FieldName, mut schema: AttributeSchema) -> Self {
        schema.name = name.as_str().to_string();
        Self {
            affinity,
            name,
            schema,
            on_read: None,
            on_create: None,
            on_update: None,
        }
    }

    pub fn on_read(
        mut self,
        handler: impl Fn(&T, &mut ResourceData) -> FieldResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_read = Some(Box::new(handler));
        self
    }

    pub fn on_create(
        mut self,
        handler: impl Fn(&mut T, &ResourceData) -> FieldResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_create = Some(Box::new(handler));
        self
    }

    pub fn on_update(
        mut self,
        handler: impl Fn(&mut T, &ResourceData) -> FieldResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(handler));
        self
    }

    /// Flatten this field from the SDK object
    pub fn read(&self, object: &T, data: &mut ResourceData) -> FieldResult<()> {
        match &self.on_read {
            Some(handler) => {
                log::debug!("{}: reading {}", self.affinity, self.name);
                handler(object, data)
            }
            None => Ok(()),
        }
    }

    /// Expand this field into the SDK object for a create request
    pub fn create(&self, object: &mut T, data: &ResourceData) -> FieldResult<()> {
        match &self.on_create {
            Some(handler) => {
                log::debug!("{}: expanding {} for create", self.affinity, self.name);
                handler(object, data)
            }
            None => Ok(()),
        }
    }

    /// Expand this field into the SDK object for an update request
    pub fn update(&self, object: &mut T, data: &ResourceData) -> FieldResult<()> {
        match &self.on_update {
            Some(handler) => {
                log::debug!("{}: expanding {} for update", self.affinity, self.name);
                handler(object, data)
            }
            None => Ok(()),
        }
    }
}

impl<T> fmt::Debug for GenericField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericField")
            .field("affinity", &self.affinity)
            .field("name", &self.name)
            .field("on_read", &self.on_read.is_some())
            .field("on_create", &self.on_create.is_some())
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}

/// Registered fields of one resource, keyed by name
pub type FieldsMap<T> = BTreeMap<FieldName, GenericField<T>>;

/// A resource made of generic fields over the SDK object `T`
pub struct GenericResource<T> {
    name: &'static str,
    fields: FieldsMap<T>,
}

impl<T> GenericResource<T> {
    pub fn new(name: &'static str, fields: FieldsMap<T>) -> Self {
        Self { name, fields }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &FieldsMap<T> {
        &self.fields
    }

    /// Resource schema assembled from the schema of every field
    pub fn schema(&self) -> ResourceSchema {
        self.fields
            .values()
            .fold(ResourceSchema::new(self.name), |schema, field| {
                schema.attribute(field.schema.clone())
            })
    }

    /// Flatten every field
    pub fn on_read(&self, object: &T, data: &mut ResourceData) -> FieldResult<()> {
        for field in self.fields.values() {
            field.read(object, data)?;
        }
        Ok(())
    }

    /// Expand every field for a create request
    pub fn on_create(&self, object: &mut T, data: &ResourceData) -> FieldResult<()> {
        for field in self.fields.values() {
            field.create(object, data)?;
        }
        Ok(())
    }

    /// Expand the fields whose configuration changed. Returns whether any did.
    pub fn on_update(&self, object: &mut T, data: &ResourceData) -> FieldResult<bool> {
        let mut has_changed = false;
        for field in self.fields.values() {
            if data.has_change(field.name.as_str()) {
                field.update(object, data)?;
                has_changed = true;
            }
        }
        log::debug!("{}: update has changes = {}", self.name, has_changed);
        Ok(has_changed)
    }
}
