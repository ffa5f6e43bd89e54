//! Spotform Spotinst Provider
//!
//! Schemas and expand/flatten mappings between configuration documents and
//! the Spotinst API objects.
//!
//! ## Module Structure
//!
//! - `fields` - Field groups (field names, schemas and handlers)
//! - `resources` - Resource type definitions
//! - `sdk` - Spotinst API objects
//! - `utils` - Helper functions for value extraction and conversion

pub mod fields;
pub mod resources;
pub mod sdk;
pub mod utils;

pub use resources::resource_types;
pub use sdk::{ElastigroupAzureWrapper, OceanAwsWrapper};

use spotform_core::provider::{Provider, ResourceType};

/// Spotinst provider
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotinstProvider;

impl SpotinstProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Provider for SpotinstProvider {
    fn name(&self) -> &'static str {
        "spotinst"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }
}
