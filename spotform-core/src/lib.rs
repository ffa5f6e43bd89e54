//! Spotform Core
//!
//! Schema definitions and bidirectional mapping between configuration
//! documents and typed cloud SDK objects.
//!
//! - `resource` - configuration values
//! - `schema` - attribute and resource schemas
//! - `data` - per-resource configuration container handed to field handlers
//! - `field` - generic fields grouping a schema with its expand/flatten handlers
//! - `provider` - provider and resource type traits

pub mod data;
pub mod field;
pub mod provider;
pub mod resource;
pub mod schema;
