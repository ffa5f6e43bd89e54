//! Field groups
//!
//! Each group owns the field-name constants, schemas and expand/flatten
//! handlers of one configuration section, and registers them through its
//! `setup` function.

pub mod elastigroup_azure_scaling_policies;
pub mod ocean_aws_launch_configuration;
