//! Resource type definitions
//!
//! Every resource type is a `GenericResource` over its SDK wrapper, with the
//! fields registered by its field groups.

use spotform_core::field::{FieldsMap, GenericResource};
use spotform_core::provider::ResourceType;

use crate::fields::{elastigroup_azure_scaling_policies, ocean_aws_launch_configuration};
use crate::sdk::{ElastigroupAzureWrapper, OceanAwsWrapper};

pub const ELASTIGROUP_AZURE: &str = "elastigroup_azure";
pub const OCEAN_AWS: &str = "ocean_aws";

/// Azure Elastigroup
pub fn elastigroup_azure() -> GenericResource<ElastigroupAzureWrapper> {
    let mut fields = FieldsMap::new();
    elastigroup_azure_scaling_policies::setup(&mut fields);
    GenericResource::new(ELASTIGROUP_AZURE, fields)
}

/// Ocean cluster on AWS
pub fn ocean_aws() -> GenericResource<OceanAwsWrapper> {
    let mut fields = FieldsMap::new();
    ocean_aws_launch_configuration::setup(&mut fields);
    GenericResource::new(OCEAN_AWS, fields)
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(elastigroup_azure()), Box::new(ocean_aws())]
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spotform_core::data::ResourceData;
    use spotform_core::resource::attributes_from_json;

    use super::*;

    #[test]
    fn resource_type_names() {
        let names: Vec<_> = resource_types().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["elastigroup_azure", "ocean_aws"]);
    }

    #[test]
    fn expand_create_wraps_group() {
        let resource = elastigroup_azure();
        let config = attributes_from_json(&json!({
            "scaling_down_policy": [{
                "policy_name": "down",
                "metric_name": "CPUUtilization",
                "namespace": "Microsoft.Compute",
                "threshold": 20,
                "action_type": "adjustment",
                "adjustment": "1"
            }]
        }))
        .unwrap();
        let data = ResourceData::new(ResourceType::schema(&resource)).with_config(config);

        let request = resource.expand_create(&data).unwrap();
        assert_eq!(
            request,
            json!({"group": {"scaling": {"down": [{
                "policyName": "down",
                "metricName": "CPUUtilization",
                "namespace": "Microsoft.Compute",
                "threshold": 20.0,
                "action": {"type": "adjustment", "adjustment": "1"}
            }]}}})
        );
    }

    #[test]
    fn expand_update_without_changes_is_empty() {
        let resource = ocean_aws();
        let config = attributes_from_json(&json!({"security_groups": ["sg-1"]})).unwrap();
        let data = ResourceData::new(ResourceType::schema(&resource))
            .with_config(config.clone())
            .with_state(config);

        let request = resource.expand_update(&data).unwrap();
        assert_eq!(request, json!({"cluster": {}}));
    }

    #[test]
    fn flatten_reports_field_errors() {
        let resource = ocean_aws();
        let mut data = ResourceData::new(ResourceType::schema(&resource));
        let err = resource
            .flatten(&json!({"cluster": {"compute": "nope"}}), &mut data)
            .unwrap_err();
        assert_eq!(err.to_string(), "[ocean_aws] Failed to parse SDK response");
    }
}
