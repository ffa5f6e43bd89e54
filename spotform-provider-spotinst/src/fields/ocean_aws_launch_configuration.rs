//! Launch configuration of an Ocean (AWS) cluster
//!
//! Every field maps onto `cluster.compute.launchSpecification`.

use spotform_core::data::ResourceData;
use spotform_core::field::{FieldName, FieldsMap, GenericField, set_field};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, types};

use crate::sdk::{Nullable, OceanAwsWrapper, value_of};
use crate::sdk::aws::{
    IamInstanceProfile, InstanceMetadataOptions, LaunchSpecification, LoadBalancer,
};
use crate::utils::{
    block, decode_user_data, encode_user_data, is_instance_profile_arn, positive_int_attr,
    string_attr, string_or_empty,
};

pub const AFFINITY: &str = "ocean_aws_launch_configuration";

pub const IMAGE_ID: FieldName = FieldName::new("image_id");
pub const IAM_INSTANCE_PROFILE: FieldName = FieldName::new("iam_instance_profile");
pub const KEY_NAME: FieldName = FieldName::new("key_name");
pub const USER_DATA: FieldName = FieldName::new("user_data");
pub const SECURITY_GROUPS: FieldName = FieldName::new("security_groups");
pub const ASSOCIATE_PUBLIC_IP_ADDRESS: FieldName = FieldName::new("associate_public_ip_address");
pub const LOAD_BALANCERS: FieldName = FieldName::new("load_balancers");
pub const ARN: FieldName = FieldName::new("arn");
pub const NAME: FieldName = FieldName::new("name");
pub const TYPE: FieldName = FieldName::new("type");
pub const ROOT_VOLUME_SIZE: FieldName = FieldName::new("root_volume_size");
pub const MONITORING: FieldName = FieldName::new("monitoring");
pub const EBS_OPTIMIZED: FieldName = FieldName::new("ebs_optimized");
pub const USE_AS_TEMPLATE_ONLY: FieldName = FieldName::new("use_as_template_only");

pub const INSTANCE_METADATA_OPTIONS: FieldName = FieldName::new("instance_metadata_options");
pub const HTTP_TOKENS: FieldName = FieldName::new("http_tokens");
pub const HTTP_PUT_RESPONSE_HOP_LIMIT: FieldName = FieldName::new("http_put_response_hop_limit");

type Field = GenericField<OceanAwsWrapper>;

/// Register the launch configuration fields
pub fn setup(fields: &mut FieldsMap<OceanAwsWrapper>) {
    let all = [
        string_field(
            IMAGE_ID,
            "imageId",
            |spec| value_of(&spec.image_id),
            |spec| &mut spec.image_id,
        ),
        string_field(
            KEY_NAME,
            "keyPair",
            |spec| value_of(&spec.key_pair),
            |spec| &mut spec.key_pair,
        ),
        iam_instance_profile(),
        user_data(),
        security_groups(),
        load_balancers(),
        root_volume_size(),
        bool_field(
            AttributeSchema::new(ASSOCIATE_PUBLIC_IP_ADDRESS.as_str(), AttributeType::Bool)
                .optional()
                .with_provider_name("associatePublicIpAddress"),
            ASSOCIATE_PUBLIC_IP_ADDRESS,
            |spec| spec.associate_public_ip_address,
            |spec, value| spec.associate_public_ip_address = value,
        ),
        bool_field(
            AttributeSchema::new(MONITORING.as_str(), AttributeType::Bool)
                .optional()
                .with_provider_name("monitoring"),
            MONITORING,
            |spec| spec.monitoring,
            |spec, value| spec.monitoring = value,
        ),
        bool_field(
            AttributeSchema::new(EBS_OPTIMIZED.as_str(), AttributeType::Bool)
                .optional()
                .computed()
                .with_provider_name("ebsOptimized"),
            EBS_OPTIMIZED,
            |spec| spec.ebs_optimized,
            |spec, value| spec.ebs_optimized = value,
        ),
        bool_field(
            AttributeSchema::new(USE_AS_TEMPLATE_ONLY.as_str(), AttributeType::Bool)
                .optional()
                .with_provider_name("useAsTemplateOnly"),
            USE_AS_TEMPLATE_ONLY,
            |spec| spec.use_as_template_only,
            |spec, value| spec.use_as_template_only = value,
        ),
        instance_metadata_options(),
    ];

    for field in all {
        fields.insert(field.name, field);
    }
}

/// Configured, non-empty string value of a field
fn string_value(data: &ResourceData, field: FieldName) -> Option<String> {
    data.get_ok(field.as_str())
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Configured, non-empty list of blocks of a field
fn block_list(data: &ResourceData, field: FieldName) -> Option<&[Value]> {
    data.get_ok(field.as_str()).and_then(Value::as_list)
}

fn string_field(
    field: FieldName,
    provider_name: &'static str,
    get: fn(&LaunchSpecification) -> Option<&String>,
    member: fn(&mut LaunchSpecification) -> &mut Nullable<String>,
) -> Field {
    let schema = AttributeSchema::new(field.as_str(), AttributeType::String)
        .optional()
        .with_provider_name(provider_name);

    Field::new(AFFINITY, field, schema)
        .on_read(move |wrapper, data| {
            let value = string_or_empty(wrapper.launch_specification().and_then(get));
            set_field(data, field, value)
        })
        .on_create(move |wrapper, data| {
            if let Some(value) = string_value(data, field) {
                *member(wrapper.launch_specification_mut()) = Some(Some(value));
            }
            Ok(())
        })
        .on_update(move |wrapper, data| {
            *member(wrapper.launch_specification_mut()) = Some(string_value(data, field));
            Ok(())
        })
}

fn bool_field(
    schema: AttributeSchema,
    field: FieldName,
    get: fn(&LaunchSpecification) -> Option<bool>,
    set: fn(&mut LaunchSpecification, Option<bool>),
) -> Field {
    Field::new(AFFINITY, field, schema)
        .on_read(move |wrapper, data| {
            let value = wrapper.launch_specification().and_then(get).unwrap_or_default();
            set_field(data, field, Value::Bool(value))
        })
        .on_create(move |wrapper, data| {
            if data.get_ok(field.as_str()).is_some() {
                set(wrapper.launch_specification_mut(), Some(true));
            }
            Ok(())
        })
        .on_update(move |wrapper, data| {
            // false is sent explicitly
            let value = data
                .get(field.as_str())
                .and_then(Value::as_bool)
                .unwrap_or_default();
            set(wrapper.launch_specification_mut(), Some(value));
            Ok(())
        })
}

fn expand_instance_profile(value: String) -> IamInstanceProfile {
    if is_instance_profile_arn(&value) {
        IamInstanceProfile {
            arn: Some(value),
            name: None,
        }
    } else {
        IamInstanceProfile {
            arn: None,
            name: Some(value),
        }
    }
}

fn iam_instance_profile() -> Field {
    let schema = AttributeSchema::new(IAM_INSTANCE_PROFILE.as_str(), AttributeType::String)
        .optional()
        .with_provider_name("iamInstanceProfile")
        .with_description("Instance profile ARN or name");

    Field::new(AFFINITY, IAM_INSTANCE_PROFILE, schema)
        .on_read(|wrapper, data| {
            let profile = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.iam_instance_profile));
            let value = profile
                .and_then(|p| p.arn.as_ref().or(p.name.as_ref()))
                .cloned()
                .unwrap_or_default();
            set_field(data, IAM_INSTANCE_PROFILE, Value::String(value))
        })
        .on_create(|wrapper, data| {
            if let Some(value) = string_value(data, IAM_INSTANCE_PROFILE) {
                wrapper.launch_specification_mut().iam_instance_profile =
                    Some(Some(expand_instance_profile(value)));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().iam_instance_profile =
                Some(string_value(data, IAM_INSTANCE_PROFILE).map(expand_instance_profile));
            Ok(())
        })
}

fn user_data() -> Field {
    let schema = AttributeSchema::new(USER_DATA.as_str(), AttributeType::String)
        .optional()
        .with_provider_name("userData");

    Field::new(AFFINITY, USER_DATA, schema)
        .on_read(|wrapper, data| {
            let value = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.user_data))
                .map(|encoded| decode_user_data(encoded))
                .unwrap_or_default();
            set_field(data, USER_DATA, Value::String(value))
        })
        .on_create(|wrapper, data| {
            if let Some(value) = string_value(data, USER_DATA) {
                wrapper.launch_specification_mut().user_data = Some(Some(encode_user_data(&value)));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().user_data =
                Some(string_value(data, USER_DATA).map(|value| encode_user_data(&value)));
            Ok(())
        })
}

fn expand_security_groups(data: &ResourceData) -> Option<Vec<String>> {
    block_list(data, SECURITY_GROUPS).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn security_groups() -> Field {
    let schema = AttributeSchema::new(SECURITY_GROUPS.as_str(), types::string_list())
        .required()
        .with_provider_name("securityGroupIds");

    Field::new(AFFINITY, SECURITY_GROUPS, schema)
        .on_read(|wrapper, data| {
            let groups = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.security_group_ids))
                .map(|ids| ids.iter().map(|id| Value::from(id.as_str())).collect())
                .unwrap_or_default();
            set_field(data, SECURITY_GROUPS, Value::List(groups))
        })
        .on_create(|wrapper, data| {
            if let Some(groups) = expand_security_groups(data) {
                wrapper.launch_specification_mut().security_group_ids = Some(Some(groups));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().security_group_ids =
                Some(expand_security_groups(data));
            Ok(())
        })
}

fn expand_load_balancers(data: &ResourceData) -> Option<Vec<LoadBalancer>> {
    block_list(data, LOAD_BALANCERS).map(|items| {
        items
            .iter()
            .filter_map(Value::as_map)
            .map(|attrs| LoadBalancer {
                arn: string_attr(attrs, ARN.as_str()),
                name: string_attr(attrs, NAME.as_str()),
                lb_type: string_attr(attrs, TYPE.as_str()),
            })
            .collect()
    })
}

fn flatten_load_balancers(load_balancers: &[LoadBalancer]) -> Vec<Value> {
    load_balancers
        .iter()
        .map(|lb| {
            block([
                (ARN.as_str(), string_or_empty(lb.arn.as_ref())),
                (NAME.as_str(), string_or_empty(lb.name.as_ref())),
                (TYPE.as_str(), string_or_empty(lb.lb_type.as_ref())),
            ])
        })
        .collect()
}

fn load_balancers() -> Field {
    let schema = AttributeSchema::new(
        LOAD_BALANCERS.as_str(),
        AttributeType::List(Box::new(AttributeType::block(vec![
            AttributeSchema::new(ARN.as_str(), AttributeType::String).optional(),
            AttributeSchema::new(NAME.as_str(), AttributeType::String).optional(),
            AttributeSchema::new(TYPE.as_str(), AttributeType::String).optional(),
        ]))),
    )
    .optional()
    .with_provider_name("loadBalancers");

    Field::new(AFFINITY, LOAD_BALANCERS, schema)
        .on_read(|wrapper, data| {
            let value = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.load_balancers))
                .map(|lbs| flatten_load_balancers(lbs))
                .unwrap_or_default();
            set_field(data, LOAD_BALANCERS, Value::List(value))
        })
        .on_create(|wrapper, data| {
            if let Some(lbs) = expand_load_balancers(data) {
                wrapper.launch_specification_mut().load_balancers = Some(Some(lbs));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().load_balancers = Some(expand_load_balancers(data));
            Ok(())
        })
}

fn root_volume_size() -> Field {
    let schema = AttributeSchema::new(ROOT_VOLUME_SIZE.as_str(), types::positive_int())
        .optional()
        .with_provider_name("rootVolumeSize");

    Field::new(AFFINITY, ROOT_VOLUME_SIZE, schema)
        .on_read(|wrapper, data| {
            let value = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.root_volume_size))
                .copied()
                .unwrap_or_default();
            set_field(data, ROOT_VOLUME_SIZE, Value::Int(value))
        })
        .on_create(|wrapper, data| {
            if let Some(size) = data.get_ok(ROOT_VOLUME_SIZE.as_str()).and_then(Value::as_int) {
                wrapper.launch_specification_mut().root_volume_size = Some(Some(size));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().root_volume_size =
                Some(data.get_ok(ROOT_VOLUME_SIZE.as_str()).and_then(Value::as_int));
            Ok(())
        })
}

fn expand_instance_metadata_options(data: &ResourceData) -> Option<InstanceMetadataOptions> {
    let attrs = block_list(data, INSTANCE_METADATA_OPTIONS)?
        .first()?
        .as_map()?;
    Some(InstanceMetadataOptions {
        http_tokens: string_attr(attrs, HTTP_TOKENS.as_str()),
        http_put_response_hop_limit: positive_int_attr(attrs, HTTP_PUT_RESPONSE_HOP_LIMIT.as_str()),
    })
}

fn instance_metadata_options() -> Field {
    let schema = AttributeSchema::new(
        INSTANCE_METADATA_OPTIONS.as_str(),
        AttributeType::List(Box::new(AttributeType::block(vec![
            AttributeSchema::new(HTTP_TOKENS.as_str(), AttributeType::String).required(),
            AttributeSchema::new(HTTP_PUT_RESPONSE_HOP_LIMIT.as_str(), AttributeType::Int)
                .optional(),
        ]))),
    )
    .optional()
    .with_max_items(1)
    .with_provider_name("instanceMetadataOptions");

    Field::new(AFFINITY, INSTANCE_METADATA_OPTIONS, schema)
        .on_read(|wrapper, data| {
            let value = wrapper
                .launch_specification()
                .and_then(|spec| value_of(&spec.instance_metadata_options))
                .map(|opts| {
                    vec![block([
                        (HTTP_TOKENS.as_str(), string_or_empty(opts.http_tokens.as_ref())),
                        (
                            HTTP_PUT_RESPONSE_HOP_LIMIT.as_str(),
                            Value::Int(opts.http_put_response_hop_limit.unwrap_or_default()),
                        ),
                    ])]
                })
                .unwrap_or_default();
            set_field(data, INSTANCE_METADATA_OPTIONS, Value::List(value))
        })
        .on_create(|wrapper, data| {
            if let Some(opts) = expand_instance_metadata_options(data) {
                wrapper.launch_specification_mut().instance_metadata_options = Some(Some(opts));
            }
            Ok(())
        })
        .on_update(|wrapper, data| {
            wrapper.launch_specification_mut().instance_metadata_options =
                Some(expand_instance_metadata_options(data));
            Ok(())
        })
}
