//! Scaling policies of an Azure Elastigroup
//!
//! `scaling_up_policy` and `scaling_down_policy` share one schema and differ
//! only in which list of `group.scaling` they map to.

use std::collections::HashMap;

use spotform_core::field::{FieldError, FieldName, FieldResult, FieldsMap, GenericField, set_field};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType};

use crate::sdk::ElastigroupAzureWrapper;
use crate::sdk::azure::{Action, Dimension, Scaling, ScalingPolicy};
use crate::utils::{
    block, positive_float_attr, positive_int_attr, string_attr, string_or_empty,
};

pub const AFFINITY: &str = "elastigroup_azure_scaling_policies";

pub const SCALING_UP_POLICY: FieldName = FieldName::new("scaling_up_policy");
pub const SCALING_DOWN_POLICY: FieldName = FieldName::new("scaling_down_policy");

pub const POLICY_NAME: FieldName = FieldName::new("policy_name");
pub const METRIC_NAME: FieldName = FieldName::new("metric_name");
pub const NAMESPACE: FieldName = FieldName::new("namespace");
pub const STATISTIC: FieldName = FieldName::new("statistic");
pub const UNIT: FieldName = FieldName::new("unit");
pub const THRESHOLD: FieldName = FieldName::new("threshold");
pub const ADJUSTMENT: FieldName = FieldName::new("adjustment");
pub const MIN_TARGET_CAPACITY: FieldName = FieldName::new("min_target_capacity");
pub const MAX_TARGET_CAPACITY: FieldName = FieldName::new("max_target_capacity");
pub const OPERATOR: FieldName = FieldName::new("operator");
pub const EVALUATION_PERIODS: FieldName = FieldName::new("evaluation_periods");
pub const PERIOD: FieldName = FieldName::new("period");
pub const COOLDOWN: FieldName = FieldName::new("cooldown");
pub const DIMENSIONS: FieldName = FieldName::new("dimensions");
pub const DIMENSION_NAME: FieldName = FieldName::new("name");
pub const DIMENSION_VALUE: FieldName = FieldName::new("value");
pub const MINIMUM: FieldName = FieldName::new("minimum");
pub const MAXIMUM: FieldName = FieldName::new("maximum");
pub const TARGET: FieldName = FieldName::new("target");
pub const ACTION_TYPE: FieldName = FieldName::new("action_type");

type Field = GenericField<ElastigroupAzureWrapper>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalingDirection {
    Up,
    Down,
}

impl ScalingDirection {
    fn field(self) -> FieldName {
        match self {
            ScalingDirection::Up => SCALING_UP_POLICY,
            ScalingDirection::Down => SCALING_DOWN_POLICY,
        }
    }

    /// Location of the policies in the group document
    fn api_path(self) -> &'static str {
        match self {
            ScalingDirection::Up => "scaling.up",
            ScalingDirection::Down => "scaling.down",
        }
    }

    fn policies(self, scaling: &Scaling) -> Option<&Vec<ScalingPolicy>> {
        match self {
            ScalingDirection::Up => scaling.up.as_ref(),
            ScalingDirection::Down => scaling.down.as_ref(),
        }
    }

    fn set_policies(self, scaling: &mut Scaling, policies: Vec<ScalingPolicy>) {
        match self {
            ScalingDirection::Up => scaling.up = Some(policies),
            ScalingDirection::Down => scaling.down = Some(policies),
        }
    }
}

/// Register the scaling policy fields
pub fn setup(fields: &mut FieldsMap<ElastigroupAzureWrapper>) {
    for direction in [ScalingDirection::Up, ScalingDirection::Down] {
        fields.insert(direction.field(), scaling_policy_field(direction));
    }
}

fn scaling_policy_field(direction: ScalingDirection) -> Field {
    let field = direction.field();

    let schema = up_down_scaling_policy_schema(field).with_provider_name(direction.api_path());

    Field::new(AFFINITY, field, schema)
        .on_read(move |wrapper, data| {
            let policies = wrapper
                .group()
                .scaling
                .as_ref()
                .and_then(|scaling| direction.policies(scaling))
                .map(|policies| flatten_scaling_policies(policies))
                .unwrap_or_default();
            set_field(data, field, Value::List(policies))
        })
        .on_create(move |wrapper, data| {
            if let Some(value) = data.get_ok(field.as_str()) {
                let policies = expand_scaling_policies(field, value)?;
                direction.set_policies(wrapper.scaling_mut(), policies);
            }
            Ok(())
        })
        .on_update(move |wrapper, data| {
            // An unconfigured field clears the policies
            let policies = match data.get_ok(field.as_str()) {
                Some(value) => expand_scaling_policies(field, value)?,
                None => Vec::new(),
            };
            direction.set_policies(wrapper.scaling_mut(), policies);
            Ok(())
        })
}

fn base_scaling_policy_attributes() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new(POLICY_NAME.as_str(), AttributeType::String).required(),
        AttributeSchema::new(METRIC_NAME.as_str(), AttributeType::String).required(),
        AttributeSchema::new(NAMESPACE.as_str(), AttributeType::String).required(),
        AttributeSchema::new(STATISTIC.as_str(), AttributeType::String)
            .optional()
            .computed(),
        AttributeSchema::new(UNIT.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(COOLDOWN.as_str(), AttributeType::Int)
            .optional()
            .computed(),
        AttributeSchema::new(
            DIMENSIONS.as_str(),
            AttributeType::List(Box::new(AttributeType::block(vec![
                AttributeSchema::new(DIMENSION_NAME.as_str(), AttributeType::String).required(),
                AttributeSchema::new(DIMENSION_VALUE.as_str(), AttributeType::String).optional(),
            ]))),
        )
        .optional(),
    ]
}

fn up_down_scaling_policy_schema(field: FieldName) -> AttributeSchema {
    let mut attributes = base_scaling_policy_attributes();
    attributes.extend([
        AttributeSchema::new(THRESHOLD.as_str(), AttributeType::Float).required(),
        AttributeSchema::new(ADJUSTMENT.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(MIN_TARGET_CAPACITY.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(MAX_TARGET_CAPACITY.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(OPERATOR.as_str(), AttributeType::String)
            .optional()
            .computed(),
        AttributeSchema::new(EVALUATION_PERIODS.as_str(), AttributeType::Int)
            .optional()
            .computed(),
        AttributeSchema::new(PERIOD.as_str(), AttributeType::Int)
            .optional()
            .computed(),
        AttributeSchema::new(MINIMUM.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(MAXIMUM.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(TARGET.as_str(), AttributeType::String).optional(),
        AttributeSchema::new(ACTION_TYPE.as_str(), AttributeType::String).optional(),
    ]);

    AttributeSchema::new(
        field.as_str(),
        AttributeType::Set(Box::new(AttributeType::block(attributes))),
    )
    .optional()
}

fn expand_scaling_policies(field: FieldName, value: &Value) -> FieldResult<Vec<ScalingPolicy>> {
    let items = value.as_list().ok_or_else(|| {
        FieldError::expand(
            field,
            format!("expected a set of policies, got {}", value.type_name()),
        )
    })?;

    let mut policies = Vec::with_capacity(items.len());
    for item in items {
        let Some(attrs) = item.as_map() else {
            log::warn!("{}: skipping policy that is not a block", field);
            continue;
        };

        let policy = expand_scaling_policy(attrs);
        if policy.namespace.is_some() {
            policies.push(policy);
        } else {
            log::debug!("{}: dropping policy without namespace", field);
        }
    }
    Ok(policies)
}

fn expand_scaling_policy(attrs: &HashMap<String, Value>) -> ScalingPolicy {
    let mut policy = ScalingPolicy {
        policy_name: string_attr(attrs, POLICY_NAME.as_str()),
        metric_name: string_attr(attrs, METRIC_NAME.as_str()),
        namespace: string_attr(attrs, NAMESPACE.as_str()),
        statistic: string_attr(attrs, STATISTIC.as_str()),
        unit: string_attr(attrs, UNIT.as_str()),
        threshold: positive_float_attr(attrs, THRESHOLD.as_str()),
        operator: string_attr(attrs, OPERATOR.as_str()),
        period: positive_int_attr(attrs, PERIOD.as_str()),
        evaluation_periods: positive_int_attr(attrs, EVALUATION_PERIODS.as_str()),
        cooldown: positive_int_attr(attrs, COOLDOWN.as_str()),
        ..Default::default()
    };

    if let Some(value) = attrs.get(DIMENSIONS.as_str()) {
        let dimensions = expand_dimensions(value);
        if !dimensions.is_empty() {
            policy.dimensions = Some(dimensions);
        }
    }

    // Adjustments travel only on a typed action
    if let Some(action_type) = string_attr(attrs, ACTION_TYPE.as_str()) {
        policy.action = Some(Action {
            action_type: Some(action_type),
            adjustment: string_attr(attrs, ADJUSTMENT.as_str()),
            min_target_capacity: string_attr(attrs, MIN_TARGET_CAPACITY.as_str()),
            max_target_capacity: string_attr(attrs, MAX_TARGET_CAPACITY.as_str()),
            minimum: string_attr(attrs, MINIMUM.as_str()),
            maximum: string_attr(attrs, MAXIMUM.as_str()),
            target: string_attr(attrs, TARGET.as_str()),
        });
    }

    policy
}

/// Dimensions need both a name and a value; anything else is skipped
fn expand_dimensions(value: &Value) -> Vec<Dimension> {
    let Some(items) = value.as_list() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_map)
        .filter_map(|attrs| {
            let name = attrs.get(DIMENSION_NAME.as_str())?.as_str()?;
            let value = attrs.get(DIMENSION_VALUE.as_str())?.as_str()?;
            Some(Dimension {
                name: Some(name.to_string()),
                value: Some(value.to_string()),
            })
        })
        .collect()
}

fn flatten_scaling_policies(policies: &[ScalingPolicy]) -> Vec<Value> {
    policies.iter().map(flatten_scaling_policy).collect()
}

fn flatten_scaling_policy(policy: &ScalingPolicy) -> Value {
    let mut entries = vec![
        (POLICY_NAME.as_str(), string_or_empty(policy.policy_name.as_ref())),
        (METRIC_NAME.as_str(), string_or_empty(policy.metric_name.as_ref())),
        (NAMESPACE.as_str(), string_or_empty(policy.namespace.as_ref())),
        (STATISTIC.as_str(), string_or_empty(policy.statistic.as_ref())),
        (UNIT.as_str(), string_or_empty(policy.unit.as_ref())),
        (COOLDOWN.as_str(), Value::Int(policy.cooldown.unwrap_or_default())),
    ];

    if let Some(dimensions) = policy.dimensions.as_ref().filter(|d| !d.is_empty()) {
        let dimensions = dimensions
            .iter()
            .map(|dimension| {
                block([
                    (DIMENSION_NAME.as_str(), string_or_empty(dimension.name.as_ref())),
                    (DIMENSION_VALUE.as_str(), string_or_empty(dimension.value.as_ref())),
                ])
            })
            .collect();
        entries.push((DIMENSIONS.as_str(), Value::List(dimensions)));
    }

    if let Some(action) = policy.action.as_ref().filter(|a| a.action_type.is_some()) {
        entries.extend([
            (ACTION_TYPE.as_str(), string_or_empty(action.action_type.as_ref())),
            (ADJUSTMENT.as_str(), string_or_empty(action.adjustment.as_ref())),
            (
                MIN_TARGET_CAPACITY.as_str(),
                string_or_empty(action.min_target_capacity.as_ref()),
            ),
            (
                MAX_TARGET_CAPACITY.as_str(),
                string_or_empty(action.max_target_capacity.as_ref()),
            ),
            (MINIMUM.as_str(), string_or_empty(action.minimum.as_ref())),
            (MAXIMUM.as_str(), string_or_empty(action.maximum.as_ref())),
            (TARGET.as_str(), string_or_empty(action.target.as_ref())),
            (
                EVALUATION_PERIODS.as_str(),
                Value::Int(policy.evaluation_periods.unwrap_or_default()),
            ),
            (PERIOD.as_str(), Value::Int(policy.period.unwrap_or_default())),
            (THRESHOLD.as_str(), Value::Float(policy.threshold.unwrap_or_default())),
            (OPERATOR.as_str(), string_or_empty(policy.operator.as_ref())),
        ]);
    }

    block(entries)
}
