//! Spotinst API objects
//!
//! Request and response bodies of the Spotinst API, modeled after the
//! JSON the API exchanges. Every member is optional so partial update
//! requests serialize only what they touch.

pub mod aws;
pub mod azure;

use serde::{Deserialize, Deserializer, Serialize};

/// Member an update request may clear.
///
/// `None` leaves it out of the request, `Some(None)` sends `null` and
/// `Some(Some(v))` sends the value.
pub type Nullable<T> = Option<Option<T>>;

/// Deserialize a present member, `null` included, as `Some`
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The value carried by a nullable member, if any
pub fn value_of<T>(member: &Nullable<T>) -> Option<&T> {
    member.as_ref().and_then(Option::as_ref)
}

/// Request/response body of an Azure Elastigroup: `{"group": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElastigroupAzureWrapper {
    #[serde(default)]
    pub group: azure::Elastigroup,
}

impl ElastigroupAzureWrapper {
    pub fn new(group: azure::Elastigroup) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &azure::Elastigroup {
        &self.group
    }

    /// Scaling section, created on first access
    pub fn scaling_mut(&mut self) -> &mut azure::Scaling {
        self.group.scaling.get_or_insert_with(Default::default)
    }
}

/// Request/response body of an Ocean AWS cluster: `{"cluster": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OceanAwsWrapper {
    #[serde(default)]
    pub cluster: aws::Cluster,
}

impl OceanAwsWrapper {
    pub fn new(cluster: aws::Cluster) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &aws::Cluster {
        &self.cluster
    }

    pub fn launch_specification(&self) -> Option<&aws::LaunchSpecification> {
        self.cluster
            .compute
            .as_ref()
            .and_then(|c| c.launch_specification.as_ref())
    }

    /// Launch specification, created with its compute section on first access
    pub fn launch_specification_mut(&mut self) -> &mut aws::LaunchSpecification {
        self.cluster
            .compute
            .get_or_insert_with(Default::default)
            .launch_specification
            .get_or_insert_with(Default::default)
    }
}
