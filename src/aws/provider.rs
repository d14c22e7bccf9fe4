//! Cloud provider boundary
//!
//! The audit engine never talks to the AWS SDK directly; it goes through
//! the [`CloudProvider`] trait, which exposes exactly the remote operations
//! the resolution pipeline needs. The production implementation lives in
//! [`super::client`]; tests substitute an in-memory fake.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Server-side filter for list operations
#[derive(Debug, Clone)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// An EC2 instance, reduced to the fields the audit needs
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    pub instance_id: String,
    /// Raw image reference as returned by the API (may be an alias)
    pub image_ref: String,
    pub instance_type: String,
    pub state: String,
    pub launch_time: Option<DateTime<Utc>>,
}

/// Reference to a launch template at a specific version
///
/// The version is kept as a string because the API accepts symbolic
/// versions (`$Latest`, `$Default`) alongside numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchTemplateSpec {
    pub id: Option<String>,
    pub name: String,
    pub version: String,
}

/// A single instance-type override inside a mixed instances policy
#[derive(Debug, Clone, Default)]
pub struct OverrideDescriptor {
    pub launch_template: Option<LaunchTemplateSpec>,
}

/// Mixed instances policy: optional top-level template plus overrides
#[derive(Debug, Clone)]
pub struct MixedInstancesPolicyDescriptor {
    pub launch_template: Option<LaunchTemplateSpec>,
    pub overrides: Vec<OverrideDescriptor>,
}

/// An Auto Scaling group and its launch source references
#[derive(Debug, Clone)]
pub struct GroupDescriptor {
    pub name: String,
    pub launch_configuration_name: Option<String>,
    pub launch_template: Option<LaunchTemplateSpec>,
    pub mixed_instances_policy: Option<MixedInstancesPolicyDescriptor>,
}

/// A launch configuration, keyed by name
#[derive(Debug, Clone)]
pub struct LaunchConfigurationDescriptor {
    pub name: String,
    pub image_ref: String,
}

/// A launch template version, keyed by (name, version)
#[derive(Debug, Clone)]
pub struct LaunchTemplateVersionDescriptor {
    pub name: String,
    pub version: String,
    pub image_ref: String,
}

/// A machine image and its human-readable description
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub image_id: String,
    pub description: Option<String>,
}

/// Remote operations consumed by the audit engine
///
/// Implementations are responsible for pagination: list operations return
/// the full result set in provider order.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// List all regions the credentials can access
    async fn list_regions(&self) -> Result<Vec<String>>;

    /// List instances in a region, restricted by server-side filters
    async fn list_instances(
        &self,
        region: &str,
        filters: &[Filter],
    ) -> Result<Vec<InstanceDescriptor>>;

    /// List all Auto Scaling groups in a region
    async fn list_auto_scaling_groups(&self, region: &str) -> Result<Vec<GroupDescriptor>>;

    /// Describe launch configurations by name (at most 50 per call)
    async fn describe_launch_configurations(
        &self,
        region: &str,
        names: &[String],
    ) -> Result<Vec<LaunchConfigurationDescriptor>>;

    /// Describe a single launch template version
    async fn describe_launch_template_version(
        &self,
        region: &str,
        name: &str,
        version: &str,
    ) -> Result<LaunchTemplateVersionDescriptor>;

    /// Describe images by concrete image id
    async fn describe_images(
        &self,
        region: &str,
        image_ids: &[String],
    ) -> Result<Vec<ImageDescriptor>>;

    /// Look up an SSM parameter value (alias resolution)
    async fn get_parameter(&self, region: &str, path: &str) -> Result<Option<String>>;

    /// Fetch the base64-encoded console output of an instance, if any
    async fn get_console_output(&self, region: &str, instance_id: &str)
        -> Result<Option<String>>;
}
