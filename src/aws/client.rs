//! AWS SDK implementation of the provider boundary
//!
//! One `SdkConfig` is loaded up front; per-region service clients are
//! derived from it lazily and reused for the lifetime of the provider.

use super::provider::{
    CloudProvider, Filter, GroupDescriptor, ImageDescriptor, InstanceDescriptor,
    LaunchConfigurationDescriptor, LaunchTemplateSpec, LaunchTemplateVersionDescriptor,
    MixedInstancesPolicyDescriptor, OverrideDescriptor,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::Region;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Service clients scoped to one region
#[derive(Clone)]
struct RegionClients {
    ec2: aws_sdk_ec2::Client,
    autoscaling: aws_sdk_autoscaling::Client,
    ssm: aws_sdk_ssm::Client,
}

/// Production [`CloudProvider`] backed by the official AWS SDK
pub struct AwsProvider {
    base: aws_config::SdkConfig,
    clients: Mutex<HashMap<String, RegionClients>>,
}

impl AwsProvider {
    /// Load AWS configuration from the environment, optionally using a
    /// named profile.
    pub async fn new(profile: Option<&str>) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let base = loader.load().await;

        Ok(Self {
            base,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Get (or build) the service clients for a region
    async fn clients(&self, region: &str) -> RegionClients {
        let mut clients = self.clients.lock().await;
        clients
            .entry(region.to_string())
            .or_insert_with(|| {
                let config = self
                    .base
                    .to_builder()
                    .region(Region::new(region.to_string()))
                    .build();
                RegionClients {
                    ec2: aws_sdk_ec2::Client::new(&config),
                    autoscaling: aws_sdk_autoscaling::Client::new(&config),
                    ssm: aws_sdk_ssm::Client::new(&config),
                }
            })
            .clone()
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn list_regions(&self) -> Result<Vec<String>> {
        let ec2 = aws_sdk_ec2::Client::new(&self.base);
        let response = ec2
            .describe_regions()
            .send()
            .await
            .context("Failed to describe regions")?;

        Ok(response
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(|name| name.to_string())
            .collect())
    }

    async fn list_instances(
        &self,
        region: &str,
        filters: &[Filter],
    ) -> Result<Vec<InstanceDescriptor>> {
        let clients = self.clients(region).await;

        let sdk_filters = filters
            .iter()
            .map(|f| {
                aws_sdk_ec2::types::Filter::builder()
                    .name(&f.name)
                    .set_values(Some(f.values.clone()))
                    .build()
            })
            .collect();

        let mut instances = Vec::new();
        let mut pages = clients
            .ec2
            .describe_instances()
            .set_filters(Some(sdk_filters))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.context("Failed to describe instances")?;
            for reservation in page.reservations() {
                for instance in reservation.instances() {
                    instances.push(convert_instance(instance));
                }
            }
        }

        Ok(instances)
    }

    async fn list_auto_scaling_groups(&self, region: &str) -> Result<Vec<GroupDescriptor>> {
        let clients = self.clients(region).await;

        let mut groups = Vec::new();
        let mut pages = clients
            .autoscaling
            .describe_auto_scaling_groups()
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.context("Failed to describe Auto Scaling groups")?;
            for group in page.auto_scaling_groups() {
                groups.push(convert_group(group));
            }
        }

        Ok(groups)
    }

    async fn describe_launch_configurations(
        &self,
        region: &str,
        names: &[String],
    ) -> Result<Vec<LaunchConfigurationDescriptor>> {
        let clients = self.clients(region).await;

        let response = clients
            .autoscaling
            .describe_launch_configurations()
            .set_launch_configuration_names(Some(names.to_vec()))
            .send()
            .await
            .context("Failed to describe launch configurations")?;

        Ok(response
            .launch_configurations()
            .iter()
            .map(|lc| LaunchConfigurationDescriptor {
                name: lc.launch_configuration_name().unwrap_or_default().to_string(),
                image_ref: lc.image_id().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn describe_launch_template_version(
        &self,
        region: &str,
        name: &str,
        version: &str,
    ) -> Result<LaunchTemplateVersionDescriptor> {
        let clients = self.clients(region).await;

        let response = clients
            .ec2
            .describe_launch_template_versions()
            .launch_template_name(name)
            .versions(version)
            .send()
            .await
            .with_context(|| format!("Failed to describe launch template {name}:{version}"))?;

        let template = response
            .launch_template_versions()
            .first()
            .with_context(|| format!("Launch template {name}:{version} not found"))?;

        Ok(LaunchTemplateVersionDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            image_ref: template
                .launch_template_data()
                .and_then(|d| d.image_id())
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn describe_images(
        &self,
        region: &str,
        image_ids: &[String],
    ) -> Result<Vec<ImageDescriptor>> {
        let clients = self.clients(region).await;

        let mut images = Vec::new();
        let mut pages = clients
            .ec2
            .describe_images()
            .set_image_ids(Some(image_ids.to_vec()))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.context("Failed to describe images")?;
            for image in page.images() {
                images.push(ImageDescriptor {
                    image_id: image.image_id().unwrap_or_default().to_string(),
                    description: image.description().map(|d| d.to_string()),
                });
            }
        }

        Ok(images)
    }

    async fn get_parameter(&self, region: &str, path: &str) -> Result<Option<String>> {
        let clients = self.clients(region).await;

        let response = clients
            .ssm
            .get_parameter()
            .name(path)
            .send()
            .await
            .with_context(|| format!("Failed to get parameter {path}"))?;

        Ok(response
            .parameter()
            .and_then(|p| p.value())
            .map(|v| v.to_string()))
    }

    async fn get_console_output(
        &self,
        region: &str,
        instance_id: &str,
    ) -> Result<Option<String>> {
        let clients = self.clients(region).await;

        let response = clients
            .ec2
            .get_console_output()
            .instance_id(instance_id)
            .send()
            .await
            .with_context(|| format!("Failed to get console output for {instance_id}"))?;

        Ok(response.output().map(|o| o.to_string()))
    }
}

fn convert_instance(instance: &aws_sdk_ec2::types::Instance) -> InstanceDescriptor {
    InstanceDescriptor {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        image_ref: instance.image_id().unwrap_or_default().to_string(),
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        launch_time: instance
            .launch_time()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
    }
}

fn convert_group(group: &aws_sdk_autoscaling::types::AutoScalingGroup) -> GroupDescriptor {
    GroupDescriptor {
        name: group.auto_scaling_group_name().unwrap_or_default().to_string(),
        launch_configuration_name: group.launch_configuration_name().map(|n| n.to_string()),
        launch_template: group.launch_template().and_then(convert_spec),
        mixed_instances_policy: group.mixed_instances_policy().map(|policy| {
            MixedInstancesPolicyDescriptor {
                launch_template: policy
                    .launch_template()
                    .and_then(|lt| lt.launch_template_specification())
                    .and_then(convert_spec),
                overrides: policy
                    .launch_template()
                    .map(|lt| {
                        lt.overrides()
                            .iter()
                            .map(|o| OverrideDescriptor {
                                launch_template: o
                                    .launch_template_specification()
                                    .and_then(convert_spec),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        }),
    }
}

fn convert_spec(
    spec: &aws_sdk_autoscaling::types::LaunchTemplateSpecification,
) -> Option<LaunchTemplateSpec> {
    Some(LaunchTemplateSpec {
        id: spec.launch_template_id().map(|id| id.to_string()),
        name: spec.launch_template_name()?.to_string(),
        version: spec.version().unwrap_or("$Default").to_string(),
    })
}
