//! Auto Scaling group fetching, launch source resolution, and row projection

use crate::audit::session::Caches;
use crate::audit::{image, matcher, template};
use crate::aws::provider::{
    GroupDescriptor, ImageDescriptor, LaunchConfigurationDescriptor,
    LaunchTemplateSpec, LaunchTemplateVersionDescriptor, OverrideDescriptor,
};
use crate::aws::CloudProvider;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Launch configuration names per DescribeLaunchConfigurations call
const LAUNCH_CONFIGURATION_CHUNK: usize = 50;

/// One AL1 group row, flattened for display.
///
/// Exactly one of the launch configuration name or the launch template
/// fields is populated; the unused alternative stays `None` and is
/// omitted from serialized output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoScalingGroupRow {
    pub auto_scaling_group_name: String,
    pub image_id: String,
    pub image_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_configuration_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_template_version: Option<String>,
}

/// Where a group (or one of its overrides) launches instances from
#[derive(Debug, PartialEq)]
pub enum LaunchSource<'a> {
    LaunchConfiguration(&'a str),
    LaunchTemplate(&'a LaunchTemplateSpec),
}

/// Resolve the launch source for a group, or for one override of its
/// mixed instances policy.
///
/// Precedence, first match wins:
/// 1. the group's launch configuration name
/// 2. the override's own launch template spec
/// 3. the mixed instances policy's top-level spec
/// 4. the group's own top-level launch template spec
pub fn resolve_launch_source<'a>(
    group: &'a GroupDescriptor,
    override_: Option<&'a OverrideDescriptor>,
) -> Result<LaunchSource<'a>> {
    if let Some(name) = &group.launch_configuration_name {
        return Ok(LaunchSource::LaunchConfiguration(name));
    }
    if let Some(spec) = override_.and_then(|o| o.launch_template.as_ref()) {
        return Ok(LaunchSource::LaunchTemplate(spec));
    }
    if let Some(spec) = group
        .mixed_instances_policy
        .as_ref()
        .and_then(|p| p.launch_template.as_ref())
    {
        return Ok(LaunchSource::LaunchTemplate(spec));
    }
    if let Some(spec) = &group.launch_template {
        return Ok(LaunchSource::LaunchTemplate(spec));
    }
    bail!(
        "Auto Scaling group {} has no launch configuration or launch template",
        group.name
    );
}

/// AL1 group rows for one region, memoized per region.
///
/// A group with a mixed instances policy yields one row per override;
/// every other shape yields one row. Rows are post-filtered on the image
/// description signal only, since groups have no boot log to fall back on.
pub async fn rows(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
) -> Result<Vec<AutoScalingGroupRow>> {
    {
        let cache = caches.group_rows.lock().await;
        if let Some(rows) = cache.get(region) {
            return Ok(rows.clone());
        }
    }

    tracing::info!(region, "Fetching Auto Scaling groups");
    let groups = provider.list_auto_scaling_groups(region).await?;

    // Batch-load every referenced launch template version: direct group
    // attributes first, then mixed instances policies and their overrides.
    let mut specs: Vec<(String, String)> = Vec::new();
    for group in &groups {
        if let Some(spec) = &group.launch_template {
            specs.push((spec.name.clone(), spec.version.clone()));
        }
        if let Some(policy) = &group.mixed_instances_policy {
            if let Some(spec) = &policy.launch_template {
                specs.push((spec.name.clone(), spec.version.clone()));
            }
            for override_ in &policy.overrides {
                if let Some(spec) = &override_.launch_template {
                    specs.push((spec.name.clone(), spec.version.clone()));
                }
            }
        }
    }
    let template_index =
        template::get_launch_template_versions(provider, caches, region, &specs).await?;

    // Batch-load every referenced launch configuration.
    let configuration_names: Vec<String> = groups
        .iter()
        .filter_map(|g| g.launch_configuration_name.clone())
        .collect();
    let configuration_index =
        get_launch_configurations(provider, caches, region, &configuration_names).await?;

    // Batch-load the images both kinds of launch source point at.
    let mut image_refs: Vec<String> = Vec::new();
    image_refs.extend(configuration_index.values().map(|lc| lc.image_ref.clone()));
    image_refs.extend(template_index.values().map(|lt| lt.image_ref.clone()));
    let image_index = image::get_images(provider, caches, region, &image_refs).await?;

    let mut rows = Vec::new();
    for group in &groups {
        if let Some(policy) = &group.mixed_instances_policy {
            for override_ in &policy.overrides {
                rows.push(
                    build_row(
                        provider,
                        caches,
                        region,
                        group,
                        Some(override_),
                        &configuration_index,
                        &template_index,
                        &image_index,
                    )
                    .await?,
                );
            }
        } else {
            rows.push(
                build_row(
                    provider,
                    caches,
                    region,
                    group,
                    None,
                    &configuration_index,
                    &template_index,
                    &image_index,
                )
                .await?,
            );
        }
    }

    rows.retain(|row| matcher::matches_image_description(&row.image_description));

    caches
        .group_rows
        .lock()
        .await
        .insert(region.to_string(), rows.clone());
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
async fn build_row(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    group: &GroupDescriptor,
    override_: Option<&OverrideDescriptor>,
    configuration_index: &HashMap<String, LaunchConfigurationDescriptor>,
    template_index: &HashMap<(String, String), LaunchTemplateVersionDescriptor>,
    image_index: &HashMap<String, ImageDescriptor>,
) -> Result<AutoScalingGroupRow> {
    let description_of = |image_id: &str| {
        image_index
            .get(image_id)
            .and_then(|image| image.description.clone())
            .unwrap_or_default()
    };

    match resolve_launch_source(group, override_)? {
        LaunchSource::LaunchConfiguration(name) => {
            let configuration = configuration_index.get(name).with_context(|| {
                format!(
                    "Launch configuration {name} referenced by group {} was not loaded",
                    group.name
                )
            })?;
            let image_id =
                image::resolve_image_id(provider, caches, region, &configuration.image_ref)
                    .await?;
            Ok(AutoScalingGroupRow {
                auto_scaling_group_name: group.name.clone(),
                image_description: description_of(&image_id),
                image_id,
                launch_configuration_name: Some(name.to_string()),
                launch_template_id: None,
                launch_template_name: None,
                launch_template_version: None,
            })
        }
        LaunchSource::LaunchTemplate(spec) => {
            let key = (spec.name.clone(), spec.version.clone());
            let template = template_index.get(&key).with_context(|| {
                format!(
                    "Launch template {}:{} referenced by group {} was not loaded",
                    spec.name, spec.version, group.name
                )
            })?;
            let image_id =
                image::resolve_image_id(provider, caches, region, &template.image_ref).await?;
            Ok(AutoScalingGroupRow {
                auto_scaling_group_name: group.name.clone(),
                image_description: description_of(&image_id),
                image_id,
                launch_configuration_name: None,
                launch_template_id: spec.id.clone(),
                launch_template_name: Some(spec.name.clone()),
                launch_template_version: Some(spec.version.clone()),
            })
        }
    }
}

/// Batch-load launch configurations by name.
///
/// Names already cached are served from cache; the rest are fetched in
/// chunks of at most [`LAUNCH_CONFIGURATION_CHUNK`] names, each call
/// sending only its own chunk.
pub async fn get_launch_configurations(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    names: &[String],
) -> Result<HashMap<String, LaunchConfigurationDescriptor>> {
    let mut cache = caches.launch_configurations.lock().await;
    let mut results = HashMap::new();

    let mut to_get: Vec<String> = Vec::new();
    for name in names {
        if let Some(configuration) = cache.get(name) {
            results.insert(name.clone(), configuration.clone());
        } else if !to_get.contains(name) {
            to_get.push(name.clone());
        }
    }

    for chunk in to_get.chunks(LAUNCH_CONFIGURATION_CHUNK) {
        tracing::debug!(region, count = chunk.len(), "Describing launch configurations");
        for configuration in provider
            .describe_launch_configurations(region, chunk)
            .await?
        {
            results.insert(configuration.name.clone(), configuration.clone());
            cache.insert(configuration.name.clone(), configuration);
        }
    }

    Ok(results)
}
