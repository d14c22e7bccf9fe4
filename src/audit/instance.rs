//! Instance fetching and row projection

use crate::audit::session::Caches;
use crate::audit::{image, matcher};
use crate::aws::provider::Filter;
use crate::aws::CloudProvider;
use anyhow::Result;
use chrono::SecondsFormat;
use serde::Serialize;

/// One AL1 instance, flattened for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceRow {
    pub instance_id: String,
    pub image_id: String,
    pub image_description: String,
    pub instance_type: String,
    pub instance_state: String,
    /// RFC 3339 UTC timestamp, empty when the API omitted it
    pub launch_time: String,
}

/// Server-side filters for the instance listing.
///
/// Windows and commercial Linux platforms can never be AL1, and
/// terminated instances are gone; filtering here cuts the result set
/// before it crosses the wire.
fn instance_filters() -> Vec<Filter> {
    vec![
        Filter::new(
            "instance-state-name",
            &["pending", "running", "stopping", "stopped"],
        ),
        Filter::new("platform-details", &["Linux/UNIX"]),
    ]
}

/// AL1 instance rows for one region, memoized per region.
///
/// An instance is kept when its image description matches the AL1
/// pattern, or when its console output shows the AL1 kernel banner.
pub async fn rows(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
) -> Result<Vec<InstanceRow>> {
    {
        let cache = caches.instance_rows.lock().await;
        if let Some(rows) = cache.get(region) {
            return Ok(rows.clone());
        }
    }

    tracing::info!(region, "Fetching instances");
    let instances = provider.list_instances(region, &instance_filters()).await?;

    // Preload all the image descriptions
    let image_refs: Vec<String> = instances.iter().map(|i| i.image_ref.clone()).collect();
    let image_index = image::get_images(provider, caches, region, &image_refs).await?;

    let instance_ids: Vec<String> = instances.iter().map(|i| i.instance_id.clone()).collect();
    let console_matches = matcher::console_matches(provider, caches, region, &instance_ids).await?;

    let mut rows = Vec::new();
    for instance in &instances {
        let image_id =
            image::resolve_image_id(provider, caches, region, &instance.image_ref).await?;
        let image_description = image_index
            .get(&image_id)
            .and_then(|image| image.description.clone())
            .unwrap_or_default();

        if !matcher::matches_image_description(&image_description)
            && !console_matches.contains(&instance.instance_id)
        {
            continue;
        }

        rows.push(InstanceRow {
            instance_id: instance.instance_id.clone(),
            image_id,
            image_description,
            instance_type: instance.instance_type.clone(),
            instance_state: instance.state.clone(),
            launch_time: instance
                .launch_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default(),
        });
    }

    caches
        .instance_rows
        .lock()
        .await
        .insert(region.to_string(), rows.clone());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_restrict_to_live_linux_instances() {
        let filters = instance_filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name, "instance-state-name");
        assert!(!filters[0].values.contains(&"terminated".to_string()));
        assert_eq!(filters[1].name, "platform-details");
        assert_eq!(filters[1].values, vec!["Linux/UNIX"]);
    }

    #[test]
    fn launch_time_formats_as_rfc3339_millis() {
        let t = chrono::DateTime::from_timestamp(1_500_000_000, 0).unwrap();
        assert_eq!(
            t.to_rfc3339_opts(SecondsFormat::Millis, true),
            "2017-07-14T02:40:00.000Z"
        );
    }
}
