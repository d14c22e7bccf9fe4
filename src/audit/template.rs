//! Launch template version fetching and caching

use crate::audit::session::Caches;
use crate::aws::provider::LaunchTemplateVersionDescriptor;
use crate::aws::CloudProvider;
use anyhow::Result;
use std::collections::HashMap;

/// Batch-load launch template versions, keyed by (name, version).
///
/// The describe API has no multi-template form, so each uncached pair
/// costs one dedicated call; cached pairs cost nothing.
pub async fn get_launch_template_versions(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    specs: &[(String, String)],
) -> Result<HashMap<(String, String), LaunchTemplateVersionDescriptor>> {
    let mut cache = caches.launch_template_versions.lock().await;
    let mut results = HashMap::new();

    for key in specs {
        if results.contains_key(key) {
            continue;
        }
        if !cache.contains_key(key) {
            let (name, version) = key;
            tracing::debug!(region, name = %name, version = %version, "Describing launch template version");
            let template = provider
                .describe_launch_template_version(region, name, version)
                .await?;
            cache.insert(key.clone(), template);
        }
        results.insert(key.clone(), cache[key].clone());
    }

    Ok(results)
}
