//! Region discovery
//!
//! Lists every region the credentials can reach, then probes each one for
//! AL1 instances and AL1 Auto Scaling groups. Probing runs the full
//! per-region pipeline, so a successful discovery leaves the row caches
//! warm and later per-region calls free.

use crate::audit::session::Caches;
use crate::audit::{group, instance, pool};
use crate::aws::CloudProvider;
use anyhow::Result;

/// Regions probed at a time
const REGION_PROBE_CONCURRENCY: usize = 5;

/// Discover regions holding at least one AL1 instance or group.
///
/// Fail-fast: if any probe fails, the whole discovery fails and nothing
/// is memoized, so the next call retries from scratch. The output order
/// is probe-completion order.
pub async fn discover(provider: &dyn CloudProvider, caches: &Caches) -> Result<Vec<String>> {
    {
        let cache = caches.regions.lock().await;
        if let Some(regions) = cache.as_ref() {
            return Ok(regions.clone());
        }
    }

    let accessible = provider.list_regions().await?;
    tracing::info!(count = accessible.len(), "Probing accessible regions");

    let probed = pool::for_each(REGION_PROBE_CONCURRENCY, accessible, |region| async move {
        let (instances, groups) = tokio::try_join!(
            has_instances(provider, caches, &region),
            has_auto_scaling_groups(provider, caches, &region),
        )?;
        Ok((region, instances || groups))
    })
    .await?;

    let regions: Vec<String> = probed
        .into_iter()
        .filter(|(_, relevant)| *relevant)
        .map(|(region, _)| region)
        .collect();

    tracing::info!(regions = ?regions, "Cached regions");
    *caches.regions.lock().await = Some(regions.clone());
    Ok(regions)
}

async fn has_instances(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
) -> Result<bool> {
    tracing::debug!(region, "Checking for AL1 instances");
    Ok(!instance::rows(provider, caches, region).await?.is_empty())
}

async fn has_auto_scaling_groups(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
) -> Result<bool> {
    tracing::debug!(region, "Checking for AL1 Auto Scaling groups");
    Ok(!group::rows(provider, caches, region).await?.is_empty())
}
