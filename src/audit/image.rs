//! Image resolution and caching
//!
//! Image references come in two shapes: a concrete image id, or an SSM
//! alias (`resolve:ssm:/path/to/parameter`) that indirects through
//! Parameter Store. Everything downstream of this module works with
//! concrete image ids only.

use crate::audit::session::Caches;
use crate::aws::provider::ImageDescriptor;
use crate::aws::CloudProvider;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Prefix marking an image reference as an SSM parameter alias
pub const SSM_ALIAS_PREFIX: &str = "resolve:ssm:";

/// Resolve an image reference to a concrete image id.
///
/// Plain ids pass through untouched. Alias references are resolved via
/// GetParameter and cached by parameter path, so a given path is looked
/// up at most once per session. An unresolvable alias is a fatal error
/// for the current resolution pass; there are no retries.
pub async fn resolve_image_id(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    image_ref: &str,
) -> Result<String> {
    let Some(path) = image_ref.strip_prefix(SSM_ALIAS_PREFIX) else {
        return Ok(image_ref.to_string());
    };

    let mut cache = caches.alias_parameters.lock().await;
    if let Some(image_id) = cache.get(path) {
        return Ok(image_id.clone());
    }

    let image_id = provider
        .get_parameter(region, path)
        .await?
        .with_context(|| format!("Unable to resolve image id for {path}"))?;

    cache.insert(path.to_string(), image_id.clone());
    Ok(image_id)
}

/// Batch-load image descriptions, keyed by concrete image id.
///
/// References are resolved and deduplicated first; only ids absent from
/// the session cache are sent to DescribeImages, in one batched call.
/// Ids the provider does not return (deregistered images) are simply
/// absent from the result.
pub async fn get_images(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    image_refs: &[String],
) -> Result<HashMap<String, ImageDescriptor>> {
    let mut image_ids: Vec<String> = Vec::new();
    for image_ref in image_refs {
        let image_id = resolve_image_id(provider, caches, region, image_ref).await?;
        if !image_ids.contains(&image_id) {
            image_ids.push(image_id);
        }
    }

    let mut cache = caches.images.lock().await;

    let to_get: Vec<String> = image_ids
        .iter()
        .filter(|id| !cache.contains_key(*id))
        .cloned()
        .collect();

    if !to_get.is_empty() {
        tracing::debug!(region, count = to_get.len(), "Describing images");
        for image in provider.describe_images(region, &to_get).await? {
            cache.insert(image.image_id.clone(), image);
        }
    }

    Ok(image_ids
        .iter()
        .filter_map(|id| cache.get(id).map(|image| (id.clone(), image.clone())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_are_not_alias_refs() {
        assert!(!"ami-0123456789abcdef0".starts_with(SSM_ALIAS_PREFIX));
        assert_eq!(
            "resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2"
                .strip_prefix(SSM_ALIAS_PREFIX),
            Some("/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2")
        );
    }
}
