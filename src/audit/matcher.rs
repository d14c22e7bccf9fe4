//! Amazon Linux 1 classification
//!
//! Two independent signals, combined with OR by the callers:
//!
//! - the image description names an AL1 release (2014-2018 naming
//!   conventions, VPC NAT builds, and the old arch-suffixed names);
//! - the instance's console output shows the AL1 kernel banner. This is
//!   the fallback for instances whose image description reveals nothing,
//!   e.g. private copies of the stock AMIs.

use crate::audit::pool;
use crate::audit::session::Caches;
use crate::aws::CloudProvider;
use anyhow::Result;
use base64::Engine;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Concurrent GetConsoleOutput calls per batch
const CONSOLE_OUTPUT_CONCURRENCY: usize = 10;

static IMAGE_DESCRIPTION_PATTERN: OnceLock<Regex> = OnceLock::new();
static CONSOLE_OUTPUT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn image_description_pattern() -> &'static Regex {
    IMAGE_DESCRIPTION_PATTERN.get_or_init(|| {
        Regex::new(r"Amazon Linux AMI (?:(?:amzn-ami-)?201[4-8]|VPC NAT|i386|x86_64)")
            .expect("invalid image description pattern")
    })
}

fn console_output_pattern() -> &'static Regex {
    CONSOLE_OUTPUT_PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^Amazon Linux AMI release 201[1-8](?:\.\d+)?\r?\nKernel")
            .expect("invalid console output pattern")
    })
}

/// Does this image description identify an AL1 image?
pub fn matches_image_description(description: &str) -> bool {
    image_description_pattern().is_match(description)
}

/// Does this decoded boot log carry the AL1 kernel banner?
pub fn matches_console_output(console_output: &str) -> bool {
    console_output_pattern().is_match(console_output)
}

/// Decode base64 console output to text
pub fn decode_console_output(encoded: &str) -> Option<String> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Return the subset of `instance_ids` whose console output matches the
/// AL1 banner.
///
/// The per-instance verdict is cached for the session and never
/// re-checked. Missing or undecodable console output is a non-match, not
/// an error. The cache lock is held across the whole batch, so a given
/// instance is fetched at most once even when region probes overlap.
pub async fn console_matches(
    provider: &dyn CloudProvider,
    caches: &Caches,
    region: &str,
    instance_ids: &[String],
) -> Result<HashSet<String>> {
    let mut cache = caches.console_matches.lock().await;

    let to_check: Vec<String> = instance_ids
        .iter()
        .filter(|id| !cache.contains_key(*id))
        .cloned()
        .collect();

    if !to_check.is_empty() {
        let checked = pool::for_each(CONSOLE_OUTPUT_CONCURRENCY, to_check, |instance_id| {
            async move {
                tracing::debug!(instance_id = %instance_id, "Fetching console output");
                let output = provider.get_console_output(region, &instance_id).await?;
                let matched = output
                    .as_deref()
                    .and_then(decode_console_output)
                    .map(|text| matches_console_output(&text))
                    .unwrap_or(false);
                Ok((instance_id, matched))
            }
        })
        .await?;

        for (instance_id, matched) in checked {
            cache.insert(instance_id, matched);
        }
    }

    Ok(instance_ids
        .iter()
        .filter(|id| cache.get(*id).copied().unwrap_or(false))
        .cloned()
        .collect())
}
