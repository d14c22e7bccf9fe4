//! Audit session and its caches
//!
//! One [`Audit`] is created per process run. It owns every cache the
//! pipeline uses, so nothing leaks across sessions and tests get full
//! isolation. Caches are append-only: a key, once populated, is never
//! evicted or overwritten for the lifetime of the session.

use crate::audit::group::{self, AutoScalingGroupRow};
use crate::audit::instance::{self, InstanceRow};
use crate::audit::regions;
use crate::aws::provider::{
    ImageDescriptor, LaunchConfigurationDescriptor, LaunchTemplateVersionDescriptor,
};
use crate::aws::CloudProvider;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session-lifetime caches, shared by every resolver in the pipeline.
///
/// Each fetcher holds the relevant mutex across its miss-fetch-insert
/// section, so a given key is fetched remotely at most once even while
/// region probes run concurrently.
#[derive(Default)]
pub struct Caches {
    /// Image descriptions keyed by concrete image id
    pub images: Mutex<HashMap<String, ImageDescriptor>>,
    /// Launch configurations keyed by name
    pub launch_configurations: Mutex<HashMap<String, LaunchConfigurationDescriptor>>,
    /// Launch template versions keyed by (name, version)
    pub launch_template_versions:
        Mutex<HashMap<(String, String), LaunchTemplateVersionDescriptor>>,
    /// Alias parameter path -> concrete image id
    pub alias_parameters: Mutex<HashMap<String, String>>,
    /// Instance id -> whether its console output showed the AL1 banner
    pub console_matches: Mutex<HashMap<String, bool>>,
    /// Projected instance rows per region
    pub instance_rows: Mutex<HashMap<String, Vec<InstanceRow>>>,
    /// Projected group rows per region
    pub group_rows: Mutex<HashMap<String, Vec<AutoScalingGroupRow>>>,
    /// Discovered regions, set only after a fully successful discovery
    pub regions: Mutex<Option<Vec<String>>>,
}

/// The audit engine's public surface, consumed by the presentation layer
pub struct Audit {
    provider: Arc<dyn CloudProvider>,
    caches: Caches,
}

impl Audit {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self {
            provider,
            caches: Caches::default(),
        }
    }

    /// Regions with at least one AL1 instance or group.
    ///
    /// The first call runs full discovery (and warms every cache along the
    /// way); later calls return the memoized list.
    pub async fn regions(&self) -> Result<Vec<String>> {
        regions::discover(self.provider.as_ref(), &self.caches).await
    }

    /// AL1 instance rows for one region, memoized per region
    pub async fn instance_rows(&self, region: &str) -> Result<Vec<InstanceRow>> {
        instance::rows(self.provider.as_ref(), &self.caches, region).await
    }

    /// AL1 Auto Scaling group rows for one region, memoized per region
    pub async fn group_rows(&self, region: &str) -> Result<Vec<AutoScalingGroupRow>> {
        group::rows(self.provider.as_ref(), &self.caches, region).await
    }
}
