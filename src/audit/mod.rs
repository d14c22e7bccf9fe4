//! Core resolution and caching engine
//!
//! Per region, the pipeline runs fetch -> resolve -> classify -> project:
//!
//! - [`regions`] - Discovers accessible regions and filters to relevant ones
//! - [`instance`] - Instance fetching and row projection
//! - [`group`] - Auto Scaling group fetching, launch source resolution, rows
//! - [`image`] - Image description cache and SSM alias resolution
//! - [`template`] - Launch template version cache
//! - [`matcher`] - The two AL1 classification signals
//! - [`pool`] - Bounded-concurrency fan-out with aggregated errors
//! - [`session`] - The [`session::Audit`] session owning all caches

pub mod group;
pub mod image;
pub mod instance;
pub mod matcher;
pub mod pool;
pub mod regions;
pub mod session;
pub mod template;

pub use group::AutoScalingGroupRow;
pub use instance::InstanceRow;
pub use session::Audit;
