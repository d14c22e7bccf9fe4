//! AWS API interaction module
//!
//! - [`provider`] - The [`provider::CloudProvider`] trait and the plain
//!   descriptor types the audit engine works with
//! - [`client`] - Production implementation backed by the official AWS SDK

pub mod client;
pub mod provider;

pub use client::AwsProvider;
pub use provider::CloudProvider;
