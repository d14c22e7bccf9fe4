//! al1-finder: audit an AWS account for Amazon Linux 1 usage
//!
//! The [`audit`] module holds the resolution and caching engine; [`aws`]
//! holds the provider boundary and its SDK-backed implementation. The
//! binary in `main.rs` is a thin presentation consumer.

pub mod audit;
pub mod aws;
pub mod config;
