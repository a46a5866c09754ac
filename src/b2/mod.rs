//! Backblaze B2 API client

pub mod buckets;
pub mod client;
pub mod errors;
pub mod files;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::B2Client;
pub use errors::{B2Error, Result};
pub use types::*;
