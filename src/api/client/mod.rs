//! Client module
//!
//! This module provides HTTP client functionality to talk to the remote Ability Network API.

mod http;
mod trait_def;

// Re-export the trait and types
pub use http::{ClientConfig, ClientError, HttpClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use trait_def::DirectoryApi;
