//! API module
//!
//! This module provides the remote directory client and the local HTTP server
//! that serves the aggregated directory.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{ClientConfig, ClientError, DirectoryApi, HttpClient};
pub use server::{serve, AppState, ServerConfig};
