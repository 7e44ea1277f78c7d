//! Client trait definition
//!
//! This module defines the `DirectoryApi` trait that abstracts over the remote directory service.

use super::ClientError;
use crate::models::{BlogPost, Event, SearchParams, SearchResponse};

/// Trait defining the remote directory API consumed by this crate
#[async_trait::async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Search service groups, optionally pre-filtered by the server
    async fn search_services(&self, params: &SearchParams)
        -> Result<SearchResponse, ClientError>;

    /// List blog posts
    async fn blogs(&self) -> Result<Vec<BlogPost>, ClientError>;

    /// List events
    async fn events(&self) -> Result<Vec<Event>, ClientError>;
}
