//! Directory state
//!
//! [`Directory`] owns the provider list together with the inputs that filter it and
//! keeps the derived views current. [`SharedDirectory`] wraps it for concurrent use
//! and notifies subscribers when a refresh lands.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator;
use crate::api::{ClientError, DirectoryApi};
use crate::models::{Provider, SearchParams, ServiceGroupRecord};

/// Identifies one issued fetch; only the latest ticket may update the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What became of a fetch result handed to [`Directory::apply_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The provider list was rebuilt from the response
    Applied { providers: usize },
    /// The fetch failed; the provider list is now empty
    Failed,
    /// A newer fetch was issued after this one; nothing changed
    Stale,
}

/// Provider list, filter inputs and derived views for one listing
#[derive(Debug, Clone, Default)]
pub struct Directory {
    providers: Vec<Provider>,
    filtered: Vec<Provider>,
    query: String,
    selected_location: Option<String>,
    suggestions: Vec<String>,
    generation: u64,
    loaded_at: Option<DateTime<Utc>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for a new fetch, superseding any outstanding one
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
        }
    }

    /// Applies a fetch result if its ticket is still the latest.
    ///
    /// A failed fetch empties the provider list rather than surfacing the error.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ServiceGroupRecord>, ClientError>,
    ) -> FetchOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                latest = self.generation,
                "Discarding stale fetch"
            );
            return FetchOutcome::Stale;
        }

        let outcome = match result {
            Ok(groups) => {
                self.providers = aggregator::aggregate(&groups);
                FetchOutcome::Applied {
                    providers: self.providers.len(),
                }
            }
            Err(e) => {
                tracing::error!("Error fetching providers: {}", e);
                self.providers = Vec::new();
                FetchOutcome::Failed
            }
        };

        self.loaded_at = Some(Utc::now());
        self.on_state_changed();
        outcome
    }

    /// Fetches and applies in one step, for a directory with a single owner
    pub async fn refresh<A: DirectoryApi + ?Sized>(
        &mut self,
        api: &A,
        params: &SearchParams,
    ) -> FetchOutcome {
        let ticket = self.begin_fetch();
        let result = api.search_services(params).await.map(|r| r.services);
        self.apply_fetch(ticket, result)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.on_state_changed();
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.selected_location = location;
        self.on_state_changed();
    }

    /// Takes a type-ahead suggestion as the query and closes the suggestion list
    pub fn choose_suggestion(&mut self, name: &str) {
        self.set_query(name);
        self.suggestions.clear();
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn filtered(&self) -> &[Provider] {
        &self.filtered
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_location(&self) -> Option<&str> {
        self.selected_location.as_deref()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    // Recomputes every derived view from the current inputs
    fn on_state_changed(&mut self) {
        self.filtered = aggregator::filter(
            &self.providers,
            &self.query,
            self.selected_location.as_deref(),
        );
        self.suggestions = if self.query.is_empty() {
            Vec::new()
        } else {
            aggregator::suggest(&self.providers, &self.query)
        };
    }
}

/// Thread-safe handle to a [`Directory`] shared by request handlers
#[derive(Clone)]
pub struct SharedDirectory {
    inner: Arc<Mutex<Directory>>,
    update_tx: Arc<tokio::sync::broadcast::Sender<u64>>,
}

impl Default for SharedDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDirectory {
    pub fn new() -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(16);

        Self {
            inner: Arc::new(Mutex::new(Directory::new())),
            update_tx: Arc::new(tx),
        }
    }

    fn with_directory<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Directory) -> R,
    {
        let mut directory = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut directory)
    }

    /// Re-fetches from the remote API and applies the result if still current.
    ///
    /// The lock is not held while the request is in flight, so overlapping
    /// refreshes resolve to whichever was issued last.
    pub async fn refresh<A: DirectoryApi + ?Sized>(
        &self,
        api: &A,
        params: &SearchParams,
    ) -> FetchOutcome {
        let ticket = self.with_directory(|d| d.begin_fetch());
        let result = api.search_services(params).await.map(|r| r.services);
        let outcome = self.with_directory(|d| d.apply_fetch(ticket, result));

        if outcome != FetchOutcome::Stale {
            tracing::info!(generation = ticket.generation(), ?outcome, "Directory refreshed");
            let _ = self.update_tx.send(ticket.generation());
        }
        outcome
    }

    /// Filtered view computed against the current providers, independent of
    /// the stored filter inputs
    pub fn view(&self, query: &str, location: Option<&str>) -> Vec<Provider> {
        self.with_directory(|d| aggregator::filter(d.providers(), query, location))
    }

    pub fn suggestions(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }
        self.with_directory(|d| aggregator::suggest(d.providers(), query))
    }

    pub fn provider(&self, id: &str) -> Option<Provider> {
        self.with_directory(|d| d.provider(id).cloned())
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.with_directory(|d| d.providers().to_vec())
    }

    pub fn locations(&self) -> Vec<String> {
        self.with_directory(|d| aggregator::distinct_locations(d.providers()))
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.with_directory(|d| d.loaded_at())
    }

    /// Subscribe to refresh notifications; each message is the applied generation
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<u64> {
        self.update_tx.subscribe()
    }
}
