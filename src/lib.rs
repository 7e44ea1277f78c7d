//! Ability Network directory library
//!
//! Fetches disability-service listings from The Ability Network API, groups them
//! into one provider per organization and location, and filters the result for
//! display. Also serves the aggregated directory over HTTP and drives the CLI.

pub mod aggregator;
pub mod api;
pub mod cli;
pub mod directory;
pub mod locations;
pub mod models;

pub use aggregator::{aggregate, filter, suggest};
pub use directory::{Directory, FetchOutcome, FetchTicket, SharedDirectory};
pub use models::{
    AddressRecord, BlogPost, ContactRecord, Event, Provider, SearchParams, SearchResponse,
    Service, ServiceGroupRecord,
};
