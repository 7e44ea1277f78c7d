//! Core models for the ability network directory
//!
//! This module contains the records returned by the remote directory API and the
//! provider entities derived from them.

use serde::{Deserialize, Deserializer, Serialize};

/// Category given to every service merged into a provider
pub const SERVICE_CATEGORY: &str = "Service";

/// Shown in place of an empty provider description
pub const NO_DESCRIPTION: &str = "No description available.";

// The API is loose about nulls and id types, so decode those leniently.

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => String::new(),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// A contact person listed for an address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactRecord {
    /// First and last name joined, without stray whitespace
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{} {}", first.trim(), last.trim()).trim().to_string()
    }
}

/// One location at which a service is offered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub organization_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<ContactRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<serde_json::Value>,
}

/// One named service as returned by the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroupRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: Vec<AddressRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub organization_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub states: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabilities: Vec<String>,
}

/// Body of `GET /services/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<ServiceGroupRecord>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filtered_response: bool,
}

/// Server-side filters understood by the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub cities: String,
    #[serde(default)]
    pub states: String,
    #[serde(default)]
    pub disabilities: String,
}

impl SearchParams {
    /// Query string pairs, skipping empty filters
    pub fn to_query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("query", self.query.as_str()),
            ("cities", self.cities.as_str()),
            ("states", self.states.as_str()),
            ("disabilities", self.disabilities.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

/// A service offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl Service {
    pub fn from_group(group: &ServiceGroupRecord) -> Self {
        Self {
            id: group.id.clone(),
            name: group.service_name.clone(),
            category: SERVICE_CATEGORY.to_string(),
        }
    }
}

/// A distinct organization at a distinct city and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// The grouping key, `organization__city__state`
    pub id: String,
    pub name: String,
    /// Display string `"{city}, {state}"`
    pub location: String,
    pub city: String,
    pub state: String,
    pub services: Vec<Service>,
    pub about: String,
    pub contact_info: Vec<ContactRecord>,
}

impl Provider {
    pub fn about_or_default(&self) -> &str {
        if self.about.trim().is_empty() {
            NO_DESCRIPTION
        } else {
            &self.about
        }
    }
}

/// Formats the display location used both by providers and the location filter
pub fn format_location(city: &str, state: &str) -> String {
    format!("{}, {}", city, state)
}

/// A blog post from `GET /blogs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "excerpt")]
    pub content: String,
    #[serde(
        default,
        rename = "imageUrl",
        alias = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

/// An event from `GET /events`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(
        default,
        rename = "imageUrl",
        alias = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

/// Content listings come back either bare or wrapped in an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "blogs", alias = "events", alias = "items")]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped { data } => data,
        }
    }
}
