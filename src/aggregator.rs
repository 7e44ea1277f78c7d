//! Provider aggregation
//!
//! Flattens the nested search payload into one [`Provider`] per organization and
//! location, and derives the filtered and type-ahead views over that list.

use std::collections::{HashMap, HashSet};

use crate::models::{format_location, AddressRecord, Provider, Service, ServiceGroupRecord};

/// Number of service tags shown on a provider card
pub const DEFAULT_TAG_COUNT: usize = 2;

/// The grouping key for an address: `organization__city__state`
///
/// Empty segments are kept as-is.
pub fn org_key(address: &AddressRecord) -> String {
    format!(
        "{}__{}__{}",
        address.organization_name, address.city, address.state
    )
}

/// Groups every (service group, address) pair by organization and location.
///
/// Providers come out in the order their key was first seen. The first pair
/// seen for a key decides `about` and `contact_info`; later pairs only add
/// services whose id is not already present.
pub fn aggregate(service_groups: &[ServiceGroupRecord]) -> Vec<Provider> {
    let mut providers: Vec<Provider> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for group in service_groups {
        for address in &group.addresses {
            let key = org_key(address);
            let service = Service::from_group(group);

            if let Some(&slot) = slots.get(&key) {
                let existing = &mut providers[slot];
                if !existing.services.iter().any(|s| s.id == service.id) {
                    existing.services.push(service);
                }
                continue;
            }

            slots.insert(key.clone(), providers.len());
            providers.push(Provider {
                id: key,
                name: address.organization_name.clone(),
                location: format_location(&address.city, &address.state),
                city: address.city.clone(),
                state: address.state.clone(),
                services: vec![service],
                about: group.service_description.clone(),
                contact_info: address.contacts.clone(),
            });
        }
    }

    providers
}

fn matches_query(provider: &Provider, needle: &str) -> bool {
    provider.name.to_lowercase().contains(needle)
        || provider
            .services
            .iter()
            .any(|service| service.name.to_lowercase().contains(needle))
}

/// Filters providers by free text and an exact location.
///
/// The text match is case-insensitive against the provider name and its
/// service names. The location match is exact and case-sensitive. An empty
/// query and a `None` location keep everything.
pub fn filter(providers: &[Provider], query: &str, location: Option<&str>) -> Vec<Provider> {
    let needle = query.to_lowercase();

    providers
        .iter()
        .filter(|provider| needle.is_empty() || matches_query(provider, &needle))
        .filter(|provider| location.map_or(true, |loc| provider.location == loc))
        .cloned()
        .collect()
}

/// Distinct service names containing `query`, in order of first appearance
pub fn suggest(providers: &[Provider], query: &str) -> Vec<String> {
    let needle = query.to_lowercase();
    let mut seen = HashSet::new();

    providers
        .iter()
        .flat_map(|provider| provider.services.iter())
        .filter(|service| seen.insert(service.name.as_str()))
        .filter(|service| service.name.to_lowercase().contains(&needle))
        .map(|service| service.name.clone())
        .collect()
}

/// Splits services into the tags shown on a card and the count left over
pub fn service_tags(services: &[Service], max: usize) -> (&[Service], usize) {
    let shown = &services[..services.len().min(max)];
    (shown, services.len() - shown.len())
}

/// Distinct provider locations in first-seen order
pub fn distinct_locations(providers: &[Provider]) -> Vec<String> {
    let mut seen = HashSet::new();
    providers
        .iter()
        .filter(|provider| seen.insert(provider.location.as_str()))
        .map(|provider| provider.location.clone())
        .collect()
}
