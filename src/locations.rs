//! Location catalog
//!
//! The states and cities offered by the location picker, and the picker itself.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::models::format_location;

/// States offered by the picker, in display order
pub const STATES: &[&str] = &[
    "Andhra Pradesh",
    "Delhi",
    "Gujarat",
    "Karnataka",
    "Maharashtra",
    "Punjab",
    "Tamil Nadu",
    "Uttar Pradesh",
    "West Bengal",
];

lazy_static! {
    static ref CITIES_BY_STATE: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("Delhi", &["New Delhi", "Central Delhi", "South Delhi", "North Delhi"]);
        m.insert("Maharashtra", &["Mumbai", "Pune", "Nagpur", "Nashik", "Aurangabad"]);
        m.insert("Karnataka", &["Bangalore", "Mysore", "Hubli", "Mangalore"]);
        m.insert("Tamil Nadu", &["Chennai", "Coimbatore", "Madurai", "Salem"]);
        m.insert("Gujarat", &["Ahmedabad", "Surat", "Vadodara", "Rajkot"]);
        m.insert("Andhra Pradesh", &["Hyderabad", "Visakhapatnam", "Vijayawada"]);
        m.insert("Punjab", &["Chandigarh", "Ludhiana", "Amritsar"]);
        m.insert("Uttar Pradesh", &["Lucknow", "Kanpur", "Agra", "Varanasi"]);
        m.insert("West Bengal", &["Kolkata", "Siliguri", "Durgapur"]);
        m
    };
}

pub fn states() -> &'static [&'static str] {
    STATES
}

/// Cities for a state; empty for states outside the catalog
pub fn cities_for(state: &str) -> &'static [&'static str] {
    CITIES_BY_STATE.get(state).copied().unwrap_or(&[])
}

/// A state and its cities, as served to UIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCities {
    pub state: String,
    pub cities: Vec<String>,
}

/// The whole catalog in display order
pub fn catalog() -> Vec<StateCities> {
    STATES
        .iter()
        .map(|state| StateCities {
            state: state.to_string(),
            cities: cities_for(state).iter().map(|c| c.to_string()).collect(),
        })
        .collect()
}

/// Two-step location chooser: pick a state, then a city within it
#[derive(Debug, Clone, Default)]
pub struct LocationPicker {
    selected_state: Option<String>,
}

impl LocationPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_state(&self) -> Option<&str> {
        self.selected_state.as_deref()
    }

    /// Selects a state and returns the cities to choose from
    pub fn select_state(&mut self, state: &str) -> &'static [&'static str] {
        self.selected_state = Some(state.to_string());
        cities_for(state)
    }

    /// Locations offered for the selected state, formatted as filter values
    pub fn choices(&self) -> Vec<String> {
        match self.selected_state.as_deref() {
            Some(state) => cities_for(state)
                .iter()
                .map(|city| format_location(city, state))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Completes the selection, yielding the location filter value.
    ///
    /// Returns `None` and leaves the picker untouched when no state is selected.
    pub fn select_city(&mut self, city: &str) -> Option<String> {
        let state = self.selected_state.take()?;
        Some(format_location(city, &state))
    }

    /// Clears the location filter
    pub fn select_all(&mut self) -> Option<String> {
        self.selected_state = None;
        None
    }

    /// Steps back from the city list to the state list
    pub fn back(&mut self) {
        self.selected_state = None;
    }
}
