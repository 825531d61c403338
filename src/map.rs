//! The boundary to the client-side map widget.
//!
//! The widget gets a [`MapView`] and reports newly placed markers back. The
//! click-to-place workflow lives in [`MarkerPlacement`] so it can run on the
//! server without the widget.

use serde::Serialize;

use crate::models::trip::{Location, LocationId};

pub const DEFAULT_DESCRIPTION: &str = "Click to add description";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub locations: Vec<Location>,
    pub show_route: bool,
    pub is_editing: bool,
    /// Polyline points for the widget, empty while the route is hidden.
    pub route: Vec<(f64, f64)>,
}

impl MapView {
    pub fn new(locations: &[Location], show_route: bool, is_editing: bool) -> Self {
        Self {
            locations: locations.to_vec(),
            show_route,
            is_editing,
            route: if show_route { route(locations) } else { Vec::new() },
        }
    }

    /// Embedded into the page for the widget script.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Coordinates in visiting order. A single stop has no route.
pub fn route(locations: &[Location]) -> Vec<(f64, f64)> {
    if locations.len() < 2 {
        return Vec::new();
    }
    locations.iter().map(|loc| loc.coordinates).collect()
}

#[derive(Debug, Clone, Default)]
pub struct MarkerPlacement {
    pending: Option<(f64, f64)>,
}

impl MarkerPlacement {
    pub fn pending(&self) -> Option<(f64, f64)> {
        self.pending
    }

    /// Clicks outside editing mode do nothing.
    pub fn click(&mut self, is_editing: bool, latitude: f64, longitude: f64) -> bool {
        if !is_editing || !valid_coordinates(latitude, longitude) {
            return false;
        }
        self.pending = Some((latitude, longitude));
        true
    }

    pub fn confirm(&mut self, name: &str, description: &str, id: LocationId) -> Option<Location> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let coordinates = self.pending.take()?;
        let description = description.trim();
        Some(Location {
            id,
            name: name.to_string(),
            description: if description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                description.to_string()
            },
            coordinates,
            comments: Some(Vec::new()),
        })
    }
}

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}
