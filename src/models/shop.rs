// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shop model (read-only directory entry).

use crate::geodistance::Coordinates;

/// A shop from the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Shop {
    /// Directory ID (referenced by challenge targets)
    pub shop_id: u64,
    /// Display name
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// Latitude (None if the shop has no known location)
    pub lat: Option<f64>,
    /// Longitude (None if the shop has no known location)
    pub lon: Option<f64>,
    /// Aggregate rating, maintained by the directory
    pub rating: Option<f64>,
}

impl Shop {
    /// Distance from a user position in kilometers (infinite if unlocated).
    pub fn distance_from(&self, position: &Coordinates) -> f64 {
        position.distance_to(self.lat, self.lon)
    }

    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}
