// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shop directory loading and lookup.

use crate::geodistance::Coordinates;
use crate::models::Shop;
use geo::Point;
use geojson::GeoJson;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only shop directory, loaded once at startup.
#[derive(Default, Clone)]
pub struct ShopDirectory {
    shops: Vec<Shop>,
    index: HashMap<u64, usize>,
}

impl ShopDirectory {
    /// Load shops from a GeoJSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let json_data = fs::read_to_string(path.as_ref())
            .map_err(|e| DirectoryError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load shops from a GeoJSON string.
    ///
    /// Each feature is a shop: a Point geometry (or `null` for shops without
    /// a known location) with `id`, `name`, `address` and `rating` properties.
    pub fn load_from_json(json_data: &str) -> Result<Self, DirectoryError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| DirectoryError::ParseError(e.to_string()))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(DirectoryError::ParseError(
                "expected a FeatureCollection".to_string(),
            ));
        };

        let mut shops = Vec::new();
        for feature in collection.features {
            let Some(shop_id) = feature.property("id").and_then(|v| v.as_u64()) else {
                tracing::warn!(name = ?feature.property("name"), "Skipping shop without numeric id");
                continue;
            };

            let name = feature
                .property("name")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();
            let address = feature
                .property("address")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let rating = feature.property("rating").and_then(|v| v.as_f64());

            let location = match feature.geometry {
                Some(geom) => Some(Self::convert_geometry(geom.value)?),
                None => None,
            };

            shops.push(Shop {
                shop_id,
                name,
                address,
                lat: location.map(|p| p.y()),
                lon: location.map(|p| p.x()),
                rating,
            });
        }

        Self::from_shops(shops)
    }

    /// Build a directory from already-constructed shops.
    pub fn from_shops(shops: Vec<Shop>) -> Result<Self, DirectoryError> {
        let mut index = HashMap::with_capacity(shops.len());
        for (pos, shop) in shops.iter().enumerate() {
            if index.insert(shop.shop_id, pos).is_some() {
                return Err(DirectoryError::DuplicateId(shop.shop_id));
            }
        }

        tracing::info!(count = shops.len(), "Loaded shops");
        Ok(Self { shops, index })
    }

    fn convert_geometry(value: geojson::Value) -> Result<Point<f64>, DirectoryError> {
        use std::convert::TryInto;

        value
            .try_into()
            .map_err(|_| DirectoryError::UnsupportedGeometry)
    }

    /// Get the list of shops in file order.
    pub fn shops(&self) -> &[Shop] {
        &self.shops
    }

    /// Look up a shop by ID.
    pub fn get_shop(&self, shop_id: u64) -> Option<&Shop> {
        self.index.get(&shop_id).map(|&pos| &self.shops[pos])
    }

    /// Shops ordered nearest-first from a position, with their distances.
    ///
    /// With a radius, only located shops within it are returned. Without
    /// one, unlocated shops are included at the end.
    pub fn nearby(&self, position: &Coordinates, radius_km: Option<f64>) -> Vec<(&Shop, f64)> {
        let mut found: Vec<(&Shop, f64)> = self
            .shops
            .iter()
            .map(|shop| (shop, shop.distance_from(position)))
            .filter(|(_, d)| radius_km.map_or(true, |r| *d <= r))
            .collect();

        found.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.shop_id.cmp(&b.0.shop_id)));
        found
    }
}

/// Errors from directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Unsupported geometry type (expected Point)")]
    UnsupportedGeometry,

    #[error("Duplicate shop id: {0}")]
    DuplicateId(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [108.2022, 16.0544] },
                "properties": { "id": 1, "name": "Banh Mi Phuong", "address": "2B Phan Chau Trinh", "rating": 4.5 }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "id": 2, "name": "Pop-up Stall" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [108.0, 16.0] },
                "properties": { "name": "No Id" }
            }
        ]
    }"#;

    #[test]
    fn test_load_sample() {
        let dir = ShopDirectory::load_from_json(SAMPLE).unwrap();
        assert_eq!(dir.shops().len(), 2);

        let shop = dir.get_shop(1).unwrap();
        assert_eq!(shop.name, "Banh Mi Phuong");
        assert_eq!(shop.lat, Some(16.0544));
        assert_eq!(shop.lon, Some(108.2022));
        assert_eq!(shop.rating, Some(4.5));

        let stall = dir.get_shop(2).unwrap();
        assert!(!stall.has_location());
        assert!(dir.get_shop(3).is_none());
    }

    #[test]
    fn test_rejects_non_point_geometry() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] },
                "properties": { "id": 1, "name": "Road" }
            }]
        }"#;

        assert!(matches!(
            ShopDirectory::load_from_json(json),
            Err(DirectoryError::UnsupportedGeometry)
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let shop = Shop {
            shop_id: 1,
            name: "A".to_string(),
            address: None,
            lat: None,
            lon: None,
            rating: None,
        };
        assert!(matches!(
            ShopDirectory::from_shops(vec![shop.clone(), shop]),
            Err(DirectoryError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_nearby_orders_and_filters() {
        let dir = ShopDirectory::load_from_json(SAMPLE).unwrap();
        let here = Coordinates {
            lat: 16.0544,
            lon: 108.2022,
        };

        let all = dir.nearby(&here, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0.shop_id, 1);
        assert_eq!(all[0].1, 0.0);
        assert!(all[1].1.is_infinite());

        let within = dir.nearby(&here, Some(1.0));
        assert_eq!(within.len(), 1);
    }
}
