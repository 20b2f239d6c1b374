//! Store geolocation.
//!
//! Locations are GeoJSON-style points: a `type` tag that is always
//! [`POINT`], a `[longitude, latitude]` pair and a street address.

use serde::{Deserialize, Serialize};

/// GeoJSON geometry type for every store location.
pub const POINT: &str = "Point";

/// Errors that can occur when constructing a [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// Longitude is not a finite number within `-180..=180`.
    #[error("longitude must be between -180 and 180 (got {0})")]
    InvalidLongitude(f64),
    /// Latitude is not a finite number within `-90..=90`.
    #[error("latitude must be between -90 and 90 (got {0})")]
    InvalidLatitude(f64),
    /// The address is blank.
    #[error("address cannot be empty")]
    EmptyAddress,
}

/// A `[longitude, latitude]` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    longitude: f64,
    latitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InvalidLongitude`] or
    /// [`LocationError::InvalidLatitude`].
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, LocationError> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidLongitude(longitude));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidLatitude(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl TryFrom<[f64; 2]> for Coordinates {
    type Error = LocationError;

    fn try_from([longitude, latitude]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(longitude, latitude)
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(coordinates: Coordinates) -> Self {
        [coordinates.longitude, coordinates.latitude]
    }
}

/// Where a store is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Geometry type, always [`POINT`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Position of the store.
    pub coordinates: Coordinates,
    /// Street address (trimmed, non-empty).
    pub address: String,
}

impl Location {
    /// Build a point location; the `type` tag is forced to [`POINT`].
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::EmptyAddress`] if the trimmed address is empty.
    pub fn point(coordinates: Coordinates, address: &str) -> Result<Self, LocationError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LocationError::EmptyAddress);
        }
        Ok(Self {
            kind: POINT.to_owned(),
            coordinates,
            address: address.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_in_range() {
        let coords = Coordinates::new(-79.38, 43.65).unwrap();
        assert!((coords.longitude() + 79.38).abs() < f64::EPSILON);
        assert!((coords.latitude() - 43.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinates_out_of_range() {
        assert!(matches!(
            Coordinates::new(181.0, 0.0),
            Err(LocationError::InvalidLongitude(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -90.5),
            Err(LocationError::InvalidLatitude(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_point_forces_type_and_trims_address() {
        let coords = Coordinates::new(1.0, 2.0).unwrap();
        let location = Location::point(coords, "  1 Main St  ").unwrap();
        assert_eq!(location.kind, POINT);
        assert_eq!(location.address, "1 Main St");
    }

    #[test]
    fn test_point_requires_address() {
        let coords = Coordinates::new(1.0, 2.0).unwrap();
        assert_eq!(
            Location::point(coords, "   "),
            Err(LocationError::EmptyAddress)
        );
    }

    #[test]
    fn test_geojson_shape() {
        let coords = Coordinates::new(-0.5, 51.25).unwrap();
        let location = Location::point(coords, "London").unwrap();
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Point",
                "coordinates": [-0.5, 51.25],
                "address": "London"
            })
        );
    }
}
