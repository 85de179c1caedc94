//! Reverse geocoding seam.
//!
//! The wizard only needs "coordinates in, address out, may fail". Keeping
//! it behind a trait lets tests drive the failure path without a network.

use crate::api::{ApiClient, ApiError};

pub trait ReverseGeocode {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, ApiError>;
}

impl ReverseGeocode for ApiClient {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, ApiError> {
        self.reverse_geocode_address(latitude, longitude)
    }
}
