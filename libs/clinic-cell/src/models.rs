use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const UNNAMED_CLINIC: &str = "Unnamed Clinic";
pub const DEFAULT_SPECIALTY: &str = "General Practice";
pub const MAX_CLINICS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub specialty: String,
    /// Great-circle distance from the search origin, one decimal.
    pub distance_km: f64,
    pub emergency: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Case-insensitive name filter.
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicSearch {
    pub origin: GeoPoint,
    pub clinics: Vec<Clinic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
