use std::cmp::Ordering;

use tracing::{info, instrument, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    Clinic, ClinicQuery, ClinicSearch, GeoPoint, OverpassElement, DEFAULT_SPECIALTY, MAX_CLINICS,
    UNNAMED_CLINIC,
};
use crate::services::geolocation::IpGeolocator;
use crate::services::overpass::OverpassClient;

const EARTH_RADIUS_KM: f64 = 6371.0;

pub struct ClinicService {
    overpass: OverpassClient,
    geolocator: IpGeolocator,
    radius_m: u32,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            overpass: OverpassClient::new(config),
            geolocator: IpGeolocator::new(config),
            radius_m: config.clinic_search_radius_m,
        }
    }

    /// Nearest clinics to the given point, or to the caller's IP location
    /// when no point is given.
    #[instrument(skip(self))]
    pub async fn search(&self, query: ClinicQuery) -> Result<ClinicSearch, AppError> {
        let origin = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) => {
                let point = GeoPoint::new(lat, lng);
                if !point.is_valid() {
                    return Err(AppError::BadRequest("Coordinates out of range".to_string()));
                }
                point
            }
            (None, None) => self.geolocator.locate().await.map_err(|e| {
                warn!("IP geolocation failed: {}", e);
                AppError::ExternalService(format!("Could not determine location: {}", e))
            })?,
            _ => {
                return Err(AppError::BadRequest("lat and lng must be given together".to_string()));
            }
        };

        let elements = self.overpass
            .nearby_clinics(origin, self.radius_m)
            .await
            .map_err(|e| AppError::ExternalService(format!("Clinic search failed: {}", e)))?;

        let clinics = filter_by_name(nearest_clinics(&elements, origin), query.q.as_deref());
        info!("Found {} clinics near {}, {}", clinics.len(), origin.lat, origin.lng);

        Ok(ClinicSearch { origin, clinics })
    }
}

/// Maps points of interest to clinics, nearest first, at most [`MAX_CLINICS`].
pub fn nearest_clinics(elements: &[OverpassElement], origin: GeoPoint) -> Vec<Clinic> {
    let mut clinics: Vec<(f64, Clinic)> = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let point = GeoPoint::new(element.lat?, element.lon?);
            let distance = haversine_km(origin, point);
            Some((distance, to_clinic(element, index, point, distance)))
        })
        .collect();

    clinics.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    clinics.truncate(MAX_CLINICS);
    clinics.into_iter().map(|(_, clinic)| clinic).collect()
}

fn to_clinic(element: &OverpassElement, index: usize, point: GeoPoint, distance_km: f64) -> Clinic {
    let tag = |key: &str, default: &str| {
        element.tags
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    Clinic {
        id: element.id.unwrap_or(index as i64),
        lat: point.lat,
        lng: point.lng,
        name: tag("name", UNNAMED_CLINIC),
        specialty: tag("specialty", DEFAULT_SPECIALTY),
        distance_km: (distance_km * 10.0).round() / 10.0,
        emergency: element.tags.get("emergency").map(String::as_str) == Some("yes"),
    }
}

pub fn filter_by_name(clinics: Vec<Clinic>, query: Option<&str>) -> Vec<Clinic> {
    let needle = match query.map(str::trim) {
        Some(needle) if !needle.is_empty() => needle.to_lowercase(),
        _ => return clinics,
    };

    clinics
        .into_iter()
        .filter(|clinic| clinic.name.to_lowercase().contains(&needle))
        .collect()
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
