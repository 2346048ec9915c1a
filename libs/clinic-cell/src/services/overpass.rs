use anyhow::{Result, anyhow};
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{GeoPoint, OverpassElement, OverpassResponse};

/// Client for the Overpass point-of-interest query API.
pub struct OverpassClient {
    client: Client,
    url: String,
}

impl OverpassClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.overpass_api_url.clone(),
        }
    }

    /// Clinic and hospital nodes within `radius_m` of `around`.
    pub async fn nearby_clinics(&self, around: GeoPoint, radius_m: u32) -> Result<Vec<OverpassElement>> {
        let query = build_query(around, radius_m);
        debug!("Querying Overpass at {} within {} m", self.url, radius_m);

        let response = self.client
            .get(&self.url)
            .query(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Overpass query failed: {} - {}", status, body);
            return Err(anyhow!("Overpass query failed with status {}", status));
        }

        let parsed: OverpassResponse = response.json().await?;
        debug!("Overpass returned {} elements", parsed.elements.len());
        Ok(parsed.elements)
    }
}

pub fn build_query(around: GeoPoint, radius_m: u32) -> String {
    format!(
        "[out:json];(node[\"amenity\"=\"clinic\"](around:{r},{lat},{lng});node[\"amenity\"=\"hospital\"](around:{r},{lat},{lng}););out;",
        r = radius_m,
        lat = around.lat,
        lng = around.lng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_covers_clinics_and_hospitals() {
        let query = build_query(GeoPoint::new(51.5, -0.12), 5000);

        assert!(query.starts_with("[out:json];"));
        assert!(query.contains("node[\"amenity\"=\"clinic\"](around:5000,51.5,-0.12);"));
        assert!(query.contains("node[\"amenity\"=\"hospital\"](around:5000,51.5,-0.12);"));
    }
}
