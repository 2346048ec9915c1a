use anyhow::{Result, anyhow};
use reqwest::Client;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{GeoPoint, IpLocation};

/// Approximate position of the caller from an IP geolocation service.
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.ip_geolocation_url.clone(),
        }
    }

    pub async fn locate(&self) -> Result<GeoPoint> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("IP geolocation failed with status {}", status));
        }

        let location: IpLocation = response.json().await?;
        match (location.latitude, location.longitude) {
            (Some(lat), Some(lng)) => {
                debug!("IP geolocation resolved to {}, {}", lat, lng);
                Ok(GeoPoint::new(lat, lng))
            }
            _ => Err(anyhow!("IP geolocation response has no coordinates")),
        }
    }
}
