use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a repository treats a remote snapshot that arrives while one of its
/// own merge-writes is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Discard snapshots polled during an in-flight local write. The next
    /// poll after the write lands carries the authoritative document.
    #[default]
    HoldWhileWriting,
    /// Apply every snapshot as soon as it is seen (last writer wins).
    RemoteWins,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold-while-writing" | "hold" => Ok(Self::HoldWhileWriting),
            "remote-wins" | "last-writer-wins" => Ok(Self::RemoteWins),
            other => Err(format!("unknown conflict policy: {}", other)),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HoldWhileWriting => write!(f, "hold-while-writing"),
            Self::RemoteWins => write!(f, "remote-wins"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: Option<String>,
    pub local_cache_dir: String,
    pub default_user_id: String,
    pub remote_poll_interval_secs: u64,
    pub conflict_policy: ConflictPolicy,
    pub overpass_api_url: String,
    pub ip_geolocation_url: String,
    pub clinic_search_radius_m: u32,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: None,
            local_cache_dir: ".medilink-cache".to_string(),
            default_user_id: "demoUser".to_string(),
            remote_poll_interval_secs: 5,
            conflict_policy: ConflictPolicy::default(),
            overpass_api_url: "https://overpass-api.de/api/interpreter".to_string(),
            ip_geolocation_url: "https://ipapi.co/json/".to_string(),
            clinic_search_radius_m: 5000,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY").ok()
                .filter(|key| !key.is_empty()),
            local_cache_dir: env::var("LOCAL_CACHE_DIR")
                .unwrap_or(defaults.local_cache_dir),
            default_user_id: env::var("DEFAULT_USER_ID")
                .unwrap_or(defaults.default_user_id),
            remote_poll_interval_secs: parse_var("REMOTE_POLL_INTERVAL_SECS", defaults.remote_poll_interval_secs),
            conflict_policy: parse_var("SYNC_CONFLICT_POLICY", defaults.conflict_policy),
            overpass_api_url: env::var("OVERPASS_API_URL")
                .unwrap_or(defaults.overpass_api_url),
            ip_geolocation_url: env::var("IP_GEOLOCATION_URL")
                .unwrap_or(defaults.ip_geolocation_url),
            clinic_search_radius_m: parse_var("CLINIC_SEARCH_RADIUS_M", defaults.clinic_search_radius_m),
            port: parse_var("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - documents will only live in memory and the local cache");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
    }

    /// `None` disables remote change subscriptions.
    pub fn remote_poll_interval(&self) -> Option<Duration> {
        if self.remote_poll_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.remote_poll_interval_secs))
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
