//! Configuration for the marker engine and the collaborators it talks to.
//!
//! Every section has sensible defaults so a host only needs to provide what
//! differs (typically the provider API key and the backend endpoint).
//! [`PostmapConfig::from_env`] layers environment overrides on top.

use crate::core::constants::{
    DEFAULT_CENTER, DEFAULT_FIT_PADDING, DEFAULT_POLL_INTERVAL, DEFAULT_USER_AGENT, DEFAULT_ZOOM,
    NOMINATIM_BASE_URL, POPUP_VERTICAL_OFFSET, PROVIDER_SCRIPT_URL,
};
use crate::core::geo::LatLng;
use crate::layers::reconciler::ReconcileMode;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_MAPS_API_KEY: &str = "POSTMAP_MAPS_API_KEY";
pub const ENV_BACKEND_URL: &str = "POSTMAP_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "POSTMAP_BACKEND_KEY";
pub const ENV_POLL_INTERVAL_MS: &str = "POSTMAP_POLL_INTERVAL_MS";
pub const ENV_GEOCODER_URL: &str = "POSTMAP_GEOCODER_URL";
pub const ENV_USER_AGENT: &str = "POSTMAP_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostmapConfig {
    pub sync: SyncConfig,
    pub viewport: ViewportConfig,
    pub overlay: OverlayConfig,
    pub provider: ProviderConfig,
    pub geocoder: GeocoderConfig,
    pub backend: Option<BackendConfig>,
}

impl PostmapConfig {
    /// Defaults overridden by `POSTMAP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PostmapConfig::from_env`] with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup(ENV_MAPS_API_KEY) {
            config.provider.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                MapError::Config(format!("{ENV_POLL_INTERVAL_MS} must be an integer, got {raw:?}"))
            })?;
            if ms == 0 {
                return Err(MapError::Config(format!(
                    "{ENV_POLL_INTERVAL_MS} must be greater than zero"
                )));
            }
            config.sync.poll_interval_ms = ms;
        }
        if let Some(url) = lookup(ENV_GEOCODER_URL) {
            config.geocoder.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            config.geocoder.user_agent = agent;
        }
        match (lookup(ENV_BACKEND_URL), lookup(ENV_BACKEND_KEY)) {
            (Some(endpoint), Some(api_key)) => {
                config.backend = Some(BackendConfig {
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    api_key,
                })
            }
            (Some(_), None) => {
                return Err(MapError::Config(format!(
                    "{ENV_BACKEND_URL} is set but {ENV_BACKEND_KEY} is missing"
                )))
            }
            _ => {}
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    /// Resolve owner display names through the secondary lookup
    pub enrich_display_names: bool,
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            enrich_display_names: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub default_center: LatLng,
    pub default_zoom: f64,
    pub fit_padding: f64,
    /// Upper zoom bound for the automatic fit (a lone marker would otherwise max out)
    pub max_fit_zoom: Option<f64>,
    pub reconcile_mode: ReconcileMode,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            default_center: LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            default_zoom: DEFAULT_ZOOM,
            fit_padding: DEFAULT_FIT_PADDING,
            max_fit_zoom: Some(17.0),
            reconcile_mode: ReconcileMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub vertical_offset: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            vertical_offset: POPUP_VERTICAL_OFFSET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub script_url: String,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Full script URL with the API key attached
    pub fn script_src(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}?key={}", self.script_url, key),
            None => self.script_url.clone(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            script_url: PROVIDER_SCRIPT_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub endpoint: String,
    pub api_key: String,
}
