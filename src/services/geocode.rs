//! Nominatim address lookups
//!
//! Used by the post form: free text to a coordinate when a post is created,
//! and a coordinate back to an address when the user drops a pin. A non-OK
//! response or an empty result is "not found", not an error.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::core::config::GeocoderConfig;
use crate::core::geo::LatLng;
use crate::services::HTTP_CLIENT;
use crate::traits::Geocoder;
use crate::Result;

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            config,
        }
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET with the identifying headers Nominatim's usage policy asks for.
    /// `None` for non-success statuses.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(query)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("geocoder /{} answered {}", path, status);
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new(GeocoderConfig::default())
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let params = [
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
        ];
        match self.get("search", &params).await? {
            Some(body) => parse_search(&body),
            None => Ok(None),
        }
    }

    async fn reverse(&self, lat_lng: &LatLng) -> Result<Option<String>> {
        let params = [
            ("lat", lat_lng.lat.to_string()),
            ("lon", lat_lng.lng.to_string()),
            ("format", "json".to_string()),
        ];
        match self.get("reverse", &params).await? {
            Some(body) => parse_reverse(&body),
            None => Ok(None),
        }
    }
}

/// First hit of a `/search` response
pub(crate) fn parse_search(body: &str) -> Result<Option<LatLng>> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    let Some(hit) = hits.first() else {
        return Ok(None);
    };

    let (Ok(lat), Ok(lng)) = (hit.lat.trim().parse::<f64>(), hit.lon.trim().parse::<f64>()) else {
        log::warn!("geocoder returned unparseable coordinates {:?}/{:?}", hit.lat, hit.lon);
        return Ok(None);
    };
    let position = LatLng::new(lat, lng);
    Ok(position.is_valid().then_some(position))
}

pub(crate) fn parse_reverse(body: &str) -> Result<Option<String>> {
    let hit: ReverseHit = serde_json::from_str(body)?;
    Ok(hit.display_name.filter(|name| !name.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapError;

    #[test]
    fn test_parse_search_takes_first_hit() {
        let body = r#"[
            {"lat": "38.2466395", "lon": "21.7345740", "display_name": "Patras"},
            {"lat": "1.0", "lon": "2.0"}
        ]"#;
        let position = parse_search(body).unwrap().unwrap();
        assert!((position.lat - 38.2466395).abs() < 1e-9);
        assert!((position.lng - 21.734574).abs() < 1e-9);
    }

    #[test]
    fn test_parse_search_empty_and_garbage() {
        assert_eq!(parse_search("[]").unwrap(), None);
        assert_eq!(parse_search(r#"[{"lat": "north", "lon": "1"}]"#).unwrap(), None);
        assert_eq!(parse_search(r#"[{"lat": "123.0", "lon": "1"}]"#).unwrap(), None);
        assert!(matches!(parse_search("{"), Err(MapError::Serialization(_))));
    }

    #[test]
    fn test_parse_reverse() {
        let body = r#"{"display_name": "Agiou Nikolaou, Patras, Greece", "place_id": 1}"#;
        assert_eq!(
            parse_reverse(body).unwrap().as_deref(),
            Some("Agiou Nikolaou, Patras, Greece")
        );
        assert_eq!(parse_reverse(r#"{"error": "Unable to geocode"}"#).unwrap(), None);
    }

    #[tokio::test]
    async fn test_blank_query_skips_network() {
        // Unroutable base URL: any request would fail
        let geocoder = NominatimGeocoder::new(GeocoderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeocoderConfig::default()
        });
        assert_eq!(geocoder.geocode("   ").await.unwrap(), None);
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let geocoder = NominatimGeocoder::new(GeocoderConfig {
            base_url: "https://geo.example/".to_string(),
            ..GeocoderConfig::default()
        });
        assert_eq!(geocoder.endpoint("search"), "https://geo.example/search");
    }
}
