//! Outbound proxies for reverse geocoding and destination photos
//!
//! API keys stay on the server. Successful upstream responses are cached in
//! Redis when a cache is configured; cache failures are logged and bypassed.

use common::cache::RedisPool;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProxyConfig;

/// Number of photos requested from Unsplash per search
pub const PHOTOS_PER_PAGE: u32 = 15;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Caller did not supply a usable query parameter
    #[error("{0}")]
    MissingParameter(String),

    /// Query parameter is present but not a usable value
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0} API key is not configured")]
    NotConfigured(&'static str),

    #[error("{0} request failed: {1}")]
    Upstream(&'static str, #[source] reqwest::Error),
}

/// Query string of `GET /api/geocode`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Query string of `GET /api/photos`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoQuery {
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSearchResponse {
    pub photos: Vec<Photo>,
}

#[derive(Clone)]
pub struct ProxyService {
    http: Client,
    cache: Option<RedisPool>,
    config: ProxyConfig,
}

impl ProxyService {
    pub fn new(config: ProxyConfig, cache: Option<RedisPool>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            cache,
            config,
        })
    }

    /// Resolve coordinates to an address via Geoapify
    ///
    /// The upstream JSON is returned untouched.
    pub async fn reverse_geocode(&self, query: &GeocodeQuery) -> Result<Value, ProxyError> {
        let (lat, lon) = parse_coordinates(query)?;
        let api_key = self
            .config
            .geoapify_api_key
            .as_deref()
            .ok_or(ProxyError::NotConfigured("Geoapify"))?;

        let cache_key = format!("roam:geocode:{}:{}", lat, lon);
        if let Some(hit) = self.cached::<Value>(&cache_key).await {
            return Ok(hit);
        }

        let request = self.http.get(&self.config.geoapify_base_url).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("apiKey", api_key.to_string()),
        ]);
        let body = fetch_json("Geoapify", request).await?;

        self.store(&cache_key, &body).await;
        Ok(body)
    }

    /// Search Unsplash for photos of a destination
    pub async fn search_photos(&self, query: &PhotoQuery) -> Result<PhotoSearchResponse, ProxyError> {
        let term = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ProxyError::MissingParameter("Query parameter is required".to_string()))?;
        let access_key = self
            .config
            .unsplash_access_key
            .as_deref()
            .ok_or(ProxyError::NotConfigured("Unsplash"))?;

        let cache_key = format!("roam:photos:{}", term.to_lowercase());
        if let Some(hit) = self.cached::<PhotoSearchResponse>(&cache_key).await {
            return Ok(hit);
        }

        let request = self.http.get(&self.config.unsplash_base_url).query(&[
            ("query", term.to_string()),
            ("per_page", PHOTOS_PER_PAGE.to_string()),
            ("client_id", access_key.to_string()),
        ]);
        let body = fetch_json("Unsplash", request).await?;

        let response = PhotoSearchResponse {
            photos: photos_from_unsplash(&body),
        };
        self.store(&cache_key, &response).await;
        Ok(response)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get_json(key).await {
            Ok(hit) => {
                if hit.is_some() {
                    debug!("Cache hit for {}", key);
                }
                hit
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_json(key, value).await {
                warn!("Cache write failed for {}: {}", key, e);
            }
        }
    }
}

fn parse_coordinates(query: &GeocodeQuery) -> Result<(f64, f64), ProxyError> {
    let required = || ProxyError::MissingParameter("Latitude and longitude are required".to_string());
    let lat = query.lat.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let lon = query.lon.as_deref().map(str::trim).filter(|v| !v.is_empty());

    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            let parse = |value: &str| {
                value.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    ProxyError::InvalidParameter(
                        "Latitude and longitude must be numbers".to_string(),
                    )
                })
            };
            Ok((parse(lat)?, parse(lon)?))
        }
        _ => Err(required()),
    }
}

async fn fetch_json(service: &'static str, request: RequestBuilder) -> Result<Value, ProxyError> {
    let upstream = |e| ProxyError::Upstream(service, e);
    request
        .send()
        .await
        .map_err(upstream)?
        .error_for_status()
        .map_err(upstream)?
        .json::<Value>()
        .await
        .map_err(upstream)
}

/// Map an Unsplash search response to photo entries
///
/// Results without a regular-size URL or dimensions are skipped.
pub fn photos_from_unsplash(body: &Value) -> Vec<Photo> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|result| {
            let src = result.pointer("/urls/regular")?.as_str()?;
            let width = result.get("width")?.as_u64()?;
            let height = result.get("height")?.as_u64()?;
            Some(Photo {
                src: src.to_string(),
                width: u32::try_from(width).ok()?,
                height: u32::try_from(height).ok()?,
            })
        })
        .collect()
}
