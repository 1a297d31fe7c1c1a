//! Application state shared across handlers

use common::cache::RedisPool;
use std::sync::Arc;

use crate::{middleware::JwtVerifier, proxy::ProxyService, repositories::Repository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub proxy: ProxyService,
    pub cache: Option<RedisPool>,
    pub jwt: JwtVerifier,
}

#[cfg(test)]
impl AppState {
    /// State backed by the given repository, without Redis or upstream keys
    pub fn for_tests(repository: Arc<dyn Repository>) -> Self {
        use crate::config::ProxyConfig;

        let proxy = ProxyService::new(
            ProxyConfig {
                geoapify_api_key: None,
                unsplash_access_key: None,
                geoapify_base_url: "http://127.0.0.1:9/geocode".to_string(),
                unsplash_base_url: "http://127.0.0.1:9/photos".to_string(),
                timeout_seconds: 1,
            },
            None,
        )
        .unwrap();

        Self {
            repository,
            proxy,
            cache: None,
            jwt: JwtVerifier::from_secret(b"roam-test-secret"),
        }
    }
}
