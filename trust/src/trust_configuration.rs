use crate::http_client::{HttpClient, HyperHttpClient};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1/";

#[derive(Debug, Clone)]
pub struct TrustConfiguration {
    base_url: String,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl TrustConfiguration {
    pub fn new() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            http_client: None,
        }
    }

    pub fn set_base_url<S: Into<String>>(&mut self, base_url: S) {
        self.base_url = base_url.into();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }
}

impl Default for TrustConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
