use crate::config::config::ApiConfig;
use crate::error::{FetchError, Result};
use crate::query::{EntityKind, Query};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct PageResponse {
    pub data: PageData,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageData {
    #[serde(default)]
    pub items: Vec<RawItem>,
    pub paging: Paging,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Paging {
    pub total_items: u64,
    pub number_of_pages: u32,
    #[serde(default)]
    pub current_page: u32,
}

/// One record as returned by the API; only `properties` is used.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawItem {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl PageResponse {
    pub fn items(&self) -> &[RawItem] {
        &self.data.items
    }

    pub fn paging(&self) -> &Paging {
        &self.data.paging
    }

    pub fn into_items(self) -> Vec<RawItem> {
        self.data.items
    }
}

/// Anything that can produce one page of results for a query.
///
/// Implementations are shared by reference across fetch workers, so they
/// must be `Sync`.
pub trait PageSource: Sync {
    fn fetch_page(&self, kind: EntityKind, query: &Query) -> Result<PageResponse>;
}

/// Blocking HTTP client for the `odm-*` endpoints.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    host: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl ApiClient {
    /// Build a client from explicit credentials. Fails if no API key is set.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FetchError::MissingApiKey)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            host: config.host.clone(),
            api_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, kind: EntityKind) -> String {
        format!("{}/odm-{}", self.base_url, kind.endpoint())
    }
}

impl PageSource for ApiClient {
    fn fetch_page(&self, kind: EntityKind, query: &Query) -> Result<PageResponse> {
        let url = self.endpoint_url(kind);
        let params = query.to_params(kind);
        let start = Instant::now();

        debug!(
            "GET {} page={} ({} params)",
            url,
            query.page_number(),
            params.len()
        );

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.api_key)
            .query(&params)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        debug!(
            "Response for {} page={}: status={} bytes={} elapsed_ms={}",
            kind,
            query.page_number(),
            status,
            body.len(),
            start.elapsed().as_millis()
        );

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Credentials rejected by {}: {}", url, status);
            return Err(FetchError::Unauthorized {
                status: status.as_u16(),
            });
        }

        // The API answers 200 with a body; anything else carries no page.
        if status != StatusCode::OK {
            warn!("API error from {}: {}", url, status);
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let page: PageResponse = serde_json::from_str(&body)?;
        Ok(page)
    }
}
