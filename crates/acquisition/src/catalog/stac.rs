//! STAC API item search over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::{AcquisitionItem, Asset, CatalogClient, CatalogQuery, Properties};
use crate::error::CatalogError;
use eo_common::parse_timestamp;

/// Items requested per page.
const PAGE_SIZE: usize = 100;

/// STAC catalog client for one API root.
pub struct StacCatalog {
    client: Client,
    base_url: String,
}

impl StacCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_body(query: &CatalogQuery) -> Value {
        let mut body = json!({
            "collections": [query.collection],
            "intersects": query.boundary.geometry(),
            "datetime": query.time_range.to_interval(),
            "limit": query.max_items.min(PAGE_SIZE),
        });
        if let Some(ceiling) = query.cloud_ceiling {
            body["query"] = json!({ "eo:cloud_cover": { "lte": ceiling } });
        }
        body
    }

    async fn send(&self, request: &PageRequest) -> Result<SearchPage, CatalogError> {
        let builder = match request {
            PageRequest::Post { url, body } => self.client.post(url).json(body),
            PageRequest::Get { url } => self.client.get(url),
        };
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        decode_page(&text)
    }
}

#[async_trait]
impl CatalogClient for StacCatalog {
    #[instrument(skip(self, query), fields(url = %self.base_url, collection = %query.collection))]
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<AcquisitionItem>, CatalogError> {
        let mut request = Some(PageRequest::Post {
            url: format!("{}/search", self.base_url),
            body: Self::search_body(query),
        });
        let mut items = Vec::new();
        let mut pages = 0usize;

        while let Some(current) = request.take() {
            let page = self.send(&current).await?;
            pages += 1;
            debug!(page = pages, returned = page.items.len(), "Fetched STAC page");
            items.extend(page.items);

            if items.len() >= query.max_items {
                items.truncate(query.max_items);
                break;
            }
            request = page.next.and_then(|link| link.into_request(&current));
        }

        info!(count = items.len(), pages = pages, "STAC search complete");
        Ok(items)
    }
}

enum PageRequest {
    Post { url: String, body: Value },
    Get { url: String },
}

impl PageRequest {
    fn body(&self) -> Option<&Value> {
        match self {
            PageRequest::Post { body, .. } => Some(body),
            PageRequest::Get { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    href: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    merge: bool,
}

impl Link {
    fn into_request(self, previous: &PageRequest) -> Option<PageRequest> {
        let is_post = self
            .method
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("POST"))
            .unwrap_or(false);
        if !is_post {
            return Some(PageRequest::Get { url: self.href });
        }

        let body = match (self.body, previous.body()) {
            (Some(Value::Object(next)), Some(Value::Object(prev))) if self.merge => {
                let mut merged = prev.clone();
                merged.extend(next);
                Value::Object(merged)
            }
            (Some(next), _) => next,
            (None, Some(prev)) => prev.clone(),
            (None, None) => {
                warn!(href = %self.href, "POST next link without a body");
                return None;
            }
        };
        Some(PageRequest::Post {
            url: self.href,
            body,
        })
    }
}

#[derive(Debug)]
struct SearchPage {
    items: Vec<AcquisitionItem>,
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct RawFeatureCollection {
    #[serde(default)]
    features: Vec<RawItem>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: String,
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    assets: std::collections::HashMap<String, Asset>,
}

impl From<RawItem> for AcquisitionItem {
    fn from(raw: RawItem) -> Self {
        let datetime = raw
            .properties
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(|s| parse_timestamp(s).ok());
        AcquisitionItem {
            id: raw.id,
            datetime,
            properties: raw.properties,
            assets: raw.assets,
        }
    }
}

fn decode_page(text: &str) -> Result<SearchPage, CatalogError> {
    let raw: RawFeatureCollection = serde_json::from_str(text)?;
    let next = raw.links.into_iter().find(|l| l.rel == "next");
    Ok(SearchPage {
        items: raw.features.into_iter().map(AcquisitionItem::from).collect(),
        next,
    })
}
