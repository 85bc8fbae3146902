use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::schema::{CatalogEntry, Category, SearchPage};

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub lookup_timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://swapi.dev/api".to_string(),
            lookup_timeout_secs: 5,
            max_concurrency: 16,
        }
    }
}

/// Name search against one catalog category.
///
/// `Ok(None)` means the catalog answered but had no match. `Err` covers
/// transport failures, non-success statuses and payloads that don't parse.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn search(&self, category: Category, name: &str) -> Result<Option<CatalogEntry>>;
}

#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.lookup_timeout_secs))
            .build()
            .context("Failed to build catalog HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn search_url(&self, category: Category) -> String {
        format!("{}/{}/", self.base_url, category.path_segment())
    }
}

#[async_trait]
impl CatalogLookup for CatalogClient {
    async fn search(&self, category: Category, name: &str) -> Result<Option<CatalogEntry>> {
        let url = self.search_url(category);

        let response = self.client
            .get(&url)
            .query(&[("search", name)])
            .send()
            .await
            .with_context(|| format!("Failed to send catalog search to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Catalog search failed: {}", response.status());
        }

        let page: SearchPage = response
            .json()
            .await
            .context("Failed to parse catalog search response")?;

        Ok(page.into_first_match())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    /// Serves a tiny SWAPI on a random local port and returns its base URL.
    async fn spawn_catalog() -> String {
        async fn people(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            match params.get("search").map(String::as_str) {
                Some("Luke Skywalker") => Json(json!({
                    "count": 1,
                    "results": [{"name": "Luke Skywalker", "height": "172"}]
                })),
                _ => Json(json!({"count": 0, "results": []})),
            }
        }

        let app = Router::new()
            .route("/api/people/", get(people))
            .route("/api/planets/", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/api/starships/", get(|| async { "<html>maintenance</html>" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/api", addr)
    }

    async fn client() -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url: spawn_catalog().await,
            ..CatalogConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_first_result() {
        let client = client().await;

        let entry = client.search(Category::People, "Luke Skywalker").await.unwrap();

        assert_eq!(entry.unwrap().name(), Some("Luke Skywalker"));
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let client = client().await;

        let entry = client.search(Category::People, "Not-A-Character").await.unwrap();

        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_err() {
        let client = client().await;

        let err = client.search(Category::Planets, "Tatooine").await.unwrap_err();

        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_err() {
        let client = client().await;

        let err = client.search(Category::Starships, "X-wing").await.unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to parse catalog search response"));
    }

    #[test]
    fn test_search_url_strips_trailing_slash() {
        let client = CatalogClient::new(&CatalogConfig {
            base_url: "https://swapi.dev/api/".to_string(),
            ..CatalogConfig::default()
        })
        .unwrap();

        assert_eq!(client.search_url(Category::Starships), "https://swapi.dev/api/starships/");
    }
}
