//! HTTP document store

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::models::{GroupListing, RawGroup};
use shared::store::{WriteRequest, WriteResponse};

use crate::{ClientConfig, ClientError, ClientResult, DocumentStore, TaxonomySource, config::StorePaths};

/// Document store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    token: Option<String>,
    paths: StorePaths,
}

impl HttpDocumentStore {
    /// Create a new HTTP store from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            paths: config.paths.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: serde::Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let text = if body.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                body
            };
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Status {
                    status: status.as_u16(),
                    message: text,
                }),
            };
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn batch_write(&self, request: &WriteRequest) -> ClientResult<WriteResponse> {
        tracing::debug!(
            collection = %request.collection,
            docs = request.len(),
            deletes = request.docs.iter().filter(|d| d.data.get(shared::store::DELETE_MARKER).is_some()).count(),
            "POST batch write"
        );
        self.post(&self.paths.write, request).await
    }

    async fn read_group(&self, group_id: &str) -> ClientResult<Option<RawGroup>> {
        let listing: GroupListing = self
            .get(&self.paths.groups, &[("variantGroupId", group_id)])
            .await?;
        Ok(listing.items.into_iter().next())
    }

    async fn list_groups(&self) -> ClientResult<GroupListing> {
        self.get(&self.paths.groups, &[]).await
    }
}

#[async_trait]
impl TaxonomySource for HttpDocumentStore {
    async fn load_taxonomies(&self) -> ClientResult<Value> {
        self.get(&self.paths.taxonomies, &[]).await
    }

    async fn load_storages(&self) -> ClientResult<Value> {
        self.get(&self.paths.storages, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let store = HttpDocumentStore::new(&ClientConfig::new("http://localhost:3000/")).unwrap();
        assert_eq!(store.url("/api/storage"), "http://localhost:3000/api/storage");
        assert_eq!(store.url("api/storage"), "http://localhost:3000/api/storage");
    }

    #[test]
    fn test_auth_header() {
        let store = HttpDocumentStore::new(&ClientConfig::new("http://x")).unwrap();
        assert!(store.auth_header().is_none());

        let store = store.with_token("abc");
        assert_eq!(store.auth_header().as_deref(), Some("Bearer abc"));
    }
}
