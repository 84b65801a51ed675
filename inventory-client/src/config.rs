//! Client configuration

/// Endpoint paths of the remote document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Batch-write endpoint (POST `{collection, docs}`)
    pub write: String,
    /// Group listing / group-read endpoint (GET, `?variantGroupId=` for one group)
    pub groups: String,
    /// Taxonomy documents (GET)
    pub taxonomies: String,
    /// Storage locations (GET)
    pub storages: String,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            write: "/api/products-import/upload".to_string(),
            groups: "/api/inventory-variants".to_string(),
            taxonomies: "/api/taxonomies".to_string(),
            storages: "/api/storage".to_string(),
        }
    }
}

/// Client configuration for connecting to the remote document store
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Store base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Endpoint paths
    pub paths: StorePaths,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            paths: StorePaths::default(),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Override endpoint paths
    pub fn with_paths(mut self, paths: StorePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Create an HTTP store from this configuration
    pub fn build_http_store(&self) -> crate::ClientResult<super::HttpDocumentStore> {
        super::HttpDocumentStore::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://store.local")
            .with_token("secret")
            .with_timeout(5);

        assert_eq!(config.base_url, "http://store.local");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, 5);
        assert_eq!(config.paths.write, "/api/products-import/upload");
    }
}
