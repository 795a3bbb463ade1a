//! Catalog client for a Soul Player library server.

use crate::error::{Result, ServerClientError};
use crate::library::LibraryClient;
use crate::types::ServerConfig;
use async_trait::async_trait;
use reqwest::Client;
use soul_core::{Album, CatalogClient, SignedUrl, Track};
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the library API.
///
/// Implements [`CatalogClient`], so the playback engine can list the library
/// and resolve indirect sources through it.
///
/// # Example
///
/// ```ignore
/// use soul_core::CatalogClient;
/// use soul_server_client::{ServerConfig, SoulServerClient};
///
/// let client = SoulServerClient::new(ServerConfig::with_token("https://music.example.com", "token"))?;
/// let tracks = client.list_tracks().await?;
/// println!("Found {} tracks", tracks.len());
/// ```
pub struct SoulServerClient {
    http: Client,
    url: String,
    access_token: Option<String>,
}

impl SoulServerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        url::Url::parse(&url).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("SoulPlayer/{} (Playback)", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        info!(url = %url, "Created catalog client");

        Ok(Self {
            http,
            url,
            access_token: config.access_token,
        })
    }

    /// Get the server URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if the client sends an access token.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Get a library client for library operations.
    pub fn library(&self) -> LibraryClient<'_> {
        LibraryClient::new(&self.http, &self.url, self.access_token.as_deref())
    }
}

#[async_trait]
impl CatalogClient for SoulServerClient {
    async fn list_tracks(&self) -> soul_core::Result<Vec<Track>> {
        let tracks = self.library().get_tracks().await?;
        Ok(tracks.into_iter().map(|t| t.into_track()).collect())
    }

    async fn list_albums(&self) -> soul_core::Result<Vec<Album>> {
        let albums = self.library().get_albums().await?;
        Ok(albums.into_iter().map(|a| a.into_album()).collect())
    }

    async fn resolve_source(&self, key: &str) -> soul_core::Result<SignedUrl> {
        let response = self.library().get_stream_url(key).await?;
        debug!(key = %key, expires_in = response.expires_in, "Resolved signed URL");
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(SoulServerClient::new(ServerConfig::new("https://example.com")).is_ok());
        assert!(SoulServerClient::new(ServerConfig::new("http://localhost:8080")).is_ok());

        assert!(SoulServerClient::new(ServerConfig::new("")).is_err());
        assert!(SoulServerClient::new(ServerConfig::new("not-a-url")).is_err());
        assert!(SoulServerClient::new(ServerConfig::new("ftp://example.com")).is_err());
    }

    #[test]
    fn test_url_normalization() {
        let client =
            SoulServerClient::new(ServerConfig::new("https://example.com/")).expect("valid url");
        assert_eq!(client.url(), "https://example.com");
    }
}
