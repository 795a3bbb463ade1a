//! Library endpoints of the catalog API.

use crate::error::{Result, ServerClientError};
use crate::types::{ServerAlbum, ServerTrack, StreamUrlResponse};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Library client bound to one server.
pub struct LibraryClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    access_token: Option<&'a str>,
}

impl<'a> LibraryClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, access_token: Option<&'a str>) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        match self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// List every track in the library.
    pub async fn get_tracks(&self) -> Result<Vec<ServerTrack>> {
        let url = format!("{}/api/library/tracks", self.base_url);
        debug!(url = %url, "Fetching tracks");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        let tracks: Vec<ServerTrack> = parse_response(response, "tracks").await?;

        debug!(tracks = tracks.len(), "Fetched tracks");
        Ok(tracks)
    }

    /// List album groupings.
    ///
    /// Servers without album support answer 404, which maps to an empty list.
    pub async fn get_albums(&self) -> Result<Vec<ServerAlbum>> {
        let url = format!("{}/api/library/albums", self.base_url);
        debug!(url = %url, "Fetching albums");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        if response.status().as_u16() == 404 {
            debug!("Server has no album endpoint");
            return Ok(Vec::new());
        }

        let albums: Vec<ServerAlbum> = parse_response(response, "albums").await?;
        debug!(albums = albums.len(), "Fetched albums");
        Ok(albums)
    }

    /// Get a streaming URL for a storage key.
    ///
    /// The URL is time-limited and should be used promptly.
    pub async fn get_stream_url(&self, key: &str) -> Result<StreamUrlResponse> {
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        let url = format!("{}/api/library/tracks/{}/stream", self.base_url, encoded);
        debug!(url = %url, key = %key, "Getting stream URL");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        if response.status().as_u16() == 404 {
            return Err(ServerClientError::ServerError {
                status: 404,
                message: format!("Source not found: {}", key),
            });
        }

        parse_response(response, "stream").await
    }
}

fn map_send_error(e: reqwest::Error) -> ServerClientError {
    if e.is_connect() || e.is_timeout() {
        ServerClientError::ServerUnreachable(e.to_string())
    } else {
        ServerClientError::Request(e)
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse {} response: {}", what, e))
        })
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        Err(ServerClientError::AuthRequired)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(ServerClientError::ServerError {
            status: status.as_u16(),
            message: error_text,
        })
    }
}
