//! Handles all interactions with the screensaver backend.
//!
//! The presentation controller only depends on the `DataService` trait. `ApiClient`
//! implements it over HTTP with `reqwest`: configuration, the photo collection, weather
//! and media-player state are plain request/response calls, and media controls are
//! fire-and-forget POSTs.

use async_trait::async_trait;
use log::{debug, error, info, trace};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::config::ScreensaverConfig;
use super::errors::ApiError;
use super::model::{MediaAction, MediaState, PhotoEntry, WeatherState};

/// The request/response data service the controller consumes.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn fetch_config(&self) -> Result<ScreensaverConfig, ApiError>;

    /// The collection may differ between calls; the backend rescans storage each time.
    async fn fetch_photos(&self) -> Result<Vec<PhotoEntry>, ApiError>;

    /// `None` when no weather source is configured or upstream is unavailable.
    async fn fetch_weather(&self) -> Result<Option<WeatherState>, ApiError>;

    /// `None` when no media player is configured or upstream is unavailable.
    async fn fetch_media(&self) -> Result<Option<MediaState>, ApiError>;

    async fn media_control(&self, action: MediaAction) -> Result<(), ApiError>;

    /// Raw bytes for a photo or artwork reference.
    async fn fetch_image_bytes(&self, reference: &str) -> Result<Vec<u8>, ApiError>;
}

/// HTTP client for the backend at `base_url`.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// Resolves an endpoint path or an image reference to a full URL.
    ///
    /// Absolute `http(s)` references (e.g. CDN album art) are used as-is; anything
    /// else is joined onto the backend base URL.
    pub fn resolve(&self, reference: &str) -> Result<Url, ApiError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(Url::parse(reference)?);
        }
        let path = reference.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.resolve(path)?;
        trace!("GET {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Request error fetching {}: {:?}", url, e);
            ApiError::Reqwest(e)
        })?;
        let response = response.error_for_status().map_err(|e| {
            let status = e.status().unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            error!("HTTP error fetching {}: {} - {}", url, status, e);
            ApiError::HttpError { status, message: e.to_string() }
        })?;
        let body = response.bytes().await.map_err(ApiError::Reqwest)?;
        serde_json::from_slice::<T>(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", url, e);
            ApiError::SerdeJson(e)
        })
    }

    async fn post_json(&self, path: &str, payload: serde_json::Value) -> Result<(), ApiError> {
        let url = self.resolve(path)?;
        trace!("POST {} {}", url, payload);
        let response = self.client.post(url.clone()).json(&payload).send().await.map_err(|e| {
            error!("Request error posting to {}: {:?}", url, e);
            ApiError::Reqwest(e)
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let error_message = response.text().await.unwrap_or_else(|e| format!("N/A (failed to read error body: {})", e));
            error!("POST {} failed. Status: {}, Body: {}", url, status, error_message);
            return Err(ApiError::HttpError { status, message: error_message });
        }
        // The backend answers {"ok": bool}; false means the player call failed upstream.
        let ack: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        if ack.get("ok").and_then(|ok| ok.as_bool()) == Some(false) {
            return Err(ApiError::Generic(format!("Backend rejected {}", path)));
        }
        Ok(())
    }
}

/// Backend endpoint and body for a control action.
pub fn control_request(action: MediaAction) -> (&'static str, serde_json::Value) {
    match action {
        MediaAction::PlayPause => ("/api/media/play_pause", serde_json::json!({})),
        MediaAction::Next => ("/api/media/next", serde_json::json!({})),
        MediaAction::Previous => ("/api/media/previous", serde_json::json!({})),
        MediaAction::SetVolume(level) => {
            let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
            ("/api/media/volume", serde_json::json!({ "volume_level": level }))
        }
    }
}

#[async_trait]
impl DataService for ApiClient {
    async fn fetch_config(&self) -> Result<ScreensaverConfig, ApiError> {
        let config: ScreensaverConfig = self.get_json("/api/config").await?;
        info!("Fetched screensaver config: {:?}", config);
        Ok(config)
    }

    async fn fetch_photos(&self) -> Result<Vec<PhotoEntry>, ApiError> {
        let photos: Vec<PhotoEntry> = self.get_json("/api/photos").await?;
        info!("Fetched {} photos", photos.len());
        Ok(photos)
    }

    async fn fetch_weather(&self) -> Result<Option<WeatherState>, ApiError> {
        let weather: Option<WeatherState> = self.get_json("/api/weather").await?;
        debug!("Fetched weather: {:?}", weather);
        Ok(weather)
    }

    async fn fetch_media(&self) -> Result<Option<MediaState>, ApiError> {
        let media: Option<MediaState> = self.get_json("/api/media").await?;
        trace!("Fetched media state: {:?}", media);
        Ok(media)
    }

    async fn media_control(&self, action: MediaAction) -> Result<(), ApiError> {
        let (path, payload) = control_request(action);
        debug!("Issuing media control {:?}", action);
        self.post_json(path, payload).await
    }

    async fn fetch_image_bytes(&self, reference: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.resolve(reference)?;
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Request error fetching image {}: {:?}", url, e);
            ApiError::Reqwest(e)
        })?;
        let response = response.error_for_status().map_err(|e| {
            let status = e.status().unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            error!("HTTP error {} fetching image {}", status, url);
            ApiError::HttpError { status, message: e.to_string() }
        })?;
        let bytes = response.bytes().await.map_err(|e| {
            error!("Error reading image bytes for {}: {:?}", url, e);
            ApiError::Reqwest(e)
        })?;
        trace!("Fetched {} bytes for image {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_references_join_the_backend_url() {
        let api = ApiClient::new(Client::new(), "http://kiosk.local:8080/");
        assert_eq!(api.resolve("/photos/a b.jpg").unwrap().as_str(), "http://kiosk.local:8080/photos/a%20b.jpg");
        assert_eq!(api.resolve("/api/media").unwrap().as_str(), "http://kiosk.local:8080/api/media");
    }

    #[test]
    fn ingress_prefix_is_preserved() {
        let api = ApiClient::new(Client::new(), "http://ha.local/api/hassio_ingress/abc");
        assert_eq!(api.resolve("/api/photos").unwrap().as_str(), "http://ha.local/api/hassio_ingress/abc/api/photos");
    }

    #[test]
    fn absolute_artwork_urls_are_used_directly() {
        let api = ApiClient::new(Client::new(), "http://kiosk.local:8080");
        assert_eq!(api.resolve("https://cdn.example.com/art.jpg").unwrap().as_str(), "https://cdn.example.com/art.jpg");
    }

    #[test]
    fn volume_requests_are_clamped() {
        let (path, body) = control_request(MediaAction::SetVolume(1.5));
        assert_eq!(path, "/api/media/volume");
        assert_eq!(body["volume_level"], serde_json::json!(1.0));
        let (_, body) = control_request(MediaAction::SetVolume(-0.2));
        assert_eq!(body["volume_level"], serde_json::json!(0.0));
        assert_eq!(control_request(MediaAction::Next).0, "/api/media/next");
    }
}
