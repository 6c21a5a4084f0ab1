//! Error types for settings, backend calls, media and the application as a whole.
//!
//! Nothing here is fatal to the presentation controller. Callers log the error and
//! fall back to defaults, an empty collection, the last-known display or white clock text.

use std::error::Error as StdError;
use std::fmt;

/// Problems with the kiosk settings file or the screensaver configuration document.
#[must_use = "a settings error should be handled or propagated"]
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    Io(std::io::Error),
    /// The INI or JSON content is malformed.
    Parse(String),
    /// A required settings key is absent.
    MissingKey(String),
    /// A key is present but its value cannot be used.
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read settings: {e}"),
            Self::Parse(detail) => write!(f, "malformed configuration: {detail}"),
            Self::MissingKey(key) => write!(f, "settings key `{key}` is required"),
            Self::InvalidValue { key, message } => write!(f, "settings key `{key}` is unusable: {message}"),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Self::Io(e) = self {
            return Some(e);
        }
        None
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Failures talking to the screensaver backend.
#[must_use = "a backend error should be handled or propagated"]
#[derive(Debug)]
pub enum ApiError {
    /// Transport failure, timeout or undecodable body.
    Reqwest(reqwest::Error),
    /// A JSON payload did not match the expected shape.
    SerdeJson(serde_json::Error),
    /// An endpoint or image URL could not be built.
    UrlParse(url::ParseError),
    /// The backend answered with a non-2xx status.
    HttpError { status: reqwest::StatusCode, message: String },
    /// Any other backend failure.
    Generic(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reqwest(e) => write!(f, "request to backend failed: {e}"),
            Self::SerdeJson(e) => write!(f, "backend sent unexpected JSON: {e}"),
            Self::UrlParse(e) => write!(f, "bad backend URL: {e}"),
            Self::HttpError { status, message } => write!(f, "backend answered {status}: {message}"),
            Self::Generic(detail) => f.write_str(detail),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let source: &(dyn StdError + 'static) = match self {
            Self::Reqwest(e) => e,
            Self::SerdeJson(e) => e,
            Self::UrlParse(e) => e,
            Self::HttpError { .. } | Self::Generic(_) => return None,
        };
        Some(source)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Reqwest(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerdeJson(err)
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::UrlParse(err)
    }
}

/// Failures producing pixels: photo and artwork decoding, dashboard snapshots.
#[must_use = "a media error should be handled or propagated"]
#[derive(Debug)]
pub enum MediaError {
    /// Local I/O failed while handling media.
    Io(std::io::Error),
    /// The bytes are not a decodable image.
    Image(image::ImageError),
    /// The bytes never arrived.
    Fetch(ApiError),
    /// The headless browser could not capture the dashboard.
    HeadlessChrome(String),
    /// Any other media failure, such as a panicked decode task.
    Generic(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "media I/O failed: {e}"),
            Self::Image(e) => write!(f, "cannot decode image: {e}"),
            Self::Fetch(e) => write!(f, "cannot fetch image: {e}"),
            Self::HeadlessChrome(detail) => write!(f, "dashboard capture failed: {detail}"),
            Self::Generic(detail) => f.write_str(detail),
        }
    }
}

impl StdError for MediaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let source: &(dyn StdError + 'static) = match self {
            Self::Io(e) => e,
            Self::Image(e) => e,
            Self::Fetch(e) => e,
            Self::HeadlessChrome(_) | Self::Generic(_) => return None,
        };
        Some(source)
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err)
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        MediaError::Image(err)
    }
}

impl From<ApiError> for MediaError {
    fn from(err: ApiError) -> Self {
        MediaError::Fetch(err)
    }
}

/// Whatever `main` can end with.
#[must_use = "an application error should be handled or propagated"]
#[derive(Debug)]
pub enum AppError {
    /// Settings could not be loaded.
    Config(ConfigError),
    /// The backend client could not be set up.
    Api(ApiError),
    /// Media handling failed outside the controller.
    Media(MediaError),
    /// The window or another top-level component failed.
    Generic(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => fmt::Display::fmt(e, f),
            Self::Api(e) => fmt::Display::fmt(e, f),
            Self::Media(e) => fmt::Display::fmt(e, f),
            Self::Generic(detail) => f.write_str(detail),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let source: &(dyn StdError + 'static) = match self {
            Self::Config(e) => e,
            Self::Api(e) => e,
            Self::Media(e) => e,
            Self::Generic(_) => return None,
        };
        Some(source)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err)
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err)
    }
}

impl From<eframe::Error> for AppError {
    fn from(err: eframe::Error) -> Self {
        Self::Generic(format!("window failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "settings.ini");
        let app: AppError = ConfigError::from(io).into();
        assert!(app.to_string().contains("settings.ini"));
        assert!(app.source().is_some());
        assert!(AppError::Generic("x".into()).source().is_none());
    }

    #[test]
    fn fetch_failures_convert_into_media_errors() {
        let err: MediaError = ApiError::Generic("offline".into()).into();
        assert!(matches!(err, MediaError::Fetch(ApiError::Generic(_))));
        assert!(err.to_string().contains("offline"));
        assert!(err.source().is_some());
    }

    #[test]
    fn json_errors_become_parse_errors_for_config() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ConfigError::from(err), ConfigError::Parse(_)));
    }
}
