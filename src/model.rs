//! Defines the core data structures and enums used by the screensaver.
//!
//! This includes the display mode, photo and EXIF models returned by the backend,
//! media-player and weather states, and the small enums shared between the
//! controller and the host window (clock placement, text color, activity sources).

use log::warn;
use serde::{Deserialize, Serialize};

/// The display mode currently shown by the kiosk. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// The embedded home-automation dashboard.
    #[default]
    Dashboard,
    /// Photo slideshow with clock, EXIF overlay and weather.
    Slideshow,
    /// Media-player track info and transport controls.
    NowPlaying,
}

impl DisplayMode {
    /// Whether the screensaver (slideshow or now-playing) is up.
    pub fn is_screensaver(self) -> bool {
        !matches!(self, DisplayMode::Dashboard)
    }
}

/// Date and location metadata extracted upstream from a photo.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Exif {
    /// Human-readable capture date, e.g. "June 3, 2021".
    #[serde(default)]
    pub date: Option<String>,
    /// Reverse-geocoded place, e.g. "Lisbon, Portugal".
    #[serde(default)]
    pub location: Option<String>,
}

/// A single photo in the collection returned by the backend.
///
/// Older backends list bare URL strings; those parse as entries without EXIF data.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(from = "PhotoRecord")]
pub struct PhotoEntry {
    /// Backend-relative (or absolute) reference to the image bytes.
    pub url: String,
    pub exif: Exif,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhotoRecord {
    Url(String),
    Full {
        url: String,
        #[serde(default)]
        exif: Exif,
    },
}

impl From<PhotoRecord> for PhotoEntry {
    fn from(record: PhotoRecord) -> Self {
        match record {
            PhotoRecord::Url(url) => PhotoEntry { url, exif: Exif::default() },
            PhotoRecord::Full { url, exif } => PhotoEntry { url, exif },
        }
    }
}

/// Playback state reported by the media player.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(from = "String")]
pub enum PlaybackState {
    Playing,
    Paused,
    /// Idle, off, standby, unavailable, or anything else.
    #[default]
    Idle,
}

impl PlaybackState {
    /// Playing and paused both keep the now-playing view up.
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl From<String> for PlaybackState {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "playing" => PlaybackState::Playing,
            "paused" => PlaybackState::Paused,
            _ => PlaybackState::Idle,
        }
    }
}

/// Media-player state as polled from the backend. Never mutated locally.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MediaState {
    #[serde(rename = "state", default)]
    pub playback_state: PlaybackState,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(rename = "image_url", default)]
    pub artwork_url: Option<String>,
    /// 0.0 to 1.0 when the player reports it.
    #[serde(default)]
    pub volume_level: Option<f32>,
}

fn default_temperature_unit() -> String {
    "°C".to_string()
}

/// Weather state as polled from the backend.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct WeatherState {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,
}

/// Fire-and-forget media-player control actions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
    /// Target volume, clamped to 0.0..=1.0 before it is sent.
    SetVolume(f32),
}

/// Where the clock overlay sits on screen. Also selects the sampled photo region.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(from = "String")]
pub enum ClockPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl ClockPosition {
    /// Parses a position such as "bottom-center". Unknown values fall back to bottom-center.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "top-left" => ClockPosition::TopLeft,
            "top-center" => ClockPosition::TopCenter,
            "top-right" => ClockPosition::TopRight,
            "center-left" => ClockPosition::CenterLeft,
            "center" | "center-center" => ClockPosition::Center,
            "center-right" => ClockPosition::CenterRight,
            "bottom-left" => ClockPosition::BottomLeft,
            "bottom-center" => ClockPosition::BottomCenter,
            "bottom-right" => ClockPosition::BottomRight,
            invalid => {
                warn!("Invalid clock_position '{}', defaulting to bottom-center.", invalid);
                ClockPosition::BottomCenter
            }
        }
    }

    /// Horizontal anchor: 0 = left, 1 = center, 2 = right.
    pub fn column(self) -> u8 {
        match self {
            ClockPosition::TopLeft | ClockPosition::CenterLeft | ClockPosition::BottomLeft => 0,
            ClockPosition::TopCenter | ClockPosition::Center | ClockPosition::BottomCenter => 1,
            ClockPosition::TopRight | ClockPosition::CenterRight | ClockPosition::BottomRight => 2,
        }
    }

    /// Vertical anchor: 0 = top, 1 = center, 2 = bottom.
    pub fn row(self) -> u8 {
        match self {
            ClockPosition::TopLeft | ClockPosition::TopCenter | ClockPosition::TopRight => 0,
            ClockPosition::CenterLeft | ClockPosition::Center | ClockPosition::CenterRight => 1,
            ClockPosition::BottomLeft | ClockPosition::BottomCenter | ClockPosition::BottomRight => 2,
        }
    }
}

impl From<String> for ClockPosition {
    fn from(raw: String) -> Self {
        ClockPosition::parse(&raw)
    }
}

/// Overlay text color chosen for readability against the current background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextColor {
    /// Light text on a dark background.
    #[default]
    White,
    /// Dark text on a light background.
    Black,
}

/// Kinds of user activity that reset the idle countdown.
///
/// `FrameFocusChange` stands in for interaction inside the dashboard frame, which is
/// otherwise invisible to the host. It is imprecise: the frame merely gaining focus looks
/// the same as the user touching it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivitySource {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    FrameFocusChange,
}

impl ActivitySource {
    pub const ALL: [ActivitySource; 7] = [
        ActivitySource::PointerDown,
        ActivitySource::PointerMove,
        ActivitySource::KeyPress,
        ActivitySource::Scroll,
        ActivitySource::TouchStart,
        ActivitySource::Click,
        ActivitySource::FrameFocusChange,
    ];

    /// Sources that count as a deliberate interaction with the screensaver itself.
    pub fn is_interaction(self) -> bool {
        matches!(
            self,
            ActivitySource::PointerDown | ActivitySource::Click | ActivitySource::TouchStart | ActivitySource::KeyPress
        )
    }
}

/// One activity event forwarded by the host window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivitySignal {
    pub source: ActivitySource,
    /// Horizontal position as a fraction of the viewport width, for pointer and touch events.
    pub x_fraction: Option<f32>,
}

impl ActivitySignal {
    pub fn new(source: ActivitySource) -> Self {
        Self { source, x_fraction: None }
    }

    pub fn at(source: ActivitySource, x_fraction: f32) -> Self {
        Self { source, x_fraction: Some(x_fraction) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_state_parses_backend_payload() {
        let json = r#"{"state":"playing","title":"X","artist":"Y","album":"Z","image_url":"/api/media/image?url=%2Fapi%2Fart","volume_level":0.4}"#;
        let media: MediaState = serde_json::from_str(json).unwrap();
        assert_eq!(media.playback_state, PlaybackState::Playing);
        assert_eq!(media.title, "X");
        assert_eq!(media.artwork_url.as_deref(), Some("/api/media/image?url=%2Fapi%2Fart"));
        assert_eq!(media.volume_level, Some(0.4));
    }

    #[test]
    fn unknown_player_states_are_idle() {
        let media: MediaState = serde_json::from_str(r#"{"state":"standby"}"#).unwrap();
        assert_eq!(media.playback_state, PlaybackState::Idle);
        assert!(!media.playback_state.is_active());
        assert!(PlaybackState::from("Paused".to_string()).is_active());
    }

    #[test]
    fn photo_entry_tolerates_missing_exif() {
        let photos: Vec<PhotoEntry> =
            serde_json::from_str(r#"[{"url":"/photos/a.jpg"},{"url":"/photos/b.jpg","exif":{"date":"June 3, 2021"}}]"#).unwrap();
        assert_eq!(photos[0].exif, Exif::default());
        assert_eq!(photos[1].exif.date.as_deref(), Some("June 3, 2021"));
        assert_eq!(photos[1].exif.location, None);
    }

    #[test]
    fn bare_url_photo_lists_are_accepted() {
        let photos: Vec<PhotoEntry> = serde_json::from_str(r#"["https://picsum.photos/1920/1080?random=1"]"#).unwrap();
        assert_eq!(photos[0].url, "https://picsum.photos/1920/1080?random=1");
        assert_eq!(photos[0].exif, Exif::default());
    }

    #[test]
    fn weather_unit_defaults_to_celsius() {
        let weather: WeatherState = serde_json::from_str(r#"{"condition":"sunny","temperature":21.5}"#).unwrap();
        assert_eq!(weather.temperature_unit, "°C");
    }

    #[test]
    fn clock_position_parsing_falls_back_to_bottom_center() {
        assert_eq!(ClockPosition::parse("top-right"), ClockPosition::TopRight);
        assert_eq!(ClockPosition::parse("center"), ClockPosition::Center);
        assert_eq!(ClockPosition::parse("sideways"), ClockPosition::BottomCenter);
        assert_eq!((ClockPosition::BottomCenter.column(), ClockPosition::BottomCenter.row()), (1, 2));
    }
}
