//! The host display the controller draws onto.
//!
//! The controller pushes changes through `Surface`; `SharedDisplay` accumulates them
//! into a `DisplayModel` snapshot that the kiosk window renders every frame.

use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;
use log::trace;

use crate::clock::ClockReading;
use crate::media_gate::{NowPlayingChanges, NowPlayingView};
use crate::model::{ActivitySource, ClockPosition, DisplayMode, PhotoEntry, TextColor};
use crate::weather::WeatherDisplay;

/// Everything the controller can change on screen.
pub trait Surface: Send {
    /// Starts forwarding the given activity sources. Called once per process.
    fn register_activity_sources(&mut self, sources: &[ActivitySource]);
    fn show_mode(&mut self, mode: DisplayMode);
    fn set_dashboard_url(&mut self, url: &str);
    /// Reloads the embedded dashboard frame.
    fn reload_frame(&mut self);
    fn set_clock_position(&mut self, position: ClockPosition);
    /// Switches to a new slide and its EXIF overlay. Pixels follow via `set_photo_pixels`.
    fn show_photo(&mut self, index: usize, photo: &PhotoEntry);
    fn set_photo_pixels(&mut self, index: usize, image: Arc<RgbaImage>);
    fn set_clock(&mut self, reading: &ClockReading);
    fn set_clock_color(&mut self, color: TextColor);
    fn set_weather(&mut self, weather: &WeatherDisplay);
    /// Applies only the parts of `view` flagged in `changes`.
    fn update_now_playing(&mut self, view: &NowPlayingView, changes: &NowPlayingChanges);
    fn set_artwork(&mut self, image: Option<Arc<RgbaImage>>);
}

/// Renderable state of the kiosk.
#[derive(Clone, Debug, Default)]
pub struct DisplayModel {
    pub mode: DisplayMode,
    pub dashboard_url: String,
    /// Incremented each time the dashboard frame must reload.
    pub frame_reloads: u64,
    pub activity_sources: Vec<ActivitySource>,
    pub photo_index: Option<usize>,
    pub photo: Option<Arc<RgbaImage>>,
    /// Incremented whenever `photo` changes, so renderers can refresh textures.
    pub photo_revision: u64,
    pub exif_date: Option<String>,
    pub exif_location: Option<String>,
    pub clock: ClockReading,
    pub clock_color: TextColor,
    pub clock_position: ClockPosition,
    pub weather: Option<WeatherDisplay>,
    pub now_playing: NowPlayingView,
    pub artwork: Option<Arc<RgbaImage>>,
    pub artwork_revision: u64,
}

/// Thread-safe `Surface` backed by a shared `DisplayModel`.
#[derive(Clone, Default)]
pub struct SharedDisplay {
    model: Arc<Mutex<DisplayModel>>,
    notify: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SharedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `notify` after every change, e.g. to request a repaint.
    pub fn with_notifier(mut self, notify: impl Fn() + Send + Sync + 'static) -> Self {
        self.notify = Some(Arc::new(notify));
        self
    }

    /// A copy of the current model. Images are shared, not copied.
    pub fn snapshot(&self) -> DisplayModel {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DisplayModel> {
        self.model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&mut self, apply: impl FnOnce(&mut DisplayModel)) {
        apply(&mut self.lock());
        if let Some(notify) = &self.notify {
            notify();
        }
    }
}

impl Surface for SharedDisplay {
    fn register_activity_sources(&mut self, sources: &[ActivitySource]) {
        self.update(|m| {
            for source in sources {
                if !m.activity_sources.contains(source) {
                    m.activity_sources.push(*source);
                }
            }
        });
    }

    fn show_mode(&mut self, mode: DisplayMode) {
        trace!("Display mode -> {:?}", mode);
        self.update(|m| {
            m.mode = mode;
            if mode == DisplayMode::Dashboard {
                m.photo_index = None;
                m.photo = None;
                m.photo_revision += 1;
                m.exif_date = None;
                m.exif_location = None;
            }
        });
    }

    fn set_dashboard_url(&mut self, url: &str) {
        self.update(|m| m.dashboard_url = url.to_string());
    }

    fn reload_frame(&mut self) {
        self.update(|m| m.frame_reloads += 1);
    }

    fn set_clock_position(&mut self, position: ClockPosition) {
        self.update(|m| m.clock_position = position);
    }

    fn show_photo(&mut self, index: usize, photo: &PhotoEntry) {
        self.update(|m| {
            m.photo_index = Some(index);
            m.photo = None;
            m.photo_revision += 1;
            m.exif_date = photo.exif.date.clone();
            m.exif_location = photo.exif.location.clone();
        });
    }

    fn set_photo_pixels(&mut self, index: usize, image: Arc<RgbaImage>) {
        self.update(|m| {
            if m.photo_index == Some(index) {
                m.photo = Some(image);
                m.photo_revision += 1;
            }
        });
    }

    fn set_clock(&mut self, reading: &ClockReading) {
        self.update(|m| m.clock = reading.clone());
    }

    fn set_clock_color(&mut self, color: TextColor) {
        self.update(|m| m.clock_color = color);
    }

    fn set_weather(&mut self, weather: &WeatherDisplay) {
        self.update(|m| m.weather = Some(weather.clone()));
    }

    fn update_now_playing(&mut self, view: &NowPlayingView, changes: &NowPlayingChanges) {
        self.update(|m| {
            if changes.track {
                m.now_playing.title = view.title.clone();
                m.now_playing.artist = view.artist.clone();
                m.now_playing.album = view.album.clone();
            }
            if changes.artwork {
                m.now_playing.artwork_url = view.artwork_url.clone();
            }
            if changes.transport {
                m.now_playing.transport = view.transport;
            }
            if changes.volume {
                m.now_playing.volume = view.volume;
            }
        });
    }

    fn set_artwork(&mut self, image: Option<Arc<RgbaImage>>) {
        self.update(|m| {
            m.artwork = image;
            m.artwork_revision += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_gate::TransportIcon;
    use crate::model::Exif;

    #[test]
    fn pixels_for_a_previous_slide_are_ignored() {
        let mut display = SharedDisplay::new();
        let photo = PhotoEntry { url: "/photos/a.jpg".into(), exif: Exif { date: Some("May 1, 2020".into()), location: None } };
        display.show_photo(3, &photo);
        display.set_photo_pixels(2, Arc::new(RgbaImage::new(2, 2)));
        assert!(display.snapshot().photo.is_none());
        display.set_photo_pixels(3, Arc::new(RgbaImage::new(2, 2)));
        let model = display.snapshot();
        assert!(model.photo.is_some());
        assert_eq!(model.exif_date.as_deref(), Some("May 1, 2020"));
    }

    #[test]
    fn now_playing_applies_only_flagged_changes() {
        let mut display = SharedDisplay::new();
        let view = NowPlayingView { title: "X".into(), transport: TransportIcon::Pause, volume: Some(0.3), ..Default::default() };
        display.update_now_playing(&view, &NowPlayingChanges { track: true, ..Default::default() });
        let model = display.snapshot();
        assert_eq!(model.now_playing.title, "X");
        assert_eq!(model.now_playing.transport, TransportIcon::Play);
        assert_eq!(model.now_playing.volume, None);
    }

    #[test]
    fn notifier_runs_on_every_change() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = count.clone();
        let mut display = SharedDisplay::new().with_notifier(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        display.show_mode(DisplayMode::Slideshow);
        display.reload_frame();
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(display.snapshot().frame_reloads, 1);
    }
}
