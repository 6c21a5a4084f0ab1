//! Manages the window-side state: GPU textures and the pending dashboard capture.
//!
//! The controller only hands over decoded pixels. This module uploads them as egui
//! textures once per revision and keeps the result of the background dashboard capture
//! until the next frame picks it up.

use std::sync::{Arc, Mutex};

use egui::{ColorImage as EguiColorImage, TextureHandle, TextureOptions};
use image::RgbaImage;
use log::{debug, trace, warn};

use super::errors::MediaError;

/// Converts decoded RGBA pixels to an egui image.
pub fn to_color_image(image: &RgbaImage) -> EguiColorImage {
    let size = [image.width() as usize, image.height() as usize];
    EguiColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// A texture tied to the revision of the pixels it was uploaded from.
#[derive(Default)]
pub struct RevisionedTexture {
    name: &'static str,
    revision: Option<u64>,
    texture: Option<TextureHandle>,
}

impl RevisionedTexture {
    pub fn new(name: &'static str) -> Self {
        Self { name, revision: None, texture: None }
    }

    /// Returns the texture for `image` at `revision`, uploading only when the revision changed.
    pub fn sync(&mut self, ctx: &egui::Context, revision: u64, image: Option<&Arc<RgbaImage>>) -> Option<&TextureHandle> {
        if self.revision != Some(revision) {
            self.revision = Some(revision);
            self.texture = image.map(|img| {
                debug!("Uploading {} texture (revision {}, {}x{})", self.name, revision, img.width(), img.height());
                ctx.load_texture(self.name, to_color_image(img), TextureOptions::LINEAR)
            });
            if self.texture.is_none() {
                trace!("Cleared {} texture (revision {})", self.name, revision);
            }
        }
        self.texture.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.texture.is_some()
    }
}

/// Holds textures for everything the kiosk window draws.
pub struct TextureCache {
    pub photo: RevisionedTexture,
    pub artwork: RevisionedTexture,
    pub dashboard: Option<TextureHandle>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            photo: RevisionedTexture::new("photo"),
            artwork: RevisionedTexture::new("artwork"),
            dashboard: None,
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the background dashboard capture for one frame-reload count.
#[derive(Debug, Default)]
pub struct DashboardCapture {
    /// Reload count the most recent capture was started for.
    requested: Option<u64>,
    /// Result of a finished capture, waiting to be turned into a texture.
    pub pending: Arc<Mutex<Option<Result<RgbaImage, MediaError>>>>,
}

impl DashboardCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a capture should start for `reloads`. Marks it as requested when true.
    pub fn needs_capture(&mut self, url: &str, reloads: u64) -> bool {
        if url.is_empty() || self.requested == Some(reloads) {
            return false;
        }
        self.requested = Some(reloads);
        true
    }

    /// Takes a finished capture, if any.
    pub fn take_finished(&self) -> Option<RgbaImage> {
        let mut guard = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.take()? {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Dashboard capture failed, keeping previous snapshot: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn color_image_keeps_dimensions_and_pixels() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let color = to_color_image(&image);
        assert_eq!(color.size, [3, 2]);
        assert_eq!(color.pixels[0], egui::Color32::from_rgb(1, 2, 3));
    }

    #[test]
    fn capture_is_requested_once_per_reload() {
        let mut capture = DashboardCapture::new();
        assert!(!capture.needs_capture("", 0));
        assert!(capture.needs_capture("http://ha.local", 0));
        assert!(!capture.needs_capture("http://ha.local", 0));
        assert!(capture.needs_capture("http://ha.local", 1));
    }

    #[test]
    fn failed_capture_yields_nothing() {
        let capture = DashboardCapture::new();
        assert!(capture.take_finished().is_none());
        *capture.pending.lock().unwrap() = Some(Err(MediaError::HeadlessChrome("no chrome".into())));
        assert!(capture.take_finished().is_none());
        *capture.pending.lock().unwrap() = Some(Ok(RgbaImage::new(4, 4)));
        assert_eq!(capture.take_finished().unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn texture_uploads_only_on_new_revisions() {
        let ctx = egui::Context::default();
        let image = Arc::new(RgbaImage::new(2, 2));
        let mut texture = RevisionedTexture::new("photo");
        let first = texture.sync(&ctx, 1, Some(&image)).map(|t| t.id());
        assert!(first.is_some());
        assert_eq!(texture.sync(&ctx, 1, None).map(|t| t.id()), first);
        assert!(texture.sync(&ctx, 2, None).is_none());
        assert!(!texture.is_loaded());
    }
}
