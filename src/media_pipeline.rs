//! Handles media fetching, decoding and capture.
//!
//! This module is responsible for:
//! - Fetching photo and album-art bytes from the backend and decoding them to RGBA.
//! - Capturing the dashboard page as a snapshot using a headless browser.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, error, info, trace, warn};

use super::api_client::DataService;
use super::errors::MediaError;

/// Decodes image bytes of any supported format into RGBA pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, MediaError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Fetches and decodes the image behind `reference`.
///
/// Decoding runs on the blocking pool so large photos do not stall the controller.
#[must_use = "fetching an image can fail; the Result must be handled"]
pub async fn load_image(service: &dyn DataService, reference: &str) -> Result<Arc<RgbaImage>, MediaError> {
    debug!("Fetching image: '{}'", reference);
    let bytes = service.fetch_image_bytes(reference).await.map_err(|e| {
        error!("Error fetching image '{}': {}", reference, e);
        MediaError::Fetch(e)
    })?;

    trace!("Decoding image: {} ({} bytes)", reference, bytes.len());
    let reference_for_log = reference.to_string();
    let image = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| MediaError::Generic(format!("Decode task for {} panicked: {}", reference_for_log, e)))?
        .map_err(|e| {
            error!("Error decoding image '{}': {}", reference, e);
            e
        })?;
    debug!("Decoded image '{}' ({}x{})", reference, image.width(), image.height());
    Ok(Arc::new(image))
}

/// Captures a snapshot of the dashboard at `url` using a headless Chrome browser.
/// The snapshot is fitted to a `width`×`height` canvas.
#[must_use = "dashboard capture can fail; the Result must be handled"]
pub async fn capture_dashboard(url: String, width: u32, height: u32) -> Result<RgbaImage, MediaError> {
    info!("Starting dashboard capture for URL: {}", url);

    tokio::task::spawn_blocking(move || -> Result<RgbaImage, MediaError> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .build()
            .map_err(|e| {
                error!("Failed to build headless Chrome launch options for {}: {}", url, e);
                MediaError::HeadlessChrome(e.to_string())
            })?;

        debug!("Launching browser for: {}", url);
        let browser = Browser::new(launch_options).map_err(|e| {
            error!("Failed to launch headless Chrome for {}: {}", url, e);
            MediaError::HeadlessChrome(e.to_string())
        })?;

        let tab = browser.new_tab().map_err(|e| {
            error!("Failed to create new tab for {}: {}", url, e);
            MediaError::HeadlessChrome(e.to_string())
        })?;

        debug!("Navigating to: {}", url);
        tab.navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| {
                error!("Failed to load {} in headless Chrome: {}", url, e);
                MediaError::HeadlessChrome(e.to_string())
            })?;

        // Dashboards render their cards after navigation completes.
        std::thread::sleep(StdDuration::from_secs(3));

        let png_data = tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| {
                error!("Failed to capture screenshot for {}: {}", url, e);
                MediaError::HeadlessChrome(e.to_string())
            })?;

        if let Err(e) = tab.close(true) {
            warn!("Failed to close tab for {}: {} (non-critical)", url, e);
        }

        let captured = image::load_from_memory_with_format(&png_data, ImageFormat::Png)?;
        let fitted = fit_to_canvas(captured, width, height);
        info!("Captured dashboard snapshot for {}", url);
        Ok(fitted)
    })
    .await
    .map_err(|e| MediaError::Generic(format!("Dashboard capture task panicked: {}", e)))?
}

/// Crops from the top-left if larger, pads with white if smaller.
fn fit_to_canvas(captured: DynamicImage, width: u32, height: u32) -> RgbaImage {
    if captured.width() == width && captured.height() == height {
        return captured.to_rgba8();
    }
    debug!("Fitting snapshot from {}x{} to {}x{}", captured.width(), captured.height(), width, height);
    let mut canvas = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let cropped = captured.crop_imm(0, 0, captured.width().min(width), captured.height().min(height));
    image::imageops::overlay(&mut canvas, &cropped.to_rgba8(), 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn decodes_png_bytes() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let decoded = decode_image(&png_bytes(&source)).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        assert!(matches!(decode_image(b"not an image"), Err(MediaError::Image(_))));
    }

    #[test]
    fn small_snapshots_are_padded_white() {
        let small = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let fitted = fit_to_canvas(small, 4, 3);
        assert_eq!(fitted.dimensions(), (4, 3));
        assert_eq!(fitted.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(fitted.get_pixel(3, 2), &Rgba([255, 255, 255, 255]));
    }
}
