//! Clock text color from the brightness of the photo behind it.
//!
//! Photos are shown cover-fitted: the viewport is filled and whichever dimension
//! overflows is cropped evenly on both sides. The clock's screen position therefore
//! maps to a point inside that visible crop, and a small region around it is averaged.

use image::RgbaImage;

use crate::model::{ClockPosition, TextColor};

/// Luma at or above this selects dark text.
pub const LUMA_THRESHOLD: f64 = 128.0;

/// Sampled region size as a fraction of the visible crop.
const REGION_WIDTH_FRACTION: f64 = 0.3;
const REGION_HEIGHT_FRACTION: f64 = 0.15;

/// Upper bound on pixels read per axis; larger regions are strided.
const MAX_SAMPLES_PER_AXIS: u32 = 64;

/// A rectangle in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Part of an `image_width`×`image_height` image visible when cover-fitted to the viewport.
pub fn visible_crop(image_width: u32, image_height: u32, viewport_width: f32, viewport_height: f32) -> CropRect {
    if image_width == 0 || image_height == 0 || viewport_width <= 0.0 || viewport_height <= 0.0 {
        return CropRect { x: 0, y: 0, width: image_width, height: image_height };
    }
    let image_aspect = f64::from(image_width) / f64::from(image_height);
    let viewport_aspect = f64::from(viewport_width) / f64::from(viewport_height);

    if image_aspect > viewport_aspect {
        // Wider than the viewport: sides are cut off.
        let width = ((f64::from(image_height) * viewport_aspect).round() as u32).clamp(1, image_width);
        CropRect { x: (image_width - width) / 2, y: 0, width, height: image_height }
    } else {
        let height = ((f64::from(image_width) / viewport_aspect).round() as u32).clamp(1, image_height);
        CropRect { x: 0, y: (image_height - height) / 2, width: image_width, height }
    }
}

/// Region of `crop` under the clock at `position`.
pub fn clock_region(crop: CropRect, position: ClockPosition) -> CropRect {
    let width = ((f64::from(crop.width) * REGION_WIDTH_FRACTION).round() as u32).clamp(1, crop.width.max(1));
    let height = ((f64::from(crop.height) * REGION_HEIGHT_FRACTION).round() as u32).clamp(1, crop.height.max(1));
    let x = match position.column() {
        0 => 0,
        1 => (crop.width.saturating_sub(width)) / 2,
        _ => crop.width.saturating_sub(width),
    };
    let y = match position.row() {
        0 => 0,
        1 => (crop.height.saturating_sub(height)) / 2,
        _ => crop.height.saturating_sub(height),
    };
    CropRect { x: crop.x + x, y: crop.y + y, width, height }
}

/// Perceived brightness of one pixel (ITU-R BT.601 weights).
pub fn pixel_luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Average luma over `rect`, clipped to the image. `None` if nothing lies inside.
pub fn sample_region_luma(image: &RgbaImage, rect: CropRect) -> Option<f64> {
    let x_end = rect.x.saturating_add(rect.width).min(image.width());
    let y_end = rect.y.saturating_add(rect.height).min(image.height());
    if rect.x >= x_end || rect.y >= y_end {
        return None;
    }
    let x_step = ((x_end - rect.x) / MAX_SAMPLES_PER_AXIS).max(1) as usize;
    let y_step = ((y_end - rect.y) / MAX_SAMPLES_PER_AXIS).max(1) as usize;

    let mut total = 0.0;
    let mut count = 0u32;
    for y in (rect.y..y_end).step_by(y_step) {
        for x in (rect.x..x_end).step_by(x_step) {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            total += pixel_luma(r, g, b);
            count += 1;
        }
    }
    Some(total / f64::from(count))
}

pub fn text_color_for_luma(luma: f64) -> TextColor {
    if luma < LUMA_THRESHOLD {
        TextColor::White
    } else {
        TextColor::Black
    }
}

/// Clock color for the photo currently on screen.
///
/// A photo that has not loaded yet, or has no pixels, gets white text.
pub fn clock_text_color(
    image: Option<&RgbaImage>,
    viewport: (f32, f32),
    position: ClockPosition,
) -> TextColor {
    let Some(image) = image.filter(|img| img.width() > 0 && img.height() > 0) else {
        return TextColor::White;
    };
    let crop = visible_crop(image.width(), image.height(), viewport.0, viewport.1);
    let region = clock_region(crop, position);
    sample_region_luma(image, region).map_or(TextColor::White, text_color_for_luma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn grey_luma_equals_its_channel_value() {
        let image = solid(40, 40, 200);
        let luma = sample_region_luma(&image, CropRect { x: 0, y: 0, width: 40, height: 40 }).unwrap();
        assert!((luma - 200.0).abs() < 1e-6);
        assert_eq!(text_color_for_luma(luma), TextColor::Black);

        let dark = solid(40, 40, 10);
        let luma = sample_region_luma(&dark, CropRect { x: 0, y: 0, width: 40, height: 40 }).unwrap();
        assert!((luma - 10.0).abs() < 1e-6);
        assert_eq!(text_color_for_luma(luma), TextColor::White);
    }

    #[test]
    fn threshold_is_inclusive_for_black() {
        assert_eq!(text_color_for_luma(127.9), TextColor::White);
        assert_eq!(text_color_for_luma(128.0), TextColor::Black);
    }

    #[test]
    fn wide_image_is_cropped_at_the_sides() {
        // 4:1 image in a 2:1 viewport keeps the middle half.
        let crop = visible_crop(400, 100, 200.0, 100.0);
        assert_eq!(crop, CropRect { x: 100, y: 0, width: 200, height: 100 });
    }

    #[test]
    fn tall_image_is_cropped_top_and_bottom() {
        let crop = visible_crop(100, 400, 200.0, 100.0);
        assert_eq!(crop, CropRect { x: 0, y: 175, width: 100, height: 50 });
    }

    #[test]
    fn bottom_center_region_hugs_the_bottom_edge() {
        let crop = CropRect { x: 0, y: 0, width: 1000, height: 1000 };
        let region = clock_region(crop, ClockPosition::BottomCenter);
        assert_eq!(region, CropRect { x: 350, y: 850, width: 300, height: 150 });
        let region = clock_region(crop, ClockPosition::TopRight);
        assert_eq!(region, CropRect { x: 700, y: 0, width: 300, height: 150 });
    }

    #[test]
    fn samples_only_the_clock_region() {
        // Dark top half, bright bottom half.
        let mut image = solid(100, 100, 10);
        for y in 50..100 {
            for x in 0..100 {
                image.put_pixel(x, y, Rgba([240, 240, 240, 255]));
            }
        }
        assert_eq!(clock_text_color(Some(&image), (100.0, 100.0), ClockPosition::BottomCenter), TextColor::Black);
        assert_eq!(clock_text_color(Some(&image), (100.0, 100.0), ClockPosition::TopLeft), TextColor::White);
    }

    #[test]
    fn cropped_away_pixels_do_not_count() {
        // Bright strips at the far left and right are outside the cover crop.
        let mut image = solid(400, 100, 10);
        for y in 0..100 {
            for x in (0..100).chain(300..400) {
                image.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        assert_eq!(clock_text_color(Some(&image), (200.0, 100.0), ClockPosition::BottomLeft), TextColor::White);
    }

    #[test]
    fn missing_or_empty_image_defaults_to_white() {
        assert_eq!(clock_text_color(None, (1920.0, 1080.0), ClockPosition::BottomCenter), TextColor::White);
        let empty = RgbaImage::new(0, 0);
        assert_eq!(clock_text_color(Some(&empty), (1920.0, 1080.0), ClockPosition::BottomCenter), TextColor::White);
    }

    #[test]
    fn out_of_bounds_region_yields_nothing() {
        let image = solid(10, 10, 100);
        assert_eq!(sample_region_luma(&image, CropRect { x: 20, y: 20, width: 5, height: 5 }), None);
    }
}
