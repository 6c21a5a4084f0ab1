//! Lays out and draws the text overlays of the screensaver.
//!
//! This module turns the display model into positioned blocks of text (clock, date,
//! weather and photo details) and paints them over the current photo.

use egui::{Align, Color32, FontId, Rect, Vec2};
use log::trace;

use crate::model::{ClockPosition, TextColor};
use crate::surface::DisplayModel;

const OVERLAY_PADDING: f32 = 40.0;
const LINE_SPACING: f32 = 6.0;
const SHADOW_OFFSET: f32 = 2.0;

// --- Text Properties Structs ---

/// One line of overlay text.
#[derive(Debug, Clone)]
pub struct OverlayLine {
    pub text: String,
    pub font_id: FontId,
}

/// A block of lines anchored at one of the nine screen positions.
#[derive(Debug, Clone)]
pub struct OverlayBlock {
    pub lines: Vec<OverlayLine>,
    pub h_align: Align,
    pub v_align: Align,
    pub color: Color32,
    /// Drop shadow keeping the text readable on busy photos.
    pub shadow: Color32,
}

/// Horizontal and vertical anchors for a clock position.
pub fn anchors(position: ClockPosition) -> (Align, Align) {
    let h_align = match position.column() {
        0 => Align::Min,
        1 => Align::Center,
        _ => Align::Max,
    };
    let v_align = match position.row() {
        0 => Align::Min,
        1 => Align::Center,
        _ => Align::Max,
    };
    (h_align, v_align)
}

pub fn text_color32(color: TextColor) -> Color32 {
    match color {
        TextColor::White => Color32::WHITE,
        TextColor::Black => Color32::BLACK,
    }
}

fn shadow_for(color: TextColor) -> Color32 {
    match color {
        TextColor::White => Color32::from_black_alpha(160),
        TextColor::Black => Color32::from_white_alpha(120),
    }
}

/// Clock, date and (when known) weather, stacked at the configured position.
pub fn clock_block(model: &DisplayModel, scale: f32) -> OverlayBlock {
    let mut lines = vec![
        OverlayLine { text: model.clock.time.clone(), font_id: FontId::proportional(96.0 * scale) },
        OverlayLine { text: model.clock.date.clone(), font_id: FontId::proportional(32.0 * scale) },
    ];
    if let Some(weather) = &model.weather {
        lines.push(OverlayLine { text: weather.label(), font_id: FontId::proportional(32.0 * scale) });
    }
    let (h_align, v_align) = anchors(model.clock_position);
    OverlayBlock { lines, h_align, v_align, color: text_color32(model.clock_color), shadow: shadow_for(model.clock_color) }
}

/// Photo date and place, in the bottom corner away from the clock.
pub fn photo_info_block(model: &DisplayModel, scale: f32) -> Option<OverlayBlock> {
    let lines: Vec<OverlayLine> = [&model.exif_date, &model.exif_location]
        .into_iter()
        .flatten()
        .filter(|text| !text.trim().is_empty())
        .map(|text| OverlayLine { text: text.clone(), font_id: FontId::proportional(22.0 * scale) })
        .collect();
    if lines.is_empty() {
        return None;
    }
    let h_align = if model.clock_position.column() == 0 { Align::Max } else { Align::Min };
    Some(OverlayBlock {
        lines,
        h_align,
        v_align: Align::Max,
        color: Color32::WHITE,
        shadow: Color32::from_black_alpha(160),
    })
}

/// Top-left corner of a block of `size` anchored inside `area`.
pub fn block_origin(area: Rect, size: Vec2, h_align: Align, v_align: Align) -> egui::Pos2 {
    let x = match h_align {
        Align::Min => area.left() + OVERLAY_PADDING,
        Align::Center => area.center().x - size.x / 2.0,
        Align::Max => area.right() - size.x - OVERLAY_PADDING,
    };
    let y = match v_align {
        Align::Min => area.top() + OVERLAY_PADDING,
        Align::Center => area.center().y - size.y / 2.0,
        Align::Max => area.bottom() - size.y - OVERLAY_PADDING,
    };
    egui::pos2(x.max(area.left()), y.max(area.top()))
}

/// Paints `block` into `area`, aligning each line within the block.
pub fn draw_overlay(ui: &egui::Ui, area: Rect, block: &OverlayBlock) {
    let painter = ui.painter_at(area);
    let galleys: Vec<_> = block
        .lines
        .iter()
        .map(|line| painter.layout_no_wrap(line.text.clone(), line.font_id.clone(), block.color))
        .collect();
    if galleys.is_empty() {
        return;
    }

    let width = galleys.iter().map(|g| g.size().x).fold(0.0, f32::max);
    let height = galleys.iter().map(|g| g.size().y).sum::<f32>() + LINE_SPACING * (galleys.len() - 1) as f32;
    let origin = block_origin(area, Vec2::new(width, height), block.h_align, block.v_align);
    trace!("Overlay block {}x{} at {:?}", width, height, origin);

    let mut y = origin.y;
    for (line, galley) in block.lines.iter().zip(galleys) {
        let x = match block.h_align {
            Align::Min => origin.x,
            Align::Center => origin.x + (width - galley.size().x) / 2.0,
            Align::Max => origin.x + width - galley.size().x,
        };
        let line_height = galley.size().y;
        painter.text(
            egui::pos2(x + SHADOW_OFFSET, y + SHADOW_OFFSET),
            egui::Align2::LEFT_TOP,
            &line.text,
            line.font_id.clone(),
            block.shadow,
        );
        painter.galley(egui::pos2(x, y), galley, block.color);
        y += line_height + LINE_SPACING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherDisplay;
    use egui::pos2;

    #[test]
    fn anchors_follow_the_clock_position() {
        assert_eq!(anchors(ClockPosition::TopLeft), (Align::Min, Align::Min));
        assert_eq!(anchors(ClockPosition::Center), (Align::Center, Align::Center));
        assert_eq!(anchors(ClockPosition::BottomRight), (Align::Max, Align::Max));
    }

    #[test]
    fn clock_block_includes_weather_when_known() {
        let mut model = DisplayModel::default();
        model.clock_color = TextColor::Black;
        assert_eq!(clock_block(&model, 1.0).lines.len(), 2);

        model.weather = Some(WeatherDisplay { icon: "☀️", condition: "sunny".into(), temperature_celsius: Some(21) });
        let block = clock_block(&model, 1.0);
        assert_eq!(block.lines.len(), 3);
        assert_eq!(block.lines[2].text, "☀️ 21°C");
        assert_eq!(block.color, Color32::BLACK);
    }

    #[test]
    fn photo_info_sits_opposite_the_clock() {
        let mut model = DisplayModel::default();
        assert!(photo_info_block(&model, 1.0).is_none());

        model.exif_date = Some("May 1, 2020".into());
        model.clock_position = ClockPosition::BottomLeft;
        assert_eq!(photo_info_block(&model, 1.0).unwrap().h_align, Align::Max);
        model.clock_position = ClockPosition::TopRight;
        assert_eq!(photo_info_block(&model, 1.0).unwrap().h_align, Align::Min);
    }

    #[test]
    fn block_origin_respects_padding() {
        let area = Rect::from_min_max(pos2(0.0, 0.0), pos2(1000.0, 500.0));
        let size = Vec2::new(200.0, 100.0);
        assert_eq!(block_origin(area, size, Align::Min, Align::Min), pos2(OVERLAY_PADDING, OVERLAY_PADDING));
        assert_eq!(block_origin(area, size, Align::Center, Align::Center), pos2(400.0, 200.0));
        assert_eq!(block_origin(area, size, Align::Max, Align::Max), pos2(1000.0 - 200.0 - OVERLAY_PADDING, 500.0 - 100.0 - OVERLAY_PADDING));
    }
}
