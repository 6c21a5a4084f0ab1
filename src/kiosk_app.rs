//! The kiosk window.
//!
//! `KioskApp` renders the controller's `DisplayModel` every frame and forwards user
//! input back to the controller as activity signals. It owns no presentation state of
//! its own beyond textures and the in-flight dashboard capture.

use eframe::egui;
use egui::{Align, CentralPanel, Color32, Frame, Layout, Rect, RichText, TouchPhase, Vec2};
use log::{debug, info, trace};

use crate::controller::ControllerHandle;
use crate::luma::visible_crop;
use crate::media_pipeline::capture_dashboard;
use crate::model::{ActivitySignal, ActivitySource, DisplayMode, MediaAction};
use crate::state_manager::{DashboardCapture, TextureCache};
use crate::surface::{DisplayModel, SharedDisplay};
use crate::text_renderer::{clock_block, draw_overlay, photo_info_block};

/// Reference height the overlay font sizes are designed for.
const DESIGN_HEIGHT: f32 = 1080.0;

pub struct KioskApp {
    display: SharedDisplay,
    controller: ControllerHandle,
    runtime: tokio::runtime::Handle,
    textures: TextureCache,
    capture: DashboardCapture,
    capture_size: (u32, u32),
    last_size: Option<Vec2>,
    /// Volume being dragged, sent once the drag ends.
    volume_draft: Option<f32>,
}

impl KioskApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        display: SharedDisplay,
        controller: ControllerHandle,
        runtime: tokio::runtime::Handle,
        capture_size: (u32, u32),
    ) -> Self {
        info!("Initializing kiosk window ({}x{} capture).", capture_size.0, capture_size.1);
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self {
            display,
            controller,
            runtime,
            textures: TextureCache::new(),
            capture: DashboardCapture::new(),
            capture_size,
            last_size: None,
            volume_draft: None,
        }
    }

    fn track_viewport(&mut self, ctx: &egui::Context) {
        let size = ctx.screen_rect().size();
        if self.last_size != Some(size) && size.x > 0.0 && size.y > 0.0 {
            debug!("Window size is now {}x{}", size.x, size.y);
            self.last_size = Some(size);
            self.controller.resize(size.x, size.y);
        }
    }

    fn refresh_dashboard(&mut self, ctx: &egui::Context, model: &DisplayModel) {
        if let Some(image) = self.capture.take_finished() {
            debug!("Dashboard snapshot ready ({}x{})", image.width(), image.height());
            let color_image = crate::state_manager::to_color_image(&image);
            match &mut self.textures.dashboard {
                Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
                None => self.textures.dashboard = Some(ctx.load_texture("dashboard", color_image, egui::TextureOptions::LINEAR)),
            }
        }

        if !self.capture.needs_capture(&model.dashboard_url, model.frame_reloads) {
            return;
        }
        info!("Capturing dashboard {} (reload {}).", model.dashboard_url, model.frame_reloads);
        let url = model.dashboard_url.clone();
        let (width, height) = self.capture_size;
        let pending = self.capture.pending.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = capture_dashboard(url, width, height).await;
            *pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(result);
            ctx.request_repaint();
        });
    }

    /// Forwards this frame's input. Pointer input inside `controls` stays with the widgets.
    fn forward_input(&self, ctx: &egui::Context, model: &DisplayModel, controls: Option<Rect>) {
        let width = ctx.screen_rect().width().max(1.0);
        let mut signals = Vec::new();
        ctx.input(|i| {
            let mut touched = false;
            for event in &i.events {
                let signal = match event {
                    egui::Event::PointerMoved(pos) => Some(ActivitySignal::at(ActivitySource::PointerMove, pos.x / width)),
                    egui::Event::PointerButton { pos, pressed: true, .. } => {
                        if touched || controls.is_some_and(|rect| rect.contains(*pos)) {
                            None
                        } else {
                            Some(ActivitySignal::at(ActivitySource::PointerDown, pos.x / width))
                        }
                    }
                    egui::Event::Touch { phase: TouchPhase::Start, pos, .. } => {
                        touched = true;
                        if controls.is_some_and(|rect| rect.contains(*pos)) {
                            None
                        } else {
                            Some(ActivitySignal::at(ActivitySource::TouchStart, pos.x / width))
                        }
                    }
                    egui::Event::Key { pressed: true, repeat: false, .. } => Some(ActivitySignal::new(ActivitySource::KeyPress)),
                    egui::Event::Scroll(_) => Some(ActivitySignal::new(ActivitySource::Scroll)),
                    egui::Event::WindowFocused(_) => Some(ActivitySignal::new(ActivitySource::FrameFocusChange)),
                    _ => None,
                };
                signals.extend(signal);
            }
        });

        for signal in signals {
            if !model.activity_sources.contains(&signal.source) {
                continue;
            }
            trace!("Forwarding {:?}", signal);
            self.controller.activity(signal);
        }
    }

    fn draw_dashboard(&self, ui: &mut egui::Ui, rect: Rect, model: &DisplayModel) {
        match &self.textures.dashboard {
            Some(texture) => {
                let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
            }
            None => {
                ui.allocate_ui_at_rect(rect, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new(format!("Loading dashboard…\n{}", model.dashboard_url)).size(24.0));
                    });
                });
            }
        }
    }

    fn draw_slideshow(&mut self, ui: &mut egui::Ui, rect: Rect, model: &DisplayModel) {
        let ctx = ui.ctx().clone();
        ui.painter().rect_filled(rect, 0.0, Color32::BLACK);
        if let (Some(texture), Some(photo)) = (self.textures.photo.sync(&ctx, model.photo_revision, model.photo.as_ref()), &model.photo) {
            let crop = visible_crop(photo.width(), photo.height(), rect.width(), rect.height());
            if !crop.is_empty() {
                let (w, h) = (photo.width() as f32, photo.height() as f32);
                let uv = Rect::from_min_max(
                    egui::pos2(crop.x as f32 / w, crop.y as f32 / h),
                    egui::pos2((crop.x + crop.width) as f32 / w, (crop.y + crop.height) as f32 / h),
                );
                ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
            }
        }

        let scale = rect.height() / DESIGN_HEIGHT;
        if let Some(block) = photo_info_block(model, scale) {
            draw_overlay(ui, rect, &block);
        }
        draw_overlay(ui, rect, &clock_block(model, scale));
    }

    /// Draws the now-playing view and returns the area taken by its controls.
    fn draw_now_playing(&mut self, ui: &mut egui::Ui, rect: Rect, model: &DisplayModel) -> Rect {
        let ctx = ui.ctx().clone();
        let scale = rect.height() / DESIGN_HEIGHT;
        ui.painter().rect_filled(rect, 0.0, Color32::from_gray(16));

        let art_side = rect.height() * 0.5;
        let art_rect = Rect::from_min_size(
            egui::pos2(rect.left() + rect.width() * 0.12, rect.center().y - art_side / 2.0),
            Vec2::splat(art_side),
        );
        match self.textures.artwork.sync(&ctx, model.artwork_revision, model.artwork.as_ref()) {
            Some(texture) => {
                let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                ui.painter().image(texture.id(), art_rect, uv, Color32::WHITE);
            }
            None => {
                ui.painter().rect_filled(art_rect, 12.0, Color32::from_gray(48));
                ui.painter().text(art_rect.center(), egui::Align2::CENTER_CENTER, "♪", egui::FontId::proportional(120.0 * scale), Color32::from_gray(140));
            }
        }

        let info_rect = Rect::from_min_max(
            egui::pos2(art_rect.right() + 60.0 * scale, art_rect.top()),
            egui::pos2(rect.right() - rect.width() * 0.08, art_rect.bottom()),
        );
        let now_playing = &model.now_playing;
        let mut controls_rect = info_rect;
        ui.allocate_ui_at_rect(info_rect, |ui| {
            ui.with_layout(Layout::top_down(Align::Min), |ui| {
                ui.label(RichText::new(&now_playing.title).size(56.0 * scale).strong().color(Color32::WHITE));
                ui.label(RichText::new(&now_playing.artist).size(36.0 * scale).color(Color32::LIGHT_GRAY));
                ui.label(RichText::new(&now_playing.album).size(28.0 * scale).color(Color32::GRAY));
                ui.add_space(40.0 * scale);

                let buttons = ui.horizontal(|ui| {
                    let size = 48.0 * scale;
                    if ui.button(RichText::new("⏮").size(size)).clicked() {
                        self.controller.media(MediaAction::Previous);
                    }
                    if ui.button(RichText::new(now_playing.transport.glyph()).size(size)).clicked() {
                        self.controller.media(MediaAction::PlayPause);
                    }
                    if ui.button(RichText::new("⏭").size(size)).clicked() {
                        self.controller.media(MediaAction::Next);
                    }
                });
                controls_rect = buttons.response.rect;

                if let Some(volume) = now_playing.volume {
                    ui.add_space(20.0 * scale);
                    let mut value = self.volume_draft.unwrap_or(volume);
                    let slider = ui.add(egui::Slider::new(&mut value, 0.0..=1.0).show_value(false).text("Volume"));
                    if slider.changed() {
                        self.volume_draft = Some(value);
                    }
                    if !slider.dragged() {
                        if let Some(level) = self.volume_draft.take() {
                            self.controller.media(MediaAction::SetVolume(level));
                        }
                    }
                    controls_rect = controls_rect.union(slider.rect);
                }
            });
        });

        draw_overlay(ui, rect, &clock_block(model, scale * 0.6));
        controls_rect.expand(8.0)
    }
}

impl eframe::App for KioskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.track_viewport(ctx);
        let model = self.display.snapshot();
        self.refresh_dashboard(ctx, &model);

        let mut controls = None;
        CentralPanel::default().frame(Frame::none().fill(Color32::BLACK)).show(ctx, |ui| {
            let rect = ui.max_rect();
            match model.mode {
                DisplayMode::Dashboard => self.draw_dashboard(ui, rect, &model),
                DisplayMode::Slideshow => self.draw_slideshow(ui, rect, &model),
                DisplayMode::NowPlaying => controls = Some(self.draw_now_playing(ui, rect, &model)),
            }
        });

        self.forward_input(ctx, &model, controls);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Kiosk window closing.");
        self.controller.shutdown();
    }
}
