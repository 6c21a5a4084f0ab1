use std::sync::Arc;
use std::time::Duration;

use eframe::{egui, NativeOptions};
use log::{error, info, warn};
use reqwest::Client as ReqwestClient;

use screensaver_rs::api_client::ApiClient;
use screensaver_rs::config::{self, KioskSettings, DEFAULT_SETTINGS_PATH};
use screensaver_rs::controller::PresentationController;
use screensaver_rs::errors::{ApiError, AppError};
use screensaver_rs::kiosk_app::KioskApp;
use screensaver_rs::surface::SharedDisplay;

const HTTP_TIMEOUT_SECONDS: u64 = 15;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting screensaver_rs...");

    let settings_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = config::load_settings(&settings_path).unwrap_or_else(|e| {
        error!("Failed to load settings from {}: {}", settings_path, e);
        let fallback = KioskSettings::default();
        warn!("Using default settings with backend {}", fallback.backend_url);
        fallback
    });

    let http_client = ReqwestClient::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
        .build()
        .map_err(ApiError::Reqwest)?;
    let service = Arc::new(ApiClient::new(http_client, &settings.backend_url));

    // The window context only exists once eframe starts; until then repaints are no-ops.
    let repaint_ctx: Arc<std::sync::OnceLock<egui::Context>> = Arc::new(std::sync::OnceLock::new());
    let notifier_ctx = repaint_ctx.clone();
    let display = SharedDisplay::new().with_notifier(move || {
        if let Some(ctx) = notifier_ctx.get() {
            ctx.request_repaint();
        }
    });

    let viewport = (settings.viewport_width as f32, settings.viewport_height as f32);
    let (controller, handle) = PresentationController::new(service, display.clone(), viewport);
    let controller_task = tokio::spawn(controller.run());

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Screensaver")
            .with_inner_size([viewport.0, viewport.1])
            .with_fullscreen(settings.fullscreen),
        ..Default::default()
    };
    let runtime = tokio::runtime::Handle::current();
    let capture_size = (settings.viewport_width, settings.viewport_height);
    let app_handle = handle.clone();
    let result = eframe::run_native(
        "Screensaver",
        options,
        Box::new(move |cc| {
            let _ = repaint_ctx.set(cc.egui_ctx.clone());
            Box::new(KioskApp::new(cc, display, app_handle, runtime, capture_size))
        }),
    );

    handle.shutdown();
    if let Err(e) = controller_task.await {
        warn!("Controller task ended abnormally: {}", e);
    }
    info!("screensaver_rs exited.");
    result.map_err(AppError::from)
}
