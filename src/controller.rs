//! The presentation controller.
//!
//! A single task owns all presentation state and processes one event at a time: commands
//! from the host window, timer ticks, and the results of fetches it spawned. Every
//! timer lives in a `TimerSet` slot, so entering and leaving modes can never stack
//! duplicate timers, and results that arrive after the state moved on are dropped.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::api_client::DataService;
use crate::clock::{ClockReading, FrameRefreshTracker, CLOCK_TICK_PERIOD};
use crate::config::ScreensaverConfig;
use crate::errors::{ApiError, MediaError};
use crate::idle::IdleMonitor;
use crate::luma::clock_text_color;
use crate::media_gate::{GateDecision, MediaGate, NowPlayingChanges};
use crate::media_pipeline::load_image;
use crate::model::{ActivitySignal, DisplayMode, MediaAction, MediaState, PhotoEntry, TextColor, WeatherState};
use crate::slide_rotator::SlideshowState;
use crate::surface::Surface;
use crate::timers::{TimerSet, TimerSlot, TimerTick};
use crate::weather::WeatherDisplay;

pub const WEATHER_POLL_PERIOD: Duration = Duration::from_secs(60);
pub const MEDIA_POLL_PERIOD: Duration = Duration::from_secs(10);
/// Delay before re-polling the player after a control, so the new state is visible.
pub const CONTROL_REPOLL_DELAY: Duration = Duration::from_millis(500);
/// Taps in the leftmost fraction of the screen go back one slide.
pub const BACK_ZONE_FRACTION: f32 = 0.2;

/// Requests the host window (or a test) can send to the controller.
#[derive(Debug)]
pub enum Command {
    Activity(ActivitySignal),
    EnterSlideshow,
    /// Leaves any screensaver mode for the dashboard.
    Stop,
    /// Goes back one slide and restarts the rotation interval.
    Retreat,
    Media(MediaAction),
    Resize { width: f32, height: f32 },
    Snapshot(oneshot::Sender<ControllerSnapshot>),
    Shutdown,
}

/// Read-only view of the controller's state.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerSnapshot {
    pub mode: DisplayMode,
    pub activation_pending: bool,
    pub photo_count: usize,
    pub current_index: Option<usize>,
    pub history_len: usize,
    pub clock_color: TextColor,
    pub armed_slots: Vec<TimerSlot>,
    /// Live handle count per slot, in `TimerSlot::ALL` order.
    pub live_handles: Vec<(TimerSlot, usize)>,
    pub listener_registrations: usize,
}

impl ControllerSnapshot {
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.armed_slots.contains(&slot)
    }
}

enum Event {
    Command(Command),
    Timer(TimerTick),
    ConfigLoaded(Result<ScreensaverConfig, ApiError>),
    PhotosLoaded { request: u64, result: Result<Vec<PhotoEntry>, ApiError> },
    ImageLoaded { generation: u64, index: usize, result: Result<Arc<RgbaImage>, MediaError> },
    WeatherPolled { session: u64, result: Result<Option<WeatherState>, ApiError> },
    MediaPolled { session: u64, result: Result<Option<MediaState>, ApiError> },
    ArtworkLoaded { session: u64, url: String, result: Result<Arc<RgbaImage>, MediaError> },
    RepollMedia { session: u64 },
}

impl From<TimerTick> for Event {
    fn from(tick: TimerTick) -> Self {
        Event::Timer(tick)
    }
}

/// Cloneable sender for `Command`s.
#[derive(Clone)]
pub struct ControllerHandle {
    events: UnboundedSender<Event>,
}

impl ControllerHandle {
    pub fn send(&self, command: Command) {
        if self.events.send(Event::Command(command)).is_err() {
            warn!("Presentation controller is not running; command dropped.");
        }
    }

    pub fn activity(&self, signal: ActivitySignal) {
        self.send(Command::Activity(signal));
    }

    pub fn enter_slideshow(&self) {
        self.send(Command::EnterSlideshow);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn retreat(&self) {
        self.send(Command::Retreat);
    }

    pub fn media(&self, action: MediaAction) {
        self.send(Command::Media(action));
    }

    pub fn resize(&self, width: f32, height: f32) {
        self.send(Command::Resize { width, height });
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// `None` once the controller has stopped.
    pub async fn snapshot(&self) -> Option<ControllerSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.events.send(Event::Command(Command::Snapshot(tx))).ok()?;
        rx.await.ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Activation {
    Inactive,
    /// Waiting for the photo collection requested under this id.
    Loading(u64),
    Active,
}

pub struct PresentationController<S: Surface> {
    service: Arc<dyn DataService>,
    surface: S,
    timers: TimerSet<Event>,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    rng: StdRng,
    viewport: (f32, f32),
    config: ScreensaverConfig,
    mode: DisplayMode,
    activation: Activation,
    next_request: u64,
    /// Bumped when a screensaver session starts or ends. Poll results carry the session
    /// they were started in.
    session: u64,
    slideshow: Option<SlideshowState>,
    /// Bumped for every slide shown; image loads for older slides are ignored.
    image_generation: u64,
    clock_color: TextColor,
    gate: MediaGate,
    frame_refresh: FrameRefreshTracker,
    idle: IdleMonitor,
}

impl<S: Surface> PresentationController<S> {
    pub fn new(service: Arc<dyn DataService>, surface: S, viewport: (f32, f32)) -> (Self, ControllerHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let config = ScreensaverConfig::default();
        let controller = Self {
            service,
            surface,
            timers: TimerSet::new(events_tx.clone()),
            events_tx: events_tx.clone(),
            events_rx,
            rng: StdRng::from_entropy(),
            viewport,
            idle: IdleMonitor::new(config.idle_timeout()),
            config,
            mode: DisplayMode::Dashboard,
            activation: Activation::Inactive,
            next_request: 0,
            session: 0,
            slideshow: None,
            image_generation: 0,
            clock_color: TextColor::White,
            gate: MediaGate::new(),
            frame_refresh: FrameRefreshTracker::new(Instant::now()),
        };
        (controller, ControllerHandle { events: events_tx })
    }

    /// Replaces the random source used for slide selection.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Runs until `Command::Shutdown` or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Presentation controller starting.");
        self.request_config();
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self.timers.cancel_all(&TimerSlot::ALL);
        info!("Presentation controller stopped.");
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Command(command) => return self.handle_command(command),
            Event::Timer(tick) => self.on_timer(tick),
            Event::ConfigLoaded(result) => self.on_config_loaded(result),
            Event::PhotosLoaded { request, result } => self.on_photos_loaded(request, result),
            Event::ImageLoaded { generation, index, result } => self.on_image_loaded(generation, index, result),
            Event::WeatherPolled { session, result } => self.on_weather_polled(session, result),
            Event::MediaPolled { session, result } => self.on_media_polled(session, result),
            Event::ArtworkLoaded { session, url, result } => self.on_artwork_loaded(session, url, result),
            Event::RepollMedia { session } => {
                if self.is_current_session(session) && self.config.media_enabled() {
                    self.poll_media();
                }
            }
        }
        true
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Activity(signal) => self.on_activity(signal),
            Command::EnterSlideshow => self.enter_slideshow(),
            Command::Stop => self.exit_to_dashboard(),
            Command::Retreat => self.retreat(),
            Command::Media(action) => self.send_media_control(action),
            Command::Resize { width, height } => {
                if width > 0.0 && height > 0.0 && (width, height) != self.viewport {
                    debug!("Viewport resized to {}x{}", width, height);
                    self.viewport = (width, height);
                    if self.mode == DisplayMode::Slideshow {
                        self.refresh_clock_color();
                    }
                }
            }
            Command::Snapshot(reply) => {
                if reply.send(self.snapshot()).is_err() {
                    trace!("Snapshot requester went away before the reply.");
                }
            }
            Command::Shutdown => {
                info!("Shutdown requested.");
                return false;
            }
        }
        true
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            mode: self.mode,
            activation_pending: matches!(self.activation, Activation::Loading(_)),
            photo_count: self.slideshow.as_ref().map_or(0, SlideshowState::len),
            current_index: self.slideshow.as_ref().map(SlideshowState::current_index),
            history_len: self.slideshow.as_ref().map_or(0, |s| s.history().len()),
            clock_color: self.clock_color,
            armed_slots: self.timers.armed_slots(),
            live_handles: TimerSlot::ALL.into_iter().map(|slot| (slot, self.timers.live_count(slot))).collect(),
            listener_registrations: self.idle.registrations(),
        }
    }

    // --- Configuration ---

    fn request_config(&self) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_config().await;
            let _ = events.send(Event::ConfigLoaded(result));
        });
    }

    fn on_config_loaded(&mut self, result: Result<ScreensaverConfig, ApiError>) {
        let config = result.unwrap_or_else(|e| {
            warn!("Failed to fetch screensaver config, using defaults: {}", e);
            ScreensaverConfig::default()
        });
        info!(
            "Screensaver config: idle {:?}, slides every {:?}, clock {:?}, weather: {}, media: {}",
            config.idle_timeout(),
            config.slide_interval(),
            config.clock_position,
            config.weather_enabled(),
            config.media_enabled()
        );
        self.surface.set_dashboard_url(&config.home_assistant_url);
        self.surface.set_clock_position(config.clock_position);
        self.idle.set_timeout(config.idle_timeout());
        self.config = config;
        if self.mode == DisplayMode::Dashboard && self.activation == Activation::Inactive {
            self.idle.arm(&mut self.timers, &mut self.surface);
        }
    }

    // --- Activity ---

    fn on_activity(&mut self, signal: ActivitySignal) {
        match self.mode {
            DisplayMode::Dashboard => {
                if let Activation::Loading(request) = self.activation {
                    info!("Activity while loading photos (request {}); staying on dashboard.", request);
                    self.activation = Activation::Inactive;
                }
                self.idle.on_activity(signal, &mut self.timers, &mut self.surface);
            }
            DisplayMode::Slideshow if signal.source.is_interaction() => {
                if signal.x_fraction.is_some_and(|x| x < BACK_ZONE_FRACTION) {
                    self.retreat();
                } else {
                    self.exit_to_dashboard();
                }
            }
            DisplayMode::NowPlaying if signal.source.is_interaction() => self.exit_to_dashboard(),
            _ => trace!("Ignoring {:?} in {:?}", signal.source, self.mode),
        }
    }

    // --- Mode transitions ---

    fn enter_slideshow(&mut self) {
        match self.activation {
            Activation::Loading(request) => {
                debug!("Slideshow activation already in progress (request {}).", request);
                return;
            }
            Activation::Active => {
                debug!("Slideshow already active.");
                return;
            }
            Activation::Inactive => {}
        }
        self.next_request += 1;
        let request = self.next_request;
        self.activation = Activation::Loading(request);
        info!("Entering slideshow, fetching photos (request {}).", request);

        let service = self.service.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_photos().await;
            let _ = events.send(Event::PhotosLoaded { request, result });
        });
    }

    fn on_photos_loaded(&mut self, request: u64, result: Result<Vec<PhotoEntry>, ApiError>) {
        if self.activation != Activation::Loading(request) {
            debug!("Discarding photo collection for abandoned request {}.", request);
            return;
        }
        let photos = result.unwrap_or_else(|e| {
            warn!("Failed to fetch photos: {}", e);
            Vec::new()
        });
        match SlideshowState::new(photos, &mut self.rng) {
            Some(slides) => self.activate(slides),
            None => {
                info!("No photos available; staying on dashboard.");
                self.activation = Activation::Inactive;
                self.idle.arm(&mut self.timers, &mut self.surface);
            }
        }
    }

    fn activate(&mut self, slides: SlideshowState) {
        info!("Mode transition {:?} -> {:?} with {} photos.", self.mode, DisplayMode::Slideshow, slides.len());
        self.activation = Activation::Active;
        self.session += 1;
        self.slideshow = Some(slides);
        self.mode = DisplayMode::Slideshow;
        self.gate.reset();
        self.idle.disable(&mut self.timers);

        self.surface.show_mode(DisplayMode::Slideshow);
        self.show_current_slide();

        self.timers.reschedule_every(TimerSlot::SlideRotation, self.config.slide_interval(), false);
        self.timers.reschedule_every(TimerSlot::ClockTick, CLOCK_TICK_PERIOD, true);
        if self.config.weather_enabled() {
            self.timers.reschedule_every(TimerSlot::WeatherPoll, WEATHER_POLL_PERIOD, true);
        }
        if self.config.media_enabled() {
            self.timers.reschedule_every(TimerSlot::MediaPoll, MEDIA_POLL_PERIOD, true);
        }
    }

    fn exit_to_dashboard(&mut self) {
        let from = self.mode;
        self.timers.cancel_all(&TimerSlot::SCREENSAVER);
        self.activation = Activation::Inactive;
        self.session += 1;
        self.slideshow = None;
        self.image_generation += 1;
        self.gate.reset();
        self.mode = DisplayMode::Dashboard;
        self.set_clock_color(TextColor::White);
        if from != DisplayMode::Dashboard {
            info!("Mode transition {:?} -> {:?}", from, DisplayMode::Dashboard);
            self.surface.show_mode(DisplayMode::Dashboard);
            self.surface.set_artwork(None);
        }
        self.idle.enable();
        self.idle.arm(&mut self.timers, &mut self.surface);
    }

    fn enter_now_playing(&mut self) {
        if self.mode != DisplayMode::Slideshow {
            return;
        }
        info!("Mode transition {:?} -> {:?}", self.mode, DisplayMode::NowPlaying);
        self.timers.cancel(TimerSlot::SlideRotation);
        self.mode = DisplayMode::NowPlaying;
        self.surface.show_mode(DisplayMode::NowPlaying);
        self.set_clock_color(TextColor::White);
    }

    fn exit_now_playing(&mut self) {
        if self.mode != DisplayMode::NowPlaying {
            return;
        }
        info!("Mode transition {:?} -> {:?}", self.mode, DisplayMode::Slideshow);
        self.mode = DisplayMode::Slideshow;
        self.surface.show_mode(DisplayMode::Slideshow);
        self.surface.set_artwork(None);
        self.timers.reschedule_every(TimerSlot::SlideRotation, self.config.slide_interval(), false);
        self.refresh_clock_color();
    }

    // --- Slides ---

    fn show_current_slide(&mut self) {
        let Some(slides) = self.slideshow.as_ref() else {
            return;
        };
        let index = slides.current_index();
        let photo = slides.current().clone();
        self.image_generation += 1;
        let generation = self.image_generation;

        debug!("Showing slide {} ({})", index, photo.url);
        self.surface.show_photo(index, &photo);
        self.set_clock_color(TextColor::White);

        let service = self.service.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = load_image(service.as_ref(), &photo.url).await;
            let _ = events.send(Event::ImageLoaded { generation, index, result });
        });
    }

    fn on_image_loaded(&mut self, generation: u64, index: usize, result: Result<Arc<RgbaImage>, MediaError>) {
        if generation != self.image_generation {
            trace!("Discarding image for superseded slide {}.", index);
            return;
        }
        let Some(slides) = self.slideshow.as_mut() else {
            return;
        };
        match result {
            Ok(image) => {
                slides.set_current_image(image.clone());
                self.surface.set_photo_pixels(index, image);
                if self.mode == DisplayMode::Slideshow {
                    self.refresh_clock_color();
                }
            }
            Err(e) => warn!("Failed to load slide {}: {}", index, e),
        }
    }

    fn advance_slide(&mut self) {
        if self.mode != DisplayMode::Slideshow {
            return;
        }
        let Some(slides) = self.slideshow.as_mut() else {
            return;
        };
        let next = slides.advance(&mut self.rng);
        trace!("Advanced to slide {}", next);
        self.show_current_slide();
    }

    fn retreat(&mut self) {
        if self.mode != DisplayMode::Slideshow {
            return;
        }
        let Some(slides) = self.slideshow.as_mut() else {
            return;
        };
        match slides.retreat() {
            Some(previous) => {
                debug!("Back to slide {}", previous);
                self.show_current_slide();
                self.timers.reschedule_every(TimerSlot::SlideRotation, self.config.slide_interval(), false);
            }
            None => debug!("No slide history to go back to."),
        }
    }

    // --- Clock ---

    fn tick_clock(&mut self) {
        self.surface.set_clock(&ClockReading::now());
        if self.frame_refresh.check(Instant::now()) {
            info!("Reloading dashboard frame.");
            self.surface.reload_frame();
        }
    }

    fn refresh_clock_color(&mut self) {
        let image = self.slideshow.as_ref().and_then(SlideshowState::current_image).cloned();
        let color = clock_text_color(image.as_deref(), self.viewport, self.config.clock_position);
        self.set_clock_color(color);
    }

    fn set_clock_color(&mut self, color: TextColor) {
        if self.clock_color != color {
            trace!("Clock color -> {:?}", color);
            self.clock_color = color;
            self.surface.set_clock_color(color);
        }
    }

    // --- Polling ---

    /// Whether a result started in `session` still belongs to the screensaver on screen.
    fn is_current_session(&self, session: u64) -> bool {
        session == self.session && self.mode.is_screensaver()
    }

    fn on_timer(&mut self, tick: TimerTick) {
        if !self.timers.is_current(&tick) {
            trace!("Dropping stale {:?} tick (generation {}).", tick.slot, tick.generation);
            return;
        }
        match tick.slot {
            TimerSlot::Idle => {
                self.timers.complete(&tick);
                if self.mode == DisplayMode::Dashboard {
                    info!("No activity for {:?}.", self.idle.timeout());
                    self.enter_slideshow();
                }
            }
            TimerSlot::SlideRotation => self.advance_slide(),
            TimerSlot::ClockTick => self.tick_clock(),
            TimerSlot::WeatherPoll => self.poll_weather(),
            TimerSlot::MediaPoll => self.poll_media(),
        }
    }

    fn poll_weather(&self) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        let session = self.session;
        tokio::spawn(async move {
            let result = service.fetch_weather().await;
            let _ = events.send(Event::WeatherPolled { session, result });
        });
    }

    fn on_weather_polled(&mut self, session: u64, result: Result<Option<WeatherState>, ApiError>) {
        if !self.is_current_session(session) {
            trace!("Discarding weather poll from session {}.", session);
            return;
        }
        match result {
            Ok(Some(state)) => {
                let display = WeatherDisplay::from_state(&state);
                debug!("Weather: {}", display.label());
                self.surface.set_weather(&display);
            }
            Ok(None) => debug!("No weather data available; keeping last reading."),
            Err(e) => warn!("Weather poll failed, keeping last reading: {}", e),
        }
    }

    fn poll_media(&self) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        let session = self.session;
        tokio::spawn(async move {
            let result = service.fetch_media().await;
            let _ = events.send(Event::MediaPolled { session, result });
        });
    }

    fn on_media_polled(&mut self, session: u64, result: Result<Option<MediaState>, ApiError>) {
        if !self.is_current_session(session) {
            trace!("Discarding media poll from session {}.", session);
            return;
        }
        let state = match result {
            Ok(state) => state,
            Err(e) => {
                warn!("Media poll failed, keeping current display: {}", e);
                return;
            }
        };
        match self.gate.evaluate(state.as_ref(), self.mode) {
            GateDecision::Enter(changes) => {
                self.enter_now_playing();
                self.apply_now_playing(changes);
            }
            GateDecision::Update(changes) => self.apply_now_playing(changes),
            GateDecision::Exit => self.exit_now_playing(),
            GateDecision::Stay => {}
        }
    }

    fn apply_now_playing(&mut self, changes: NowPlayingChanges) {
        if !changes.any() {
            return;
        }
        let Some(view) = self.gate.view().cloned() else {
            return;
        };
        self.surface.update_now_playing(&view, &changes);
        if !changes.artwork {
            return;
        }
        match view.artwork_url {
            Some(url) => {
                let service = self.service.clone();
                let events = self.events_tx.clone();
                let session = self.session;
                tokio::spawn(async move {
                    let result = load_image(service.as_ref(), &url).await;
                    let _ = events.send(Event::ArtworkLoaded { session, url, result });
                });
            }
            None => self.surface.set_artwork(None),
        }
    }

    fn on_artwork_loaded(&mut self, session: u64, url: String, result: Result<Arc<RgbaImage>, MediaError>) {
        let current = self.gate.view().and_then(|view| view.artwork_url.as_deref());
        if session != self.session || self.mode != DisplayMode::NowPlaying || current != Some(url.as_str()) {
            trace!("Discarding artwork for {}.", url);
            return;
        }
        match result {
            Ok(image) => self.surface.set_artwork(Some(image)),
            Err(e) => {
                warn!("Failed to load artwork {}: {}", url, e);
                self.surface.set_artwork(None);
            }
        }
    }

    fn send_media_control(&self, action: MediaAction) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        let session = self.session;
        tokio::spawn(async move {
            if let Err(e) = service.media_control(action).await {
                warn!("Media control {:?} failed: {}", action, e);
            }
            tokio::time::sleep(CONTROL_REPOLL_DELAY).await;
            let _ = events.send(Event::RepollMedia { session });
        });
    }
}
