//! Presentation controller for a wall-mounted home-automation kiosk.
//!
//! The kiosk shows a dashboard and, after a period of inactivity, a photo slideshow with
//! a clock, weather and photo details. When a media player starts playing, the
//! slideshow yields to a now-playing view until playback stops.

pub mod api_client;
pub mod clock;
pub mod config;
pub mod controller;
pub mod errors;
pub mod idle;
pub mod kiosk_app;
pub mod luma;
pub mod media_gate;
pub mod media_pipeline;
pub mod model;
pub mod slide_rotator;
pub mod state_manager;
pub mod surface;
pub mod text_renderer;
pub mod timers;
pub mod weather;
