//! Decides when media playback overrides the slideshow, and what changed on screen.

use log::debug;

use crate::model::{DisplayMode, MediaState, PlaybackState};

/// Transport button glyph: the action the button performs next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportIcon {
    #[default]
    Play,
    Pause,
}

impl TransportIcon {
    pub fn for_state(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => TransportIcon::Pause,
            _ => TransportIcon::Play,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            TransportIcon::Play => "▶",
            TransportIcon::Pause => "⏸",
        }
    }
}

/// The now-playing fields currently on screen.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NowPlayingView {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork_url: Option<String>,
    pub transport: TransportIcon,
    pub volume: Option<f32>,
}

impl NowPlayingView {
    fn from_state(state: &MediaState) -> Self {
        Self {
            title: state.title.clone(),
            artist: state.artist.clone(),
            album: state.album.clone(),
            artwork_url: state.artwork_url.clone().filter(|url| !url.is_empty()),
            transport: TransportIcon::for_state(state.playback_state),
            volume: state.volume_level.map(|v| v.clamp(0.0, 1.0)),
        }
    }
}

/// Which parts of the view differ from what was shown before.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct NowPlayingChanges {
    pub artwork: bool,
    pub track: bool,
    pub transport: bool,
    pub volume: bool,
}

impl NowPlayingChanges {
    pub fn any(&self) -> bool {
        self.artwork || self.track || self.transport || self.volume
    }
}

/// Outcome of feeding one poll result through the gate.
#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
    /// Playback active and not yet in now-playing.
    Enter(NowPlayingChanges),
    /// Playback active and already in now-playing.
    Update(NowPlayingChanges),
    /// Playback stopped while in now-playing.
    Exit,
    /// Nothing to do.
    Stay,
}

/// Remembers the last applied view so only differences reach the display.
#[derive(Debug, Default)]
pub struct MediaGate {
    view: Option<NowPlayingView>,
}

impl MediaGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<&NowPlayingView> {
        self.view.as_ref()
    }

    /// Forgets the shown view, e.g. when the screensaver closes.
    pub fn reset(&mut self) {
        self.view = None;
    }

    /// Evaluates a successful poll. `None` means the player is unconfigured or unavailable.
    pub fn evaluate(&mut self, state: Option<&MediaState>, mode: DisplayMode) -> GateDecision {
        match state.filter(|s| s.playback_state.is_active()) {
            Some(state) => {
                let next = NowPlayingView::from_state(state);
                let changes = match &self.view {
                    Some(previous) if mode == DisplayMode::NowPlaying => NowPlayingChanges {
                        artwork: previous.artwork_url != next.artwork_url,
                        track: previous.title != next.title || previous.artist != next.artist || previous.album != next.album,
                        transport: previous.transport != next.transport,
                        volume: previous.volume != next.volume,
                    },
                    _ => NowPlayingChanges { artwork: true, track: true, transport: true, volume: true },
                };
                self.view = Some(next);
                if mode == DisplayMode::NowPlaying {
                    GateDecision::Update(changes)
                } else {
                    debug!("Media playback active while in {:?}", mode);
                    GateDecision::Enter(changes)
                }
            }
            None => {
                self.view = None;
                if mode == DisplayMode::NowPlaying {
                    GateDecision::Exit
                } else {
                    GateDecision::Stay
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(state: &str, title: &str, artwork: Option<&str>) -> MediaState {
        MediaState {
            playback_state: PlaybackState::from(state.to_string()),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            artwork_url: artwork.map(str::to_string),
            volume_level: Some(0.5),
        }
    }

    #[test]
    fn playing_enters_now_playing_with_everything_changed() {
        let mut gate = MediaGate::new();
        let decision = gate.evaluate(Some(&media("playing", "X", Some("/art/1"))), DisplayMode::Slideshow);
        assert_eq!(decision, GateDecision::Enter(NowPlayingChanges { artwork: true, track: true, transport: true, volume: true }));
        assert_eq!(gate.view().unwrap().transport, TransportIcon::Pause);
    }

    #[test]
    fn identical_poll_changes_nothing() {
        let mut gate = MediaGate::new();
        gate.evaluate(Some(&media("playing", "X", Some("/art/1"))), DisplayMode::Slideshow);
        let decision = gate.evaluate(Some(&media("playing", "X", Some("/art/1"))), DisplayMode::NowPlaying);
        assert_eq!(decision, GateDecision::Update(NowPlayingChanges::default()));
    }

    #[test]
    fn artwork_only_changes_when_the_url_differs() {
        let mut gate = MediaGate::new();
        gate.evaluate(Some(&media("playing", "X", Some("/art/1"))), DisplayMode::Slideshow);
        let GateDecision::Update(changes) = gate.evaluate(Some(&media("paused", "X", Some("/art/1"))), DisplayMode::NowPlaying) else {
            panic!("expected an update");
        };
        assert!(!changes.artwork);
        assert!(changes.transport);

        let GateDecision::Update(changes) = gate.evaluate(Some(&media("paused", "Y", Some("/art/2"))), DisplayMode::NowPlaying) else {
            panic!("expected an update");
        };
        assert!(changes.artwork);
        assert!(changes.track);
    }

    #[test]
    fn idle_or_missing_player_exits_now_playing() {
        let mut gate = MediaGate::new();
        gate.evaluate(Some(&media("playing", "X", None)), DisplayMode::Slideshow);
        assert_eq!(gate.evaluate(Some(&media("idle", "", None)), DisplayMode::NowPlaying), GateDecision::Exit);
        assert!(gate.view().is_none());
        assert_eq!(gate.evaluate(None, DisplayMode::Slideshow), GateDecision::Stay);
    }

    #[test]
    fn volume_is_clamped() {
        let mut gate = MediaGate::new();
        let mut state = media("playing", "X", None);
        state.volume_level = Some(1.7);
        gate.evaluate(Some(&state), DisplayMode::Slideshow);
        assert_eq!(gate.view().unwrap().volume, Some(1.0));
    }
}
