//! Photo ordering, current position and back-navigation history for one slideshow session.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;
use log::{debug, trace};
use rand::Rng;

use crate::model::PhotoEntry;

/// Maximum number of previously shown slides that can be navigated back to.
pub const HISTORY_LIMIT: usize = 100;

/// State of one slideshow activation. Created fresh on entry, dropped on exit.
#[derive(Debug)]
pub struct SlideshowState {
    photos: Vec<PhotoEntry>,
    current_index: usize,
    history: VecDeque<usize>,
    /// Decoded pixels of the current slide once loaded.
    current_image: Option<Arc<RgbaImage>>,
}

impl SlideshowState {
    /// Starts a session at a uniformly random slide. Returns `None` for an empty collection.
    pub fn new<R: Rng + ?Sized>(photos: Vec<PhotoEntry>, rng: &mut R) -> Option<Self> {
        if photos.is_empty() {
            return None;
        }
        let current_index = rng.gen_range(0..photos.len());
        debug!("New slideshow session with {} photos, starting at index {}", photos.len(), current_index);
        Some(Self { photos, current_index, history: VecDeque::with_capacity(HISTORY_LIMIT), current_image: None })
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &PhotoEntry {
        &self.photos[self.current_index]
    }

    pub fn history(&self) -> &VecDeque<usize> {
        &self.history
    }

    pub fn current_image(&self) -> Option<&Arc<RgbaImage>> {
        self.current_image.as_ref()
    }

    pub fn set_current_image(&mut self, image: Arc<RgbaImage>) {
        self.current_image = Some(image);
    }

    /// Moves to a random slide other than the current one and returns its index.
    ///
    /// The outgoing index is pushed onto the history, evicting the oldest entry at
    /// `HISTORY_LIMIT`. A single-slide collection just re-displays slide 0.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if self.photos.len() == 1 {
            self.current_index = 0;
            self.current_image = None;
            return 0;
        }

        // Draw from the other len - 1 slides and skip over the current index.
        let pick = rng.gen_range(0..self.photos.len() - 1);
        let next = if pick >= self.current_index { pick + 1 } else { pick };

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(self.current_index);
        trace!("Advancing slide {} -> {} (history depth {})", self.current_index, next, self.history.len());
        self.current_index = next;
        self.current_image = None;
        next
    }

    /// Returns to the most recently shown slide, or `None` when there is no history.
    pub fn retreat(&mut self) -> Option<usize> {
        let previous = self.history.pop_back()?;
        trace!("Retreating slide {} -> {} (history depth {})", self.current_index, previous, self.history.len());
        self.current_index = previous;
        self.current_image = None;
        Some(previous)
    }
}
