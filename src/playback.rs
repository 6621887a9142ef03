//! Cursor over the catalog plus the play/pause/mode flags, and the deadline
//! model of the slide timer.

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Sequential,
    Random,
}

impl Mode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Sequential => Self::Random,
            Self::Random => Self::Sequential,
        }
    }
}

/// Navigation state of the slideshow.
///
/// `order` is a permutation of catalog indices: identity in
/// [`Mode::Sequential`], a fresh shuffle in [`Mode::Random`]. `position` always
/// indexes into `order` while the catalog is non-empty.
///
/// Switching mode resets the cursor to the first entry of the regenerated
/// order.
#[derive(Debug)]
pub struct PlaybackState {
    mode: Mode,
    order: Vec<usize>,
    position: usize,
    paused: bool,
    fullscreen: bool,
    auto_advance: bool,
    rng: StdRng,
}

impl PlaybackState {
    /// Initial state for a catalog of `len` entries: sequential, first image,
    /// not paused.
    #[must_use]
    pub fn new(len: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            mode: Mode::Sequential,
            order: (0..len).collect(),
            position: 0,
            paused: false,
            fullscreen: false,
            auto_advance: true,
            rng,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Catalog index of the slide under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.order.get(self.position).copied()
    }

    /// Catalog index the next [`advance`](Self::advance) would land on.
    #[must_use]
    pub fn upcoming(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        self.order.get((self.position + 1) % self.order.len()).copied()
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    #[must_use]
    pub const fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    /// Step forward, wrapping from last to first. No-op on an empty catalog.
    pub fn advance(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.position = (self.position + 1) % self.order.len();
    }

    /// Step backward, wrapping from first to last. No-op on an empty catalog.
    pub fn retreat(&mut self) {
        if self.order.is_empty() {
            return;
        }
        let len = self.order.len();
        self.position = (self.position + len - 1) % len;
    }

    /// Flip between sequential and random traversal.
    pub fn toggle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    /// Enter `mode`, regenerating the order and resetting the cursor.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        for (slot, idx) in self.order.iter_mut().zip(0..) {
            *slot = idx;
        }
        if mode == Mode::Random {
            self.order.shuffle(&mut self.rng);
        }
        self.position = 0;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, on: bool) {
        self.fullscreen = on;
    }

    pub fn toggle_auto_advance(&mut self) -> bool {
        self.auto_advance = !self.auto_advance;
        self.auto_advance
    }

    pub fn set_auto_advance(&mut self, on: bool) {
        self.auto_advance = on;
    }

    /// Whether the slide timer should be running.
    #[must_use]
    pub fn timer_should_run(&self) -> bool {
        self.auto_advance && !self.paused && !self.order.is_empty()
    }
}

/// Deadline-based repeating timer for automatic advancement.
#[derive(Debug, Clone)]
pub struct SlideTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl SlideTimer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    #[must_use]
    pub const fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Start a fresh interval from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    /// Arm or disarm to match `running`, keeping an existing deadline.
    pub fn sync(&mut self, running: bool, now: Instant) {
        match (running, self.next_due) {
            (true, None) => self.arm(now),
            (false, Some(_)) => self.disarm(),
            _ => {}
        }
    }

    /// Returns `true` when the deadline has passed, scheduling the next one.
    ///
    /// The next deadline follows the previous one so slides keep a steady
    /// cadence; if the loop fell more than an interval behind it restarts from
    /// `now` instead of firing a burst.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let next = due + self.interval;
        self.next_due = Some(if next <= now { now + self.interval } else { next });
        true
    }
}
