//! Maps keys, buttons, timer ticks and loader outcomes onto playback
//! transitions. All slideshow mutation happens in [`Slideshow::handle`].

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ImagePath};
use crate::config::Configuration;
use crate::playback::{Mode, PlaybackState, SlideTimer};

/// Keyboard keys the slideshow reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Left,
    Right,
    R,
    F,
}

/// On-screen buttons, in the order they appear in the control bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlButton {
    Previous,
    Auto,
    Pause,
    Random,
    Fullscreen,
    Next,
    Quit,
}

impl ControlButton {
    pub const ALL: [Self; 7] = [
        Self::Previous,
        Self::Auto,
        Self::Pause,
        Self::Random,
        Self::Fullscreen,
        Self::Next,
        Self::Quit,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    TogglePause,
    ToggleMode,
    ToggleFullscreen,
    ToggleAutoAdvance,
    /// Leave fullscreen, or quit when already windowed.
    Escape,
    Quit,
}

impl From<Key> for Command {
    fn from(key: Key) -> Self {
        match key {
            Key::Escape => Self::Escape,
            Key::Space => Self::TogglePause,
            Key::Left => Self::Previous,
            Key::Right => Self::Next,
            Key::R => Self::ToggleMode,
            Key::F => Self::ToggleFullscreen,
        }
    }
}

impl From<ControlButton> for Command {
    fn from(button: ControlButton) -> Self {
        match button {
            ControlButton::Previous => Self::Previous,
            ControlButton::Auto => Self::ToggleAutoAdvance,
            ControlButton::Pause => Self::TogglePause,
            ControlButton::Random => Self::ToggleMode,
            ControlButton::Fullscreen => Self::ToggleFullscreen,
            ControlButton::Next => Self::Next,
            ControlButton::Quit => Self::Quit,
        }
    }
}

/// Everything that can happen to the slideshow, as seen by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    /// A pointer press; `None` when it hit no button.
    Click(Option<ControlButton>),
    PointerMoved,
    /// Wall-clock progress; fires the slide timer and hides idle controls.
    Tick,
    /// The slide for this path is now on screen.
    Shown(std::path::PathBuf),
    DecodeFailed(std::path::PathBuf),
}

/// What the event loop must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Status or controls changed; repaint the overlay.
    Refresh,
    /// The slide under the cursor changed; load and show it.
    Show,
    SetFullscreen(bool),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Travel {
    Forward,
    Backward,
}

/// Snapshot of what the status line should say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// One-based slide number and total, when there is a slide.
    pub position: Option<(usize, usize)>,
    pub folder: String,
    pub mode: Mode,
    pub paused: bool,
    pub auto_advance: bool,
    pub fullscreen: bool,
}

impl Status {
    #[must_use]
    pub fn line(&self) -> String {
        let mut parts = Vec::with_capacity(5);
        match self.position {
            Some((n, total)) => {
                parts.push(format!("Image {n}/{total}"));
                parts.push(format!("Folder: {}", self.folder));
            }
            None => parts.push("No images".to_string()),
        }
        if self.mode == Mode::Random {
            parts.push("[RANDOM]".to_string());
        }
        if self.paused {
            parts.push("[PAUSED]".to_string());
        }
        parts.push(format!(
            "Auto [{}]",
            if self.auto_advance { "ON" } else { "OFF" }
        ));
        parts.join(" | ")
    }

    /// Whether `button` should be drawn in its "on" colour.
    #[must_use]
    pub fn is_active(&self, button: ControlButton) -> bool {
        match button {
            ControlButton::Auto => self.auto_advance,
            ControlButton::Pause => self.paused,
            ControlButton::Random => self.mode == Mode::Random,
            ControlButton::Fullscreen => self.fullscreen,
            _ => false,
        }
    }
}

/// Visibility of the control bar, driven by pointer movement.
#[derive(Debug, Clone)]
pub struct ControlBar {
    hide_after: Duration,
    last_motion: Option<Instant>,
}

impl ControlBar {
    #[must_use]
    pub const fn new(hide_after: Duration) -> Self {
        Self {
            hide_after,
            last_motion: None,
        }
    }

    /// Record pointer activity. Returns `true` if the bar was hidden before.
    pub fn reveal(&mut self, now: Instant) -> bool {
        let was_visible = self.is_visible(now);
        self.last_motion = Some(now);
        !was_visible
    }

    #[must_use]
    pub fn is_visible(&self, now: Instant) -> bool {
        self.hide_deadline().is_some_and(|deadline| now < deadline)
    }

    #[must_use]
    pub fn hide_deadline(&self) -> Option<Instant> {
        self.last_motion.map(|t| t + self.hide_after)
    }

    /// Forget the last movement once the deadline has passed. Returns `true`
    /// when the bar just became hidden.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.last_motion.is_some() && !self.is_visible(now) {
            self.last_motion = None;
            return true;
        }
        false
    }
}

/// Application controller: owns the catalog, playback state, slide timer and
/// control-bar visibility.
#[derive(Debug)]
pub struct Slideshow {
    catalog: Catalog,
    state: PlaybackState,
    timer: SlideTimer,
    controls: ControlBar,
    travel: Travel,
    failures: usize,
    exhausted: bool,
}

impl Slideshow {
    #[must_use]
    pub fn new(catalog: Catalog, cfg: &Configuration, now: Instant) -> Self {
        let mut state = PlaybackState::new(catalog.len(), cfg.shuffle_seed);
        if cfg.start_mode != Mode::Sequential {
            state.set_mode(cfg.start_mode);
        }
        state.set_fullscreen(cfg.start_fullscreen);
        state.set_auto_advance(cfg.auto_advance);
        let mut show = Self {
            catalog,
            state,
            timer: SlideTimer::new(cfg.slide_interval()),
            controls: ControlBar::new(cfg.controls_hide_delay()),
            travel: Travel::Forward,
            failures: 0,
            exhausted: false,
        };
        show.sync_timer(now);
        show
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub const fn timer(&self) -> &SlideTimer {
        &self.timer
    }

    /// Every catalog entry failed to decode in a row; nothing left to show.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn current_image(&self) -> Option<&ImagePath> {
        if self.exhausted {
            return None;
        }
        self.state.current().and_then(|idx| self.catalog.get(idx))
    }

    #[must_use]
    pub fn upcoming_image(&self) -> Option<&ImagePath> {
        self.state.upcoming().and_then(|idx| self.catalog.get(idx))
    }

    #[must_use]
    pub fn controls_visible(&self, now: Instant) -> bool {
        self.controls.is_visible(now)
    }

    /// Earliest instant at which [`Event::Tick`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timer.next_due(), self.controls.hide_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        let position = self
            .current_image()
            .map(|_| (self.state.position() + 1, self.state.len()));
        Status {
            position,
            folder: self
                .current_image()
                .map(ImagePath::folder_name)
                .unwrap_or_default(),
            mode: self.state.mode(),
            paused: self.state.is_paused(),
            auto_advance: self.state.auto_advance(),
            fullscreen: self.state.is_fullscreen(),
        }
    }

    /// The window changed fullscreen state on its own (window manager, OS
    /// shortcut); keep the flag honest.
    pub fn sync_fullscreen(&mut self, on: bool) {
        self.state.set_fullscreen(on);
    }

    /// Single state-transition function for every slideshow event.
    pub fn handle(&mut self, event: Event, now: Instant) -> Effect {
        match event {
            Event::Key(key) => self.apply(Command::from(key), now),
            Event::Click(target) => self.click(target, now),
            Event::PointerMoved => {
                if self.controls.reveal(now) {
                    Effect::Refresh
                } else {
                    Effect::None
                }
            }
            Event::Tick => self.tick(now),
            Event::Shown(path) => {
                if self.is_current(&path) {
                    self.failures = 0;
                }
                Effect::None
            }
            Event::DecodeFailed(path) => self.decode_failed(&path, now),
        }
    }

    /// Apply one command from the transition table.
    pub fn apply(&mut self, command: Command, now: Instant) -> Effect {
        match command {
            Command::Next => self.step(Travel::Forward, now),
            Command::Previous => self.step(Travel::Backward, now),
            Command::ToggleMode => {
                let mode = self.state.toggle_mode();
                info!(?mode, "traversal mode changed");
                if self.catalog.is_empty() {
                    return Effect::Refresh;
                }
                self.resume_after_exhaustion(now);
                self.failures = 0;
                self.travel = Travel::Forward;
                self.restart_dwell(now);
                Effect::Show
            }
            Command::TogglePause => {
                let paused = self.state.toggle_pause();
                info!(paused, "pause toggled");
                self.sync_timer(now);
                Effect::Refresh
            }
            Command::ToggleAutoAdvance => {
                let on = self.state.toggle_auto_advance();
                info!(auto_advance = on, "auto-advance toggled");
                self.sync_timer(now);
                Effect::Refresh
            }
            Command::ToggleFullscreen => {
                let on = self.state.toggle_fullscreen();
                info!(fullscreen = on, "fullscreen toggled");
                Effect::SetFullscreen(on)
            }
            Command::Escape => {
                if self.state.is_fullscreen() {
                    self.state.set_fullscreen(false);
                    info!("leaving fullscreen");
                    Effect::SetFullscreen(false)
                } else {
                    self.quit()
                }
            }
            Command::Quit => self.quit(),
        }
    }

    fn click(&mut self, target: Option<ControlButton>, now: Instant) -> Effect {
        if self.controls.reveal(now) {
            // A click on a hidden bar only brings it back.
            return Effect::Refresh;
        }
        match target {
            Some(button) => {
                debug!(?button, "button pressed");
                self.apply(Command::from(button), now)
            }
            None => Effect::None,
        }
    }

    fn tick(&mut self, now: Instant) -> Effect {
        let hidden = self.controls.expire(now);
        if self.timer.poll(now) {
            self.state.advance();
            self.travel = Travel::Forward;
            return Effect::Show;
        }
        if hidden { Effect::Refresh } else { Effect::None }
    }

    fn step(&mut self, travel: Travel, now: Instant) -> Effect {
        if self.catalog.is_empty() {
            return Effect::None;
        }
        self.resume_after_exhaustion(now);
        // Only failures met while skipping on our own count towards the stop.
        self.failures = 0;
        match travel {
            Travel::Forward => self.state.advance(),
            Travel::Backward => self.state.retreat(),
        }
        self.travel = travel;
        self.restart_dwell(now);
        Effect::Show
    }

    fn decode_failed(&mut self, path: &Path, now: Instant) -> Effect {
        if !self.is_current(path) {
            debug!(path = %path.display(), "ignoring failure for a slide no longer shown");
            return Effect::None;
        }
        self.failures += 1;
        if self.failures >= self.catalog.len() {
            warn!(
                failures = self.failures,
                "no image in the catalog could be decoded; stopping"
            );
            self.exhausted = true;
            self.timer.disarm();
            return Effect::Refresh;
        }
        match self.travel {
            Travel::Forward => self.state.advance(),
            Travel::Backward => self.state.retreat(),
        }
        self.restart_dwell(now);
        Effect::Show
    }

    fn quit(&mut self) -> Effect {
        info!("quit requested");
        self.timer.disarm();
        Effect::Exit
    }

    fn is_current(&self, path: &Path) -> bool {
        self.current_image().is_some_and(|p| p.as_path() == path)
    }

    fn resume_after_exhaustion(&mut self, now: Instant) {
        if self.exhausted {
            self.exhausted = false;
            self.failures = 0;
            self.sync_timer(now);
        }
    }

    fn restart_dwell(&mut self, now: Instant) {
        if self.timer.is_armed() {
            self.timer.arm(now);
        }
    }

    fn sync_timer(&mut self, now: Instant) {
        let running = self.state.timer_should_run() && !self.exhausted;
        self.timer.sync(running, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::from_paths(names.iter().map(|n| PathBuf::from(format!("/photos/{n}"))))
    }

    fn slideshow(names: &[&str]) -> (Slideshow, Instant) {
        let cfg = Configuration {
            shuffle_seed: Some(3),
            ..Configuration::default()
        };
        let now = Instant::now();
        (Slideshow::new(catalog(names), &cfg, now), now)
    }

    fn current_name(show: &Slideshow) -> String {
        show.current_image()
            .map(|p| p.as_path().file_name().unwrap().to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn key_table_matches_buttons() {
        assert_eq!(Command::from(Key::Space), Command::TogglePause);
        assert_eq!(Command::from(Key::R), Command::from(ControlButton::Random));
        assert_eq!(Command::from(Key::Left), Command::from(ControlButton::Previous));
        assert_eq!(Command::from(Key::Right), Command::from(ControlButton::Next));
        assert_eq!(Command::from(Key::F), Command::from(ControlButton::Fullscreen));
        assert_eq!(Command::from(ControlButton::Auto), Command::ToggleAutoAdvance);
        assert_eq!(Command::from(ControlButton::Quit), Command::Quit);
    }

    #[test]
    fn right_and_left_navigate_with_wrap() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.png", "c.gif"]);
        assert_eq!(current_name(&show), "a.jpg");
        assert_eq!(show.handle(Event::Key(Key::Right), t0), Effect::Show);
        assert_eq!(current_name(&show), "b.png");
        show.handle(Event::Key(Key::Right), t0);
        show.handle(Event::Key(Key::Right), t0);
        assert_eq!(current_name(&show), "a.jpg");
        show.handle(Event::Key(Key::Left), t0);
        assert_eq!(current_name(&show), "c.gif");
    }

    #[test]
    fn escape_leaves_fullscreen_before_quitting() {
        let (mut show, t0) = slideshow(&["a.jpg"]);
        assert!(show.state().is_fullscreen());
        assert_eq!(
            show.handle(Event::Key(Key::Escape), t0),
            Effect::SetFullscreen(false)
        );
        assert_eq!(show.handle(Event::Key(Key::Escape), t0), Effect::Exit);
        assert!(!show.timer().is_armed());
    }

    #[test]
    fn quit_disarms_timer() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        assert!(show.timer().is_armed());
        assert_eq!(show.apply(Command::Quit, t0), Effect::Exit);
        assert!(!show.timer().is_armed());
    }

    #[test]
    fn timer_drives_three_advances_in_nine_seconds() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        let mut shows = Vec::new();
        for ms in (0..=9000u64).step_by(50) {
            let now = t0 + Duration::from_millis(ms);
            if show.handle(Event::Tick, now) == Effect::Show {
                shows.push(ms);
            }
        }
        assert_eq!(shows, vec![3000, 6000, 9000]);
        assert_eq!(current_name(&show), "d.jpg");
    }

    #[test]
    fn pause_stops_ticks_but_not_manual_navigation() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        show.handle(Event::Key(Key::Space), t0);
        assert!(show.state().is_paused());
        assert!(!show.timer().is_armed());
        assert_eq!(
            show.handle(Event::Tick, t0 + Duration::from_secs(30)),
            Effect::None
        );
        assert_eq!(current_name(&show), "a.jpg");
        assert_eq!(show.handle(Event::Key(Key::Right), t0), Effect::Show);
        assert_eq!(current_name(&show), "b.jpg");
    }

    #[test]
    fn resume_rearms_from_now_without_backlog() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        show.apply(Command::TogglePause, t0);
        let later = t0 + Duration::from_secs(20);
        show.apply(Command::TogglePause, later);
        assert_eq!(show.timer().next_due(), Some(later + Duration::from_secs(3)));
        assert_eq!(show.handle(Event::Tick, later), Effect::None);
    }

    #[test]
    fn auto_advance_off_disarms_independently_of_pause() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        show.handle(Event::Click(None), t0);
        show.handle(Event::Click(Some(ControlButton::Auto)), t0);
        assert!(!show.state().auto_advance());
        assert!(!show.state().is_paused());
        assert!(!show.timer().is_armed());
        show.handle(Event::Click(Some(ControlButton::Auto)), t0);
        assert!(show.timer().is_armed());
    }

    #[test]
    fn manual_step_restarts_dwell() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        let t1 = t0 + Duration::from_millis(2500);
        show.apply(Command::Next, t1);
        assert_eq!(show.timer().next_due(), Some(t1 + Duration::from_secs(3)));
        assert_eq!(
            show.handle(Event::Tick, t0 + Duration::from_millis(3000)),
            Effect::None
        );
    }

    #[test]
    fn empty_catalog_navigation_is_noop() {
        let (mut show, t0) = slideshow(&[]);
        assert_eq!(show.apply(Command::Next, t0), Effect::None);
        assert_eq!(show.apply(Command::Previous, t0), Effect::None);
        assert!(show.current_image().is_none());
        assert!(!show.timer().is_armed());
        assert_eq!(show.status().line(), "No images | Auto [ON]");
    }

    #[test]
    fn decode_failure_skips_forward() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        show.apply(Command::Next, t0);
        let broken = show.current_image().unwrap().as_path().to_path_buf();
        assert_eq!(show.handle(Event::DecodeFailed(broken), t0), Effect::Show);
        assert_eq!(current_name(&show), "c.jpg");
    }

    #[test]
    fn decode_failure_after_previous_skips_backward() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        show.apply(Command::Previous, t0);
        let broken = show.current_image().unwrap().as_path().to_path_buf();
        show.handle(Event::DecodeFailed(broken), t0);
        assert_eq!(current_name(&show), "b.jpg");
    }

    #[test]
    fn stale_decode_failure_is_ignored() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        let effect = show.handle(Event::DecodeFailed(PathBuf::from("/photos/c.jpg")), t0);
        assert_eq!(effect, Effect::None);
        assert_eq!(current_name(&show), "a.jpg");
    }

    #[test]
    fn all_broken_catalog_stops_skipping() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        let first = show.current_image().unwrap().as_path().to_path_buf();
        assert_eq!(show.handle(Event::DecodeFailed(first), t0), Effect::Show);
        let second = show.current_image().unwrap().as_path().to_path_buf();
        assert_eq!(show.handle(Event::DecodeFailed(second), t0), Effect::Refresh);
        assert!(show.is_exhausted());
        assert!(show.current_image().is_none());
        assert!(!show.timer().is_armed());

        assert_eq!(show.apply(Command::Next, t0), Effect::Show);
        assert!(!show.is_exhausted());
        assert!(show.timer().is_armed());
    }

    #[test]
    fn successful_show_resets_failure_count() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        let a = show.current_image().unwrap().as_path().to_path_buf();
        show.handle(Event::DecodeFailed(a), t0);
        let b = show.current_image().unwrap().as_path().to_path_buf();
        show.handle(Event::Shown(b), t0);
        show.apply(Command::Next, t0);
        let c = show.current_image().unwrap().as_path().to_path_buf();
        show.handle(Event::DecodeFailed(c), t0);
        show.apply(Command::Next, t0);
        let b = show.current_image().unwrap().as_path().to_path_buf();
        assert_eq!(show.handle(Event::DecodeFailed(b), t0), Effect::Show);
        assert!(!show.is_exhausted());
    }

    #[test]
    fn manual_step_between_failures_keeps_show_alive() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg"]);
        show.handle(Event::DecodeFailed(PathBuf::from("/photos/a.jpg")), t0);
        assert_eq!(current_name(&show), "b.jpg");
        assert_eq!(show.apply(Command::Next, t0), Effect::Show);
        assert_eq!(
            show.handle(Event::DecodeFailed(PathBuf::from("/photos/c.jpg")), t0),
            Effect::Show
        );
        assert_eq!(
            show.handle(Event::DecodeFailed(PathBuf::from("/photos/a.jpg")), t0),
            Effect::Show
        );
        assert!(!show.is_exhausted());
        assert_eq!(current_name(&show), "b.jpg");
    }

    #[test]
    fn mode_toggle_between_failures_keeps_show_alive() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        show.handle(Event::DecodeFailed(PathBuf::from("/photos/a.jpg")), t0);
        assert_eq!(show.apply(Command::ToggleMode, t0), Effect::Show);
        let current = show.current_image().unwrap().as_path().to_path_buf();
        assert_eq!(show.handle(Event::DecodeFailed(current), t0), Effect::Show);
        assert!(!show.is_exhausted());
    }

    #[test]
    fn mode_toggle_resets_to_first_of_new_order() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        show.apply(Command::Next, t0);
        assert_eq!(show.apply(Command::ToggleMode, t0), Effect::Show);
        assert_eq!(show.state().mode(), Mode::Random);
        assert_eq!(show.state().position(), 0);
        show.apply(Command::ToggleMode, t0);
        assert_eq!(current_name(&show), "a.jpg");
        assert!(show.status().line().starts_with("Image 1/4 | Folder: photos"));
    }

    #[test]
    fn controls_hide_after_inactivity() {
        let (mut show, t0) = slideshow(&["a.jpg"]);
        show.apply(Command::TogglePause, t0);
        assert!(!show.controls_visible(t0));
        assert_eq!(show.handle(Event::PointerMoved, t0), Effect::Refresh);
        assert_eq!(show.handle(Event::PointerMoved, t0), Effect::None);
        let later = t0 + Duration::from_millis(3500);
        assert!(!show.controls_visible(later));
        assert_eq!(show.handle(Event::Tick, later), Effect::Refresh);
        assert_eq!(show.handle(Event::Tick, later), Effect::None);
    }

    #[test]
    fn click_on_hidden_bar_only_reveals() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        let effect = show.handle(Event::Click(Some(ControlButton::Next)), t0);
        assert_eq!(effect, Effect::Refresh);
        assert_eq!(current_name(&show), "a.jpg");
        let effect = show.handle(Event::Click(Some(ControlButton::Next)), t0);
        assert_eq!(effect, Effect::Show);
        assert_eq!(current_name(&show), "b.jpg");
    }

    #[test]
    fn next_deadline_is_earliest_of_timer_and_controls() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        assert_eq!(show.next_deadline(), Some(t0 + Duration::from_secs(3)));
        show.handle(Event::PointerMoved, t0);
        assert_eq!(show.next_deadline(), Some(t0 + Duration::from_secs(3)));
        show.apply(Command::TogglePause, t0);
        assert_eq!(show.next_deadline(), Some(t0 + Duration::from_millis(3500)));
    }

    #[test]
    fn status_marks_active_buttons() {
        let (mut show, t0) = slideshow(&["a.jpg", "b.jpg"]);
        show.apply(Command::TogglePause, t0);
        show.apply(Command::ToggleMode, t0);
        let status = show.status();
        assert!(status.is_active(ControlButton::Pause));
        assert!(status.is_active(ControlButton::Random));
        assert!(status.is_active(ControlButton::Auto));
        assert!(!status.is_active(ControlButton::Next));
        assert!(status.line().contains("[RANDOM] | [PAUSED]"));
    }
}
