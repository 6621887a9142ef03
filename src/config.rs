use std::path::Path;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::Error;
use crate::playback::Mode;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Time each slide stays on screen before auto-advance, in milliseconds.
    pub slide_interval_ms: u64,
    /// Cross-fade duration when a slide replaces the previous one (0 = cut).
    pub transition_ms: u64,
    /// Pointer inactivity after which the control bar hides, in milliseconds.
    pub controls_hide_delay_ms: u64,
    /// Open the window borderless fullscreen.
    pub start_fullscreen: bool,
    /// Whether the slide timer runs from the start.
    pub auto_advance: bool,
    /// Traversal order used when the slideshow starts.
    pub start_mode: Mode,
    /// Enlarge images smaller than the window to fit it.
    pub upscale: bool,
    /// Optional deterministic seed for random-mode shuffles.
    pub shuffle_seed: Option<u64>,
    /// Skip dot-directories below each root while scanning.
    pub skip_hidden_dirs: bool,
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Clear colour behind letterboxed photos.
    pub background: [u8; 3],
}

impl Configuration {
    /// Parse a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    /// [`Error::Io`] when the file cannot be read, [`Error::Config`] when it
    /// is not valid configuration YAML.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&s)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    /// [`Error::Config`] on malformed YAML, wrong types or unknown keys.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.slide_interval_ms > 0,
            "slide-interval-ms must be greater than zero"
        );
        ensure!(
            self.transition_ms < self.slide_interval_ms,
            "transition-ms ({}) must be shorter than slide-interval-ms ({})",
            self.transition_ms,
            self.slide_interval_ms
        );
        ensure!(
            (1_000..=60_000).contains(&self.controls_hide_delay_ms),
            "controls-hide-delay-ms must be between 1000 and 60000"
        );
        Ok(self)
    }

    #[must_use]
    pub const fn slide_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.slide_interval_ms)
    }

    #[must_use]
    pub const fn transition(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.transition_ms)
    }

    #[must_use]
    pub const fn controls_hide_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.controls_hide_delay_ms)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            slide_interval_ms: 3000,
            transition_ms: 400,
            controls_hide_delay_ms: 3500,
            start_fullscreen: true,
            auto_advance: true,
            start_mode: Mode::Sequential,
            upscale: false,
            shuffle_seed: None,
            skip_hidden_dirs: false,
            max_depth: None,
            background: [0, 0, 0],
        }
    }
}
