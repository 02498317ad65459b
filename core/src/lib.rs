//! jyutboard-core
//!
//! Interactive core of a Jyutping on-screen keyboard: touch gesture resolution
//! and candidate aggregation over a romanization engine and an English
//! completion engine.
//!
//! Public API:
//! - `GestureMachine` - Multi-contact touch state machine emitting `KeyboardAction`s
//! - `ActionDispatcher` - Sink receiving resolved actions
//! - `CompositionEngine` - Narrow lookup interface over the two backends
//! - `CandidateAggregator` - Sectioned, lazily grown candidate view
//! - `CandidateOrganizer` - Source selection and presentation notifications
//! - `CandidatePager` - Page/cursor navigation with load-more
//! - `GlyphLookup` - Radical and stroke metadata used by grouped modes
//! - `Config` - Gesture and candidate tuning
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod action;
pub use action::{KeyAction, KeyHit, KeyId, KeyboardAction, KeyboardType, ShiftState};

pub mod dispatcher;
pub use dispatcher::{ActionDispatcher, KeyFeedback, RecordingDispatcher};

pub mod gesture;
pub use gesture::{
    ContactEvent, ContactId, ContactPhase, Force, GestureMachine, GestureMode, Point, TimerHandle,
    TimerKind,
};

pub mod composition;
pub use composition::{Composition, CompositionEngine, InputMode, VecCompositionEngine};

pub mod candidate;
pub use candidate::{
    Candidate, CandidateFilter, CandidateIndex, CandidatePath, CandidateSection, CandidateSource,
    GroupByMode,
};

pub mod glyph;
pub use glyph::{GlyphInfo, GlyphLookup, GlyphTable, GlyphWhitelist, RedbGlyphTable};

pub mod grouping;

pub mod aggregator;
pub use aggregator::{AggregatorState, CandidateAggregator, UpdateOutcome};

pub mod suggestion;
pub use suggestion::AutoSuggestion;

pub mod organizer;
pub use organizer::{CandidateOrganizer, CandidateSink, NullSink};

pub mod pager;
pub use pager::CandidatePager;

/// How concurrent key contacts are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceIdiom {
    /// A new key-down commits every other typing contact except held modifiers.
    Phone,
    /// Key-up commits older queued contacts first to keep insertion order.
    Pad,
}

/// Tuning for the gesture machine and the candidate engine.
///
/// Every product-tuning constant lives here rather than in code so front-ends
/// can adjust it from a TOML file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Gesture resolution
    pub device_idiom: DeviceIdiom,
    /// Delay before the first backspace repeat (ms)
    pub key_repeat_initial_delay_ms: u64,
    /// Period between backspace repeats (ms)
    pub key_repeat_interval_ms: u64,
    /// Repeats emitted as single-character deletes before switching to word deletes
    pub backspace_repeats_before_word_delete: u32,
    /// Hold time before a key opens its long-press overlay (ms)
    pub long_press_delay_ms: u64,
    /// Movement from the start point that cancels a pending long-press
    pub long_press_cancel_distance: f32,
    /// Window in which a second shift tap locks caps (ms)
    pub double_tap_window_ms: u64,
    /// Leftward drag on the delete key that deletes a word
    pub swipe_delete_threshold: f32,
    /// Horizontal distance per cursor step
    pub cursor_step: f32,
    /// Horizontal displacement needed to start moving the cursor
    pub cursor_move_threshold: f32,
    /// Horizontal displacement needed for a force swipe on a character key
    pub force_swipe_min_distance: f32,
    /// Fraction of maximum force counted as a strong press
    pub strong_press_ratio: f32,
    /// Horizontal distance per long-press overlay choice
    pub overlay_step: f32,

    // Candidate aggregation
    /// Every Nth row of the best block is a completion candidate
    pub completion_interleave_period: usize,
    /// Interleave completions identical to the raw input instead of deferring them
    pub show_raw_completion_inline: bool,
    /// Upper bound on backend pulls in one update
    pub max_load_iterations: usize,
    /// Rows per pager page
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_idiom: DeviceIdiom::Phone,
            key_repeat_initial_delay_ms: 640,
            key_repeat_interval_ms: 80,
            backspace_repeats_before_word_delete: 13,
            long_press_delay_ms: 320,
            long_press_cancel_distance: 20.0,
            double_tap_window_ms: 350,
            swipe_delete_threshold: 30.0,
            cursor_step: 8.0,
            cursor_move_threshold: 10.0,
            force_swipe_min_distance: 30.0,
            strong_press_ratio: 0.5,
            overlay_step: 24.0,
            completion_interleave_period: 4,
            show_raw_completion_inline: false,
            max_load_iterations: 256,
            page_size: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn key_repeat_initial_delay(&self) -> Duration {
        Duration::from_millis(self.key_repeat_initial_delay_ms)
    }

    pub fn key_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.key_repeat_interval_ms.max(1))
    }

    pub fn long_press_delay(&self) -> Duration {
        Duration::from_millis(self.long_press_delay_ms)
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }

    /// Cursor step, never zero.
    pub fn effective_cursor_step(&self) -> f32 {
        if self.cursor_step > 0.0 {
            self.cursor_step
        } else {
            Config::default().cursor_step
        }
    }

    /// Interleave period; a period below 2 would leave no room for romanization rows.
    pub fn effective_interleave_period(&self) -> usize {
        self.completion_interleave_period.max(2)
    }
}

/// Utility helpers.
pub mod utils {
    use unicode_normalization::UnicodeNormalization;

    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Lowercase letters of `s`, dropping tone digits, spaces and other symbols.
    pub fn romanization_letters(s: &str) -> String {
        normalize(s)
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// `s` without its trailing tone digits ("nei5" -> "nei").
    pub fn without_trailing_digits(s: &str) -> &str {
        s.trim_end_matches(|c: char| c.is_ascii_digit())
    }

    /// Length of the longest common subsequence of two strings, in chars.
    pub fn longest_common_subsequence_len(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        let mut prev = vec![0usize; b.len() + 1];
        let mut cur = vec![0usize; b.len() + 1];
        for ca in &a {
            for (j, cb) in b.iter().enumerate() {
                cur[j + 1] = if ca == cb {
                    prev[j] + 1
                } else {
                    cur[j].max(prev[j + 1])
                };
            }
            std::mem::swap(&mut prev, &mut cur);
        }
        prev[b.len()]
    }
}
