//! Picks the candidate source and tells the presentation layer what changed.
//!
//! While the engine is composing, candidates come from the aggregator. Otherwise
//! the active auto-suggestion list (if any) is shown. Every change is reported
//! to a `CandidateSink`: a rebuilt view as `sections_changed`, rows grown at the
//! end of section 0 as `more_candidates_appended`.

use crate::aggregator::CandidateAggregator;
use crate::candidate::{CandidateIndex, GroupByMode};
use crate::composition::CompositionEngine;
use crate::suggestion::AutoSuggestion;
use std::ops::Range;
use tracing::debug;

/// Receiver of candidate view notifications.
pub trait CandidateSink {
    fn sections_changed(&mut self) {}

    fn more_candidates_appended(&mut self, _section: usize, _rows: Range<usize>) {}
}

/// Sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CandidateSink for NullSink {}

impl<S: CandidateSink + ?Sized> CandidateSink for &mut S {
    fn sections_changed(&mut self) {
        (**self).sections_changed()
    }

    fn more_candidates_appended(&mut self, section: usize, rows: Range<usize>) {
        (**self).more_candidates_appended(section, rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveSource {
    Nothing,
    Engine,
    Suggestion(AutoSuggestion),
}

const FREQUENCY_ONLY: &[GroupByMode] = &[GroupByMode::ByFrequency];

pub struct CandidateOrganizer<E, S = NullSink> {
    aggregator: CandidateAggregator<E>,
    sink: S,
    auto_suggestion: Option<AutoSuggestion>,
    active: ActiveSource,
}

impl<E: CompositionEngine> CandidateOrganizer<E, NullSink> {
    pub fn without_sink(aggregator: CandidateAggregator<E>) -> Self {
        Self::new(aggregator, NullSink)
    }
}

impl<E: CompositionEngine, S: CandidateSink> CandidateOrganizer<E, S> {
    pub fn new(aggregator: CandidateAggregator<E>, sink: S) -> Self {
        Self {
            aggregator,
            sink,
            auto_suggestion: None,
            active: ActiveSource::Nothing,
        }
    }

    pub fn aggregator(&self) -> &CandidateAggregator<E> {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut CandidateAggregator<E> {
        &mut self.aggregator
    }

    pub fn engine(&self) -> &E {
        self.aggregator.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.aggregator.engine_mut()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn auto_suggestion(&self) -> Option<AutoSuggestion> {
        self.auto_suggestion
    }

    /// List shown while nothing is being composed. Takes effect on the next update.
    pub fn set_auto_suggestion(&mut self, suggestion: Option<AutoSuggestion>) {
        self.auto_suggestion = suggestion;
    }

    pub fn is_showing_engine_candidates(&self) -> bool {
        self.active == ActiveSource::Engine
    }

    fn page_size(&self) -> usize {
        self.aggregator.config().page_size.max(1)
    }

    fn pick_source(&self) -> ActiveSource {
        if self.aggregator.engine().is_composing() {
            ActiveSource::Engine
        } else if let Some(suggestion) = self.auto_suggestion {
            ActiveSource::Suggestion(suggestion)
        } else {
            ActiveSource::Nothing
        }
    }

    /// Refresh the view after the composition changed (`reload`) or to grow it.
    pub fn update_candidates(&mut self, reload: bool) {
        let source = self.pick_source();
        let reload = reload || source != self.active;
        if source != self.active {
            debug!(from = ?self.active, to = ?source, "candidate source changed");
        }
        self.active = source;

        match source {
            ActiveSource::Engine => {
                let target = if reload {
                    self.page_size()
                } else {
                    self.aggregator.candidate_count(0) + self.page_size()
                };
                let outcome = self.aggregator.update_candidates(reload, target);
                if outcome.reloaded {
                    self.sink.sections_changed();
                } else if !outcome.appended.is_empty() {
                    self.sink.more_candidates_appended(0, outcome.appended);
                }
            }
            ActiveSource::Suggestion(_) | ActiveSource::Nothing => {
                self.aggregator.reset();
                if reload {
                    self.sink.sections_changed();
                }
            }
        }
    }

    /// Grow section 0 of the engine view. Returns whether rows were appended.
    pub fn request_more(&mut self, section: usize) -> bool {
        if section != 0
            || self.active != ActiveSource::Engine
            || self.aggregator.engine().has_exhausted_romanization()
        {
            return false;
        }
        let before = self.aggregator.candidate_count(0);
        self.update_candidates(false);
        self.aggregator.candidate_count(0) > before
    }

    pub fn number_of_sections(&self) -> usize {
        match self.active {
            ActiveSource::Engine => self.aggregator.number_of_sections(),
            ActiveSource::Suggestion(_) => 1,
            ActiveSource::Nothing => 0,
        }
    }

    pub fn section_header(&self, section: usize) -> Option<&str> {
        match self.active {
            ActiveSource::Engine => self.aggregator.section_header(section),
            _ => None,
        }
    }

    pub fn candidate_count(&self, section: usize) -> usize {
        match self.active {
            ActiveSource::Engine => self.aggregator.candidate_count(section),
            ActiveSource::Suggestion(s) if section == 0 => s.candidates().len(),
            _ => 0,
        }
    }

    pub fn candidate(&self, index: CandidateIndex) -> Option<String> {
        match self.active {
            ActiveSource::Engine => self.aggregator.candidate(index),
            ActiveSource::Suggestion(s) if index.section == 0 => {
                s.candidate(index.row).map(str::to_string)
            }
            _ => None,
        }
    }

    pub fn candidate_comment(&self, index: CandidateIndex) -> Option<String> {
        match self.active {
            ActiveSource::Engine => self.aggregator.candidate_comment(index),
            _ => None,
        }
    }

    /// Commit a candidate and reload the view.
    pub fn select_candidate(&mut self, index: CandidateIndex) -> Option<String> {
        let selected = match self.active {
            ActiveSource::Engine => self.aggregator.select_candidate(index),
            ActiveSource::Suggestion(_) => self.candidate(index),
            ActiveSource::Nothing => None,
        };
        self.update_candidates(true);
        selected
    }

    pub fn unlearn_candidate(&mut self, index: CandidateIndex) -> bool {
        if self.active != ActiveSource::Engine {
            return false;
        }
        let removed = self.aggregator.unlearn_candidate(index);
        self.update_candidates(true);
        removed
    }

    pub fn supported_group_by_modes(&self) -> &'static [GroupByMode] {
        match self.active {
            ActiveSource::Engine => &GroupByMode::ALL,
            _ => FREQUENCY_ONLY,
        }
    }

    pub fn group_by_mode(&self) -> GroupByMode {
        match self.active {
            ActiveSource::Engine => self.aggregator.group_by_mode(),
            _ => GroupByMode::ByFrequency,
        }
    }

    /// Regroup the engine view. Ignored for other sources.
    pub fn set_group_by_mode(&mut self, mode: GroupByMode) {
        if self.active != ActiveSource::Engine {
            return;
        }
        if self.aggregator.set_group_by_mode(mode).reloaded {
            self.sink.sections_changed();
        }
    }

    /// Whether committing from the current list should close the candidate pane.
    pub fn closes_pane_on_commit(&self) -> bool {
        matches!(self.active, ActiveSource::Suggestion(s) if s.closes_pane_on_commit())
    }

    /// Whether the candidate strip must not expand into a full pane.
    pub fn cannot_expand(&self) -> bool {
        matches!(self.active, ActiveSource::Suggestion(s) if s.cannot_expand())
    }
}
