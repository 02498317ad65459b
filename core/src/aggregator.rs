//! Candidate aggregation over the romanization and completion backends.
//!
//! `CandidateAggregator` owns a `CompositionEngine` and exposes the merged,
//! sectioned candidate view. In frequency order there is a single unheaded
//! section, filled in five resumable phases:
//!
//! 1. best romanization candidates (same length as the first one), only while
//!    the first candidate's reading covers the typed letters
//! 2. one best completion blended in every `completion_interleave_period` rows
//!    of phase 1
//! 3. the best completions not shown yet, in one batch, once phase 1 is over
//! 4. the remaining romanization candidates
//! 5. the worst completions, once the romanization backend is exhausted
//!
//! The grouped modes pull every romanization candidate and bucket them (see
//! `grouping`); they are rebuilt only on reload.

use crate::candidate::{
    Candidate, CandidateFilter, CandidateIndex, CandidatePath, CandidateSection, CandidateSource,
    GroupByMode,
};
use crate::composition::{CompositionEngine, InputMode};
use crate::glyph::GlyphLookup;
use crate::{grouping, utils, Config};
use std::ops::Range;
use tracing::{debug, trace, warn};

/// Cursors and phase flags of the frequency view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorState {
    /// Next romanization candidate to consider
    pub cur_romanization_index: usize,
    /// Next best completion to consider for blending
    pub cur_completion_index: usize,
    pub has_loaded_all_best: bool,
    pub has_populated_best_completions: bool,
    pub has_populated_worst_completions: bool,
    /// Completions equal to the typed text, held back until the batch phase
    deferred_completions: Vec<usize>,
    rows_since_completion: usize,
}

/// What an update changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Every section was rebuilt
    pub reloaded: bool,
    /// Rows appended to section 0
    pub appended: Range<usize>,
}

impl UpdateOutcome {
    pub fn has_changes(&self) -> bool {
        self.reloaded || !self.appended.is_empty()
    }
}

pub struct CandidateAggregator<E> {
    engine: E,
    config: Config,
    group_by: GroupByMode,
    filter: Option<Box<dyn CandidateFilter>>,
    glyphs: Option<Box<dyn GlyphLookup>>,
    sections: Vec<CandidateSection>,
    state: AggregatorState,
}

impl<E: CompositionEngine> CandidateAggregator<E> {
    pub fn new(engine: E, config: Config) -> Self {
        Self {
            engine,
            config,
            group_by: GroupByMode::default(),
            filter: None,
            glyphs: None,
            sections: Vec::new(),
            state: AggregatorState::default(),
        }
    }

    /// Skip romanization candidates the filter rejects.
    pub fn with_filter<F: CandidateFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Radical and stroke data for the grouped modes.
    pub fn with_glyphs<G: GlyphLookup + 'static>(mut self, glyphs: G) -> Self {
        self.glyphs = Some(Box::new(glyphs));
        self
    }

    pub fn set_filter(&mut self, filter: Option<Box<dyn CandidateFilter>>) {
        self.filter = filter;
    }

    pub fn set_glyphs(&mut self, glyphs: Option<Box<dyn GlyphLookup>>) {
        self.glyphs = glyphs;
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine. Call `update_candidates(true, ..)` after
    /// changing the composition.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn group_by_mode(&self) -> GroupByMode {
        self.group_by
    }

    /// Switch the grouping and rebuild the view from scratch.
    pub fn set_group_by_mode(&mut self, mode: GroupByMode) -> UpdateOutcome {
        if mode == self.group_by {
            return UpdateOutcome::default();
        }
        debug!(?mode, "switching candidate grouping");
        self.group_by = mode;
        self.update_candidates(true, 0)
    }

    /// Drop every section and cursor.
    pub fn reset(&mut self) {
        self.sections.clear();
        self.state = AggregatorState::default();
    }

    /// Grow or rebuild the view.
    ///
    /// Without `reload` only the frequency view grows; it keeps pulling from the
    /// backend until section 0 holds `target_count` rows, the backend is
    /// exhausted, or `max_load_iterations` pulls were made.
    pub fn update_candidates(&mut self, reload: bool, target_count: usize) -> UpdateOutcome {
        if !reload && !self.group_by.is_incremental() {
            return UpdateOutcome::default();
        }
        if reload {
            self.reset();
        }
        if !self.engine.is_ready() {
            debug!("composition engine not ready, candidate view left empty");
            return UpdateOutcome {
                reloaded: reload,
                appended: 0..0,
            };
        }

        let before = if reload { 0 } else { self.candidate_count(0) };
        match self.group_by {
            GroupByMode::ByFrequency => self.fill_by_frequency(reload, target_count),
            mode => self.rebuild_grouped(mode),
        }
        let after = self.candidate_count(0);
        trace!(reload, before, after, sections = self.sections.len(), "candidates updated");
        UpdateOutcome {
            reloaded: reload,
            appended: before..after.max(before),
        }
    }

    fn max_pulls(&self) -> usize {
        self.config.max_load_iterations.max(1)
    }

    fn fill_by_frequency(&mut self, reload: bool, target_count: usize) {
        let pulls_romanization = self.engine.input_mode().uses_romanization();
        let max_pulls = self.max_pulls();
        let mut pulls = 0;

        if pulls_romanization && (!reload || self.engine.loaded_romanization_count() == 0) {
            self.engine.load_more_romanization_candidates();
            pulls += 1;
        }
        self.populate_by_frequency();

        while pulls_romanization
            && self.candidate_count(0) < target_count
            && !self.engine.has_exhausted_romanization()
        {
            if pulls >= max_pulls {
                warn!(
                    pulls,
                    loaded = self.engine.loaded_romanization_count(),
                    "romanization backend never reported exhaustion, stopping pulls"
                );
                break;
            }
            self.engine.load_more_romanization_candidates();
            pulls += 1;
            self.populate_by_frequency();
        }
    }

    fn rebuild_grouped(&mut self, mode: GroupByMode) {
        if !self.engine.input_mode().uses_romanization() {
            return;
        }
        self.load_all_romanization();

        let filter = self.filter.as_deref();
        self.sections = match mode {
            GroupByMode::ByRomanizationPrefix => {
                grouping::by_romanization_prefix(&self.engine, filter)
            }
            GroupByMode::ByRadical | GroupByMode::ByStrokeCount => match self.glyphs.as_deref() {
                Some(glyphs) if mode == GroupByMode::ByRadical => {
                    grouping::by_radical(&self.engine, glyphs, filter)
                }
                Some(glyphs) => grouping::by_stroke_count(&self.engine, glyphs, filter),
                None => {
                    debug!(?mode, "no glyph data, grouped view is empty");
                    Vec::new()
                }
            },
            GroupByMode::ByFrequency => return,
        };
        debug!(?mode, sections = self.sections.len(), "grouped candidates rebuilt");
    }

    fn load_all_romanization(&mut self) {
        let max_pulls = self.max_pulls();
        let mut pulls = 0;
        while !self.engine.has_exhausted_romanization() {
            if pulls >= max_pulls {
                warn!(
                    pulls,
                    loaded = self.engine.loaded_romanization_count(),
                    "romanization backend never reported exhaustion, grouping what is loaded"
                );
                break;
            }
            pulls += 1;
            if !self.engine.load_more_romanization_candidates() {
                break;
            }
        }
    }

    fn accepts(&self, candidate: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accept(candidate))
    }

    /// Whether the first candidate's reading covers every typed letter.
    fn is_exact_match(&self, raw: &str) -> bool {
        let code = self
            .engine
            .romanization_candidate_comment(0)
            .map(|c| utils::romanization_letters(&c))
            .unwrap_or_default();
        utils::longest_common_subsequence_len(raw, &code) == raw.chars().count()
    }

    fn next_blended_completion(
        &mut self,
        best_end: usize,
        raw: &str,
        hold_back_raw: bool,
    ) -> Option<usize> {
        let completions = self.engine.completion_candidates();
        while self.state.cur_completion_index < best_end {
            let index = self.state.cur_completion_index;
            self.state.cur_completion_index += 1;
            if hold_back_raw && completions[index].to_lowercase() == raw {
                self.state.deferred_completions.push(index);
                continue;
            }
            return Some(index);
        }
        None
    }

    fn populate_by_frequency(&mut self) {
        let mode = self.engine.input_mode();
        let use_romanization = mode.uses_romanization();
        let completion_count = if mode.uses_completion() {
            self.engine.completion_candidates().len()
        } else {
            0
        };
        let use_completion = completion_count > 0;
        let best_end = self.engine.completion_worst_start().min(completion_count);
        let period = self.config.effective_interleave_period();
        let raw = utils::romanization_letters(&self.engine.raw_input());
        let hold_back_raw = mode == InputMode::Mixed && !self.config.show_raw_completion_inline;

        if self.sections.is_empty() {
            self.sections.push(CandidateSection::default());
        }

        if !use_romanization || !self.is_exact_match(&raw) {
            self.state.has_loaded_all_best = true;
        }

        // Phases 1 and 2
        let best_len = self
            .engine
            .romanization_candidate(0)
            .map_or(0, |c| c.chars().count());
        while !self.state.has_loaded_all_best
            && self.state.cur_romanization_index < self.engine.loaded_romanization_count()
        {
            if use_completion && self.state.rows_since_completion + 1 >= period {
                if let Some(index) = self.next_blended_completion(best_end, &raw, hold_back_raw) {
                    self.sections[0].paths.push(CandidatePath::completion(index));
                    self.state.rows_since_completion = 0;
                    continue;
                }
            }
            let index = self.state.cur_romanization_index;
            let Some(candidate) = self.engine.romanization_candidate(index) else {
                self.state.has_loaded_all_best = true;
                break;
            };
            if candidate.chars().count() < best_len {
                self.state.has_loaded_all_best = true;
                break;
            }
            self.state.cur_romanization_index += 1;
            if self.accepts(&candidate) {
                self.sections[0].paths.push(CandidatePath::romanization(index));
                self.state.rows_since_completion += 1;
            }
        }

        if !self.state.has_loaded_all_best {
            if !self.engine.has_exhausted_romanization() {
                return;
            }
            self.state.has_loaded_all_best = true;
        }

        // Phase 3
        if use_completion && !self.state.has_populated_best_completions {
            let deferred = std::mem::take(&mut self.state.deferred_completions);
            let rest = self.state.cur_completion_index.min(best_end)..best_end;
            let section = &mut self.sections[0];
            section
                .paths
                .extend(deferred.into_iter().chain(rest).map(CandidatePath::completion));
            self.state.cur_completion_index = best_end;
            self.state.has_populated_best_completions = true;
        }

        // Phase 4
        if use_romanization {
            while self.state.cur_romanization_index < self.engine.loaded_romanization_count() {
                let index = self.state.cur_romanization_index;
                self.state.cur_romanization_index += 1;
                match self.engine.romanization_candidate(index) {
                    Some(candidate) if self.accepts(&candidate) => {
                        self.sections[0].paths.push(CandidatePath::romanization(index));
                    }
                    _ => {}
                }
            }
        }

        // Phase 5
        if use_completion
            && !self.state.has_populated_worst_completions
            && (!use_romanization || self.engine.has_exhausted_romanization())
        {
            self.sections[0]
                .paths
                .extend((best_end..completion_count).map(CandidatePath::completion));
            self.state.has_populated_worst_completions = true;
        }
    }

    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn sections(&self) -> &[CandidateSection] {
        &self.sections
    }

    pub fn section(&self, section: usize) -> Option<&CandidateSection> {
        self.sections.get(section)
    }

    pub fn section_header(&self, section: usize) -> Option<&str> {
        self.sections.get(section)?.header.as_deref()
    }

    pub fn candidate_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, CandidateSection::len)
    }

    pub fn candidate_path(&self, index: CandidateIndex) -> Option<CandidatePath> {
        self.sections.get(index.section)?.paths.get(index.row).copied()
    }

    pub fn candidate(&self, index: CandidateIndex) -> Option<String> {
        let path = self.candidate_path(index)?;
        match path.source {
            CandidateSource::Romanization => self.engine.romanization_candidate(path.index),
            CandidateSource::Completion => {
                self.engine.completion_candidates().get(path.index).cloned()
            }
        }
    }

    /// Reading of a romanization candidate, first alternative of each syllable
    /// ("hang4/hong4 jan4" -> "hang4 jan4"). Completions have none.
    pub fn candidate_comment(&self, index: CandidateIndex) -> Option<String> {
        let path = self.candidate_path(index)?;
        if path.source != CandidateSource::Romanization {
            return None;
        }
        let comment = self.engine.romanization_candidate_comment(path.index)?;
        let first_readings: Vec<&str> = comment
            .split_whitespace()
            .map(|syllable| syllable.split('/').next().unwrap_or_default())
            .collect();
        Some(first_readings.join(" "))
    }

    /// Resolved candidates of one section.
    pub fn section_candidates(&self, section: usize) -> Vec<Candidate> {
        (0..self.candidate_count(section))
            .filter_map(|row| {
                let index = CandidateIndex::new(section, row);
                Some(Candidate {
                    text: self.candidate(index)?,
                    comment: self.candidate_comment(index),
                    index,
                })
            })
            .collect()
    }

    /// Commit a candidate through its backend. The whole view is dropped since
    /// the composition changed.
    pub fn select_candidate(&mut self, index: CandidateIndex) -> Option<String> {
        let path = self.candidate_path(index)?;
        let selected = match path.source {
            CandidateSource::Romanization => self.engine.select_romanization_candidate(path.index),
            CandidateSource::Completion => self.engine.select_completion_candidate(path.index),
        };
        debug!(?path, committed = selected.is_some(), "candidate selected");
        self.reset();
        selected
    }

    /// Remove a candidate from future ranking.
    pub fn unlearn_candidate(&mut self, index: CandidateIndex) -> bool {
        let Some(path) = self.candidate_path(index) else {
            return false;
        };
        let removed = match path.source {
            CandidateSource::Romanization => self.engine.unlearn_romanization_candidate(path.index),
            CandidateSource::Completion => self.engine.unlearn_completion_candidate(path.index),
        };
        debug!(?path, removed, "candidate unlearned");
        self.reset();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, VecCompositionEngine};
    use crate::glyph::{GlyphInfo, GlyphTable};

    fn texts<E: CompositionEngine>(agg: &CandidateAggregator<E>) -> Vec<String> {
        agg.section_candidates(0).into_iter().map(|c| c.text).collect()
    }

    fn nei_engine() -> VecCompositionEngine {
        VecCompositionEngine::new("nei5")
            .with_romanization([
                ("你", "nei5"),
                ("呢", "ne1"),
                ("妳", "nei5"),
                ("尼", "nei4"),
                ("膩", "nei6"),
                ("餌", "nei6"),
            ])
            .with_completions(["neil", "neither"], ["nein"])
    }

    #[test]
    fn best_block_blends_one_completion_every_fourth_row() {
        let mut agg = CandidateAggregator::new(nei_engine(), Config::default());
        let outcome = agg.update_candidates(true, 0);
        assert!(outcome.reloaded);
        assert_eq!(
            texts(&agg),
            vec!["你", "呢", "妳", "neil", "尼", "膩", "餌", "neither", "nein"]
        );
        assert_eq!(agg.number_of_sections(), 1);
        assert_eq!(agg.section_header(0), None);
    }

    #[test]
    fn interleave_period_is_configurable() {
        let mut config = Config::default();
        config.completion_interleave_period = 3;
        let mut agg = CandidateAggregator::new(nei_engine(), config);
        agg.update_candidates(true, 0);
        assert_eq!(
            texts(&agg),
            vec!["你", "呢", "neil", "妳", "尼", "neither", "膩", "餌", "nein"]
        );
    }

    fn sin_engine() -> VecCompositionEngine {
        VecCompositionEngine::new("sin")
            .with_romanization([
                ("先", "sin1"),
                ("線", "sin3"),
                ("善", "sin6"),
                ("仙", "sin1"),
                ("冼", "sin2"),
            ])
            .with_completions(["sin", "since", "sing"], Vec::<String>::new())
    }

    #[test]
    fn completion_equal_to_input_is_held_back() {
        let mut agg = CandidateAggregator::new(sin_engine(), Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(
            texts(&agg),
            vec!["先", "線", "善", "since", "仙", "冼", "sin", "sing"]
        );
    }

    #[test]
    fn completion_equal_to_input_can_be_shown_inline() {
        let mut config = Config::default();
        config.show_raw_completion_inline = true;
        let mut agg = CandidateAggregator::new(sin_engine(), config);
        agg.update_candidates(true, 0);
        assert_eq!(
            texts(&agg),
            vec!["先", "線", "善", "sin", "仙", "冼", "since", "sing"]
        );
    }

    #[test]
    fn filtered_candidates_still_advance_the_cursor() {
        let mut agg = CandidateAggregator::new(sin_engine(), Config::default())
            .with_filter(|s: &str| s != "線");
        agg.update_candidates(true, 0);
        assert_eq!(
            texts(&agg),
            vec!["先", "善", "仙", "since", "冼", "sin", "sing"]
        );
        assert_eq!(agg.state().cur_romanization_index, 5);
    }

    #[test]
    fn shorter_candidate_ends_best_block() {
        let engine = VecCompositionEngine::new("neihou")
            .with_romanization([
                ("你好", "nei5 hou2"),
                ("你號", "nei5 hou6"),
                ("你", "nei5"),
                ("呢", "nei1"),
            ])
            .with_completions(["neighbourhood"], ["neigh"]);
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(
            texts(&agg),
            vec!["你好", "你號", "neighbourhood", "你", "呢", "neigh"]
        );
    }

    #[test]
    fn inexact_input_puts_completions_first() {
        let engine = VecCompositionEngine::new("hello")
            .with_romanization([("哈佬", "haa1 lou2"), ("喜", "hei2")])
            .with_completions(["hello", "help"], Vec::<String>::new());
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(texts(&agg), vec!["hello", "help", "哈佬", "喜"]);
    }

    fn long_engine() -> VecCompositionEngine {
        let chars = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];
        VecCompositionEngine::new("jat")
            .with_romanization(chars.iter().map(|c| (*c, "jat1")))
            .with_completions(["jatte"], ["jatt"])
            .with_page_size(4)
    }

    #[test]
    fn incremental_updates_only_append() {
        let mut agg = CandidateAggregator::new(long_engine(), Config::default());
        agg.update_candidates(true, 0);
        // Best block waits for more backend pages before the batch phase.
        assert_eq!(texts(&agg), vec!["一", "二", "三", "jatte", "四"]);

        let mut seen = agg.section(0).unwrap().paths.clone();
        loop {
            let outcome = agg.update_candidates(false, 0);
            let now = agg.section(0).unwrap().paths.clone();
            assert!(now.starts_with(&seen));
            assert_eq!(outcome.appended, seen.len()..now.len());
            if !outcome.has_changes() {
                break;
            }
            seen = now;
        }
        let mut unique = seen.clone();
        unique.sort_by_key(|p| (p.source == CandidateSource::Completion, p.index));
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
        assert_eq!(seen.len(), 12);
        assert_eq!(texts(&agg).last().map(String::as_str), Some("jatt"));
    }

    #[test]
    fn target_count_pulls_until_satisfied() {
        let mut agg = CandidateAggregator::new(long_engine(), Config::default());
        agg.update_candidates(true, 9);
        assert_eq!(agg.candidate_count(0), 9);
        assert_eq!(agg.engine().load_calls(), 2);
    }

    #[test]
    fn reload_recomputes_from_scratch() {
        let mut agg = CandidateAggregator::new(long_engine(), Config::default());
        agg.update_candidates(true, 0);
        agg.update_candidates(false, 0);
        let grown = texts(&agg);
        let outcome = agg.update_candidates(true, 0);
        assert!(outcome.reloaded);
        assert_eq!(outcome.appended, 0..agg.candidate_count(0));
        // Already loaded pages are reused, so the view matches the grown one.
        assert_eq!(texts(&agg), grown);
        assert_eq!(agg.state().cur_romanization_index, 8);
    }

    #[test]
    fn selection_resets_the_view() {
        let mut agg = CandidateAggregator::new(nei_engine(), Config::default());
        agg.update_candidates(true, 0);
        let index = CandidateIndex::new(0, 3);
        assert_eq!(agg.select_candidate(index).as_deref(), Some("neil"));
        assert_eq!(agg.number_of_sections(), 0);
        assert_eq!(agg.candidate(index), None);
        assert_eq!(agg.state(), &AggregatorState::default());
        assert!(!agg.engine().is_composing());

        agg.update_candidates(true, 0);
        assert_eq!(agg.number_of_sections(), 1);
        assert_eq!(agg.candidate_count(0), 0);
        assert_eq!(agg.select_candidate(CandidateIndex::new(0, 0)), None);
    }

    #[test]
    fn unlearn_delegates_by_source() {
        let mut agg = CandidateAggregator::new(nei_engine(), Config::default());
        agg.update_candidates(true, 0);
        assert!(agg.unlearn_candidate(CandidateIndex::new(0, 1)));
        assert_eq!(agg.number_of_sections(), 0);
        assert!(!agg.unlearn_candidate(CandidateIndex::new(0, 0)));

        agg.update_candidates(true, 0);
        assert!(agg.unlearn_candidate(CandidateIndex::new(0, 0)));
        agg.update_candidates(true, 0);
        assert_eq!(agg.candidate(CandidateIndex::new(0, 3)).as_deref(), Some("neil"));
        assert!(agg.unlearn_candidate(CandidateIndex::new(0, 3)));
        assert_eq!(
            agg.engine().unlearned(),
            ["呢".to_string(), "你".to_string(), "neil".to_string()]
        );
        assert!(!agg.unlearn_candidate(CandidateIndex::new(4, 0)));
    }

    #[test]
    fn comment_shows_first_reading_of_each_syllable() {
        let engine = VecCompositionEngine::new("hangjan")
            .with_romanization([("行人", "hang4/hong4 jan4")])
            .with_completions(["hangman"], Vec::<String>::new());
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(
            agg.candidate_comment(CandidateIndex::new(0, 0)).as_deref(),
            Some("hang4 jan4")
        );
        assert_eq!(agg.candidate_comment(CandidateIndex::new(0, 1)), None);
        assert_eq!(agg.candidate(CandidateIndex::new(0, 1)).as_deref(), Some("hangman"));
    }

    #[test]
    fn input_modes_select_backends() {
        let engine = nei_engine().with_input_mode(InputMode::Completion);
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(texts(&agg), vec!["neil", "neither", "nein"]);
        assert_eq!(agg.engine().load_calls(), 0);

        let engine = nei_engine().with_input_mode(InputMode::Romanization);
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.update_candidates(true, 0);
        assert_eq!(texts(&agg), vec!["你", "呢", "妳", "尼", "膩", "餌"]);
    }

    #[test]
    fn engine_not_ready_yields_empty_view() {
        let mut engine = nei_engine();
        engine.set_ready(false);
        let mut agg = CandidateAggregator::new(engine, Config::default());
        let outcome = agg.update_candidates(true, 5);
        assert!(outcome.reloaded);
        assert_eq!(agg.number_of_sections(), 0);
    }

    #[test]
    fn radical_grouping_pulls_everything_first() {
        let engine = VecCompositionEngine::new("ngo")
            .with_romanization([("我", "ngo5"), ("餓", "ngo6"), ("鵝", "ngo4"), ("俄", "ngo4")])
            .with_page_size(1);
        let glyphs: GlyphTable = [
            ('我', GlyphInfo::new(62, 3, 7)),
            ('餓', GlyphInfo::new(184, 7, 16)),
            ('鵝', GlyphInfo::new(196, 7, 18)),
            ('俄', GlyphInfo::new(9, 7, 9)),
        ]
        .into_iter()
        .collect();
        let mut agg = CandidateAggregator::new(engine, Config::default()).with_glyphs(glyphs);
        agg.update_candidates(true, 0);
        assert_eq!(agg.engine().loaded_romanization_count(), 1);

        let outcome = agg.set_group_by_mode(GroupByMode::ByRadical);
        assert!(outcome.reloaded);
        assert!(agg.engine().has_exhausted_romanization());
        let headers: Vec<_> = (0..agg.number_of_sections())
            .filter_map(|s| agg.section_header(s))
            .collect();
        assert_eq!(headers, vec!["⼈", "⼽", "⾷", "⿃"]);

        // Grouped views do not grow incrementally.
        assert!(!agg.update_candidates(false, 100).has_changes());
        assert_eq!(agg.set_group_by_mode(GroupByMode::ByRadical), UpdateOutcome::default());
    }

    #[test]
    fn grouped_modes_without_glyphs_are_empty() {
        let mut agg = CandidateAggregator::new(nei_engine(), Config::default());
        agg.set_group_by_mode(GroupByMode::ByStrokeCount);
        assert_eq!(agg.number_of_sections(), 0);
        agg.set_group_by_mode(GroupByMode::ByRomanizationPrefix);
        assert!(agg.number_of_sections() > 0);
    }

    #[test]
    fn partial_composition_orders_prefix_sections() {
        let engine = VecCompositionEngine::new("neihou")
            .with_composition(Composition::new("你hou"))
            .with_romanization([("好", "hou2"), ("口", "hau2"), ("號", "hou6"), ("後", "hau6")]);
        let mut agg = CandidateAggregator::new(engine, Config::default());
        agg.set_group_by_mode(GroupByMode::ByRomanizationPrefix);
        assert_eq!(agg.section_header(0), Some("hou2"));
        assert_eq!(agg.section_header(2), Some("hau2"));
    }

    /// Claims more is always coming but never delivers.
    struct StuckEngine {
        pulls: usize,
    }

    impl CompositionEngine for StuckEngine {
        fn is_composing(&self) -> bool {
            true
        }

        fn composition(&self) -> Option<Composition> {
            Some(Composition::new("a"))
        }

        fn raw_input(&self) -> String {
            "a".to_string()
        }

        fn romanization_candidate(&self, _index: usize) -> Option<String> {
            None
        }

        fn romanization_candidate_comment(&self, _index: usize) -> Option<String> {
            None
        }

        fn loaded_romanization_count(&self) -> usize {
            0
        }

        fn load_more_romanization_candidates(&mut self) -> bool {
            self.pulls += 1;
            true
        }

        fn has_exhausted_romanization(&self) -> bool {
            false
        }

        fn completion_candidates(&self) -> &[String] {
            &[]
        }

        fn select_romanization_candidate(&mut self, _index: usize) -> Option<String> {
            None
        }

        fn select_completion_candidate(&mut self, _index: usize) -> Option<String> {
            None
        }

        fn unlearn_romanization_candidate(&mut self, _index: usize) -> bool {
            false
        }
    }

    #[test]
    fn misreporting_backend_pulls_are_bounded() {
        let mut config = Config::default();
        config.max_load_iterations = 16;
        let mut agg = CandidateAggregator::new(StuckEngine { pulls: 0 }, config);
        agg.update_candidates(true, 10);
        assert_eq!(agg.engine().pulls, 16);

        agg.set_group_by_mode(GroupByMode::ByRomanizationPrefix);
        assert_eq!(agg.engine().pulls, 32);
        assert_eq!(agg.number_of_sections(), 0);
    }
}
