//! Page and cursor navigation over the first candidate section.
//!
//! The pager owns a `CandidateOrganizer` and pages through section 0, asking
//! the organizer for more rows whenever the next page would run past what has
//! been loaded.

use crate::candidate::{Candidate, CandidateIndex};
use crate::composition::CompositionEngine;
use crate::organizer::{CandidateOrganizer, CandidateSink};
use std::ops::Range;

pub struct CandidatePager<E, S> {
    organizer: CandidateOrganizer<E, S>,
    /// Number of candidates per page
    page_size: usize,
    /// Current page index (0-based)
    current_page: usize,
    /// Cursor position within the current page (0-based)
    cursor: usize,
}

impl<E: CompositionEngine, S: CandidateSink> CandidatePager<E, S> {
    /// Page size comes from the aggregator's `Config::page_size`.
    pub fn new(organizer: CandidateOrganizer<E, S>) -> Self {
        let page_size = organizer.aggregator().config().page_size.max(1);
        Self {
            organizer,
            page_size,
            current_page: 0,
            cursor: 0,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.set_page_size(page_size);
        self
    }

    pub fn organizer(&self) -> &CandidateOrganizer<E, S> {
        &self.organizer
    }

    pub fn organizer_mut(&mut self) -> &mut CandidateOrganizer<E, S> {
        &mut self.organizer
    }

    pub fn into_organizer(self) -> CandidateOrganizer<E, S> {
        self.organizer
    }

    /// Set the page size.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        if self.current_page >= self.num_pages() && self.num_pages() > 0 {
            self.current_page = 0;
        }
        if self.cursor >= self.current_page_len() && self.current_page_len() > 0 {
            self.cursor = 0;
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows loaded so far.
    pub fn len(&self) -> usize {
        self.organizer.candidate_count(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pages covering the loaded rows.
    pub fn num_pages(&self) -> usize {
        self.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn current_page_range(&self) -> Range<usize> {
        let start = self.current_page * self.page_size;
        let end = (start + self.page_size).min(self.len());
        start..end.max(start)
    }

    fn current_page_len(&self) -> usize {
        self.current_page_range().len()
    }

    pub fn current_page_candidates(&self) -> Vec<Candidate> {
        self.current_page_range()
            .filter_map(|row| {
                let index = CandidateIndex::new(0, row);
                Some(Candidate {
                    text: self.organizer.candidate(index)?,
                    comment: self.organizer.candidate_comment(index),
                    index,
                })
            })
            .collect()
    }

    /// Index of the candidate under the cursor.
    pub fn selected_index(&self) -> Option<CandidateIndex> {
        let row = self.current_page * self.page_size + self.cursor;
        (row < self.len()).then(|| CandidateIndex::new(0, row))
    }

    pub fn selected_candidate(&self) -> Option<String> {
        self.organizer.candidate(self.selected_index()?)
    }

    /// Refresh through the organizer; a reload goes back to the first page.
    pub fn update_candidates(&mut self, reload: bool) {
        self.organizer.update_candidates(reload);
        if reload {
            self.reset();
        }
    }

    /// Returns true if the cursor moved.
    pub fn cursor_up(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Returns true if the cursor moved.
    pub fn cursor_down(&mut self) -> bool {
        let page_len = self.current_page_len();
        if page_len > 0 && self.cursor < page_len - 1 {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns true if the page changed.
    pub fn page_up(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        self.clamp_cursor();
        true
    }

    /// Move to the next page, loading rows until it is full or nothing more comes.
    /// Returns true if the page changed.
    pub fn page_down(&mut self) -> bool {
        let next_start = (self.current_page + 1) * self.page_size;
        let next_end = next_start + self.page_size;
        while self.len() < next_end {
            if !self.organizer.request_more(0) {
                break;
            }
        }
        if next_start >= self.len() {
            return false;
        }
        self.current_page += 1;
        self.clamp_cursor();
        true
    }

    fn clamp_cursor(&mut self) {
        let page_len = self.current_page_len();
        if page_len > 0 && self.cursor >= page_len {
            self.cursor = page_len - 1;
        }
    }

    /// Move the cursor to a row of the current page.
    pub fn select_by_index(&mut self, page_index: usize) -> Option<String> {
        if page_index >= self.current_page_len() {
            return None;
        }
        self.cursor = page_index;
        self.selected_candidate()
    }

    /// Commit the candidate under the cursor and go back to the first page.
    pub fn commit_selected(&mut self) -> Option<String> {
        let index = self.selected_index()?;
        let committed = self.organizer.select_candidate(index);
        self.reset();
        committed
    }

    /// Go to the first page, first candidate.
    pub fn reset(&mut self) {
        self.current_page = 0;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::CandidateAggregator;
    use crate::composition::VecCompositionEngine;
    use crate::organizer::NullSink;
    use crate::Config;

    fn pager(count: usize, page_size: usize) -> CandidatePager<VecCompositionEngine, NullSink> {
        let romanization: Vec<(String, String)> = (0..count)
            .map(|i| (format!("字{}", i), "zi6".to_string()))
            .collect();
        let engine = VecCompositionEngine::new("zi")
            .with_romanization(romanization)
            .with_page_size(2);
        let mut config = Config::default();
        config.page_size = page_size;
        let organizer = CandidateOrganizer::without_sink(CandidateAggregator::new(engine, config));
        let mut pager = CandidatePager::new(organizer);
        pager.update_candidates(true);
        pager
    }

    #[test]
    fn page_down_loads_more_rows() {
        let mut p = pager(10, 3);
        assert_eq!(p.len(), 4);
        assert_eq!(p.current_page_candidates()[0].text, "字0");

        assert!(p.page_down());
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.current_page_candidates()[0].text, "字3");
        assert!(p.len() >= 6);

        assert!(p.page_down());
        assert!(p.page_down());
        assert_eq!(p.current_page_candidates().len(), 1);
        assert_eq!(p.current_page_candidates()[0].text, "字9");
        assert!(!p.page_down());
        assert_eq!(p.num_pages(), 4);
    }

    #[test]
    fn cursor_stays_on_page() {
        let mut p = pager(5, 3);
        assert!(p.cursor_down());
        assert!(p.cursor_down());
        assert!(!p.cursor_down());
        assert_eq!(p.cursor(), 2);
        assert!(p.page_down());
        // Second page only has two rows.
        assert_eq!(p.cursor(), 1);
        assert_eq!(p.selected_candidate().as_deref(), Some("字4"));
        assert!(p.page_up());
        assert!(!p.page_up());
        assert!(p.cursor_up());
        assert_eq!(p.selected_index(), Some(CandidateIndex::new(0, 0)));
    }

    #[test]
    fn commit_selects_through_organizer() {
        let mut p = pager(5, 3);
        assert_eq!(p.select_by_index(1).as_deref(), Some("字1"));
        assert_eq!(p.select_by_index(7), None);
        assert_eq!(p.commit_selected().as_deref(), Some("字1"));
        assert_eq!(p.current_page(), 0);
        assert!(p.is_empty());
        assert_eq!(p.commit_selected(), None);
    }
}
