//! Candidate handles, sections and grouping modes.
//!
//! This module provides:
//! - `CandidatePath`: provenance + index of one candidate in a backend list
//! - `CandidateSection`: an ordered run of paths under an optional header
//! - `CandidateIndex`: (section, row) address used by the presentation layer
//! - `GroupByMode`: the alternate orderings of the candidate view

use serde::{Deserialize, Serialize};

/// Backend a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    Romanization,
    Completion,
}

/// Stable handle into a backend's lazily grown candidate list.
///
/// The text itself stays in the backend and is fetched on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePath {
    pub source: CandidateSource,
    pub index: usize,
}

impl CandidatePath {
    pub fn romanization(index: usize) -> Self {
        Self {
            source: CandidateSource::Romanization,
            index,
        }
    }

    pub fn completion(index: usize) -> Self {
        Self {
            source: CandidateSource::Completion,
            index,
        }
    }
}

/// Row address in the sectioned view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CandidateIndex {
    pub section: usize,
    pub row: usize,
}

impl CandidateIndex {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

/// Ordered group of candidates. Rebuilt, never edited in place, when the
/// grouping or the composition changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateSection {
    pub header: Option<String>,
    pub paths: Vec<CandidatePath>,
}

impl CandidateSection {
    pub fn new(header: Option<String>, paths: Vec<CandidatePath>) -> Self {
        Self { header, paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A candidate resolved to its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub comment: Option<String>,
    pub index: CandidateIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupByMode {
    /// Backend order with completions blended in. Supports incremental loading.
    #[default]
    ByFrequency,
    ByRomanizationPrefix,
    ByRadical,
    ByStrokeCount,
}

impl GroupByMode {
    pub const ALL: [GroupByMode; 4] = [
        GroupByMode::ByFrequency,
        GroupByMode::ByRomanizationPrefix,
        GroupByMode::ByRadical,
        GroupByMode::ByStrokeCount,
    ];

    /// Label shown on the grouping switcher.
    pub fn title(self) -> &'static str {
        match self {
            GroupByMode::ByFrequency => "詞頻",
            GroupByMode::ByRomanizationPrefix => "粵拼",
            GroupByMode::ByRadical => "部首",
            GroupByMode::ByStrokeCount => "筆畫",
        }
    }

    pub fn is_incremental(self) -> bool {
        self == GroupByMode::ByFrequency
    }
}

/// Predicate deciding whether a romanization candidate may be shown.
pub trait CandidateFilter {
    fn accept(&self, candidate: &str) -> bool;
}

impl<F: Fn(&str) -> bool> CandidateFilter for F {
    fn accept(&self, candidate: &str) -> bool {
        self(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_frequency_mode_is_incremental() {
        let incremental: Vec<_> = GroupByMode::ALL
            .iter()
            .filter(|m| m.is_incremental())
            .collect();
        assert_eq!(incremental, vec![&GroupByMode::ByFrequency]);
        assert_eq!(GroupByMode::ByRadical.title(), "部首");
    }

    #[test]
    fn closures_are_filters() {
        let no_latin = |s: &str| !s.chars().any(|c| c.is_ascii_alphabetic());
        assert!(no_latin.accept("你好"));
        assert!(!no_latin.accept("A貨"));
    }
}
