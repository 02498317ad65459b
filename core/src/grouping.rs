//! Bucket builders for the grouped candidate views.
//!
//! Each builder reads the romanization candidates the engine has loaded so far
//! (the caller pulls everything first) and returns the sections of one
//! grouping mode. Completion candidates never take part in grouped views.

use crate::candidate::{CandidateFilter, CandidatePath, CandidateSection};
use crate::composition::CompositionEngine;
use crate::glyph::{radical_char, GlyphLookup};
use crate::utils;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;

fn accepted<E: CompositionEngine + ?Sized>(
    engine: &E,
    index: usize,
    filter: Option<&dyn CandidateFilter>,
) -> Option<String> {
    let text = engine.romanization_candidate(index)?;
    match filter {
        Some(filter) if !filter.accept(&text) => None,
        _ => Some(text),
    }
}

/// Group by the reading of the first syllable ("nei5 hou2" -> "nei5").
///
/// A candidate with alternative readings ("hang4/hong4") lands in every one of
/// their buckets. Singleton buckets without a sibling sharing their stem are
/// folded into a bucket named after their first letter. Buckets the typed
/// letters start with come first, longest first; the rest follow alphabetically.
pub fn by_romanization_prefix<E: CompositionEngine + ?Sized>(
    engine: &E,
    filter: Option<&dyn CandidateFilter>,
) -> Vec<CandidateSection> {
    let mut headers: Vec<String> = Vec::new();
    let mut buckets: AHashMap<String, Vec<usize>> = AHashMap::new();

    for index in 0..engine.loaded_romanization_count() {
        let Some(comment) = engine.romanization_candidate_comment(index) else {
            continue;
        };
        let Some(first_syllable) = comment.split_whitespace().next() else {
            continue;
        };
        if accepted(engine, index, filter).is_none() {
            continue;
        }
        for reading in first_syllable.split('/').filter(|r| !r.is_empty()) {
            let bucket = buckets.entry(reading.to_string()).or_insert_with(|| {
                headers.push(reading.to_string());
                Vec::new()
            });
            if bucket.last() != Some(&index) {
                bucket.push(index);
            }
        }
    }

    // Fold lonely buckets into their first-letter bucket.
    let mut folded: AHashSet<String> = AHashSet::new();
    let original_headers = headers.clone();
    for header in &original_headers {
        if buckets.get(header).map_or(0, Vec::len) != 1 {
            continue;
        }
        let mut stem_chars = header.chars();
        stem_chars.next_back();
        let stem = stem_chars.as_str();
        if headers.iter().filter(|h| h.starts_with(stem)).count() != 1 {
            continue;
        }
        let Some(first) = header.chars().next() else {
            continue;
        };
        let coarse = first.to_string();
        if coarse == *header {
            continue;
        }
        let moved = buckets.get(header).cloned().unwrap_or_default();
        let target = buckets.entry(coarse.clone()).or_insert_with(|| {
            headers.push(coarse.clone());
            Vec::new()
        });
        target.extend(moved);
        folded.insert(header.clone());
    }

    let typed: String = engine
        .composition()
        .map(|c| utils::romanization_letters(&c.text))
        .unwrap_or_default();
    let (mut best, mut rest): (Vec<String>, Vec<String>) = headers
        .into_iter()
        .filter(|h| !folded.contains(h))
        .partition(|h| typed.starts_with(utils::without_trailing_digits(h)));
    best.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    rest.sort();

    best.into_iter()
        .chain(rest)
        .filter_map(|header| {
            let indices = buckets.remove(&header)?;
            let paths = indices.into_iter().map(CandidatePath::romanization).collect();
            Some(CandidateSection::new(Some(header), paths))
        })
        .collect()
}

/// Group by the Kangxi radical of the first char, radicals ascending,
/// residual stroke count ascending within a radical.
pub fn by_radical<E: CompositionEngine + ?Sized>(
    engine: &E,
    glyphs: &dyn GlyphLookup,
    filter: Option<&dyn CandidateFilter>,
) -> Vec<CandidateSection> {
    let mut buckets: BTreeMap<u8, Vec<(u8, usize)>> = BTreeMap::new();
    for index in 0..engine.loaded_romanization_count() {
        let Some(text) = accepted(engine, index, filter) else {
            continue;
        };
        let Some(info) = glyphs.leading_glyph_info(&text) else {
            continue;
        };
        if !info.has_radical() {
            continue;
        }
        buckets
            .entry(info.radical)
            .or_default()
            .push((info.radical_stroke, index));
    }

    buckets
        .into_iter()
        .map(|(radical, mut members)| {
            members.sort_by_key(|(radical_stroke, _)| *radical_stroke);
            let header = radical_char(radical).map(String::from);
            let paths = members
                .into_iter()
                .map(|(_, index)| CandidatePath::romanization(index))
                .collect();
            CandidateSection::new(header, paths)
        })
        .collect()
}

/// Group by total stroke count of the first char, ascending. Backend order is
/// kept inside a bucket.
pub fn by_stroke_count<E: CompositionEngine + ?Sized>(
    engine: &E,
    glyphs: &dyn GlyphLookup,
    filter: Option<&dyn CandidateFilter>,
) -> Vec<CandidateSection> {
    let mut buckets: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for index in 0..engine.loaded_romanization_count() {
        let Some(text) = accepted(engine, index, filter) else {
            continue;
        };
        match glyphs.leading_glyph_info(&text) {
            Some(info) if info.has_total_stroke() => {
                buckets.entry(info.total_stroke).or_default().push(index)
            }
            _ => {}
        }
    }

    buckets
        .into_iter()
        .map(|(strokes, indices)| {
            let paths = indices.into_iter().map(CandidatePath::romanization).collect();
            CandidateSection::new(Some(strokes.to_string()), paths)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, VecCompositionEngine};
    use crate::glyph::{GlyphInfo, GlyphTable};

    fn loaded(engine: VecCompositionEngine) -> VecCompositionEngine {
        let mut engine = engine;
        while engine.load_more_romanization_candidates() {}
        engine
    }

    fn headers(sections: &[CandidateSection]) -> Vec<&str> {
        sections.iter().filter_map(|s| s.header.as_deref()).collect()
    }

    fn indices(section: &CandidateSection) -> Vec<usize> {
        section.paths.iter().map(|p| p.index).collect()
    }

    #[test]
    fn prefix_buckets_put_typed_prefix_first() {
        let engine = loaded(
            VecCompositionEngine::new("hou")
                .with_romanization([
                    ("好", "hou2"),
                    ("號", "hou6"),
                    ("毫", "hou4"),
                    ("豪", "hou4"),
                    ("可", "ho2"),
                    ("何", "ho4"),
                    ("口", "hau2"),
                    ("後", "hau6"),
                ])
                .with_page_size(3),
        );
        let sections = by_romanization_prefix(&engine, None);
        // hou2/hou6/ho2/ho4/hau2/hau6 are singletons with siblings sharing the stem.
        assert_eq!(
            headers(&sections),
            vec!["hou2", "hou4", "hou6", "ho2", "ho4", "hau2", "hau6"]
        );
        assert_eq!(indices(&sections[1]), vec![2, 3]);
    }

    #[test]
    fn lonely_singletons_fold_into_first_letter() {
        let engine = loaded(
            VecCompositionEngine::new("ng")
                .with_romanization([("我", "ngo5"), ("牙", "ngaa4"), ("芽", "ngaa4")]),
        );
        let sections = by_romanization_prefix(&engine, None);
        assert_eq!(headers(&sections), vec!["n", "ngaa4"]);
        assert_eq!(indices(&sections[0]), vec![0]);
    }

    #[test]
    fn alternative_readings_land_in_each_bucket() {
        let engine = loaded(
            VecCompositionEngine::new("hang")
                .with_romanization([("行", "hang4/hong4"), ("恆", "hang4"), ("航", "hong4")]),
        );
        let sections = by_romanization_prefix(&engine, None);
        assert_eq!(headers(&sections), vec!["hang4", "hong4"]);
        assert_eq!(indices(&sections[0]), vec![0, 1]);
        assert_eq!(indices(&sections[1]), vec![0, 2]);
    }

    #[test]
    fn partial_selection_uses_remaining_letters() {
        let engine = loaded(
            VecCompositionEngine::new("neihou")
                .with_composition(Composition::new("你hou"))
                .with_romanization([("好", "hou2"), ("號", "hou6"), ("口", "hau2"), ("後", "hau6")]),
        );
        let sections = by_romanization_prefix(&engine, None);
        assert_eq!(headers(&sections), vec!["hou2", "hou6", "hau2", "hau6"]);
    }

    fn glyphs() -> GlyphTable {
        [
            ('你', GlyphInfo::new(9, 5, 7)),
            ('佢', GlyphInfo::new(9, 5, 7)),
            ('人', GlyphInfo::new(9, 0, 2)),
            ('好', GlyphInfo::new(38, 3, 6)),
            ('呢', GlyphInfo::new(30, 5, 8)),
            ('嘢', GlyphInfo::new(0, 0, 0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn radical_buckets_ascend_and_sort_by_residual_strokes() {
        let engine = loaded(VecCompositionEngine::new("n").with_romanization([
            ("好", "hou2"),
            ("你", "nei5"),
            ("呢", "ne1"),
            ("人", "jan4"),
            ("嘢", "je5"),
            ("𠮩", "ngo4"),
        ]));
        let table = glyphs();
        let sections = by_radical(&engine, &table, None);
        assert_eq!(headers(&sections), vec!["⼈", "⼝", "⼥"]);
        assert_eq!(indices(&sections[0]), vec![3, 1]);
    }

    #[test]
    fn stroke_buckets_keep_backend_order() {
        let engine = loaded(VecCompositionEngine::new("n").with_romanization([
            ("佢", "keoi5"),
            ("好", "hou2"),
            ("你", "nei5"),
            ("人", "jan4"),
        ]));
        let table = glyphs();
        let sections = by_stroke_count(&engine, &table, None);
        assert_eq!(headers(&sections), vec!["2", "6", "7"]);
        assert_eq!(indices(&sections[2]), vec![0, 2]);
    }

    #[test]
    fn filter_applies_to_grouped_views() {
        let engine = loaded(
            VecCompositionEngine::new("nei").with_romanization([("你", "nei5"), ("妳", "nei5")]),
        );
        let no_variant = |s: &str| !s.contains('妳');
        let sections = by_romanization_prefix(&engine, Some(&no_variant));
        assert_eq!(sections.len(), 1);
        assert_eq!(indices(&sections[0]), vec![0]);
    }
}
