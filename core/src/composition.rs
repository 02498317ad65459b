//! Composition state and the lookup interface over the two prediction backends.
//!
//! The keyboard core never sees how candidates are produced. It talks to a
//! `CompositionEngine`, which fronts a romanization engine (Jyutping to Chinese,
//! paged and lazily loaded) and a completion engine (English word completion,
//! computed in one go and split into a best and a worst range).

/// In-progress input with its caret.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composition {
    /// Composed text shown to the user (e.g. "你hou2" after a partial selection)
    pub text: String,
    /// Caret position in chars
    pub caret_index: usize,
}

impl Composition {
    pub fn new<T: Into<String>>(text: T) -> Self {
        let text = text.into();
        let caret_index = text.chars().count();
        Self { text, caret_index }
    }

    pub fn with_caret<T: Into<String>>(text: T, caret_index: usize) -> Self {
        let text = text.into();
        let caret_index = caret_index.min(text.chars().count());
        Self { text, caret_index }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Which backends contribute candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Chinese candidates with English completions blended in
    #[default]
    Mixed,
    /// Romanization backend only
    Romanization,
    /// Completion backend only
    Completion,
}

impl InputMode {
    pub fn uses_romanization(self) -> bool {
        self != InputMode::Completion
    }

    pub fn uses_completion(self) -> bool {
        self != InputMode::Romanization
    }
}

/// Stateful oracle over the romanization and completion backends.
///
/// Index arguments address each backend's own candidate list. Out-of-range
/// indices yield `None`/`false`, never a panic.
pub trait CompositionEngine {
    /// Whether the backends can serve lookups. While false the keyboard disables typing.
    fn is_ready(&self) -> bool {
        true
    }

    fn is_composing(&self) -> bool;

    fn input_mode(&self) -> InputMode {
        InputMode::Mixed
    }

    fn composition(&self) -> Option<Composition>;

    fn composed_text(&self) -> String {
        self.composition().map(|c| c.text).unwrap_or_default()
    }

    fn caret_index(&self) -> usize {
        self.composition().map(|c| c.caret_index).unwrap_or(0)
    }

    /// Keys typed so far as the completion engine sees them.
    fn raw_input(&self) -> String;

    fn romanization_candidate(&self, index: usize) -> Option<String>;

    /// Reading of a romanization candidate, e.g. "nei5 hou2" or "hang4/hong4".
    fn romanization_candidate_comment(&self, index: usize) -> Option<String>;

    fn loaded_romanization_count(&self) -> usize;

    /// Pull the next page from the romanization backend. Returns whether anything was loaded.
    fn load_more_romanization_candidates(&mut self) -> bool;

    fn has_exhausted_romanization(&self) -> bool;

    fn completion_candidates(&self) -> &[String];

    /// Index where low-confidence completions begin.
    fn completion_worst_start(&self) -> usize {
        self.completion_candidates().len()
    }

    /// Select a romanization candidate. Returns the committed text, or `None`
    /// when the selection only completed part of the composition.
    fn select_romanization_candidate(&mut self, index: usize) -> Option<String>;

    fn select_completion_candidate(&mut self, index: usize) -> Option<String>;

    /// Remove a romanization candidate from future ranking.
    fn unlearn_romanization_candidate(&mut self, index: usize) -> bool;

    fn unlearn_completion_candidate(&mut self, _index: usize) -> bool {
        false
    }
}

/// In-memory engine over fixed candidate lists, paged like a real backend.
///
/// Used by tests and the replay tool.
#[derive(Debug, Clone)]
pub struct VecCompositionEngine {
    ready: bool,
    mode: InputMode,
    raw_input: String,
    composition: Option<Composition>,
    /// (candidate, reading)
    romanization: Vec<(String, String)>,
    page_size: usize,
    loaded: usize,
    completions: Vec<String>,
    worst_start: usize,
    load_calls: usize,
    unlearned: Vec<String>,
}

impl VecCompositionEngine {
    /// An engine composing `raw_input`, with no candidates yet.
    pub fn new<T: Into<String>>(raw_input: T) -> Self {
        let raw_input = raw_input.into();
        let composition = if raw_input.is_empty() {
            None
        } else {
            Some(Composition::new(raw_input.clone()))
        };
        Self {
            ready: true,
            mode: InputMode::Mixed,
            raw_input,
            composition,
            romanization: Vec::new(),
            page_size: 8,
            loaded: 0,
            completions: Vec::new(),
            worst_start: 0,
            load_calls: 0,
            unlearned: Vec::new(),
        }
    }

    pub fn with_romanization<I, A, B>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        self.romanization = candidates
            .into_iter()
            .map(|(text, comment)| (text.into(), comment.into()))
            .collect();
        self
    }

    /// Completion candidates: `best` first, then `worst`.
    pub fn with_completions<I, J, S, T>(mut self, best: I, worst: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.completions = best.into_iter().map(Into::into).collect();
        self.worst_start = self.completions.len();
        self.completions.extend(worst.into_iter().map(Into::into));
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_composition(mut self, composition: Composition) -> Self {
        self.composition = Some(composition);
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Number of backend pulls performed so far.
    pub fn load_calls(&self) -> usize {
        self.load_calls
    }

    pub fn unlearned(&self) -> &[String] {
        &self.unlearned
    }

    fn clear_input(&mut self) {
        self.raw_input.clear();
        self.composition = None;
        self.romanization.clear();
        self.completions.clear();
        self.worst_start = 0;
        self.loaded = 0;
    }
}

impl CompositionEngine for VecCompositionEngine {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_composing(&self) -> bool {
        self.composition.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn input_mode(&self) -> InputMode {
        self.mode
    }

    fn composition(&self) -> Option<Composition> {
        self.composition.clone()
    }

    fn raw_input(&self) -> String {
        self.raw_input.clone()
    }

    fn romanization_candidate(&self, index: usize) -> Option<String> {
        if index >= self.loaded {
            return None;
        }
        self.romanization.get(index).map(|(text, _)| text.clone())
    }

    fn romanization_candidate_comment(&self, index: usize) -> Option<String> {
        if index >= self.loaded {
            return None;
        }
        self.romanization
            .get(index)
            .map(|(_, comment)| comment.clone())
    }

    fn loaded_romanization_count(&self) -> usize {
        self.loaded
    }

    fn load_more_romanization_candidates(&mut self) -> bool {
        self.load_calls += 1;
        if !self.ready || self.loaded >= self.romanization.len() {
            return false;
        }
        self.loaded = (self.loaded + self.page_size).min(self.romanization.len());
        true
    }

    fn has_exhausted_romanization(&self) -> bool {
        self.loaded >= self.romanization.len()
    }

    fn completion_candidates(&self) -> &[String] {
        &self.completions
    }

    fn completion_worst_start(&self) -> usize {
        self.worst_start.min(self.completions.len())
    }

    fn select_romanization_candidate(&mut self, index: usize) -> Option<String> {
        let text = self.romanization_candidate(index)?;
        self.clear_input();
        Some(text)
    }

    fn select_completion_candidate(&mut self, index: usize) -> Option<String> {
        let text = self.completions.get(index)?.clone();
        self.clear_input();
        Some(text)
    }

    fn unlearn_romanization_candidate(&mut self, index: usize) -> bool {
        if index >= self.loaded || index >= self.romanization.len() {
            return false;
        }
        let (text, _) = self.romanization.remove(index);
        self.loaded -= 1;
        self.unlearned.push(text);
        true
    }

    fn unlearn_completion_candidate(&mut self, index: usize) -> bool {
        if index >= self.completions.len() {
            return false;
        }
        let text = self.completions.remove(index);
        if index < self.worst_start {
            self.worst_start -= 1;
        }
        self.unlearned.push(text);
        true
    }
}
