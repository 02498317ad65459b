//! Fixed candidate lists offered when nothing is being composed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoSuggestion {
    HalfWidthPunctuation,
    FullWidthPunctuation,
    HalfWidthDigit,
    FullWidthArabicDigit,
    /// 一二三 and friends
    FullWidthLowerDigit,
    /// Banker's numerals (壹貳叄)
    FullWidthUpperDigit,
}

const HALF_WIDTH_PUNCTUATION: &[&str] = &[".", ",", "?", "!", "。", "，", "？", "！"];
const FULL_WIDTH_PUNCTUATION: &[&str] = &["。", "，", "？", "！", ".", ",", "?", "!"];
const HALF_WIDTH_DIGITS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
const FULL_WIDTH_ARABIC_DIGITS: &[&str] = &["０", "１", "２", "３", "４", "５", "６", "７", "８", "９"];
const FULL_WIDTH_LOWER_DIGITS: &[&str] = &[
    "一", "二", "三", "四", "五", "六", "七", "八", "九", "十", "零", "廿", "百", "千", "萬", "億",
];
const FULL_WIDTH_UPPER_DIGITS: &[&str] = &[
    "零", "壹", "貳", "叄", "肆", "伍", "陸", "柒", "捌", "玖", "拾", "佰", "仟", "萬", "億",
];

impl AutoSuggestion {
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            AutoSuggestion::HalfWidthPunctuation => HALF_WIDTH_PUNCTUATION,
            AutoSuggestion::FullWidthPunctuation => FULL_WIDTH_PUNCTUATION,
            AutoSuggestion::HalfWidthDigit => HALF_WIDTH_DIGITS,
            AutoSuggestion::FullWidthArabicDigit => FULL_WIDTH_ARABIC_DIGITS,
            AutoSuggestion::FullWidthLowerDigit => FULL_WIDTH_LOWER_DIGITS,
            AutoSuggestion::FullWidthUpperDigit => FULL_WIDTH_UPPER_DIGITS,
        }
    }

    pub fn candidate(self, row: usize) -> Option<&'static str> {
        self.candidates().get(row).copied()
    }

    /// Punctuation rows stay a single strip.
    pub fn cannot_expand(self) -> bool {
        matches!(
            self,
            AutoSuggestion::HalfWidthPunctuation | AutoSuggestion::FullWidthPunctuation
        )
    }

    /// Committing a digit closes the candidate pane.
    pub fn closes_pane_on_commit(self) -> bool {
        !self.cannot_expand()
    }
}
