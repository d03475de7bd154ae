//! Heuristic alt-text review
//!
//! A fixed rule table applied to each aggregated image. Rules run in order
//! and every rule that fires adds one message; when none fires the record
//! gets a single pass-through message.

use std::sync::LazyLock;

use regex::Regex;

use crate::aggregate::ImageRecord;

/// Reported when alt text is missing, blank or a placeholder value
pub const MSG_WCAG_FAILURE: &str = "WCAG 1.1.1 Failure: Alt text is empty or invalid.";
/// Reported for large images
pub const MSG_LARGE_IMAGE: &str = "Consider reducing the image size for a better user experience.";
/// Reported when alt text contains a filler phrase
pub const MSG_SUSPICIOUS_PHRASE: &str =
    "Avoid phrases like 'image of', 'graphic of', or 'todo' in alt text.";
/// Reported when alt text is a known meaningless value
pub const MSG_MEANINGLESS: &str = "Alt text appears meaningless. Replace it with a descriptive value.";
/// Reported for short alt text
pub const MSG_TOO_SHORT: &str = "Alt text seems too short. Provide more context.";
/// Reported for long alt text
pub const MSG_TOO_LONG: &str = "Alt text may be too long. Consider shortening.";
/// Reported when sentences are long
pub const MSG_SIMPLIFY: &str = "Consider simplifying the text.";
/// Reported when a title attribute is present
pub const MSG_REMOVE_TITLE: &str =
    "Consider removing the title text. Often, it reduces usability for screen readers.";
/// Reported when nothing else fired
pub const MSG_PASS: &str = "Alt-text passes automated tests, but does it make sense to a person?";

/// Alt values treated as no alt at all
pub const INVALID_ALT_VALUES: &[&str] = &["null", "tbd", "none", "alt text", ""];

/// Substrings that suggest filler phrasing
pub const SUSPICIOUS_PHRASES: &[&str] = &[
    "image of",
    "graphic of",
    "picture of",
    "photo of",
    "placeholder",
    "spacer",
    "tbd",
    "todo",
];

/// Whole alt values that carry no meaning
pub const MEANINGLESS_ALT_VALUES: &[&str] = &[
    "alt",
    "chart",
    "decorative",
    "image",
    "graphic",
    "photo",
    "placeholder image",
    "spacer",
    "tbd",
    "todo",
    "undefined",
];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// Thresholds for the rule table
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionConfig {
    /// Images above this size get a size suggestion
    pub large_image_kb: f64,

    /// Alt text shorter than this (in characters) is too short
    pub min_alt_chars: usize,

    /// Alt text longer than this (in characters) is too long
    pub max_alt_chars: usize,

    /// Words per sentence above which simplification is suggested
    pub readability_threshold: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            large_image_kb: 250.0,
            min_alt_chars: 25,
            max_alt_chars: 250,
            readability_threshold: 20.0,
        }
    }
}

impl SuggestionConfig {
    /// Set the words-per-sentence threshold
    pub fn with_readability_threshold(mut self, threshold: f64) -> Self {
        self.readability_threshold = threshold;
        self
    }
}

/// Word and sentence counts of a text
///
/// Sentences are non-blank pieces between `.`, `!` and `?`.
pub fn text_statistics(text: &str) -> (usize, usize) {
    if text.trim().is_empty() {
        return (0, 0);
    }
    let words = WORD_RE.find_iter(text).count();
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|piece| !piece.trim().is_empty())
        .count();
    (words, sentences)
}

/// Whether alt text counts as missing
pub fn is_invalid_alt(alt_text: Option<&str>) -> bool {
    match alt_text {
        None => true,
        Some(alt) => {
            let normalized = alt.trim().to_lowercase();
            INVALID_ALT_VALUES.contains(&normalized.as_str())
        }
    }
}

/// Run the rule table against one record
pub fn suggest(record: &ImageRecord, config: &SuggestionConfig) -> Vec<String> {
    let mut suggestions = Vec::new();

    match record.alt_text.as_deref() {
        alt if is_invalid_alt(alt) => suggestions.push(MSG_WCAG_FAILURE),
        Some(alt) => {
            if record.size_kb > config.large_image_kb {
                suggestions.push(MSG_LARGE_IMAGE);
            }

            let lowered = alt.trim().to_lowercase();
            if SUSPICIOUS_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
                suggestions.push(MSG_SUSPICIOUS_PHRASE);
            }
            if MEANINGLESS_ALT_VALUES.contains(&lowered.as_str()) {
                suggestions.push(MSG_MEANINGLESS);
            }

            let length = alt.chars().count();
            if length < config.min_alt_chars {
                suggestions.push(MSG_TOO_SHORT);
            }
            if length > config.max_alt_chars {
                suggestions.push(MSG_TOO_LONG);
            }

            let (words, sentences) = text_statistics(alt);
            if words as f64 / sentences.max(1) as f64 > config.readability_threshold {
                suggestions.push(MSG_SIMPLIFY);
            }
        }
        None => suggestions.push(MSG_WCAG_FAILURE),
    }

    if record
        .title
        .as_deref()
        .is_some_and(|title| !title.trim().is_empty())
    {
        suggestions.push(MSG_REMOVE_TITLE);
    }

    if suggestions.is_empty() {
        suggestions.push(MSG_PASS);
    }

    suggestions.into_iter().map(str::to_string).collect()
}

/// Attach suggestions to every record
pub fn annotate<'a>(records: impl IntoIterator<Item = &'a mut ImageRecord>, config: &SuggestionConfig) {
    for record in records {
        record.suggestions = suggest(record, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alt: Option<&str>, size_kb: f64, title: Option<&str>) -> ImageRecord {
        let mut record = ImageRecord::new("https://example.com/a.png");
        record.count = 1;
        record.alt_text = alt.map(str::to_string);
        record.size_kb = size_kb;
        record.title = title.map(str::to_string);
        record
    }

    fn run(alt: Option<&str>, size_kb: f64, title: Option<&str>) -> Vec<String> {
        suggest(&record(alt, size_kb, title), &SuggestionConfig::default())
    }

    #[test]
    fn test_empty_alt_only_reports_wcag_failure() {
        assert_eq!(run(Some(""), 100.0, None), vec![MSG_WCAG_FAILURE]);
        assert_eq!(run(None, 100.0, None), vec![MSG_WCAG_FAILURE]);
        assert_eq!(run(Some("  NULL "), 100.0, None), vec![MSG_WCAG_FAILURE]);
        assert_eq!(run(Some("Alt Text"), 900.0, None), vec![MSG_WCAG_FAILURE]);
    }

    #[test]
    fn test_invalid_alt_still_checks_title() {
        assert_eq!(
            run(Some("tbd"), 0.0, Some("Hover text")),
            vec![MSG_WCAG_FAILURE, MSG_REMOVE_TITLE]
        );
    }

    #[test]
    fn test_suspicious_phrase_without_too_short() {
        let suggestions = run(Some("A picture of a cat eating"), 100.0, None);
        assert_eq!(suggestions, vec![MSG_SUSPICIOUS_PHRASE]);
    }

    #[test]
    fn test_meaningless_alt() {
        let suggestions = run(Some("Decorative"), 10.0, None);
        assert!(suggestions.contains(&MSG_MEANINGLESS.to_string()));
        assert!(suggestions.contains(&MSG_TOO_SHORT.to_string()));
    }

    #[test]
    fn test_long_alt() {
        let alt = "x".repeat(300);
        let suggestions = run(Some(&alt), 10.0, None);
        assert!(suggestions.contains(&MSG_TOO_LONG.to_string()));
        assert!(!suggestions.contains(&MSG_TOO_SHORT.to_string()));
    }

    #[test]
    fn test_good_record_passes() {
        let suggestions = run(
            Some("Volunteers planting oak saplings along the river bank"),
            100.0,
            None,
        );
        assert_eq!(suggestions, vec![MSG_PASS]);
    }

    #[test]
    fn test_large_image() {
        let suggestions = run(
            Some("Volunteers planting oak saplings along the river bank"),
            251.0,
            Some("   "),
        );
        assert_eq!(suggestions, vec![MSG_LARGE_IMAGE]);
    }

    #[test]
    fn test_readability() {
        let run_on = "one two three four five six seven eight nine ten eleven twelve \
                      thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty twentyone";
        let suggestions = run(Some(run_on), 10.0, None);
        assert!(suggestions.contains(&MSG_SIMPLIFY.to_string()));

        let split = "one two three four five six seven eight nine ten. eleven twelve \
                     thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty twentyone";
        let suggestions = run(Some(split), 10.0, None);
        assert!(!suggestions.contains(&MSG_SIMPLIFY.to_string()));

        let strict = SuggestionConfig::default().with_readability_threshold(5.0);
        let suggestions = suggest(&record(Some(split), 10.0, None), &strict);
        assert!(suggestions.contains(&MSG_SIMPLIFY.to_string()));
    }

    #[test]
    fn test_text_statistics() {
        assert_eq!(text_statistics(""), (0, 0));
        assert_eq!(text_statistics("A dog. A cat!"), (4, 2));
        assert_eq!(text_statistics("no terminator"), (2, 1));
        assert_eq!(text_statistics("..."), (0, 0));
    }

    #[test]
    fn test_annotate_fills_every_record() {
        let mut records = vec![record(Some(""), 0.0, None), record(Some("tbd"), 0.0, None)];
        annotate(records.iter_mut(), &SuggestionConfig::default());
        assert!(records.iter().all(|r| r.suggestions == vec![MSG_WCAG_FAILURE]));
    }
}
