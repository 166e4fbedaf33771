//! Text and throughput metrics for a finished response.
//!
//! Every function is total: empty text and zero elapsed time yield zero
//! rather than an error. Lengths are counted in Unicode scalar values.

/// Average reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: f64 = 200.0;

/// Heuristic characters per LLM token.
pub const CHARS_PER_TOKEN: usize = 4;

const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F9FF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
    (0x1F600, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
    (0x1FA00, 0x1FA6F),
    (0x1FA70, 0x1FAFF),
    (0x2190, 0x21FF),
    (0x2300, 0x23FF),
];

const EMOJI_SINGLETONS: &[u32] = &[0x2B50, 0x3030, 0x303D, 0x3297, 0x3299];

/// Metrics derived once from a model's frozen text and total time.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DerivedStatistics {
    pub token_estimate: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub emoji_count: usize,
    pub average_word_length: f64,
    pub reading_time_minutes: f64,
    pub chars_per_second: f64,
    pub tokens_per_second: f64,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// `ceil(chars / 4)`.
pub fn token_estimate(text: &str) -> usize {
    char_len(text).div_ceil(CHARS_PER_TOKEN)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Non-blank segments between runs of `.`, `!` and `?`.
pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

pub fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
        || EMOJI_SINGLETONS.contains(&cp)
}

pub fn emoji_count(text: &str) -> usize {
    text.chars().filter(|c| is_emoji(*c)).count()
}

pub fn average_word_length(text: &str) -> f64 {
    let words = word_count(text);
    if words == 0 {
        return 0.0;
    }
    let visible = text.chars().filter(|c| !c.is_whitespace()).count();
    visible as f64 / words as f64
}

pub fn reading_time_minutes(text: &str) -> f64 {
    word_count(text) as f64 / WORDS_PER_MINUTE
}

pub fn chars_per_second(text: &str, total_time_secs: f64) -> f64 {
    if total_time_secs > 0.0 {
        char_len(text) as f64 / total_time_secs
    } else {
        0.0
    }
}

pub fn tokens_per_second(text: &str, total_time_secs: f64) -> f64 {
    if total_time_secs > 0.0 {
        token_estimate(text) as f64 / total_time_secs
    } else {
        0.0
    }
}

/// Bundles every metric for one finished response.
pub fn calculate_all(text: &str, total_time_secs: f64) -> DerivedStatistics {
    DerivedStatistics {
        token_estimate: token_estimate(text),
        word_count: word_count(text),
        sentence_count: sentence_count(text),
        emoji_count: emoji_count(text),
        average_word_length: average_word_length(text),
        reading_time_minutes: reading_time_minutes(text),
        chars_per_second: chars_per_second(text, total_time_secs),
        tokens_per_second: tokens_per_second(text, total_time_secs),
    }
}
