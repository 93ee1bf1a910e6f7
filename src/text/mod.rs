// Text normalization shared by ingestion and query-time scoring


/// Function words dropped from token lists. Covers English and French since
/// crawled postings come in both.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it",
    "of", "on", "or", "the", "to", "with", "au", "aux", "d", "de", "des", "du", "en", "et", "l",
    "la", "le", "les", "ou", "pour", "sur", "un", "une",
];

/// Lower-case, replace every non-alphanumeric character with a space and
/// collapse whitespace runs.
///
/// The function is total and deterministic: the same input always yields the
/// same output, and any input made only of punctuation or whitespace yields
/// an empty string.
#[inline]
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize `text` and split it into tokens, dropping stop words
#[inline]
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|token| !token.is_empty() && !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

#[inline]
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Collapse whitespace for display without changing case or punctuation
#[inline]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, ending with `...` when cut
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}
