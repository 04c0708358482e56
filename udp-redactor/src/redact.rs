//! Keyword redaction.
//!
//! Pure text transformation: no I/O, no failure modes.

/// Characters stripped (at most one) from the end of a word before comparing.
const TRAILING_PUNCTUATION: [char; 5] = [',', '.', '!', '?', ' '];

/// Replace every whole-word, case-insensitive occurrence of `keyword` in
/// `phrase` with `X`s, keeping one trailing punctuation mark in place.
///
/// Words are the pieces between single spaces.  Returns the redacted phrase
/// and the number of words replaced.
///
/// ```
/// use udp_redactor::redact::redact;
///
/// assert_eq!(redact("hello, world!", "hello"), ("XXXXX, world!".to_string(), 1));
/// ```
pub fn redact(phrase: &str, keyword: &str) -> (String, usize) {
    let mut matches = 0;
    let words: Vec<String> = phrase
        .split(' ')
        .map(|word| match redact_word(word, keyword) {
            Some(masked) => {
                matches += 1;
                masked
            }
            None => word.to_owned(),
        })
        .collect();
    (words.join(" "), matches)
}

fn redact_word(word: &str, keyword: &str) -> Option<String> {
    let (stem, trailing) = split_trailing(word);
    if stem.is_empty() || !eq_ignore_case(stem, keyword) {
        return None;
    }
    let mut masked = "X".repeat(stem.chars().count());
    masked.extend(trailing);
    Some(masked)
}

/// Split off one trailing punctuation character, if present.
fn split_trailing(word: &str) -> (&str, Option<char>) {
    match word.chars().next_back() {
        Some(c) if TRAILING_PUNCTUATION.contains(&c) => (&word[..word.len() - c.len_utf8()], Some(c)),
        _ => (word, None),
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
