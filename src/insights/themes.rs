//! Theme extraction over feedback notes: a word-frequency count with a
//! stop-word list, used as a lightweight proxy for qualitative trends.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Minimum surviving word length (strictly greater than this).
const MIN_WORD_LEN: usize = 3;

/// Maximal runs of ASCII letters; digits and punctuation separate words.
static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("word pattern is valid"));

/// Common English function words plus domain filler terms ("response",
/// "answer", "helpful") excluded from theme counting. Sorted for binary
/// search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "an", "and", "answer", "are", "at",
    "be", "been", "before", "being", "below", "both", "but", "by", "can", "could", "did", "didn",
    "do", "does", "don", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "he", "helpful", "here", "how", "i", "in", "into", "is", "it", "just", "more", "most",
    "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "out", "over",
    "own", "response", "s", "same", "she", "should", "so", "some", "such", "t", "than", "that",
    "the", "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
    "up", "very", "was", "wasn", "we", "were", "what", "when", "where", "which", "who", "why",
    "will", "with", "would", "yes", "you",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// A frequently occurring significant word and its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub word: String,
    pub count: u64,
}

/// Count significant words across a collection of notes and return the
/// `top_n` most frequent, ties broken by first appearance. Case is
/// folded; stop words and words of 3 characters or fewer are dropped.
pub fn extract_themes<I, S>(notes: I, top_n: usize) -> Vec<Theme>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // Insertion-ordered frequency table: a stable sort on the entry list
    // keeps first-seen order among equal counts.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<Theme> = Vec::new();

    for note in notes {
        let note = note.as_ref();
        if note.is_empty() {
            continue;
        }
        let lowered = note.to_lowercase();
        for word in WORD_PATTERN.find_iter(&lowered) {
            let word = word.as_str();
            if word.len() <= MIN_WORD_LEN || is_stop_word(word) {
                continue;
            }
            match index.get(word) {
                Some(&i) => entries[i].count += 1,
                None => {
                    index.insert(word.to_string(), entries.len());
                    entries.push(Theme {
                        word: word.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(top_n);
    entries
}
