// src/terms/ngrams.rs
// =============================================================================
// Word n-gram tokenizer used for technology term matching.
//
// How it works:
// 1. Split the text on runs of non-word characters, keeping the separators
//    so we get [word, sep, word, sep, ..., word]
// 2. Walk the words, gluing together pieces that belong to one technology
//    name: node.js, transact-sql, pl/sql, c#, c++, .net
// 3. Keep a sliding window of the last `max_n` words and emit every n-gram
//    that ends at the current word
//
// Punctuation between two words resets the window, so an n-gram never
// spans a comma or a full stop. Plain whitespace does not.
// =============================================================================

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;

// A term is an ordered sequence of lowercase words: ["machine", "learning"]
pub type Term = Vec<String>;

// Separators that merge the words around them into one token
const WORD_JOINERS: [&str; 3] = ["-", ".", "/"];

lazy_static! {
    static ref SEPARATOR: Regex = Regex::new(r"\W+").unwrap();

    // The separator ends with a lone '.' that belongs to the next word (.net)
    static ref LEADING_DOT: Regex = Regex::new(r"\W\.\n?$").unwrap();

    // '#' or '+' glued to the end of the previous word (c#, c++)
    static ref TRAILING_SYMBOLS: Regex = Regex::new(r"^([#+]+)\W").unwrap();
}

// Splits text into alternating word and separator chunks
//
// The result always has odd length and starts and ends with a word chunk,
// which may be empty when the text starts or ends with a separator.
//
// Example:
//   "node.js, rust" -> ["node", ".", "js", ", ", "rust"]
fn split_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut last = 0;
    for sep in SEPARATOR.find_iter(text) {
        chunks.push(&text[last..sep.start()]);
        chunks.push(sep.as_str());
        last = sep.end();
    }
    chunks.push(&text[last..]);
    chunks
}

// Produces every word n-gram of the text, from unigrams up to `max_n` words
//
// For each word the unigram comes first, followed by the n-grams ending at
// that word in growing length order:
//   tokenize_ngrams("a b c", 2) -> [a], [b], [a b], [c], [b c]
//
// A separator at the very end of the text yields a trailing empty word,
// e.g. "developer." ends with [""]. Matching never cares because no term
// is empty.
pub fn tokenize_ngrams(text: &str, max_n: usize) -> Vec<Term> {
    let mut ngrams = Vec::new();
    if text.is_empty() {
        return ngrams;
    }

    let chunks = split_chunks(text);
    let len = chunks.len();
    let capacity = max_n.max(1);
    let mut window: VecDeque<String> = VecDeque::with_capacity(capacity);

    // Start as if the text followed punctuation so the first word opens a
    // fresh window
    let mut prev_sep = String::from(". ");
    let mut i = 0;

    while i < len {
        let mut word = chunks[i].to_string();

        if LEADING_DOT.is_match(&prev_sep) {
            word.insert(0, '.');
            prev_sep.pop();
        }

        // node.js.io -> one token
        while i + 2 < len {
            let sep = chunks[i + 1];
            if WORD_JOINERS.contains(&sep) && !chunks[i + 2].is_empty() {
                word.push_str(sep);
                word.push_str(chunks[i + 2]);
                i += 2;
            } else {
                break;
            }
        }

        let mut next_sep = None;
        if i + 2 < len {
            let mut sep = chunks[i + 1];
            if let Some(symbols) = TRAILING_SYMBOLS.captures(sep).and_then(|c| c.get(1)) {
                word.push_str(symbols.as_str());
                sep = &sep[symbols.end()..];
            }
            next_sep = Some(sep);
        }

        ngrams.push(vec![word.clone()]);

        if !prev_sep.trim().is_empty() {
            window.clear();
        }
        if window.len() == capacity {
            window.pop_front();
        }
        window.push_back(word);

        if max_n > 1 {
            for n in 2..=window.len() {
                ngrams.push(window.iter().skip(window.len() - n).cloned().collect());
            }
        }

        if let Some(sep) = next_sep {
            prev_sep = sep.to_string();
        }
        i += 2;
    }

    ngrams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grams(items: &[&[&str]]) -> Vec<Term> {
        items
            .iter()
            .map(|gram| gram.iter().map(|w| w.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(tokenize_ngrams("", 3).is_empty());
    }

    #[test]
    fn test_unigrams() {
        assert_eq!(
            tokenize_ngrams("a b c", 1),
            grams(&[&["a"], &["b"], &["c"]])
        );
    }

    #[test]
    fn test_bigrams() {
        assert_eq!(
            tokenize_ngrams("a b c", 2),
            grams(&[&["a"], &["b"], &["a", "b"], &["c"], &["b", "c"]])
        );
    }

    #[test]
    fn test_trigrams() {
        assert_eq!(
            tokenize_ngrams("a b c", 3),
            grams(&[
                &["a"],
                &["b"],
                &["a", "b"],
                &["c"],
                &["b", "c"],
                &["a", "b", "c"],
            ])
        );
    }

    #[test]
    fn test_dot_joined_word_and_trailing_empty_token() {
        assert_eq!(
            tokenize_ngrams("a node.js developer.", 1),
            grams(&[&["a"], &["node.js"], &["developer"], &[""]])
        );
    }

    #[test]
    fn test_leading_dot() {
        assert_eq!(
            tokenize_ngrams("a .net developer", 1),
            grams(&[&["a"], &[".net"], &["developer"]])
        );
    }

    #[test]
    fn test_repeated_joiners() {
        let ngrams = tokenize_ngrams("a node.js.io file", 2);
        assert!(ngrams.contains(&grams(&[&["node.js.io"]])[0]));
        assert!(ngrams.contains(&grams(&[&["a", "node.js.io"]])[0]));
        assert!(ngrams.contains(&grams(&[&["node.js.io", "file"]])[0]));
    }

    #[test]
    fn test_hyphen_and_slash_joiners() {
        let ngrams = tokenize_ngrams("transact-sql and pl/sql", 1);
        assert_eq!(
            ngrams,
            grams(&[&["transact-sql"], &["and"], &["pl/sql"]])
        );
    }

    #[test]
    fn test_symbol_absorption() {
        assert_eq!(
            tokenize_ngrams("c# developer", 2),
            grams(&[&["c#"], &["developer"], &["c#", "developer"]])
        );
        assert_eq!(
            tokenize_ngrams("c++ and java", 1),
            grams(&[&["c++"], &["and"], &["java"]])
        );
    }

    #[test]
    fn test_dot_prefix_keeps_bigram() {
        assert_eq!(
            tokenize_ngrams("microsoft .net", 2),
            grams(&[&["microsoft"], &[".net"], &["microsoft", ".net"]])
        );
    }

    #[test]
    fn test_punctuation_resets_window() {
        assert_eq!(
            tokenize_ngrams("python, java", 2),
            grams(&[&["python"], &["java"]])
        );
    }

    #[test]
    fn test_window_is_bounded() {
        let ngrams = tokenize_ngrams("a b c d", 2);
        assert!(ngrams.iter().all(|gram| gram.len() <= 2));
        assert_eq!(ngrams.last(), Some(&grams(&[&["c", "d"]])[0]));
    }
}
