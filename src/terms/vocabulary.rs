// src/terms/vocabulary.rs
// =============================================================================
// The set of technology terms we search job descriptions for.
//
// The techs file has one term per line, e.g.:
//   # databases
//   postgresql
//   microsoft sql server
//
// Matching is a set intersection: tokenize the (lowercased) text into
// n-grams up to the longest term length, keep the n-grams that are terms.
// =============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::ngrams::{tokenize_ngrams, Term};
use crate::lines::read_good_lines;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: HashSet<Term>,
    /// Number of words in the longest term (at least 1)
    max_n: usize,
    /// File the terms were loaded from, used by reload()
    source: Option<PathBuf>,
}

impl Vocabulary {
    // Loads the vocabulary from a techs file
    //
    // Fails if the file is missing or unreadable; the caller treats that
    // as fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut vocabulary = Self {
            source: Some(path.to_path_buf()),
            ..Self::default()
        };
        vocabulary.reload()?;
        Ok(vocabulary)
    }

    // Builds a vocabulary from in-memory lines (same rules as the file)
    #[cfg(test)]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::default();
        vocabulary.replace_terms(crate::lines::good_lines(lines));
        vocabulary
    }

    // Re-reads the terms from the source file
    //
    // Needs `&mut self`, so it cannot run while a fetch pass holds the
    // vocabulary behind an Arc.
    pub fn reload(&mut self) -> Result<()> {
        let Some(path) = self.source.clone() else {
            return Ok(());
        };
        let file = File::open(&path)
            .with_context(|| format!("Cannot open techs file {}", path.display()))?;
        let lines = read_good_lines(BufReader::new(file))
            .with_context(|| format!("Cannot read techs file {}", path.display()))?;
        self.replace_terms(lines);
        tracing::info!(
            path = %path.display(),
            terms = self.len(),
            max_n = self.max_n,
            "loaded techs vocabulary"
        );
        Ok(())
    }

    fn replace_terms<I: IntoIterator<Item = String>>(&mut self, lines: I) {
        self.terms.clear();
        self.max_n = 1;
        for line in lines {
            let term: Term = line
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if term.is_empty() {
                continue;
            }
            self.max_n = self.max_n.max(term.len());
            self.terms.insert(term);
        }
    }

    pub fn max_n(&self) -> usize {
        self.max_n.max(1)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, term: &[String]) -> bool {
        self.terms.contains(term)
    }

    // All n-grams of the text that are long enough to be a term
    pub fn ngrams(&self, text: &str) -> Vec<Term> {
        tokenize_ngrams(text, self.max_n())
    }

    // Finds which vocabulary terms occur in the text
    pub fn extract_terms(&self, text: &str) -> HashSet<Term> {
        let text = text.to_lowercase();
        self.ngrams(&text)
            .into_iter()
            .filter(|ngram| self.contains(ngram))
            .collect()
    }

    // Renders matched terms as sorted, space-joined strings
    pub fn terms_to_list(terms: &HashSet<Term>) -> Vec<String> {
        let mut list: Vec<String> = terms.iter().map(|term| term.join(" ")).collect();
        list.sort();
        list
    }

    // extract_terms + terms_to_list in one call
    pub fn match_text(&self, text: &str) -> Vec<String> {
        Self::terms_to_list(&self.extract_terms(text))
    }
}
