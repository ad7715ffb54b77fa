// src/terms/mod.rs
// =============================================================================
// Technology term matching.
//
// Submodules:
// - ngrams: splits text into word n-grams (punctuation aware)
// - vocabulary: the loaded set of terms and the matching itself
// =============================================================================

mod ngrams;
mod vocabulary;

pub use ngrams::{tokenize_ngrams, Term};
pub use vocabulary::Vocabulary;
