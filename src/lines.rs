// src/lines.rs
// =============================================================================
// Helpers for the line-oriented input files (URL lists and the techs file).
//
// Both formats share the same rules:
// - a line starting with '#' is a comment
// - trailing whitespace is ignored
// - blank lines are skipped
// =============================================================================

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

// Filters raw lines down to the meaningful ones
//
// The comment check happens before trimming, so an indented '#' is kept as
// a regular line.
pub fn good_lines<I, S>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter(|line| !line.as_ref().starts_with('#'))
        .map(|line| line.as_ref().trim_end().to_string())
        .filter(|line| !line.is_empty())
}

// Reads every meaningful line from a reader
//
// Stops at the first I/O error and returns it.
pub fn read_good_lines<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
    Ok(good_lines(lines).collect())
}

// Reads every URL file up front, in the given order
//
// A file that can't be opened or read fails the whole call, so nothing is
// fetched for a run whose input is incomplete.
pub fn read_url_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, Vec<String>)>> {
    paths
        .iter()
        .map(|path| Ok((path.clone(), read_url_file(path)?)))
        .collect()
}

fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Can not open url file {}", path.display()))?;
    read_good_lines(BufReader::new(file))
        .with_context(|| format!("Failed to read url file {}", path.display()))
}
