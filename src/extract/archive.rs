// src/extract/archive.rs
// =============================================================================
// Optional on-disk copies of the fetched pages (--save-pages-to).
//
// File name: <host with ':' replaced by '_'>.<page name>.html
// The page name is "<company_id>.<job_id>" for recognised aggregator jobs
// and the SHA-256 of the URL for everything else.
// =============================================================================

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

use super::html::netloc;

#[derive(Debug, Clone)]
pub struct PageArchive {
    dir: PathBuf,
}

impl PageArchive {
    // Creates the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create pages directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(url: &str, page_name: Option<&str>) -> String {
        let prefix = Url::parse(url)
            .map(|parsed| netloc(&parsed).replace(':', "_"))
            .unwrap_or_default();
        let name = match page_name {
            Some(name) => safe_name(name),
            None => hash_url(url),
        };
        let suffix = if name.ends_with(".html") { "" } else { ".html" };
        format!("{}.{}{}", prefix, name, suffix)
    }

    // Writes the page; a failed write is logged and otherwise ignored so
    // it never changes the outcome of the URL
    pub fn save(&self, url: &str, body: &str, page_name: Option<&str>) {
        let path = self.dir.join(Self::file_name(url, page_name));
        info!(url, path = %path.display(), "saving page");
        if let Err(e) = fs::write(&path, body) {
            warn!(url, path = %path.display(), error = %e, "could not save page");
        }
    }
}

// Page names come from page content; keep them a single plain file name
fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

fn hash_url(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
