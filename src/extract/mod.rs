// src/extract/mod.rs
// =============================================================================
// Turning a fetched page into a JobRecord.
//
// Submodules:
// - html: scraper/url helpers shared by the rules
// - driver: generic extraction steps and the per-site capability traits
// - sites: rules for the job aggregators we know
// - archive: optional copies of the fetched pages on disk
//
// The pipeline only sees the PageExtractor trait. Which extractor handles
// which host is decided once, in registry().
// =============================================================================

mod archive;
mod driver;
mod html;
mod sites;

use std::sync::Arc;

pub use archive::PageArchive;
pub use html::netloc;
pub use sites::{newton_client_id, newton_job_listings, newton_jobs_url};

use driver::{EmbeddedJobLocator, GenericExtractor, SiteExtractor};
use sites::{Dice, Greenhouse, HireBridge, Indeed, Jobvite, NewtonSoftware};

use crate::terms::Vocabulary;
use crate::types::JobRecord;

// Site-specific page extraction
//
// Implementations are shared between all tasks of a worker, so `extract`
// takes `&self` and must not keep per-call state.
pub trait PageExtractor: Send + Sync {
    // Host this extractor is registered for; None for the generic one
    fn host(&self) -> Option<&str>;

    // Ok(record) for a job page, Err(reason) when the page yields nothing
    fn extract(&self, url: &str, body: &str, vocabulary: &Vocabulary) -> Result<JobRecord, String>;
}

// The host -> extractor table the pipeline is built from
pub struct ExtractorRegistry {
    pub sites: Vec<Arc<dyn PageExtractor>>,
    pub default: Arc<dyn PageExtractor>,
}

impl ExtractorRegistry {
    // Extractor registered for `host`, or the generic one
    pub fn for_host(&self, host: &str) -> Arc<dyn PageExtractor> {
        self.sites
            .iter()
            .find(|extractor| extractor.host() == Some(host))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn hosts(&self) -> Vec<&str> {
        self.sites.iter().filter_map(|extractor| extractor.host()).collect()
    }
}

// Builds the static registry of site extractors
//
// Every aggregator gets its own extractor (and later its own worker); the
// generic extractor knows how to spot jobs of the aggregators that embed
// into company sites.
pub fn registry(archive: Option<Arc<PageArchive>>) -> ExtractorRegistry {
    let sites: Vec<Arc<dyn PageExtractor>> = vec![
        Arc::new(SiteExtractor::new(Indeed, archive.clone())),
        Arc::new(SiteExtractor::new(NewtonSoftware, archive.clone())),
        Arc::new(SiteExtractor::new(Greenhouse, archive.clone())),
        Arc::new(SiteExtractor::new(HireBridge, archive.clone())),
        Arc::new(SiteExtractor::new(Jobvite, archive.clone())),
        Arc::new(SiteExtractor::new(Dice, archive.clone())),
    ];

    let locators: Vec<Arc<dyn EmbeddedJobLocator>> =
        vec![Arc::new(NewtonSoftware), Arc::new(Greenhouse)];

    ExtractorRegistry {
        sites,
        default: Arc::new(GenericExtractor::new(locators, archive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_hosts() {
        let registry = registry(None);
        assert_eq!(
            registry.hosts(),
            vec![
                "www.indeed.com",
                "newton.newtonsoftware.com",
                "boards.greenhouse.io",
                "recruit.hirebridge.com",
                "jobs.jobvite.com",
                "www.dice.com",
            ]
        );
    }

    #[test]
    fn test_for_host_falls_back_to_generic() {
        let registry = registry(None);
        assert_eq!(registry.for_host("www.dice.com").host(), Some("www.dice.com"));
        assert_eq!(registry.for_host("example.com").host(), None);
    }
}
