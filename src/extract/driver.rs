// src/extract/driver.rs
// =============================================================================
// Generic page extraction, parameterised by per-site rules.
//
// A site only describes WHERE things are on its pages (JobPageRules,
// SiteRules). The functions and extractors here decide WHAT to do with
// them:
// - extract_job_page: company + site + matched techs from a job page
// - SiteExtractor: for an aggregator host, only accept real job pages
// - GenericExtractor: any other host; detect pages that only embed an
//   aggregator job and point at the canonical URL instead
// =============================================================================

use scraper::Html;
use std::sync::Arc;
use tracing::debug;

use super::archive::PageArchive;
use super::html::{body_text, site_url};
use super::PageExtractor;
use crate::terms::Vocabulary;
use crate::types::{JobId, JobRecord};

pub const NOTHING_EXTRACTED: &str = "Nothing extracted. The job is probably no longer active.";
pub const NOT_A_JOB_PAGE: &str = "The url is not a job description/vacancy.";
pub const EXTERNAL_JOB_FOUND: &str = "External job description found:";

// Where the fields of a job description live on a page
pub trait JobPageRules: Send + Sync {
    fn extract_company_name(&self, url: &str, doc: &Html) -> String;

    fn extract_company_site(&self, url: &str, doc: &Html) -> String;

    // The text the techs are searched in; the whole body by default
    fn extract_description(&self, _url: &str, doc: &Html) -> String {
        body_text(doc)
    }
}

// Rules of a job aggregator site that gets its own fetch worker
pub trait SiteRules: JobPageRules {
    // Host the rules are registered for, e.g. "boards.greenhouse.io"
    fn host(&self) -> &'static str;

    // Some(..) only when the page is a job description
    fn detect_job_id(&self, url: &str, doc: &Html) -> Option<JobId>;
}

// Recognises a company page that embeds an aggregator's job widget
pub trait EmbeddedJobLocator: Send + Sync {
    // Canonical aggregator URL of the embedded job, if the page has one
    fn locate_job_url(&self, url: &str, doc: &Html) -> Option<String>;
}

// Pulls company, site and techs out of a job description page
pub fn extract_job_page<R>(
    rules: &R,
    url: &str,
    doc: &Html,
    vocabulary: &Vocabulary,
) -> Result<JobRecord, String>
where
    R: JobPageRules + ?Sized,
{
    let company = rules.extract_company_name(url, doc).trim().to_string();
    let site = rules.extract_company_site(url, doc);
    let description = rules.extract_description(url, doc);
    let techs = vocabulary.match_text(&description);

    debug!(url, company = %company, techs = techs.len(), "parsed job page");

    if company.is_empty() && techs.is_empty() && site.is_empty() {
        return Err(NOTHING_EXTRACTED.to_string());
    }

    Ok(JobRecord {
        url: url.to_string(),
        company,
        techs,
        site,
    })
}

// Extractor for one aggregator host
pub struct SiteExtractor<R> {
    rules: R,
    archive: Option<Arc<PageArchive>>,
}

impl<R: SiteRules> SiteExtractor<R> {
    pub fn new(rules: R, archive: Option<Arc<PageArchive>>) -> Self {
        Self { rules, archive }
    }
}

impl<R: SiteRules> PageExtractor for SiteExtractor<R> {
    fn host(&self) -> Option<&str> {
        Some(self.rules.host())
    }

    fn extract(&self, url: &str, body: &str, vocabulary: &Vocabulary) -> Result<JobRecord, String> {
        let doc = Html::parse_document(body);

        match self.rules.detect_job_id(url, &doc) {
            Some(job_id) => {
                if let Some(archive) = &self.archive {
                    archive.save(url, body, Some(&job_id.page_name()));
                }
                extract_job_page(&self.rules, url, &doc, vocabulary)
            }
            None => {
                if let Some(archive) = &self.archive {
                    archive.save(url, body, None);
                }
                Err(NOT_A_JOB_PAGE.to_string())
            }
        }
    }
}

// Rules for an arbitrary company career page
struct GenericRules;

impl JobPageRules for GenericRules {
    // There is no reliable place for a company name on an arbitrary page
    fn extract_company_name(&self, _url: &str, _doc: &Html) -> String {
        String::new()
    }

    // A page outside the aggregators is the company's own site
    fn extract_company_site(&self, url: &str, _doc: &Html) -> String {
        site_url(url)
    }
}

// Extractor used by the default worker for every unmapped host
pub struct GenericExtractor {
    locators: Vec<Arc<dyn EmbeddedJobLocator>>,
    archive: Option<Arc<PageArchive>>,
}

impl GenericExtractor {
    pub fn new(
        locators: Vec<Arc<dyn EmbeddedJobLocator>>,
        archive: Option<Arc<PageArchive>>,
    ) -> Self {
        Self { locators, archive }
    }
}

impl PageExtractor for GenericExtractor {
    fn host(&self) -> Option<&str> {
        None
    }

    fn extract(&self, url: &str, body: &str, vocabulary: &Vocabulary) -> Result<JobRecord, String> {
        if let Some(archive) = &self.archive {
            archive.save(url, body, None);
        }

        let doc = Html::parse_document(body);

        for locator in &self.locators {
            if let Some(job_url) = locator.locate_job_url(url, &doc) {
                return Err(format!("{}\t{}", EXTERNAL_JOB_FOUND, job_url));
            }
        }

        extract_job_page(&GenericRules, url, &doc, vocabulary)
    }
}
