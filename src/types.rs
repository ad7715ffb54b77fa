// src/types.rs
// =============================================================================
// Records that flow out of the pipeline.
//
// Every URL ends up as exactly one of:
// - JobRecord: the page was a job description and we extracted something
// - Failure: fetching or extracting failed, with a human readable reason
//
// The two go to separate destinations so failed URLs can be retried later.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

// A successfully processed job page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub url: String,
    /// Hiring company, empty when the page does not say
    pub company: String,
    /// Matched technology terms, sorted, multi-word terms space-joined
    pub techs: Vec<String>,
    /// Company site as scheme://host, empty when unknown
    pub site: String,
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.url,
            self.company,
            self.techs.join(", "),
            self.site
        )
    }
}

// A URL that could not be fetched or yielded nothing useful
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub url: String,
    pub reason: String,
}

impl Failure {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

// Tab separated so the url column can be cut out and fed back in
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.url, self.reason)
    }
}

// Identifies a job on an aggregator site (greenhouse, dice, ...)
//
// A page that carries a JobId is the canonical job description; a page
// without one is some other page of the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId {
    pub company_id: String,
    pub job_id: String,
}

impl JobId {
    pub fn new(company_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            job_id: job_id.into(),
        }
    }

    // Name used when archiving the page: "<company_id>.<job_id>"
    pub fn page_name(&self) -> String {
        format!("{}.{}", self.company_id, self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_record_display() {
        let record = JobRecord {
            url: "https://boards.greenhouse.io/acme/jobs/1".to_string(),
            company: "Acme".to_string(),
            techs: vec!["go".to_string(), "machine learning".to_string()],
            site: "https://acme.io".to_string(),
        };
        assert_eq!(
            record.to_string(),
            "https://boards.greenhouse.io/acme/jobs/1 | Acme | go, machine learning | https://acme.io"
        );
    }

    #[test]
    fn test_failure_display_is_tab_separated() {
        let failure = Failure::new("https://example.com/job", "HTTP 404 Not Found");
        assert_eq!(failure.to_string(), "https://example.com/job\tHTTP 404 Not Found");
    }

    #[test]
    fn test_job_record_json() {
        let record = JobRecord {
            url: "u".to_string(),
            company: String::new(),
            techs: vec!["rust".to_string()],
            site: String::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"url":"u","company":"","techs":["rust"],"site":""}"#);
    }

    #[test]
    fn test_job_id_page_name() {
        assert_eq!(JobId::new("pantheon", "619056").page_name(), "pantheon.619056");
    }
}
