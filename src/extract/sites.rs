// src/extract/sites.rs
// =============================================================================
// Page rules for the job aggregator sites we know.
//
// Each site is a unit struct implementing SiteRules (and, for aggregators
// whose jobs get embedded into company sites, EmbeddedJobLocator).
// The selectors describe the markup the sites served when the rules were
// written; when a site changes, the fields simply come back empty.
// =============================================================================

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use url::{form_urlencoded, Url};

use super::driver::{EmbeddedJobLocator, JobPageRules, SiteRules};
use super::html::{
    exists, query_value, resolve, select_attr, select_attrs, select_links, select_text,
    select_visible_text, site_url,
};
use crate::types::JobId;

lazy_static! {
    static ref INDEED_JOB_KEY: Regex = Regex::new(r"[?]jk=(\w+)").unwrap();
    static ref GREENHOUSE_PERMALINK: Regex =
        Regex::new(r"^https://boards.greenhouse.io/([^/]+)/jobs/(\d+)$").unwrap();
    static ref JOBVITE_PATH: Regex = Regex::new(r"^/([^/]+)/job/([^/?]+)$").unwrap();
    static ref WORD: Regex = Regex::new(r"^\w+$").unwrap();
    static ref NEWTON_CLIENT_ID: Regex = Regex::new(
        r"//newton[.]newtonsoftware[.]com/career/iframe[.]action[?]clientId=([0-9a-f]+)"
    )
    .unwrap();
}

// Absolute links on the page; the first one is taken as the company site
fn first_absolute_link(doc: &Html, css: &str) -> String {
    select_attrs(doc, css, "href")
        .into_iter()
        .find(|href| href.starts_with("http"))
        .map(|href| site_url(&href))
        .unwrap_or_default()
}

fn og_url(doc: &Html) -> String {
    select_attr(doc, r#"head > meta[property="og:url"]"#, "content")
        .trim()
        .to_string()
}

// -----------------------------------------------------------------------------
// www.indeed.com
// -----------------------------------------------------------------------------

pub struct Indeed;

impl JobPageRules for Indeed {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        select_text(doc, r#"span[class="company"]"#)
    }

    // The company site is only on the company page of indeed, not here
    fn extract_company_site(&self, _url: &str, _doc: &Html) -> String {
        String::new()
    }

    fn extract_description(&self, _url: &str, doc: &Html) -> String {
        select_visible_text(doc, "span#job_summary")
    }
}

impl SiteRules for Indeed {
    fn host(&self) -> &'static str {
        "www.indeed.com"
    }

    // Job pages link their mobile version: /m/viewjob?jk=ce09ccbdef05dafc
    fn detect_job_id(&self, _url: &str, doc: &Html) -> Option<JobId> {
        let alternate = select_attr(doc, r#"link[rel="alternate"][media="handheld"]"#, "href");
        let caps = INDEED_JOB_KEY.captures(&alternate)?;
        Some(JobId::new("", &caps[1]))
    }
}

// -----------------------------------------------------------------------------
// newton.newtonsoftware.com
// -----------------------------------------------------------------------------

pub struct NewtonSoftware;

const NEWTON_HOST: &str = "newton.newtonsoftware.com";
const NEWTON_IFRAME_MARKER: &str = "//newton.newtonsoftware.com/career/iframe.action";

impl JobPageRules for NewtonSoftware {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        select_attr(doc, "span#indeed-apply-widget", "data-indeed-apply-jobcompanyname")
    }

    fn extract_company_site(&self, _url: &str, doc: &Html) -> String {
        let continue_url =
            select_attr(doc, "span#indeed-apply-widget", "data-indeed-apply-continueurl");
        if continue_url.is_empty() {
            String::new()
        } else {
            site_url(&continue_url)
        }
    }

    fn extract_description(&self, _url: &str, doc: &Html) -> String {
        select_visible_text(doc, "td#gnewtonJobDescriptionText")
    }
}

impl SiteRules for NewtonSoftware {
    fn host(&self) -> &'static str {
        NEWTON_HOST
    }

    // Example:
    //   /career/JobIntroduction.action?clientId=8a78...&id=8a78...&source=Indeed
    fn detect_job_id(&self, url: &str, doc: &Html) -> Option<JobId> {
        let parsed = Url::parse(url).ok()?;
        let client_id = query_value(&parsed, "clientId")?;
        let job_id = query_value(&parsed, "id")?;
        if !exists(doc, "table#gnewtonJobDescription") {
            return None;
        }
        // ids are hex strings
        if !WORD.is_match(&client_id) || !WORD.is_match(&job_id) {
            return None;
        }
        Some(JobId::new(client_id, job_id))
    }
}

impl EmbeddedJobLocator for NewtonSoftware {
    // Company pages embedding newton jobs look like
    //   http://www.alteryx.com/careers?gnk=job&gni=8a7886f8518a669b01518ee8e5c07d58
    // and load a script from //newton.newtonsoftware.com/career/iframe.action?clientId=...
    fn locate_job_url(&self, url: &str, doc: &Html) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let job_id = query_value(&parsed, "gni")?;
        if query_value(&parsed, "gnk").as_deref() != Some("job") {
            return None;
        }

        let marker = select_attr(
            doc,
            &format!(r#"script[src*="{}"]"#, NEWTON_IFRAME_MARKER),
            "src",
        );
        if marker.is_empty() {
            return None;
        }
        let client_id = query_value(&resolve(url, &marker)?, "clientId")?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("clientId", &client_id)
            .append_pair("id", &job_id)
            .append_pair("source", "Indeed")
            .finish();
        Some(format!(
            "https://{}/career/JobIntroduction.action?{}",
            NEWTON_HOST, query
        ))
    }
}

// Company job lists on Newton Software
//
// A careers page that embeds the Newton iframe names the company's client id
// somewhere in its markup or scripts. The full job list of that client is
// served at CareerHome.action.

pub fn newton_client_id(page: &str) -> Option<String> {
    NEWTON_CLIENT_ID
        .captures(page)
        .map(|caps| caps[1].to_string())
}

pub fn newton_jobs_url(client_id: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("clientId", client_id)
        .finish();
    format!("https://{}/career/CareerHome.action?{}", NEWTON_HOST, query)
}

// (title, absolute url) of every job on a CareerHome page
pub fn newton_job_listings(listing_url: &str, body: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(body);
    select_links(&doc, r#"div[class="gnewtonCareerGroupJobTitleClass"] > a"#)
        .into_iter()
        .map(|(href, title)| {
            let url = resolve(listing_url, &href)
                .map(String::from)
                .unwrap_or(href);
            (title, url)
        })
        .collect()
}

// -----------------------------------------------------------------------------
// boards.greenhouse.io
//
// Greenhouse job descriptions are injected into the client company's site.
// A typical job URL:
//   https://boards.greenhouse.io/embed/job_app?for=pantheon&token=619056
// `for` is the short company id and `token` the job id. The job page has
//   <meta property="og:url" content="https://boards.greenhouse.io/pantheon/jobs/619056">
// -----------------------------------------------------------------------------

pub struct Greenhouse;

const GREENHOUSE_HOST: &str = "boards.greenhouse.io";
const GREENHOUSE_BOARD_MARKER: &str = "//boards.greenhouse.io/embed/job_board/js";

impl JobPageRules for Greenhouse {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        let name = select_text(doc, r#"div#header > span[class="company-name"]"#);
        let name = name.trim();
        name.strip_prefix("at ").unwrap_or(name).to_string()
    }

    fn extract_company_site(&self, _url: &str, doc: &Html) -> String {
        let jobs_url = select_attr(doc, "div#header > a", "href");
        if jobs_url.is_empty() {
            String::new()
        } else {
            site_url(&jobs_url)
        }
    }

    fn extract_description(&self, _url: &str, doc: &Html) -> String {
        select_visible_text(doc, "div#content")
    }
}

impl SiteRules for Greenhouse {
    fn host(&self) -> &'static str {
        GREENHOUSE_HOST
    }

    fn detect_job_id(&self, _url: &str, doc: &Html) -> Option<JobId> {
        let permalink = og_url(doc);
        let caps = GREENHOUSE_PERMALINK.captures(&permalink)?;
        Some(JobId::new(&caps[1], &caps[2]))
    }
}

impl EmbeddedJobLocator for Greenhouse {
    // The company page has a numeric gh_jid parameter and loads
    //   //boards.greenhouse.io/embed/job_board/js?for=pantheon
    fn locate_job_url(&self, url: &str, doc: &Html) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let job_id = query_value(&parsed, "gh_jid")?;

        let marker = select_attr(
            doc,
            &format!(r#"script[src*="{}"]"#, GREENHOUSE_BOARD_MARKER),
            "src",
        );
        if marker.is_empty() {
            return None;
        }
        let client_id = query_value(&resolve(url, &marker)?, "for")?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("for", &client_id)
            .append_pair("token", &job_id)
            .finish();
        Some(format!("https://{}/embed/job_app?{}", GREENHOUSE_HOST, query))
    }
}

// -----------------------------------------------------------------------------
// recruit.hirebridge.com
// -----------------------------------------------------------------------------

pub struct HireBridge;

impl JobPageRules for HireBridge {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        select_attr(doc, "div#logo > h1 > img", "alt")
    }

    // Job descriptions usually link the company's own site
    fn extract_company_site(&self, _url: &str, doc: &Html) -> String {
        first_absolute_link(doc, "div#rightcol a[href]")
    }
}

impl SiteRules for HireBridge {
    fn host(&self) -> &'static str {
        "recruit.hirebridge.com"
    }

    // Example permalink:
    //   http://recruit.hirebridge.com/v3/Jobs/JobDetails.aspx?cid=7744&jid=451687
    fn detect_job_id(&self, _url: &str, doc: &Html) -> Option<JobId> {
        let permalink = Url::parse(&og_url(doc)).ok()?;
        let company_id = query_value(&permalink, "cid")?;
        let job_id = query_value(&permalink, "jid")?;
        Some(JobId::new(company_id, job_id))
    }
}

// -----------------------------------------------------------------------------
// jobs.jobvite.com
// -----------------------------------------------------------------------------

pub struct Jobvite;

impl JobPageRules for Jobvite {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        select_attr(doc, r#"div[class="jv-logo"] > a > img"#, "alt")
    }

    fn extract_company_site(&self, _url: &str, doc: &Html) -> String {
        first_absolute_link(doc, "a[href]")
    }
}

impl SiteRules for Jobvite {
    fn host(&self) -> &'static str {
        "jobs.jobvite.com"
    }

    // Example: http://jobs.jobvite.com/cloudera/job/oNg44fwV
    fn detect_job_id(&self, url: &str, _doc: &Html) -> Option<JobId> {
        let parsed = Url::parse(url).ok()?;
        let caps = JOBVITE_PATH.captures(parsed.path())?;
        Some(JobId::new(&caps[1], &caps[2]))
    }
}

// -----------------------------------------------------------------------------
// www.dice.com
// -----------------------------------------------------------------------------

pub struct Dice;

impl JobPageRules for Dice {
    fn extract_company_name(&self, _url: &str, doc: &Html) -> String {
        select_text(
            doc,
            r#"li[itemprop="hiringOrganization"] span[itemprop="name"]"#,
        )
    }

    // The company site is on another page
    fn extract_company_site(&self, _url: &str, _doc: &Html) -> String {
        String::new()
    }
}

impl SiteRules for Dice {
    fn host(&self) -> &'static str {
        "www.dice.com"
    }

    // <meta name="groupId" content="cybercod"> <meta name="jobId" content="SM1-13765926">
    fn detect_job_id(&self, _url: &str, doc: &Html) -> Option<JobId> {
        let company_id = select_attr(doc, r#"head > meta[name="groupId"]"#, "content");
        let job_id = select_attr(doc, r#"head > meta[name="jobId"]"#, "content");
        let (company_id, job_id) = (company_id.trim(), job_id.trim());
        if company_id.is_empty() || job_id.is_empty() {
            return None;
        }
        Some(JobId::new(company_id, job_id))
    }
}
