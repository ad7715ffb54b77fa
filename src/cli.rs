// src/cli.rs
// =============================================================================
// Command-line interface, parsed with clap's derive API.
//
//   jobtechs extract [INFILE...]      run the pipeline over URL lists
//   jobtechs apply <HOST> <HTML_FILE> run one extractor on a saved page
//   jobtechs hosts                    list hosts with a dedicated extractor
//   jobtechs newton [URL]             list the Newton Software jobs of a company
// =============================================================================

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Request rates accepted on the command line
const MAX_RPS_LIMIT: f64 = 1000.0;
const MIN_RPS_LIMIT: f64 = 0.001;

// Largest --workers value
const MAX_WORKERS: u64 = 1024;

// Careers page checked by `jobtechs newton` without arguments
pub const DEFAULT_NEWTON_URL: &str = "https://www.alteryx.com/careers";

#[derive(Parser, Debug)]
#[command(
    name = "jobtechs",
    version = "0.1.0",
    about = "Extracts the technologies mentioned in job descriptions",
    long_about = "jobtechs fetches job posting pages, routes every page to the extractor of its \
                  job board and reports the company, its site and the technology terms found \
                  in the description. URLs that fail go to a separate file so they can be retried."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch URLs and extract the technologies of every job page
    ///
    /// Example: jobtechs extract urls.txt --techs-file techs.txt --outfile jobs.txt
    Extract {
        /// Files with one URL per line ('#' comments and blank lines are skipped).
        /// Reads stdin when none is given.
        infiles: Vec<PathBuf>,

        /// Technology terms, one per line
        #[arg(long, default_value = "techs.txt")]
        techs_file: PathBuf,

        /// Where failed URLs go, as "url<TAB>reason" lines
        #[arg(long, default_value = "failed_urls.txt")]
        errors_file: PathBuf,

        /// Log file (appended to)
        #[arg(long, default_value = "extract_techs.log")]
        log_file: PathBuf,

        /// Where results go, "-" for stdout
        #[arg(long, default_value = "-")]
        outfile: String,

        /// Save every fetched page into this directory
        #[arg(long)]
        save_pages_to: Option<PathBuf>,

        /// Concurrent requests per worker (1-1024)
        #[arg(long, default_value_t = 5, value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_WORKERS))]
        workers: usize,

        /// Requests per second for each job board, 0 = no limit
        #[arg(long, default_value_t = 3.0, value_parser = parse_rate)]
        max_rps: f64,

        /// Requests per second for all other hosts, 0 = no limit
        #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
        default_max_rps: f64,

        /// Write results as JSON lines instead of "url | company | techs | site"
        #[arg(long)]
        json: bool,
    },

    /// Run the extractor of HOST against a saved HTML page
    ///
    /// Example: jobtechs apply www.dice.com saved/job.html --url https://www.dice.com/jobs/detail/...
    Apply {
        /// Host whose extractor to use; unknown hosts get the generic one
        host: String,

        /// The saved page
        html_file: PathBuf,

        /// URL the page was fetched from (defaults to https://HOST/)
        #[arg(long)]
        url: Option<String>,

        /// Technology terms, one per line
        #[arg(long, default_value = "techs.txt")]
        techs_file: PathBuf,
    },

    /// List the hosts that have a dedicated extractor
    Hosts,

    /// Check a careers page for embedded Newton Software jobs and list them
    ///
    /// Prints "title<TAB>url" for every job of the company.
    Newton {
        /// The company careers page
        #[arg(default_value = DEFAULT_NEWTON_URL)]
        url: String,

        /// Save the fetched pages into this directory
        #[arg(long)]
        save_pages_to: Option<PathBuf>,
    },
}

// A rate is 0 (no limit) or a finite number of requests per second
fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if rate == 0.0 || (MIN_RPS_LIMIT..=MAX_RPS_LIMIT).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!(
            "rate must be 0 or between {} and {} requests per second",
            MIN_RPS_LIMIT, MAX_RPS_LIMIT
        ))
    }
}
