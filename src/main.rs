// src/main.rs
// =============================================================================
// Entry point of the jobtechs CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) for the chosen subcommand
// 3. Dispatch to the subcommand handler
// 4. Exit with proper code (0 = success, 1 = page yielded nothing, 2 = error)
// =============================================================================

mod cli;
mod extract;
mod fetch;
mod lines;
mod pipeline;
mod terms;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use extract::{newton_client_id, newton_job_listings, newton_jobs_url, registry, PageArchive};
use fetch::{HttpSource, PageSource};
use pipeline::{Pipeline, PipelineConfig, ResultFormat};
use terms::Vocabulary;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            infiles,
            techs_file,
            errors_file,
            log_file,
            outfile,
            save_pages_to,
            workers,
            max_rps,
            default_max_rps,
            json,
        } => {
            init_file_logging(&log_file)?;
            let options = ExtractOptions {
                infiles,
                techs_file,
                errors_file,
                outfile,
                save_pages_to,
                config: PipelineConfig::default()
                    .with_pool_size(workers)
                    .with_site_max_rps(max_rps)
                    .with_default_max_rps(default_max_rps)
                    .with_format(if json { ResultFormat::JsonLines } else { ResultFormat::Text }),
            };
            handle_extract(options).await
        }
        Commands::Apply {
            host,
            html_file,
            url,
            techs_file,
        } => {
            init_stderr_logging();
            handle_apply(&host, &html_file, url, &techs_file)
        }
        Commands::Hosts => {
            for host in registry(None).hosts() {
                println!("{}", host);
            }
            Ok(0)
        }
        Commands::Newton { url, save_pages_to } => {
            init_stderr_logging();
            handle_newton(&url, save_pages_to.as_deref()).await
        }
    }
}

// RUST_LOG wins over the default "info"
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// The extract command logs to a file, stdout may carry the results
fn init_file_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Can not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

struct ExtractOptions {
    infiles: Vec<PathBuf>,
    techs_file: PathBuf,
    errors_file: PathBuf,
    outfile: String,
    save_pages_to: Option<PathBuf>,
    config: PipelineConfig,
}

// Handles the 'extract' subcommand
//
// Everything that can make the whole run fail is checked before the first
// request: the techs file, every URL file, the errors file, the output file
// and the pages directory.
async fn handle_extract(options: ExtractOptions) -> Result<i32> {
    let vocabulary = Vocabulary::load(&options.techs_file).with_context(|| {
        format!(
            "The file with techs {} can not be read. Use --techs-file option",
            options.techs_file.display()
        )
    })?;

    let batches = if options.infiles.is_empty() {
        let urls = lines::read_good_lines(io::stdin().lock())
            .context("Failed to read urls from stdin")?;
        vec![(PathBuf::from("-"), urls)]
    } else {
        lines::read_url_files(&options.infiles)?
    };

    let errors_out = File::create(&options.errors_file).with_context(|| {
        format!("Can not open {} for writing", options.errors_file.display())
    })?;
    let results_out: Box<dyn Write + Send> = if options.outfile == "-" {
        Box::new(io::stdout())
    } else {
        let file = File::create(&options.outfile)
            .with_context(|| format!("Can not open {} for writing", options.outfile))?;
        Box::new(file)
    };

    let archive = match &options.save_pages_to {
        Some(dir) => {
            let archive = PageArchive::new(dir)?;
            info!(dir = %archive.dir().display(), "saving fetched pages");
            Some(Arc::new(archive))
        }
        None => None,
    };

    let mut pipeline = Pipeline::start(
        options.config,
        registry(archive),
        Arc::new(HttpSource::new()?),
        Arc::new(vocabulary),
        results_out,
        Box::new(errors_out),
    );

    // Several input files are processed one after another by the same workers
    for (path, urls) in batches {
        pipeline.run(urls).await;
        info!(file = %path.display(), "finished processing urls");
    }

    let summary = pipeline.close().await?;
    info!(
        results = summary.results,
        failures = summary.failures,
        "extraction done"
    );
    Ok(0)
}

// Handles the 'apply' subcommand
//
// Prints url, company, techs and site on separate lines, or the reason the
// page yielded nothing.
fn handle_apply(host: &str, html_file: &Path, url: Option<String>, techs_file: &Path) -> Result<i32> {
    let vocabulary = Vocabulary::load(techs_file)?;
    let body = fs::read_to_string(html_file)
        .with_context(|| format!("Can not read {}", html_file.display()))?;
    let url = url.unwrap_or_else(|| format!("https://{}/", host));

    let extractor = registry(None).for_host(host);
    match extractor.extract(&url, &body, &vocabulary) {
        Ok(record) => {
            println!("{}", record.url);
            println!("{}", record.company);
            println!("{}", record.techs.join(", "));
            println!("{}", record.site);
            Ok(0)
        }
        Err(reason) => {
            println!("{}", reason);
            Ok(1)
        }
    }
}

// Handles the 'newton' subcommand
//
// Looks for the Newton Software iframe on a careers page and prints the
// company's jobs as "title<TAB>url". Returns 1 when the page has no iframe.
async fn handle_newton(url: &str, save_pages_to: Option<&Path>) -> Result<i32> {
    let archive = save_pages_to.map(PageArchive::new).transpose()?;
    let source = HttpSource::new()?;

    let page = source
        .fetch(url)
        .await
        .with_context(|| format!("Can not fetch {}", url))?;
    if let Some(archive) = &archive {
        archive.save(url, &page, None);
    }

    let Some(client_id) = newton_client_id(&page) else {
        println!("the page does not contain the Newton Software block");
        return Ok(1);
    };
    info!(client_id = %client_id, "found Newton Software jobs");

    let jobs_url = newton_jobs_url(&client_id);
    let listing = source
        .fetch(&jobs_url)
        .await
        .with_context(|| format!("Can not fetch {}", jobs_url))?;
    if let Some(archive) = &archive {
        archive.save(&jobs_url, &listing, None);
    }

    for (title, job_url) in newton_job_listings(&jobs_url, &listing) {
        println!("{}\t{}", title, job_url);
    }
    Ok(0)
}
