// src/pipeline/controller.rs
// =============================================================================
// Builds the worker graph, feeds it and shuts it down.
//
// Startup:
//   one worker per site extractor (throttled) + one default worker
//   (unthrottled), a results writer and a failures writer
//
// Shutdown happens in two phases:
// 1. every worker gets its sentinel and we wait until it is Stopped
// 2. only then do the two writers get their sentinel; we wait for them to
//    flush and report how many lines they wrote
//
// Because the producers are all gone before the writers are told to stop,
// no record can arrive after its destination was closed.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::info;

use super::router::Router;
use super::sink::{channel, spawn_writer, Sink};
use crate::extract::ExtractorRegistry;
use crate::fetch::{FetchWorker, PageSource, WorkerConfig};
use crate::terms::Vocabulary;
use crate::types::{Failure, JobRecord};

pub const DEFAULT_WORKER: &str = "default";

// How the results destination is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    /// `url | company | tech1, tech2 | site`
    #[default]
    Text,
    /// One JSON object per line
    JsonLines,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Concurrent URLs per worker
    pub pool_size: usize,
    /// Request ceiling of every site worker, 0 = unthrottled
    pub site_max_rps: f64,
    /// Request ceiling of the default worker, 0 = unthrottled
    pub default_max_rps: f64,
    pub format: ResultFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            site_max_rps: 3.0,
            default_max_rps: 0.0,
            format: ResultFormat::Text,
        }
    }
}

impl PipelineConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_site_max_rps(mut self, max_rps: f64) -> Self {
        self.site_max_rps = max_rps;
        self
    }

    pub fn with_default_max_rps(mut self, max_rps: f64) -> Self {
        self.default_max_rps = max_rps;
        self
    }

    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }
}

// Line counts reported by the writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub results: usize,
    pub failures: usize,
}

pub struct Pipeline {
    router: Router,
    results: Sink<JobRecord>,
    failures: Sink<Failure>,
    results_writer: JoinHandle<Result<usize>>,
    failures_writer: JoinHandle<Result<usize>>,
    submitted: usize,
    started: Instant,
}

impl Pipeline {
    // Builds and starts every worker and both writers
    //
    // Must be called from inside a tokio runtime.
    pub fn start(
        config: PipelineConfig,
        registry: ExtractorRegistry,
        source: Arc<dyn PageSource>,
        vocabulary: Arc<Vocabulary>,
        results_out: Box<dyn Write + Send>,
        failures_out: Box<dyn Write + Send>,
    ) -> Self {
        let (results, results_rx) = channel();
        let (failures, failures_rx) = channel();

        let make_worker = |name: &str, extractor, max_rps| {
            Arc::new(FetchWorker::new(
                name,
                extractor,
                source.clone(),
                vocabulary.clone(),
                results.clone(),
                failures.clone(),
                WorkerConfig {
                    pool_size: config.pool_size,
                    max_rps,
                },
            ))
        };

        let mut workers = HashMap::new();
        for extractor in &registry.sites {
            let Some(host) = extractor.host() else {
                continue;
            };
            let worker = make_worker(host, extractor.clone(), config.site_max_rps);
            workers.insert(host.to_string(), worker);
        }
        let default = make_worker(DEFAULT_WORKER, registry.default.clone(), config.default_max_rps);
        let router = Router::new(workers, default);

        for worker in router.workers() {
            worker.start();
        }

        let format = config.format;
        let results_writer = spawn_writer(results_rx, results_out, move |record: &JobRecord| {
            match format {
                ResultFormat::Text => Ok(record.to_string()),
                ResultFormat::JsonLines => Ok(serde_json::to_string(record)?),
            }
        });
        let failures_writer =
            spawn_writer(failures_rx, failures_out, |failure: &Failure| Ok(failure.to_string()));

        info!(
            workers = router.workers().count(),
            pool_size = config.pool_size,
            site_max_rps = config.site_max_rps,
            "pipeline started"
        );

        Self {
            router,
            results,
            failures,
            results_writer,
            failures_writer,
            submitted: 0,
            started: Instant::now(),
        }
    }

    // Hands one URL to the worker of its host
    pub fn submit(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.router.route(&url).submit(url);
        self.submitted += 1;
    }

    // Submits a batch of URLs and waits until each one has an outcome
    //
    // The workers stay up, so run() can be called again with more input.
    pub async fn run<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            self.submit(url);
        }
        join_all(self.router.workers().map(|worker| worker.join())).await;
    }

    // Two-phase shutdown, see the top of this file
    pub async fn close(self) -> Result<Summary> {
        join_all(self.router.workers().map(|worker| worker.stop())).await;

        self.results.close();
        self.failures.close();

        let results = self
            .results_writer
            .await
            .map_err(|e| anyhow!("results writer crashed: {}", e))?
            .context("Failed to write results")?;
        let failures = self
            .failures_writer
            .await
            .map_err(|e| anyhow!("failures writer crashed: {}", e))?
            .context("Failed to write failed urls")?;

        info!(
            submitted = self.submitted,
            results,
            failures,
            elapsed_secs = self.started.elapsed().as_secs_f64(),
            "pipeline finished"
        );

        Ok(Summary { results, failures })
    }
}
