// src/fetch/worker.rs
// =============================================================================
// A fetch worker: one input queue, one rate limiter, a pool of tasks.
//
// Lifecycle:  Idle --start()--> Running --sentinel--> Draining --stop()--> Stopped
//
// How it works:
// 1. A dispatcher task takes URLs off the queue in FIFO order
// 2. Each URL gets a slot in the pool (a semaphore with `pool_size`
//    permits) and is processed by its own task:
//    rate limiter -> fetch -> extractor -> result or failure sink
// 3. When the dispatcher takes the sentinel it stops taking work and
//    waits for the tasks still running
//
// Every URL is acknowledged on the queue exactly once, after its outcome
// has been pushed, whether it succeeded, failed or panicked. Nothing that
// goes wrong with one URL reaches the other URLs of the worker.
// =============================================================================

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::limiter::RateLimiter;
use super::queue::{Envelope, JoinableQueue, TaskDone};
use super::source::PageSource;
use crate::extract::PageExtractor;
use crate::pipeline::Sink;
use crate::terms::Vocabulary;
use crate::types::{Failure, JobRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

// Largest pool a worker accepts; bigger requests are clamped to it
pub const MAX_POOL_SIZE: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerConfig {
    /// Number of URLs processed at the same time
    pub pool_size: usize,
    /// Request ceiling, 0 = unthrottled
    pub max_rps: f64,
}

// Everything the per-URL tasks need, shared behind an Arc
struct Shared {
    name: String,
    extractor: Arc<dyn PageExtractor>,
    source: Arc<dyn PageSource>,
    vocabulary: Arc<Vocabulary>,
    limiter: RateLimiter,
    results: Sink<JobRecord>,
    failures: Sink<Failure>,
    queue: Arc<JoinableQueue<String>>,
    state: Mutex<WorkerState>,
}

pub struct FetchWorker {
    shared: Arc<Shared>,
    pool_size: u32,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl FetchWorker {
    pub fn new(
        name: impl Into<String>,
        extractor: Arc<dyn PageExtractor>,
        source: Arc<dyn PageSource>,
        vocabulary: Arc<Vocabulary>,
        results: Sink<JobRecord>,
        failures: Sink<Failure>,
        config: WorkerConfig,
    ) -> Self {
        let shared = Shared {
            name: name.into(),
            extractor,
            source,
            vocabulary,
            limiter: RateLimiter::new(config.max_rps),
            results,
            failures,
            queue: Arc::new(JoinableQueue::new()),
            state: Mutex::new(WorkerState::Idle),
        };
        let pool_size = u32::try_from(config.pool_size)
            .unwrap_or(u32::MAX)
            .clamp(1, MAX_POOL_SIZE);
        if pool_size as usize != config.pool_size {
            warn!(
                worker = %shared.name,
                requested = config.pool_size,
                pool_size,
                "pool size out of range, clamped"
            );
        }
        Self {
            shared: Arc::new(shared),
            pool_size,
            dispatcher: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[cfg(test)]
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    // Number of URLs submitted but not yet finished
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.shared.queue.unfinished()
    }

    // Starts the dispatcher; a second call is a no-op
    //
    // Must be called from inside a tokio runtime.
    pub fn start(&self) {
        let mut dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        if dispatcher.is_some() {
            return;
        }
        self.shared.set_state(WorkerState::Running);
        info!(
            worker = %self.shared.name,
            pool_size = self.pool_size,
            throttled = self.shared.limiter.is_throttled(),
            "worker started"
        );
        *dispatcher = Some(tokio::spawn(dispatch(self.shared.clone(), self.pool_size)));
    }

    pub fn submit(&self, url: impl Into<String>) {
        self.shared.queue.put(url.into());
    }

    // Waits until every URL submitted so far has an outcome
    pub async fn join(&self) {
        self.shared.queue.join().await;
    }

    // Sends the sentinel and waits for the worker to finish everything
    // queued before it
    pub async fn stop(&self) {
        self.shared.queue.put_stop();
        self.shared.queue.join().await;

        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                error!(worker = %self.shared.name, error = %e, "dispatcher task failed");
            }
        }

        self.shared.set_state(WorkerState::Stopped);
        info!(worker = %self.shared.name, "worker stopped");
    }
}

// The dispatcher loop of one worker
async fn dispatch(shared: Arc<Shared>, pool_size: u32) {
    let pool = Arc::new(Semaphore::new(pool_size as usize));

    loop {
        let envelope = shared.queue.get().await;
        let done = TaskDone::new(shared.queue.clone());

        let url = match envelope {
            Envelope::Item(url) => url,
            Envelope::Stop => {
                debug!(worker = %shared.name, "sentinel received");
                shared.set_state(WorkerState::Draining);
                break;
            }
        };

        // The semaphore is never closed
        let Ok(permit) = pool.clone().acquire_owned().await else {
            break;
        };

        let task_shared = shared.clone();
        tokio::spawn(async move {
            let _slot = permit;
            let _done = done;
            task_shared.process(url).await;
        });
    }

    // Wait for the tasks still holding a slot
    if pool.acquire_many(pool_size).await.is_err() {
        warn!(worker = %shared.name, "pool closed while draining");
    }
}

impl Shared {
    #[cfg(test)]
    fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    // Produces exactly one outcome for the URL
    async fn process(&self, url: String) {
        let outcome = AssertUnwindSafe(self.fetch_and_extract(&url))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(record)) => self.results.push(record),
            Ok(Err(reason)) => self.failures.push(Failure::new(url, reason)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(worker = %self.name, url = %url, panic = %message, "uncaught panic while processing url");
                self.failures.push(Failure::new(url, message));
            }
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<JobRecord, String> {
        self.limiter.wait().await;

        let body = match self.source.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(worker = %self.name, url, reason = %reason, "fetch failed");
                return Err(reason);
            }
        };

        // HTML parsing is CPU work, keep it off the async threads
        let extractor = self.extractor.clone();
        let vocabulary = self.vocabulary.clone();
        let page_url = url.to_string();
        let extracted = tokio::task::spawn_blocking(move || {
            extractor.extract(&page_url, &body, &vocabulary)
        })
        .await;

        match extracted {
            Ok(Ok(record)) => {
                debug!(worker = %self.name, url, techs = record.techs.len(), "page extracted");
                Ok(record)
            }
            Ok(Err(reason)) => {
                warn!(worker = %self.name, url, reason = %reason, "parsing failed");
                Err(reason)
            }
            Err(join_error) => {
                let message = match join_error.try_into_panic() {
                    Ok(panic) => panic_message(panic.as_ref()),
                    Err(join_error) => join_error.to_string(),
                };
                error!(worker = %self.name, url, panic = %message, "extractor crashed");
                Err(message)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why a semaphore and not buffer_unordered?
//    - buffer_unordered needs the whole input up front; a worker queue
//      keeps receiving URLs while it runs
//    - an OwnedSemaphorePermit moves into the spawned task and frees the
//      slot when the task ends, however it ends
//
// 2. Why two places that catch panics?
//    - catch_unwind covers the async part (limiter, fetch)
//    - spawn_blocking runs the extractor on another thread; its panic comes
//      back as a JoinError instead
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sink::channel;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    // Serves "<body>{url} uses rust</body>" for every URL except those containing "down"
    struct EchoSource;

    #[async_trait]
    impl PageSource for EchoSource {
        async fn fetch(&self, url: &str) -> Result<String> {
            if url.contains("down") {
                return Err(anyhow!("HTTP 503 Service Unavailable"));
            }
            Ok(format!("<body>{} uses rust</body>", url))
        }
    }

    // Accepts pages containing "job", rejects the rest, panics on "crash"
    struct KeywordExtractor;

    impl PageExtractor for KeywordExtractor {
        fn host(&self) -> Option<&str> {
            None
        }

        fn extract(&self, url: &str, body: &str, vocabulary: &Vocabulary) -> Result<JobRecord, String> {
            if body.contains("crash") {
                panic!("extractor blew up on {}", url);
            }
            if !body.contains("job") {
                return Err("not a job".to_string());
            }
            Ok(JobRecord {
                url: url.to_string(),
                company: String::new(),
                techs: vocabulary.match_text(body),
                site: String::new(),
            })
        }
    }

    struct Harness {
        worker: FetchWorker,
        results: crate::pipeline::sink::SinkReceiver<JobRecord>,
        failures: crate::pipeline::sink::SinkReceiver<Failure>,
    }

    fn harness(config: WorkerConfig) -> Harness {
        let (results_sink, results) = channel();
        let (failures_sink, failures) = channel();
        let worker = FetchWorker::new(
            "test",
            Arc::new(KeywordExtractor),
            Arc::new(EchoSource),
            Arc::new(Vocabulary::from_lines(vec!["rust"])),
            results_sink,
            failures_sink,
            config,
        );
        Harness { worker, results, failures }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_outcome_per_url() {
        let mut h = harness(WorkerConfig { pool_size: 3, max_rps: 0.0 });
        assert_eq!(h.worker.state(), WorkerState::Idle);
        h.worker.start();
        assert_eq!(h.worker.state(), WorkerState::Running);

        h.worker.submit("https://a.example/job/rust");
        h.worker.submit("https://a.example/about");
        h.worker.submit("https://down.example/job");
        h.worker.submit("https://a.example/job/crash");
        h.worker.stop().await;
        assert_eq!(h.worker.state(), WorkerState::Stopped);
        assert_eq!(h.worker.pending(), 0);

        let results = h.results.drain_ready();
        let failures = h.failures.drain_ready();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].techs, vec!["rust"]);

        let mut reasons: Vec<(String, String)> =
            failures.into_iter().map(|f| (f.url, f.reason)).collect();
        reasons.sort();
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0].0, "https://a.example/about");
        assert_eq!(reasons[0].1, "not a job");
        assert_eq!(reasons[1].0, "https://a.example/job/crash");
        assert!(reasons[1].1.contains("extractor blew up"));
        assert_eq!(reasons[2].1, "HTTP 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_stop_without_work() {
        let h = harness(WorkerConfig { pool_size: 2, max_rps: 0.0 });
        h.worker.start();
        tokio::time::timeout(Duration::from_secs(2), h.worker.stop())
            .await
            .expect("stopping an idle worker must not hang");
        assert_eq!(h.worker.state(), WorkerState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rate_limit_bounds_throughput() {
        // 5 URLs at 10 rps take at least (5 - 1) / 10 s even with 5 slots
        let h = harness(WorkerConfig { pool_size: 5, max_rps: 10.0 });
        h.worker.start();
        let start = Instant::now();
        for i in 0..5 {
            h.worker.submit(format!("https://a.example/job/{}", i));
        }
        h.worker.join().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
        h.worker.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_join_then_more_work() {
        let mut h = harness(WorkerConfig { pool_size: 1, max_rps: 0.0 });
        h.worker.start();
        h.worker.submit("https://a.example/job/1");
        h.worker.join().await;
        h.worker.submit("https://a.example/job/2");
        h.worker.stop().await;
        assert_eq!(h.results.drain_ready().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_oversized_pool_is_clamped() {
        let mut h = harness(WorkerConfig { pool_size: usize::MAX, max_rps: 0.0 });
        assert_eq!(h.worker.pool_size, MAX_POOL_SIZE);
        h.worker.start();
        h.worker.submit("https://a.example/job/1");
        h.worker.submit("https://a.example/job/2");
        tokio::time::timeout(Duration::from_secs(5), h.worker.stop())
            .await
            .expect("a clamped pool must still drain");
        assert_eq!(h.results.drain_ready().len(), 2);

        let h = harness(WorkerConfig { pool_size: 0, max_rps: 0.0 });
        assert_eq!(h.worker.pool_size, 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
