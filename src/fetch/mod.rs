// src/fetch/mod.rs
// =============================================================================
// Fetching pages.
//
// Submodules:
// - queue: joinable FIFO work queue with an in-band sentinel
// - limiter: per-worker minimum interval between requests
// - source: where page bodies come from (reqwest in production)
// - worker: queue + limiter + task pool, feeding the output sinks
// =============================================================================

mod limiter;
mod queue;
mod source;
mod worker;

pub use queue::Envelope;
pub use source::{HttpSource, PageSource};
pub use worker::{FetchWorker, WorkerConfig};
