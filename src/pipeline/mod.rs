// src/pipeline/mod.rs
// =============================================================================
// The domain-routed pipeline.
//
// Submodules:
// - sink: shared result/failure channels and their writers
// - router: host -> worker lookup
// - controller: startup, submission and two-phase shutdown
//
// Typical use:
//   let mut pipeline = Pipeline::start(config, registry, source, vocabulary, out, errors);
//   pipeline.run(urls).await;
//   let summary = pipeline.close().await?;
// =============================================================================

mod controller;
mod router;
pub mod sink;

pub use controller::{Pipeline, PipelineConfig, ResultFormat};
pub use sink::Sink;
