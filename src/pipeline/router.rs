// src/pipeline/router.rs
// =============================================================================
// Picks the worker responsible for a URL.
//
// The routing key is the URL's host (with the port, if any). Hosts that
// have a site extractor have their own worker; everything else, including
// URLs that do not parse, goes to the default worker. The table is fixed
// when the router is built.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::extract::netloc;
use crate::fetch::FetchWorker;

pub struct Router {
    workers: HashMap<String, Arc<FetchWorker>>,
    default: Arc<FetchWorker>,
}

impl Router {
    pub fn new(workers: HashMap<String, Arc<FetchWorker>>, default: Arc<FetchWorker>) -> Self {
        Self { workers, default }
    }

    pub fn route(&self, url: &str) -> &Arc<FetchWorker> {
        host_key(url)
            .and_then(|host| self.workers.get(&host))
            .unwrap_or(&self.default)
    }

    // Every worker once, the default worker last
    pub fn workers(&self) -> impl Iterator<Item = &Arc<FetchWorker>> {
        self.workers.values().chain(std::iter::once(&self.default))
    }
}

fn host_key(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|parsed| netloc(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::registry;
    use crate::fetch::{HttpSource, WorkerConfig};
    use crate::pipeline::sink::channel;
    use crate::terms::Vocabulary;

    fn worker(name: &str) -> Arc<FetchWorker> {
        let registry = registry(None);
        let (results, _) = channel();
        let (failures, _) = channel();
        Arc::new(FetchWorker::new(
            name,
            registry.default,
            Arc::new(HttpSource::new().unwrap()),
            Arc::new(Vocabulary::default()),
            results,
            failures,
            WorkerConfig { pool_size: 1, max_rps: 0.0 },
        ))
    }

    fn router() -> Router {
        let mut workers = HashMap::new();
        workers.insert("boards.greenhouse.io".to_string(), worker("greenhouse"));
        workers.insert("localhost:8080".to_string(), worker("local"));
        Router::new(workers, worker("default"))
    }

    #[test]
    fn test_mapped_host() {
        let router = router();
        let url = "https://boards.greenhouse.io/embed/job_app?for=acme&token=1";
        assert_eq!(router.route(url).name(), "greenhouse");
    }

    #[test]
    fn test_port_is_part_of_the_key() {
        let router = router();
        assert_eq!(router.route("http://localhost:8080/jobs").name(), "local");
        assert_eq!(router.route("http://localhost/jobs").name(), "default");
    }

    #[test]
    fn test_unmapped_and_invalid_urls_go_to_default() {
        let router = router();
        assert_eq!(router.route("https://www.example.com/careers").name(), "default");
        assert_eq!(router.route("greenhouse.io without scheme").name(), "default");
        assert_eq!(router.route("").name(), "default");
    }

    #[test]
    fn test_workers_lists_default_last() {
        let router = router();
        let names: Vec<&str> = router.workers().map(|w| w.name()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names.last(), Some(&"default"));
    }
}
