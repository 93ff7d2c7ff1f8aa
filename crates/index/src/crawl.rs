//! Breadth-first crawl of a repository's directory listings.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashSet;
use exn::ResultExt;
use mvnx_extract::METADATA_FILE;
use mvnx_extract::models::Artifact;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::extractors::LinkExtractor;
use crate::indexer::IndexerHandle;
use crate::progress::{MultipleArtifactIndexer, Progress, ProgressStream, Reporter, Tally, progress_stream};
use crate::{CRAWL_PARALLELISM, POLL_INTERVAL};

/// Indexes every artifact under a repository directory.
///
/// A directory whose listing links to `maven-metadata.xml` is an artifact:
/// its path relative to the repository root gives the coordinates, and it is
/// not descended into. Any other directory has its subdirectories queued.
/// Every URL is fetched at most once per run.
///
/// The run ends once the queue is empty and no worker is busy, which is
/// checked every poll interval.
#[derive(Clone)]
pub struct CrawlEngine {
    links: LinkExtractor,
    indexer: IndexerHandle,
    host: String,
    path: String,
    parallelism: usize,
    poll_interval: Duration,
}

impl CrawlEngine {
    /// Crawl the whole repository at `host`, which must end in `/`.
    pub fn new(links: LinkExtractor, indexer: IndexerHandle, host: impl Into<String>) -> Self {
        Self {
            links,
            indexer,
            host: host.into(),
            path: String::new(),
            parallelism: CRAWL_PARALLELISM,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Start from a directory below the root instead, e.g. `io/ktor/`.
    /// Coordinates are still derived relative to the root.
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        let path = path.as_ref().trim_matches('/');
        self.path = if path.is_empty() { String::new() } else { format!("{path}/") };
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[instrument(skip_all, fields(root = %format!("{}{}", self.host, self.path), parallelism = self.parallelism))]
    async fn run(self, reporter: Reporter) -> Result<Progress> {
        reporter.report(Progress::simple(0, None));
        let root = format!("{}{}", self.host, self.path);
        let crawl = Arc::new(Crawl {
            links: self.links,
            indexer: self.indexer,
            host: self.host,
            frontier: Frontier::default(),
            visited: DashSet::new(),
            tally: Tally::default(),
            reporter,
        });
        crawl.visited.insert(root.clone());
        crawl.frontier.push(root);

        let mut workers = JoinSet::new();
        for _ in 0..self.parallelism {
            workers.spawn(Arc::clone(&crawl).work());
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if crawl.frontier.close_if_idle() {
                break;
            }
            let (queued, active) = crawl.frontier.load();
            tracing::info!(
                queued,
                active,
                visited = crawl.visited.len(),
                indexed = crawl.tally.successes(),
                "Crawling"
            );
        }

        while let Some(joined) = workers.join_next().await {
            joined.or_raise(|| ErrorKind::Interrupted)?;
        }
        let result = crawl.tally.result();
        tracing::info!(visited = crawl.visited.len(), ?result, "Crawl finished");
        Ok(result)
    }
}

impl MultipleArtifactIndexer for CrawlEngine {
    fn index(&self) -> ProgressStream {
        let engine = self.clone();
        progress_stream(move |reporter| engine.run(reporter))
    }
}

/// State shared by the workers of one run.
struct Crawl {
    links: LinkExtractor,
    indexer: IndexerHandle,
    host: String,
    frontier: Frontier,
    visited: DashSet<String>,
    tally: Tally,
    reporter: Reporter,
}

impl Crawl {
    async fn work(self: Arc<Self>) {
        while let Some(claim) = self.frontier.pop().await {
            self.visit(&claim.url).await;
        }
    }

    async fn visit(&self, url: &str) {
        let links = match self.links.extract(url).await {
            Ok(links) => links,
            Err(err) => {
                tracing::warn!(url, error = %*err, "Could not list directory");
                self.tally.error();
                return;
            },
        };

        if links.iter().any(|link| link.ends_with(METADATA_FILE)) {
            let path = url.strip_prefix(self.host.as_str()).unwrap_or(url);
            let Some(artifact) = Artifact::from_repository_path(path) else {
                tracing::debug!(url, "Skipping metadata outside of an artifact directory");
                return;
            };
            match self.indexer.index_artifact(&artifact).await {
                Ok(_) => {
                    self.tally.success();
                },
                Err(err) => {
                    tracing::warn!(%artifact, error = %*err, "Could not index artifact");
                    self.tally.error();
                },
            }
            self.reporter.report(Progress::simple(self.tally.successes(), None));
            return;
        }

        for link in links.iter().filter(|link| link.ends_with('/')) {
            let child = format!("{url}{link}");
            if self.visited.insert(child.clone()) {
                self.frontier.push(child);
            }
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<String>,
    active: usize,
    closed: bool,
}

/// Work queue that knows how many popped URLs are still being visited.
#[derive(Debug, Default)]
struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, url: String) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.queue.push_back(url);
        }
        self.notify.notify_one();
    }

    /// Wait for the next URL, or `None` once the frontier is closed.
    async fn pop(&self) -> Option<Claim<'_>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before looking, so a push in between isn't missed.
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if let Some(url) = state.queue.pop_front() {
                    state.active += 1;
                    return Some(Claim { frontier: self, url });
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the frontier if there is nothing queued and nothing in flight,
    /// waking every idle worker so it can exit.
    fn close_if_idle(&self) -> bool {
        {
            let mut state = self.lock();
            if !state.queue.is_empty() || state.active > 0 {
                return false;
            }
            state.closed = true;
        }
        self.notify.notify_waiters();
        true
    }

    /// Queued and in-flight URL counts.
    fn load(&self) -> (usize, usize) {
        let state = self.lock();
        (state.queue.len(), state.active)
    }
}

/// A popped URL. Counts as in flight until dropped, which covers a visit
/// that panics.
struct Claim<'a> {
    frontier: &'a Frontier,
    url: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.frontier.lock().active -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ArtifactIndexer;
    use async_trait::async_trait;
    use futures::StreamExt;
    use mvnx_extract::models::VersionMetadata;
    use mvnx_fetch::{FetcherHandle, MockFetcher};
    use rstest::rstest;
    use std::collections::HashSet;

    const HOST: &str = "https://repo.example/maven2/";

    /// Records what it was asked to index, failing for selected artifacts.
    #[derive(Default)]
    struct RecordingIndexer {
        indexed: Mutex<Vec<Artifact>>,
        failing: HashSet<Artifact>,
    }

    impl RecordingIndexer {
        fn failing_for(artifact: Artifact) -> Self {
            Self {
                failing: HashSet::from([artifact]),
                ..Self::default()
            }
        }

        fn indexed(&self) -> Vec<Artifact> {
            let mut indexed = self.indexed.lock().unwrap().clone();
            indexed.sort();
            indexed
        }
    }

    #[async_trait]
    impl ArtifactIndexer for RecordingIndexer {
        async fn index_artifact(&self, artifact: &Artifact) -> Result<VersionMetadata> {
            if self.failing.contains(artifact) {
                exn::bail!(ErrorKind::Fetch);
            }
            self.indexed.lock().unwrap().push(artifact.clone());
            Ok(VersionMetadata::default())
        }
    }

    fn listing(links: &[&str]) -> String {
        std::iter::once(r#"<a href="../">../</a>"#.to_string())
            .chain(links.iter().map(|link| format!(r#"<a href="{link}">{link}</a>"#)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn repository() -> MockFetcher {
        let pages = [
            ("", listing(&["com/", "io/", "single/", "archetype-catalog.xml"])),
            ("com/", listing(&["example/"])),
            ("com/example/", listing(&["lib/", "other/"])),
            ("com/example/lib/", listing(&["1.0.0/", "1.1.0/", "maven-metadata.xml"])),
            ("com/example/other/", listing(&["2.0/", "maven-metadata.xml", "maven-metadata.xml.sha1"])),
            ("io/", listing(&["ktor/"])),
            ("io/ktor/", listing(&["ktor-io/", "ktor-http/"])),
            ("io/ktor/ktor-io/", listing(&["maven-metadata.xml"])),
            ("io/ktor/ktor-http/", listing(&["3.0.0/", "maven-metadata.xml"])),
            ("single/", listing(&["maven-metadata.xml"])),
        ];
        MockFetcher::with_pages(pages.into_iter().map(|(path, body)| (format!("{HOST}{path}"), body)))
    }

    fn engine(fetcher: &Arc<MockFetcher>, indexer: &Arc<RecordingIndexer>) -> CrawlEngine {
        let fetcher: FetcherHandle = Arc::clone(fetcher) as FetcherHandle;
        let indexer: IndexerHandle = Arc::clone(indexer) as IndexerHandle;
        CrawlEngine::new(LinkExtractor::new(fetcher), indexer, HOST).with_poll_interval(Duration::from_millis(5))
    }

    async fn collect(stream: ProgressStream) -> Vec<Progress> {
        stream.map(|event| event.unwrap()).collect().await
    }

    #[rstest]
    #[case::sequential(1, None)]
    #[case::sequential_slow(1, Some(Duration::from_millis(2)))]
    #[case::parallel(256, None)]
    #[case::parallel_slow(256, Some(Duration::from_millis(2)))]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn indexes_every_artifact_once(#[case] parallelism: usize, #[case] delay: Option<Duration>) {
        let mut fetcher = repository();
        if let Some(delay) = delay {
            fetcher = fetcher.with_delay(delay);
        }
        let fetcher = Arc::new(fetcher);
        let indexer = Arc::new(RecordingIndexer::default());

        let events = collect(engine(&fetcher, &indexer).with_parallelism(parallelism).index()).await;

        assert_eq!(
            indexer.indexed(),
            vec![
                Artifact::new("com.example", "lib"),
                Artifact::new("com.example", "other"),
                Artifact::new("io.ktor", "ktor-http"),
                Artifact::new("io.ktor", "ktor-io"),
            ]
        );
        assert_eq!(events.iter().filter(|event| event.is_result()).count(), 1);
        assert_eq!(
            events.last(),
            Some(&Progress::Result {
                success_count: 4,
                error_count: 0
            })
        );
    }

    #[tokio::test]
    async fn never_descends_into_artifacts_or_refetches() {
        let fetcher = Arc::new(repository());
        let indexer = Arc::new(RecordingIndexer::default());
        collect(engine(&fetcher, &indexer).with_parallelism(8).index()).await;

        let requests = fetcher.requests().await;
        let unique: HashSet<&String> = requests.iter().collect();
        assert_eq!(unique.len(), requests.len());
        assert!(!requests.iter().any(|url| url.ends_with("1.0.0/")));
        assert!(!requests.iter().any(|url| url.ends_with("3.0.0/")));
    }

    #[tokio::test]
    async fn counts_listing_and_indexing_failures() {
        let fetcher = Arc::new(repository().with_failure(format!("{HOST}io/ktor/")));
        let indexer = Arc::new(RecordingIndexer::failing_for(Artifact::new("com.example", "other")));

        let events = collect(engine(&fetcher, &indexer).index()).await;

        assert_eq!(indexer.indexed(), vec![Artifact::new("com.example", "lib")]);
        assert_eq!(
            events.last(),
            Some(&Progress::Result {
                success_count: 1,
                error_count: 2
            })
        );
    }

    #[tokio::test]
    async fn crawls_a_single_group() {
        let fetcher = Arc::new(repository());
        let indexer = Arc::new(RecordingIndexer::default());

        let events = collect(engine(&fetcher, &indexer).with_path("/io/ktor").index()).await;

        assert_eq!(
            indexer.indexed(),
            vec![Artifact::new("io.ktor", "ktor-http"), Artifact::new("io.ktor", "ktor-io")]
        );
        assert_eq!(
            events.last(),
            Some(&Progress::Result {
                success_count: 2,
                error_count: 0
            })
        );
        assert!(!fetcher.requests().await.iter().any(|url| url.contains("com/")));
    }

    #[tokio::test]
    async fn unreachable_root_ends_with_one_error() {
        let fetcher = Arc::new(MockFetcher::default());
        let indexer = Arc::new(RecordingIndexer::default());
        let events = collect(engine(&fetcher, &indexer).index()).await;
        assert_eq!(
            events.last(),
            Some(&Progress::Result {
                success_count: 0,
                error_count: 1
            })
        );
    }

    #[tokio::test]
    async fn reports_progress_after_failed_artifacts() {
        let fetcher: FetcherHandle = Arc::new(repository());
        let indexer: IndexerHandle = Arc::new(RecordingIndexer::failing_for(Artifact::new("io.ktor", "ktor-io")));
        let (reporter, mut updates) = Reporter::detached();
        let crawl = Crawl {
            links: LinkExtractor::new(fetcher),
            indexer,
            host: HOST.to_string(),
            frontier: Frontier::default(),
            visited: DashSet::new(),
            tally: Tally::default(),
            reporter,
        };

        crawl.visit(&format!("{HOST}io/ktor/ktor-io/")).await;
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), Some(Progress::simple(0, None)));

        crawl.visit(&format!("{HOST}io/ktor/ktor-http/")).await;
        assert_eq!(*updates.borrow_and_update(), Some(Progress::simple(1, None)));
        assert_eq!(
            crawl.tally.result(),
            Progress::Result {
                success_count: 1,
                error_count: 1
            }
        );
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_the_crawl() {
        let groups: Vec<String> = (0..200).map(|group| format!("group{group}/")).collect();
        let links: Vec<&str> = groups.iter().map(String::as_str).collect();
        let fetcher = groups.iter().fold(
            MockFetcher::with_pages([(HOST.to_string(), listing(&links))]).with_delay(Duration::from_millis(20)),
            |fetcher, group| fetcher.with_page(format!("{HOST}{group}"), listing(&[])),
        );
        let fetcher = Arc::new(fetcher);
        let indexer = Arc::new(RecordingIndexer::default());

        let mut stream = engine(&fetcher, &indexer).with_parallelism(4).index();
        let drained = tokio::time::timeout(Duration::from_millis(60), async {
            while stream.next().await.is_some() {}
        })
        .await;
        assert!(drained.is_err(), "crawl finished before it could be cancelled");
        drop(stream);

        // Let the aborted tasks unwind before taking the baseline.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let at_drop = fetcher.requests().await.len();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let later = fetcher.requests().await.len();

        assert!(at_drop > 0);
        assert_eq!(later, at_drop);
        assert!(later < groups.len());
    }

    #[tokio::test]
    async fn idle_frontier_closes_and_releases_workers() {
        let frontier = Frontier::default();
        frontier.push("a".to_string());
        let claim = frontier.pop().await.unwrap();
        assert!(!frontier.close_if_idle());
        drop(claim);
        assert!(frontier.close_if_idle());
        assert!(frontier.pop().await.is_none());
        frontier.push("b".to_string());
        assert_eq!(frontier.load(), (0, 0));
    }
}
