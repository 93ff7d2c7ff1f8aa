//! Command execution against a configured index.

use std::io::Write;
use std::sync::Arc;

use exn::ResultExt;
use futures::StreamExt;
use mvnx_cache::ArtifactStore;
use mvnx_config::Config;
use mvnx_extract::is_kmp_variant_of;
use mvnx_extract::models::{Artifact, group_index_path};
use mvnx_fetch::{FetchOptions, FetcherHandle, HttpFetcher};
use mvnx_index::{
    ArtifactIndexer, BulkListIndexer, CrawlEngine, IndexerHandle, KmpTargetsExtractor, LinkExtractor,
    MetadataExtractor, MultipleArtifactIndexer, RefreshIndexer, SingleArtifactIndexer,
};
use tracing::instrument;

use crate::cli::Command;
use crate::error::{ErrorKind, Result};
use crate::render::ProgressRenderer;

/// Open the index described by `config`, run `command` against it and close
/// it again.
pub async fn run(config: Config, command: Command) -> Result<()> {
    if let Some(parent) = config.database.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Store)?;
    }
    let store = Arc::new(ArtifactStore::new(&config.database));
    store.initialize().await.or_raise(|| ErrorKind::Store)?;
    let outcome = match App::new(config, Arc::clone(&store)) {
        Ok(app) => app.execute(command, &mut std::io::stdout().lock()).await,
        Err(err) => Err(err),
    };
    store.close().await;
    outcome
}

struct App {
    config: Config,
    store: Arc<ArtifactStore>,
    fetcher: FetcherHandle,
}

impl App {
    fn new(config: Config, store: Arc<ArtifactStore>) -> Result<Self> {
        let options = FetchOptions {
            connect_timeout: config.http.connect_timeout(),
            request_timeout: config.http.request_timeout(),
            retries: config.http.retries,
            backoff: config.http.backoff(),
        };
        let fetcher: FetcherHandle = Arc::new(HttpFetcher::new(options).or_raise(|| ErrorKind::Client)?);
        Ok(Self::with_fetcher(config, store, fetcher))
    }

    fn with_fetcher(config: Config, store: Arc<ArtifactStore>, fetcher: FetcherHandle) -> Self {
        Self { config, store, fetcher }
    }

    fn host(&self) -> &str {
        &self.config.repository.host
    }

    fn links(&self) -> LinkExtractor {
        LinkExtractor::new(Arc::clone(&self.fetcher))
    }

    fn indexer(&self) -> Arc<SingleArtifactIndexer> {
        let metadata = MetadataExtractor::new(Arc::clone(&self.fetcher), self.host());
        Arc::new(SingleArtifactIndexer::new(metadata, Arc::clone(&self.store)))
    }

    fn crawl(&self) -> CrawlEngine {
        CrawlEngine::new(self.links(), self.indexer() as IndexerHandle, self.host())
            .with_parallelism(self.config.index.crawl_parallelism)
            .with_poll_interval(self.config.index.poll_interval())
    }

    #[instrument(skip(self, out))]
    async fn execute(&self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Index => self.index_many(&self.crawl(), "repository", out).await,
            Command::IndexGroup { group } => {
                let crawl = self.crawl().with_path(group_index_path(&group));
                self.index_many(&crawl, &group, out).await
            },
            Command::IndexArtifact { artifact } => self.index_one(&artifact, out).await,
            Command::IndexCsv { path } => {
                let kmp = KmpTargetsExtractor::new(self.links(), self.host());
                let bulk = BulkListIndexer::new(&path, kmp, self.indexer() as IndexerHandle)
                    .with_parallelism(self.config.index.bulk_parallelism);
                self.index_many(&bulk, &path.display().to_string(), out).await
            },
            Command::Refresh => {
                let refresh = RefreshIndexer::new(Arc::clone(&self.store), self.indexer() as IndexerHandle)
                    .with_parallelism(self.config.index.refresh_parallelism)
                    .with_chunk_size(self.config.index.refresh_chunk_size);
                self.index_many(&refresh, "stored artifacts", out).await
            },
            Command::Search { query, limit } => {
                self.search(&query, limit.unwrap_or(self.config.search.limit), out).await
            },
            Command::Targets { artifact } => self.targets(&artifact, out).await,
            Command::Versions { artifact } => self.versions(&artifact, out).await,
        }
    }

    async fn index_many(&self, indexer: &impl MultipleArtifactIndexer, label: &str, out: &mut impl Write) -> Result<()> {
        writeln!(out, "Start artifacts indexing...").or_raise(|| ErrorKind::Output)?;
        let mut renderer = ProgressRenderer::new(out);
        let mut stream = indexer.index();
        while let Some(progress) = stream.next().await {
            let progress = progress.or_raise(|| ErrorKind::Index(label.to_string()))?;
            renderer.render(&progress).or_raise(|| ErrorKind::Output)?;
        }
        Ok(())
    }

    async fn index_one(&self, artifact: &Artifact, out: &mut impl Write) -> Result<()> {
        let metadata = self
            .indexer()
            .index_artifact(artifact)
            .await
            .or_raise(|| ErrorKind::Index(artifact.to_string()))?;
        let written = match metadata.release_version {
            Some(release) => writeln!(out, "Artifact successfully indexed! Last release version: {artifact}:{release}"),
            None => writeln!(out, "Artifact successfully indexed! No release version is published."),
        };
        written.or_raise(|| ErrorKind::Output)
    }

    async fn search(&self, query: &str, limit: u32, out: &mut impl Write) -> Result<()> {
        let results = self.store.search_artifacts(query, limit).await.or_raise(|| ErrorKind::Store)?;
        if results.is_empty() {
            writeln!(out, "No artifacts found for '{query}'").or_raise(|| ErrorKind::Output)?;
        }
        for (index, result) in results.iter().enumerate() {
            writeln!(out, "{:02}. {result}", index + 1).or_raise(|| ErrorKind::Output)?;
        }
        Ok(())
    }

    async fn targets(&self, artifact: &Artifact, out: &mut impl Write) -> Result<()> {
        let mut targets: Vec<Artifact> = self
            .store
            .get_artifact_targets(artifact)
            .await
            .or_raise(|| ErrorKind::Store)?
            .into_iter()
            .filter(|target| is_kmp_variant_of(&target.artifact_id, artifact))
            .collect();
        if targets.is_empty() {
            return writeln!(out, "No Kotlin Multiplatform Targets found for '{artifact}'").or_raise(|| ErrorKind::Output);
        }
        targets.sort();
        writeln!(out, "All Kotlin Multiplatform Targets for '{artifact}': ").or_raise(|| ErrorKind::Output)?;
        for target in targets {
            writeln!(out, "* {target}").or_raise(|| ErrorKind::Output)?;
        }
        Ok(())
    }

    async fn versions(&self, artifact: &Artifact, out: &mut impl Write) -> Result<()> {
        let metadata = self.store.get_artifact_versions(artifact).await.or_raise(|| ErrorKind::Store)?;
        if metadata.versions.is_empty() {
            return writeln!(out, "No versions found for {artifact}").or_raise(|| ErrorKind::Output);
        }
        writeln!(out, "All Versions for '{artifact}': ").or_raise(|| ErrorKind::Output)?;
        for version in metadata.sorted_descending() {
            let written = match metadata.annotation(version) {
                Some(annotation) => writeln!(out, "* {version} ({annotation})"),
                None => writeln!(out, "* {version}"),
            };
            written.or_raise(|| ErrorKind::Output)?;
        }
        Ok(())
    }
}
