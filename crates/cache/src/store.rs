//! The artifact store: persisted artifacts, versions and the fuzzy index.

use std::path::PathBuf;

use exn::{OptionExt, ResultExt};
use mvnx_extract::models::{Artifact, IndexedArtifact, VersionMetadata};
use sqlx::{Sqlite, Transaction};
use tokio::sync::{Mutex, OnceCell};
use tracing::instrument;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{ArtifactRow, SearchRow, VersionRow, collect_versions, truncate_version};
use crate::search::{like_prefix, normalize, trigram_query};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Persistent, fuzzy-searchable index of artifacts and their versions.
///
/// The store must be [initialized](Self::initialize) before use; every other
/// operation fails with [`ErrorKind::Unavailable`] until then.
///
/// All writes go through [`save_artifact`](Self::save_artifact), which runs as
/// a single transaction and is serialized across every caller sharing this
/// store, so the latest/release flags can't be lost to interleaved updates.
/// Reads aren't serialized and may observe the state either side of an
/// in-flight save.
#[derive(Debug)]
pub struct ArtifactStore {
    location: Location,
    db: OnceCell<Database>,
    write_lock: Mutex<()>,
}

impl ArtifactStore {
    /// A store backed by the SQLite database at `path`, created on
    /// initialization if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::at(Location::File(path.into()))
    }

    /// A store that lives and dies with the process (useful for testing).
    pub fn in_memory() -> Self {
        Self::at(Location::Memory)
    }

    fn at(location: Location) -> Self {
        Self {
            location,
            db: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the database and bring its schema up to date. Calling this again
    /// afterwards is a no-op.
    #[instrument(skip(self), fields(location = ?self.location))]
    pub async fn initialize(&self) -> Result<()> {
        self.db
            .get_or_try_init(|| async {
                match &self.location {
                    Location::File(path) => Database::connect(path).await,
                    Location::Memory => Database::connect_in_memory().await,
                }
            })
            .await?;
        Ok(())
    }

    /// Release the underlying connections. Uninitialized stores have nothing
    /// to release.
    pub async fn close(&self) {
        if let Some(db) = self.db.get() {
            db.close().await;
        }
    }

    fn db(&self) -> Result<&Database> {
        self.db.get().ok_or_raise(|| ErrorKind::Unavailable)
    }

    /// Record `metadata` for `artifact`.
    ///
    /// The artifact row is created on first save, along with its fuzzy index
    /// entry. Versions not seen before are appended; known versions are left
    /// alone and none are ever removed. When `metadata` names a latest or
    /// release version, that flag moves to the matching row; when it doesn't,
    /// the flag stays where it was.
    #[instrument(skip(self, metadata), fields(artifact = %artifact, versions = metadata.versions.len()))]
    pub async fn save_artifact(&self, artifact: &Artifact, metadata: &VersionMetadata) -> Result<()> {
        let db = self.db()?;
        let _guard = self.write_lock.lock().await;
        let mut tx = db.pool().begin().await.or_raise(|| ErrorKind::Database)?;

        sqlx::query(include_str!("../queries/insert_artifact.sql"))
            .bind(&artifact.group_id)
            .bind(&artifact.artifact_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let (id,): (i64,) = sqlx::query_as(include_str!("../queries/get_artifact_id.sql"))
            .bind(&artifact.group_id)
            .bind(&artifact.artifact_id)
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/insert_fuzzy_entry.sql"))
            .bind(id)
            .bind(normalize(&artifact.group_id))
            .bind(normalize(&artifact.artifact_id))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;

        for version in &metadata.versions {
            sqlx::query(include_str!("../queries/insert_version.sql"))
                .bind(id)
                .bind(truncate_version(version))
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        if let Some(latest) = &metadata.latest_version {
            Self::move_flag(
                &mut tx,
                id,
                latest,
                include_str!("../queries/clear_latest.sql"),
                include_str!("../queries/set_latest.sql"),
            )
            .await?;
        }
        if let Some(release) = &metadata.release_version {
            Self::move_flag(
                &mut tx,
                id,
                release,
                include_str!("../queries/clear_release.sql"),
                include_str!("../queries/set_release.sql"),
            )
            .await?;
        }

        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(artifact_row = id, "Saved artifact");
        Ok(())
    }

    async fn move_flag(
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
        version: &str,
        clear: &'static str,
        set: &'static str,
    ) -> Result<()> {
        sqlx::query(clear).bind(id).execute(&mut **tx).await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(set)
            .bind(id)
            .bind(truncate_version(version))
            .execute(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Artifacts whose coordinates share trigrams with `query`, best match
    /// first, each paired with its release version. Artifacts without a
    /// release version never match.
    #[instrument(skip(self))]
    pub async fn search_artifacts(&self, query: &str, limit: u32) -> Result<Vec<IndexedArtifact>> {
        let db = self.db()?;
        let Some(fts_query) = trigram_query(query) else {
            return Ok(Vec::new());
        };
        let rows: Vec<SearchRow> = sqlx::query_as(include_str!("../queries/search_artifacts.sql"))
            .bind(fts_query)
            .bind(i64::from(limit))
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// One page of stored artifacts in insertion order.
    pub async fn get_artifacts(&self, limit: u64, offset: u64) -> Result<Vec<Artifact>> {
        let db = self.db()?;
        let rows: Vec<ArtifactRow> = sqlx::query_as(include_str!("../queries/get_artifacts.sql"))
            .bind(i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("page limit"))?)
            .bind(i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("page offset"))?)
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_artifacts_count(&self) -> Result<u64> {
        let db = self.db()?;
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count_artifacts.sql"))
            .fetch_one(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("artifact count"))
    }

    /// Other artifacts in the same group whose id starts with this artifact's
    /// id. These are only *candidate* platform variants; deciding which are
    /// genuine is up to the caller.
    pub async fn get_artifact_targets(&self, artifact: &Artifact) -> Result<Vec<Artifact>> {
        let db = self.db()?;
        let rows: Vec<ArtifactRow> = sqlx::query_as(include_str!("../queries/get_artifact_targets.sql"))
            .bind(&artifact.group_id)
            .bind(like_prefix(&artifact.artifact_id))
            .bind(&artifact.artifact_id)
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every stored version of `artifact` with its flags. Unknown artifacts
    /// have no versions.
    pub async fn get_artifact_versions(&self, artifact: &Artifact) -> Result<VersionMetadata> {
        let db = self.db()?;
        let rows: Vec<VersionRow> = sqlx::query_as(include_str!("../queries/get_artifact_versions.sql"))
            .bind(&artifact.group_id)
            .bind(&artifact.artifact_id)
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(collect_versions(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(versions: &[&str], latest: Option<&str>, release: Option<&str>) -> VersionMetadata {
        VersionMetadata::new(
            versions.iter().map(|v| v.to_string()).collect(),
            latest.map(String::from),
            release.map(String::from),
        )
    }

    async fn store() -> ArtifactStore {
        let store = ArtifactStore::in_memory();
        store.initialize().await.unwrap();
        store
    }

    async fn flag_counts(store: &ArtifactStore) -> Vec<(i64, i64)> {
        sqlx::query_as(
            "SELECT SUM(is_latest), SUM(is_release) FROM versions GROUP BY artifact_id ORDER BY artifact_id",
        )
        .fetch_all(store.db().unwrap().pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn unavailable_before_initialize() {
        let store = ArtifactStore::in_memory();
        let artifact = Artifact::new("com.example", "lib");
        let err = store.save_artifact(&artifact, &VersionMetadata::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable));
        let err = store.get_artifacts_count().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable));
        let err = store.search_artifacts("library", 10).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable));
        // Closing an uninitialized store is harmless.
        store.close().await;
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = store().await;
        store.save_artifact(&Artifact::new("com.example", "lib"), &metadata(&["1.0"], None, None)).await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.get_artifacts_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn saving_twice_is_idempotent() {
        let store = store().await;
        let artifact = Artifact::new("com.example", "lib");
        let metadata = metadata(&["1.0.0", "1.1.0"], Some("1.1.0"), Some("1.1.0"));
        store.save_artifact(&artifact, &metadata).await.unwrap();
        store.save_artifact(&artifact, &metadata).await.unwrap();

        assert_eq!(store.get_artifacts_count().await.unwrap(), 1);
        assert_eq!(store.get_artifact_versions(&artifact).await.unwrap(), metadata);
        let (fuzzy_entries,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM artifacts_fuzzy_index")
            .fetch_one(store.db().unwrap().pool())
            .await
            .unwrap();
        assert_eq!(fuzzy_entries, 1);
    }

    #[tokio::test]
    async fn versions_accumulate_and_flags_move() {
        let store = store().await;
        let artifact = Artifact::new("com.example", "lib");
        store
            .save_artifact(&artifact, &metadata(&["1.0.0", "1.1.0"], Some("1.1.0"), Some("1.1.0")))
            .await
            .unwrap();
        store
            .save_artifact(&artifact, &metadata(&["1.1.0", "2.0.0-rc1"], Some("2.0.0-rc1"), Some("1.1.0")))
            .await
            .unwrap();

        let stored = store.get_artifact_versions(&artifact).await.unwrap();
        assert_eq!(stored.versions, vec!["1.0.0", "1.1.0", "2.0.0-rc1"]);
        assert_eq!(stored.latest_version.as_deref(), Some("2.0.0-rc1"));
        assert_eq!(stored.release_version.as_deref(), Some("1.1.0"));
        assert_eq!(flag_counts(&store).await, vec![(1, 1)]);
    }

    #[tokio::test]
    async fn flags_stay_exclusive_across_artifacts() {
        let store = store().await;
        let first = Artifact::new("com.example", "first");
        let second = Artifact::new("com.example", "second");
        for (latest, release) in [("1.0", "1.0"), ("2.0", "1.0"), ("3.0", "3.0")] {
            let metadata = metadata(&["1.0", "2.0", "3.0"], Some(latest), Some(release));
            store.save_artifact(&first, &metadata).await.unwrap();
            store.save_artifact(&second, &metadata).await.unwrap();
        }
        assert_eq!(flag_counts(&store).await, vec![(1, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn missing_hints_keep_existing_flags() {
        let store = store().await;
        let artifact = Artifact::new("com.example", "lib");
        store.save_artifact(&artifact, &metadata(&["1.0"], Some("1.0"), Some("1.0"))).await.unwrap();
        store.save_artifact(&artifact, &metadata(&["1.1"], None, None)).await.unwrap();

        let stored = store.get_artifact_versions(&artifact).await.unwrap();
        assert_eq!(stored.versions, vec!["1.0", "1.1"]);
        assert_eq!(stored.latest_version.as_deref(), Some("1.0"));
        assert_eq!(stored.release_version.as_deref(), Some("1.0"));
    }

    #[tokio::test]
    async fn long_versions_are_truncated() {
        let store = store().await;
        let artifact = Artifact::new("com.example", "lib");
        let long = format!("1.0.0-{}", "x".repeat(200));
        store
            .save_artifact(&artifact, &metadata(&[long.as_str()], Some(long.as_str()), None))
            .await
            .unwrap();
        let stored = store.get_artifact_versions(&artifact).await.unwrap();
        assert_eq!(stored.versions[0].chars().count(), 100);
        assert_eq!(stored.latest_version, Some(stored.versions[0].clone()));
    }

    #[tokio::test]
    async fn fuzzy_search_finds_substring() {
        let store = store().await;
        store
            .save_artifact(
                &Artifact::new("com.trigram", "searchlib"),
                &metadata(&["1.2.3"], Some("1.2.3"), Some("1.2.3")),
            )
            .await
            .unwrap();
        store
            .save_artifact(
                &Artifact::new("org.unrelated", "widget"),
                &metadata(&["0.1.0"], Some("0.1.0"), Some("0.1.0")),
            )
            .await
            .unwrap();

        let results = store.search_artifacts("rchli", 50).await.unwrap();
        assert_eq!(
            results,
            vec![IndexedArtifact {
                group_id: "com.trigram".to_string(),
                artifact_id: "searchlib".to_string(),
                version: "1.2.3".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn search_ranks_and_limits() {
        let store = store().await;
        for name in ["ktor-client-core", "ktor-client-cio", "ktor-server-core", "okhttp"] {
            store
                .save_artifact(&Artifact::new("io.ktor", name), &metadata(&["2.3.7"], None, Some("2.3.7")))
                .await
                .unwrap();
        }
        let results = store.search_artifacts("ktor client core", 50).await.unwrap();
        assert_eq!(results[0].artifact_id, "ktor-client-core");
        assert!(results.iter().all(|result| result.version == "2.3.7"));

        let results = store.search_artifacts("ktor", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn search_without_matches_is_empty() {
        let store = store().await;
        assert!(store.search_artifacts("anything", 50).await.unwrap().is_empty());
        store
            .save_artifact(&Artifact::new("com.example", "lib"), &metadata(&["1.0"], None, None))
            .await
            .unwrap();
        // Matches by name, but there's no release version to report.
        assert!(store.search_artifacts("example", 50).await.unwrap().is_empty());
        assert!(store.search_artifacts("zz", 50).await.unwrap().is_empty());
        assert!(store.search_artifacts("qqqqq", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paginates_in_insertion_order() {
        let store = store().await;
        let names = ["zeta", "alpha", "mu", "beta", "omega"];
        for name in names {
            store
                .save_artifact(&Artifact::new("com.example", name), &metadata(&["1.0"], None, None))
                .await
                .unwrap();
        }
        assert_eq!(store.get_artifacts_count().await.unwrap(), 5);

        let mut seen = Vec::new();
        for offset in (0..5).step_by(2) {
            seen.extend(store.get_artifacts(2, offset).await.unwrap());
        }
        let seen: Vec<&str> = seen.iter().map(|artifact| artifact.artifact_id.as_str()).collect();
        assert_eq!(seen, names);
        assert!(store.get_artifacts(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finds_target_candidates() {
        let store = store().await;
        for (group, name) in [
            ("io.ktor", "ktor-network"),
            ("io.ktor", "ktor-network-jvm"),
            ("io.ktor", "ktor-network-tls"),
            ("io.ktor", "ktor-io"),
            ("org.other", "ktor-network-js"),
            ("io.ktor", "ktor_network-js"),
        ] {
            store.save_artifact(&Artifact::new(group, name), &VersionMetadata::default()).await.unwrap();
        }
        let targets = store.get_artifact_targets(&Artifact::new("io.ktor", "ktor-network")).await.unwrap();
        assert_eq!(
            targets,
            vec![Artifact::new("io.ktor", "ktor-network-jvm"), Artifact::new("io.ktor", "ktor-network-tls")]
        );

        // `_` is a literal, not a single character wildcard.
        let targets = store.get_artifact_targets(&Artifact::new("io.ktor", "ktor_network")).await.unwrap();
        assert_eq!(targets, vec![Artifact::new("io.ktor", "ktor_network-js")]);
    }

    #[tokio::test]
    async fn unknown_artifact_has_no_versions() {
        let store = store().await;
        let versions = store.get_artifact_versions(&Artifact::new("com.example", "missing")).await.unwrap();
        assert_eq!(versions, VersionMetadata::default());
    }

    #[tokio::test]
    async fn persists_across_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maven.db");
        let artifact = Artifact::new("com.example", "lib");
        let metadata = metadata(&["1.0.0"], Some("1.0.0"), Some("1.0.0"));

        let store = ArtifactStore::new(&path);
        store.initialize().await.unwrap();
        store.save_artifact(&artifact, &metadata).await.unwrap();
        store.close().await;

        let store = ArtifactStore::new(&path);
        store.initialize().await.unwrap();
        assert_eq!(store.get_artifact_versions(&artifact).await.unwrap(), metadata);
        assert_eq!(store.search_artifacts("example", 5).await.unwrap().len(), 1);
        store.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_keep_one_flag_each() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(ArtifactStore::new(dir.path().join("maven.db")));
        store.initialize().await.unwrap();
        let artifact = Artifact::new("com.example", "lib");

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let store = std::sync::Arc::clone(&store);
            let artifact = artifact.clone();
            tasks.spawn(async move {
                let version = format!("1.0.{i}");
                let metadata = metadata(&[version.as_str()], Some(version.as_str()), Some(version.as_str()));
                store.save_artifact(&artifact, &metadata).await.unwrap();
                store.search_artifacts("lib", 10).await.unwrap();
            });
        }
        while let Some(task) = tasks.join_next().await {
            task.unwrap();
        }

        let stored = store.get_artifact_versions(&artifact).await.unwrap();
        assert_eq!(stored.versions.len(), 64);
        assert_eq!(store.get_artifacts_count().await.unwrap(), 1);
        assert_eq!(flag_counts(&store).await, vec![(1, 1)]);
        assert!(stored.latest_version.is_some());
        assert_eq!(stored.latest_version, stored.release_version);
        store.close().await;
    }
}
