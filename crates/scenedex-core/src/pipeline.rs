//! Indexing pipeline.
//!
//! The `Indexer` keeps the scene index in step with the record store. Every
//! entry point takes the `"index"` lock first; if another operation holds
//! it, the call is skipped rather than queued. The index handle is opened
//! per operation and closed on every path, including errors.

use crate::document::to_document;
use crate::error::{Result, ScenedexError};
use crate::index::{IndexOptions, OpenMode, SceneIndex};
use crate::lock::{LockGuard, LockRegistry, INDEX_LOCK};
use crate::progress::{IndexProgress, LoggingProgress, MigrationStatus};
use crate::store::SceneStore;
use crate::types::{SceneRecord, ScrapedScene};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Where the index lives and how the pipeline writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    /// Directory holding the named index
    pub dir: PathBuf,

    /// Index name; storage lives at `dir/name`
    pub name: String,

    /// Records fetched per page during a rebuild
    pub page_size: usize,

    /// Minimum time between progress log lines for batch updates
    pub progress_interval: Duration,

    pub options: IndexOptions,
}

impl IndexSettings {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        IndexSettings {
            dir: dir.into(),
            name: name.into(),
            page_size: 100,
            progress_interval: Duration::from_secs(10),
            options: IndexOptions::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// Full path of the index storage.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Counts from one completed indexing operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Records visited
    pub processed: usize,

    /// Documents written (or removed, for deletions)
    pub written: usize,

    /// Records whose write or delete failed
    pub failed: usize,

    pub elapsed: Duration,
}

/// Result of an indexing entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Another operation held the index lock; nothing was done
    Skipped,
    Completed(IndexReport),
}

impl IndexOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, IndexOutcome::Skipped)
    }

    pub fn report(&self) -> Option<&IndexReport> {
        match self {
            IndexOutcome::Completed(report) => Some(report),
            IndexOutcome::Skipped => None,
        }
    }
}

/// Throttles progress logging to once per interval.
struct ProgressTicker {
    interval: Duration,
    last: Instant,
}

impl ProgressTicker {
    fn new(interval: Duration) -> Self {
        ProgressTicker {
            interval,
            last: Instant::now(),
        }
    }

    fn due(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }
}

/// Writes catalog records into the scene index.
pub struct Indexer {
    store: Arc<dyn SceneStore>,
    locks: Arc<LockRegistry>,
    settings: IndexSettings,
    progress: Arc<dyn IndexProgress>,
    migration: Option<Arc<dyn MigrationStatus>>,
}

impl Indexer {
    pub fn new(store: Arc<dyn SceneStore>, locks: Arc<LockRegistry>, settings: IndexSettings) -> Self {
        Indexer {
            store,
            locks,
            settings,
            progress: Arc::new(LoggingProgress::new("rebuild")),
            migration: None,
        }
    }

    /// Report rebuild progress to `progress` instead of the log.
    pub fn with_progress(mut self, progress: Arc<dyn IndexProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Mirror rebuild progress into a running migration.
    pub fn with_migration_status(mut self, migration: Arc<dyn MigrationStatus>) -> Self {
        self.migration = Some(migration);
        self
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Index every record in the store that is not indexed yet.
    ///
    /// Existing documents are left alone and stale documents are never
    /// removed; use `index_scenes` to refresh changed records.
    #[instrument(skip(self), fields(index = %self.settings.name))]
    pub fn rebuild(&self) -> Result<IndexOutcome> {
        let Some(_guard) = self.lock() else {
            return Ok(IndexOutcome::Skipped);
        };

        self.with_index(|index| self.rebuild_into(index))
    }

    /// Re-index the given records, replacing their current documents.
    #[instrument(skip_all, fields(scenes = scenes.len()))]
    pub fn index_scenes(&self, scenes: &[SceneRecord]) -> Result<IndexOutcome> {
        let Some(_guard) = self.lock() else {
            return Ok(IndexOutcome::Skipped);
        };

        self.with_index(|index| Ok(self.write_scenes(index, scenes)))
    }

    /// Re-index freshly scraped scenes.
    ///
    /// Each scene is looked up in the store; scenes that are missing or
    /// cannot be read are skipped.
    #[instrument(skip_all, fields(scenes = scraped.len()))]
    pub fn index_scraped_scenes(&self, scraped: &[ScrapedScene]) -> Result<IndexOutcome> {
        let Some(_guard) = self.lock() else {
            return Ok(IndexOutcome::Skipped);
        };

        let scenes = self.resolve_scraped(scraped);
        self.with_index(|index| Ok(self.write_scenes(index, &scenes)))
    }

    /// Remove the given records from the index. Unindexed records are ignored.
    #[instrument(skip_all, fields(scenes = scenes.len()))]
    pub fn delete_scenes(&self, scenes: &[SceneRecord]) -> Result<IndexOutcome> {
        let ids: Vec<&str> = scenes.iter().map(|s| s.scene_id.as_str()).collect();
        self.delete_ids(&ids)
    }

    /// Remove documents by scene id. Unindexed ids are ignored.
    #[instrument(skip_all, fields(scenes = ids.len()))]
    pub fn delete_scene_ids(&self, ids: &[String]) -> Result<IndexOutcome> {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.delete_ids(&ids)
    }

    fn delete_ids(&self, ids: &[&str]) -> Result<IndexOutcome> {
        let Some(_guard) = self.lock() else {
            return Ok(IndexOutcome::Skipped);
        };

        self.with_index(|index| {
            let mut report = IndexReport::default();
            let mut ticker = ProgressTicker::new(self.settings.progress_interval);

            for &id in ids {
                report.processed += 1;
                if index.exists(id) {
                    match index.delete(id) {
                        Ok(()) => report.written += 1,
                        Err(e) => {
                            warn!(scene = id, error = %e, "Failed to remove scene from index");
                            report.failed += 1;
                        }
                    }
                }

                if ticker.due() {
                    info!(processed = report.processed, total = ids.len(), "Removing scenes from index");
                }
            }

            Ok(report)
        })
    }

    fn lock(&self) -> Option<LockGuard<'_>> {
        match self.locks.acquire(INDEX_LOCK) {
            Ok(guard) => Some(guard),
            Err(_) => {
                info!("Indexing already in progress, skipping");
                None
            }
        }
    }

    /// Run `op` against a freshly opened index and close it afterwards.
    ///
    /// An error from `op` wins over an error from closing.
    fn with_index<F>(&self, op: F) -> Result<IndexOutcome>
    where
        F: FnOnce(&mut SceneIndex) -> Result<IndexReport>,
    {
        let started = Instant::now();

        let mut index = SceneIndex::open_or_create(
            &self.settings.dir,
            &self.settings.name,
            OpenMode::ReadWrite,
            &self.settings.options,
        )
        .inspect_err(|e| error!(error = %e, "Failed to open scene index"))?;

        let result = op(&mut index);
        let closed = index.close();

        let mut report = result?;
        closed?;
        report.elapsed = started.elapsed();

        info!(
            processed = report.processed,
            written = report.written,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Index operation complete"
        );

        Ok(IndexOutcome::Completed(report))
    }

    fn rebuild_into(&self, index: &mut SceneIndex) -> Result<IndexReport> {
        let total = self
            .store
            .count_scenes()
            .map_err(|e| ScenedexError::store("count_scenes", format!("{:#}", e)))?;
        let page_size = self.settings.page_size.max(1);

        info!(total, page_size, "Rebuilding search index");

        let mut report = IndexReport::default();
        let mut offset = 0;

        loop {
            let page = self
                .store
                .fetch_scenes_page(offset, page_size)
                .map_err(|e| ScenedexError::store("fetch_scenes_page", format!("{:#}", e)))?;
            if page.is_empty() {
                break;
            }

            for scene in &page {
                report.processed += 1;
                if index.exists(&scene.scene_id) {
                    continue;
                }
                match index.put(&to_document(scene)) {
                    Ok(()) => report.written += 1,
                    Err(e) => {
                        warn!(scene = %scene.scene_id, error = %e, "Failed to index scene");
                        report.failed += 1;
                    }
                }
            }

            offset += page.len();
            index.commit()?;

            self.progress.on_progress(report.processed, total);
            self.mirror_migration(report.processed, total);
        }

        self.progress.on_complete(report.processed, total);
        Ok(report)
    }

    fn mirror_migration(&self, processed: usize, total: usize) {
        if let Some(migration) = self.migration.as_ref().filter(|m| m.is_running()) {
            let message = format!("Reindexing scenes: {}/{}", processed, total);
            migration.update_status(&migration.current_phase(), processed, total, &message);
        }
    }

    fn write_scenes(&self, index: &mut SceneIndex, scenes: &[SceneRecord]) -> IndexReport {
        let mut report = IndexReport::default();
        let mut ticker = ProgressTicker::new(self.settings.progress_interval);

        for scene in scenes {
            report.processed += 1;

            let replaced = if index.exists(&scene.scene_id) {
                index.delete(&scene.scene_id)
            } else {
                Ok(())
            };

            match replaced.and_then(|()| index.put(&to_document(scene))) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(scene = %scene.scene_id, error = %e, "Failed to index scene");
                    report.failed += 1;
                }
            }

            if ticker.due() {
                info!(processed = report.processed, total = scenes.len(), "Indexing scenes");
            }
        }

        report
    }

    fn resolve_scraped(&self, scraped: &[ScrapedScene]) -> Vec<SceneRecord> {
        scraped
            .iter()
            .filter_map(|s| match self.store.fetch_scene_if_exists(&s.scene_id) {
                Ok(Some(scene)) => Some(scene),
                Ok(None) => {
                    debug!(scene = %s.scene_id, "Scraped scene not in catalog, skipping");
                    None
                }
                Err(e) => {
                    warn!(scene = %s.scene_id, error = %e, "Failed to load scraped scene");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SharedMigrationStatus;
    use crate::store::MemorySceneStore;
    use crossbeam_channel::{bounded, Receiver, Sender};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn catalog(n: usize) -> Arc<MemorySceneStore> {
        Arc::new(MemorySceneStore::from_scenes(
            (1..=n).map(|i| SceneRecord::new(format!("s{}", i), format!("Scene number {}", i))),
        ))
    }

    fn settings(dir: &TempDir) -> IndexSettings {
        IndexSettings::new(dir.path(), "scenes").with_page_size(2)
    }

    fn reopen(dir: &TempDir) -> SceneIndex {
        SceneIndex::open_or_create(dir.path(), "scenes", OpenMode::ReadOnly, &IndexOptions::default())
            .unwrap()
    }

    /// Store wrapper counting every call that reaches it
    struct CountingStore {
        inner: Arc<MemorySceneStore>,
        calls: AtomicUsize,
    }

    impl SceneStore for CountingStore {
        fn count_scenes(&self) -> anyhow::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.count_scenes()
        }

        fn fetch_scenes_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<SceneRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_scenes_page(offset, limit)
        }

        fn fetch_scene_if_exists(&self, scene_id: &str) -> anyhow::Result<Option<SceneRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_scene_if_exists(scene_id)
        }
    }

    /// Store that parks in `count_scenes` until released
    struct BlockingStore {
        inner: Arc<MemorySceneStore>,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl SceneStore for BlockingStore {
        fn count_scenes(&self) -> anyhow::Result<usize> {
            self.entered.send(())?;
            self.release.recv()?;
            self.inner.count_scenes()
        }

        fn fetch_scenes_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<SceneRecord>> {
            self.inner.fetch_scenes_page(offset, limit)
        }

        fn fetch_scene_if_exists(&self, scene_id: &str) -> anyhow::Result<Option<SceneRecord>> {
            self.inner.fetch_scene_if_exists(scene_id)
        }
    }

    /// Store that never returns more than one scene per page
    struct CappedStore {
        inner: Arc<MemorySceneStore>,
    }

    impl SceneStore for CappedStore {
        fn count_scenes(&self) -> anyhow::Result<usize> {
            self.inner.count_scenes()
        }

        fn fetch_scenes_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<SceneRecord>> {
            self.inner.fetch_scenes_page(offset, limit.min(1))
        }

        fn fetch_scene_if_exists(&self, scene_id: &str) -> anyhow::Result<Option<SceneRecord>> {
            self.inner.fetch_scene_if_exists(scene_id)
        }
    }

    struct BrokenStore;

    impl SceneStore for BrokenStore {
        fn count_scenes(&self) -> anyhow::Result<usize> {
            Ok(3)
        }

        fn fetch_scenes_page(&self, _offset: usize, _limit: usize) -> anyhow::Result<Vec<SceneRecord>> {
            anyhow::bail!("connection reset")
        }

        fn fetch_scene_if_exists(&self, _scene_id: &str) -> anyhow::Result<Option<SceneRecord>> {
            anyhow::bail!("connection reset")
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        updates: Mutex<Vec<(usize, usize)>>,
        completed: Mutex<Option<(usize, usize)>>,
    }

    impl IndexProgress for RecordingProgress {
        fn on_progress(&self, processed: usize, total: usize) {
            self.updates.lock().push((processed, total));
        }

        fn on_complete(&self, processed: usize, total: usize) {
            *self.completed.lock() = Some((processed, total));
        }
    }

    #[test]
    fn test_rebuild_indexes_every_scene() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(catalog(5), Arc::new(LockRegistry::new()), settings(&dir));

        let outcome = indexer.rebuild().unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.processed, 5);
        assert_eq!(report.written, 5);
        assert_eq!(report.failed, 0);

        let index = reopen(&dir);
        assert_eq!(index.num_docs(), 5);
        assert!(index.exists("s3"));
    }

    #[test]
    fn test_rebuild_twice_keeps_count() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(catalog(5), Arc::new(LockRegistry::new()), settings(&dir));

        indexer.rebuild().unwrap();
        let second = indexer.rebuild().unwrap();
        assert_eq!(second.report().unwrap().written, 0);
        assert_eq!(second.report().unwrap().processed, 5);

        assert_eq!(reopen(&dir).num_docs(), 5);
    }

    #[test]
    fn test_rebuild_reports_progress_per_page() {
        let dir = TempDir::new().unwrap();
        let progress = Arc::new(RecordingProgress::default());
        let indexer = Indexer::new(catalog(5), Arc::new(LockRegistry::new()), settings(&dir))
            .with_progress(progress.clone());

        indexer.rebuild().unwrap();

        assert_eq!(*progress.updates.lock(), vec![(2, 5), (4, 5), (5, 5)]);
        assert_eq!(*progress.completed.lock(), Some((5, 5)));
    }

    #[test]
    fn test_rebuild_reads_until_empty_page() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CappedStore { inner: catalog(5) });
        let indexer = Indexer::new(store, Arc::new(LockRegistry::new()), settings(&dir));

        let outcome = indexer.rebuild().unwrap();
        assert_eq!(outcome.report().unwrap().written, 5);
        assert_eq!(reopen(&dir).num_docs(), 5);
    }

    #[test]
    fn test_rebuild_mirrors_running_migration() {
        let dir = TempDir::new().unwrap();
        let migration = Arc::new(SharedMigrationStatus::new());
        migration.start("post-upgrade");

        let indexer = Indexer::new(catalog(3), Arc::new(LockRegistry::new()), settings(&dir))
            .with_migration_status(migration.clone());
        indexer.rebuild().unwrap();

        let snap = migration.snapshot();
        assert_eq!(snap.phase, "post-upgrade");
        assert_eq!(snap.current, 3);
        assert_eq!(snap.total, 3);
        assert_eq!(snap.message, "Reindexing scenes: 3/3");
    }

    #[test]
    fn test_idle_migration_untouched() {
        let dir = TempDir::new().unwrap();
        let migration = Arc::new(SharedMigrationStatus::new());

        let indexer = Indexer::new(catalog(3), Arc::new(LockRegistry::new()), settings(&dir))
            .with_migration_status(migration.clone());
        indexer.rebuild().unwrap();

        assert_eq!(migration.snapshot().message, "");
    }

    #[test]
    fn test_held_lock_skips_without_store_access() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CountingStore {
            inner: catalog(3),
            calls: AtomicUsize::new(0),
        });
        let locks = Arc::new(LockRegistry::new());
        let indexer = Indexer::new(store.clone(), locks.clone(), settings(&dir));

        assert!(locks.try_acquire(INDEX_LOCK));

        assert!(indexer.rebuild().unwrap().is_skipped());
        assert!(indexer
            .index_scraped_scenes(&[ScrapedScene::new("s1")])
            .unwrap()
            .is_skipped());
        assert!(indexer.delete_scene_ids(&["s1".to_string()]).unwrap().is_skipped());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("scenes").exists());

        locks.release(INDEX_LOCK);
        assert!(!indexer.rebuild().unwrap().is_skipped());
    }

    #[test]
    fn test_concurrent_rebuild_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);

        let locks = Arc::new(LockRegistry::new());
        let blocking = Arc::new(Indexer::new(
            Arc::new(BlockingStore {
                inner: catalog(4),
                entered: entered_tx,
                release: release_rx,
            }),
            locks.clone(),
            settings(&dir),
        ));
        let second = Indexer::new(catalog(4), locks.clone(), settings(&dir));

        let worker = {
            let blocking = Arc::clone(&blocking);
            std::thread::spawn(move || blocking.rebuild())
        };

        entered_rx.recv().unwrap();
        assert!(locks.is_held(INDEX_LOCK));
        assert!(second.rebuild().unwrap().is_skipped());

        release_tx.send(()).unwrap();
        let first = worker.join().unwrap().unwrap();
        assert_eq!(first.report().unwrap().written, 4);
        assert!(!locks.is_held(INDEX_LOCK));
    }

    #[test]
    fn test_index_scenes_replaces_documents() {
        let dir = TempDir::new().unwrap();
        let store = catalog(2);
        let indexer = Indexer::new(store.clone(), Arc::new(LockRegistry::new()), settings(&dir));
        indexer.rebuild().unwrap();

        let changed = SceneRecord::new("s1", "Lighthouse Keeper");
        let outcome = indexer.index_scenes(&[changed]).unwrap();
        assert_eq!(outcome.report().unwrap().written, 1);

        let index = reopen(&dir);
        assert_eq!(index.num_docs(), 2);
        let hits = index
            .search(&crate::index::SearchRequest::new("lighthouse"))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "s1");
    }

    #[test]
    fn test_scraped_scenes_resolved_through_store() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(catalog(3), Arc::new(LockRegistry::new()), settings(&dir));

        let outcome = indexer
            .index_scraped_scenes(&[ScrapedScene::new("s2"), ScrapedScene::new("missing")])
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.written, 1);

        let index = reopen(&dir);
        assert!(index.exists("s2"));
        assert!(!index.exists("missing"));
    }

    #[test]
    fn test_scraped_lookup_errors_are_skipped() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(Arc::new(BrokenStore), Arc::new(LockRegistry::new()), settings(&dir));

        let outcome = indexer
            .index_scraped_scenes(&[ScrapedScene::new("s1")])
            .unwrap();
        assert_eq!(outcome.report().unwrap().processed, 0);
    }

    #[test]
    fn test_delete_scenes_ignores_absent() {
        let dir = TempDir::new().unwrap();
        let store = catalog(3);
        let indexer = Indexer::new(store.clone(), Arc::new(LockRegistry::new()), settings(&dir));
        indexer.rebuild().unwrap();

        let s1 = SceneRecord::new("s1", "gone");
        let ghost = SceneRecord::new("ghost", "never indexed");
        let outcome = indexer.delete_scenes(&[s1, ghost]).unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.written, 1);
        assert_eq!(report.failed, 0);

        let outcome = indexer.delete_scene_ids(&["s2".to_string()]).unwrap();
        assert_eq!(outcome.report().unwrap().written, 1);

        let index = reopen(&dir);
        assert_eq!(index.num_docs(), 1);
        assert!(index.exists("s3"));
    }

    #[test]
    fn test_store_failure_aborts_rebuild() {
        let dir = TempDir::new().unwrap();
        let locks = Arc::new(LockRegistry::new());
        let indexer = Indexer::new(Arc::new(BrokenStore), locks.clone(), settings(&dir));

        let err = indexer.rebuild().unwrap_err();
        assert!(matches!(err, ScenedexError::Store { .. }));
        assert!(err.to_string().contains("connection reset"));
        assert!(!locks.is_held(INDEX_LOCK));

        // the handle was closed, so the writer can be taken again
        let index = SceneIndex::open_or_create(
            dir.path(),
            "scenes",
            OpenMode::ReadWrite,
            &IndexOptions::default(),
        );
        assert!(index.is_ok());
    }

    #[test]
    fn test_open_failure_releases_lock() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let locks = Arc::new(LockRegistry::new());
        let indexer = Indexer::new(catalog(1), locks.clone(), IndexSettings::new(&blocker, "scenes"));

        let err = indexer.rebuild().unwrap_err();
        assert!(matches!(err, ScenedexError::StorageOpen { .. }));
        assert!(!locks.is_held(INDEX_LOCK));
    }
}
