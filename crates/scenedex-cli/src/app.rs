//! Application state management.

use anyhow::Context;
use scenedex_core::{
    Config, Indexer, LockRegistry, LoggingProgress, MemorySceneStore, SceneRecord, SceneSearcher,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Catalog records loaded from the catalog file
    pub store: Arc<MemorySceneStore>,

    /// Operation locks for this process
    pub locks: Arc<LockRegistry>,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let scenes = match &config.catalog.path {
            Some(path) => load_catalog(path)?,
            None => {
                warn!("No catalog configured; pass --catalog or set [catalog].path");
                Vec::new()
            }
        };

        let store = Arc::new(MemorySceneStore::from_scenes(scenes));

        info!(
            index_dir = %config.index_dir()?.display(),
            scenes = store.len(),
            "Application initialized"
        );

        Ok(App {
            config,
            store,
            locks: Arc::new(LockRegistry::new()),
        })
    }

    /// Path of the index storage.
    pub fn index_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.config.index_settings()?.path())
    }

    pub fn indexer(&self) -> anyhow::Result<Indexer> {
        let indexer = Indexer::new(
            self.store.clone(),
            self.locks.clone(),
            self.config.index_settings()?,
        )
        .with_progress(Arc::new(LoggingProgress::new("index")));
        Ok(indexer)
    }

    pub fn searcher(&self) -> anyhow::Result<SceneSearcher> {
        Ok(SceneSearcher::new(
            self.store.clone(),
            self.config.search_settings()?,
        ))
    }
}

/// Read a catalog file holding a JSON array of scene records.
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<SceneRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let scenes: Vec<SceneRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

    info!(path = %path.display(), scenes = scenes.len(), "Loaded catalog");
    Ok(scenes)
}
