//! Record store interface.
//!
//! The catalog's records live in an external store. The indexing pipeline
//! and the search engine only need three reads from it, captured by the
//! `SceneStore` trait. `MemorySceneStore` is a simple ordered implementation
//! used by the CLI (backed by a catalog file) and by tests.
//!
//! ## Implementing a Store
//!
//! Implementations must be `Send + Sync`. `fetch_scenes_page` must return
//! records in a stable natural order with cast and tags already attached,
//! so that paging with increasing offsets visits every record once.

use crate::types::SceneRecord;
use parking_lot::RwLock;

/// Read access to the catalog's scene records.
pub trait SceneStore: Send + Sync {
    /// Total number of scenes in the store
    fn count_scenes(&self) -> anyhow::Result<usize>;

    /// Fetch up to `limit` scenes starting at `offset`, in natural order.
    ///
    /// An empty page means the end of the store has been reached.
    fn fetch_scenes_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<SceneRecord>>;

    /// Fetch a scene by id, or `None` if it does not exist.
    fn fetch_scene_if_exists(&self, scene_id: &str) -> anyhow::Result<Option<SceneRecord>>;
}

/// In-memory scene store preserving insertion order.
#[derive(Debug, Default)]
pub struct MemorySceneStore {
    scenes: RwLock<Vec<SceneRecord>>,
}

impl MemorySceneStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemorySceneStore {
            scenes: RwLock::new(Vec::new()),
        }
    }

    /// Create a store from records; later duplicates of an id replace earlier ones.
    pub fn from_scenes(scenes: impl IntoIterator<Item = SceneRecord>) -> Self {
        let store = Self::new();
        for scene in scenes {
            store.upsert(scene);
        }
        store
    }

    /// Insert a scene, or replace the scene with the same id in place.
    pub fn upsert(&self, scene: SceneRecord) {
        let mut scenes = self.scenes.write();
        match scenes.iter_mut().find(|s| s.scene_id == scene.scene_id) {
            Some(existing) => *existing = scene,
            None => scenes.push(scene),
        }
    }

    /// Remove a scene by id, returning it if it existed.
    pub fn remove(&self, scene_id: &str) -> Option<SceneRecord> {
        let mut scenes = self.scenes.write();
        let pos = scenes.iter().position(|s| s.scene_id == scene_id)?;
        Some(scenes.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.scenes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.read().is_empty()
    }
}

impl SceneStore for MemorySceneStore {
    fn count_scenes(&self) -> anyhow::Result<usize> {
        Ok(self.len())
    }

    fn fetch_scenes_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<SceneRecord>> {
        let scenes = self.scenes.read();
        Ok(scenes.iter().skip(offset).take(limit).cloned().collect())
    }

    fn fetch_scene_if_exists(&self, scene_id: &str) -> anyhow::Result<Option<SceneRecord>> {
        let scenes = self.scenes.read();
        Ok(scenes.iter().find(|s| s.scene_id == scene_id).cloned())
    }
}
