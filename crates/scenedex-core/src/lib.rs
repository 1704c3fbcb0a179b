//! # Scenedex Core Library
//!
//! This crate provides full-text search over a scene catalog: it keeps a
//! tantivy index in step with an external record store and matches free
//! text or media filenames against it.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Catalog records as the store hands them out
//! - **Store** (`store`): The `SceneStore` trait and an in-memory store
//! - **Canonicalize** (`canonicalize`): Filename to query-string cleanup
//! - **Document** (`document`): Record to index document mapping
//! - **Index** (`index`): The on-disk tantivy index
//! - **Lock** (`lock`): Named non-blocking operation locks
//! - **Pipeline** (`pipeline`): Rebuild, update and delete operations
//! - **Search** (`search`): Fuzzy search resolved to catalog records
//! - **Progress** (`progress`): Progress and migration status reporting
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use scenedex_core::{Config, Indexer, LockRegistry, MemorySceneStore, SceneSearcher};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let store = Arc::new(MemorySceneStore::from_scenes(scenes));
//! let locks = Arc::new(LockRegistry::new());
//!
//! Indexer::new(store.clone(), locks, config.index_settings()?).rebuild()?;
//!
//! let searcher = SceneSearcher::new(store, config.search_settings()?);
//! for hit in searcher.match_filename("Harbor.Lights_2160p.mp4") {
//!     println!("{:.2} {}", hit.score, hit.scene);
//! }
//! ```
//!
//! Canonicalizing a filename needs no index:
//!
//! ```
//! assert_eq!(scenedex_core::canonicalize("My.Scene_1080p.h264.mp4"), "My Scene");
//! ```

pub mod canonicalize;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod lock;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use canonicalize::{canonicalize, is_noise_token};
pub use config::Config;
pub use document::{to_document, IndexedDocument};
pub use error::{Result, ScenedexError};
pub use index::{
    Direction, IndexField, IndexOptions, OpenMode, SceneIndex, SearchHit, SearchRequest, SortOrder,
};
pub use lock::{HeldLock, LockGuard, LockRegistry, INDEX_LOCK};
pub use pipeline::{IndexOutcome, IndexReport, IndexSettings, Indexer};
pub use progress::{IndexProgress, LoggingProgress, MigrationStatus, SharedMigrationStatus};
pub use search::{SceneSearcher, SearchSettings};
pub use store::{MemorySceneStore, SceneStore};
pub use types::{CastMember, SceneRecord, ScoredScene, ScrapedScene, Tag};
