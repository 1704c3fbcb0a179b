//! Fuzzy scene search.
//!
//! `SceneSearcher` answers free-text and filename queries with catalog
//! records. Each call opens the index read-only, so searches run alongside
//! an indexing operation and see its last commit.
//!
//! `fuzzy_search` never fails: if the index cannot be opened or the query
//! is rejected, the problem is logged and the result is empty. Callers that
//! need to tell "no matches" from "search broken" use `try_search`.
//!
//! Queries use tantivy's query-string syntax, so `title:harbor`,
//! `+cast:jane -site:blue` and `released:[2020-01-01T00:00:00Z TO *]` all
//! work. Characters that are syntax there (`:`, `(`, `"`, ...) need quoting.

use crate::canonicalize::canonicalize;
use crate::error::Result;
use crate::index::{IndexField, IndexOptions, OpenMode, SceneIndex, SearchRequest, SortOrder};
use crate::store::SceneStore;
use crate::types::ScoredScene;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where to search and how many results to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub dir: PathBuf,
    pub name: String,

    /// Maximum number of scenes per search
    pub max_results: usize,

    pub options: IndexOptions,
}

impl SearchSettings {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        SearchSettings {
            dir: dir.into(),
            name: name.into(),
            max_results: 25,
            options: IndexOptions::default(),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }
}

/// Searches the scene index and resolves hits to catalog records.
pub struct SceneSearcher {
    store: Arc<dyn SceneStore>,
    settings: SearchSettings,
}

impl SceneSearcher {
    pub fn new(store: Arc<dyn SceneStore>, settings: SearchSettings) -> Self {
        SceneSearcher { store, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search for scenes matching `query`, best match first.
    ///
    /// Returns an empty vector on any failure.
    pub fn fuzzy_search(&self, query: &str) -> Vec<ScoredScene> {
        match self.try_search(query) {
            Ok(scenes) => scenes,
            Err(e) => {
                warn!(query, error = %e, "Scene search failed");
                Vec::new()
            }
        }
    }

    /// Search for scenes matching `query`, reporting index and query errors.
    ///
    /// Hits whose record is missing from the store, or cannot be read, are
    /// dropped.
    pub fn try_search(&self, query: &str) -> Result<Vec<ScoredScene>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let index = SceneIndex::open_or_create(
            &self.settings.dir,
            &self.settings.name,
            OpenMode::ReadOnly,
            &self.settings.options,
        )?;

        let request = SearchRequest::new(query)
            .with_fields(IndexField::RESULT_FIELDS.to_vec())
            .with_limit(self.settings.max_results)
            .with_sort(SortOrder::Relevance);
        let hits = index.search(&request)?;

        debug!(query, hits = hits.len(), "Search complete");

        let scenes = hits
            .into_iter()
            .filter_map(|hit| {
                let score = hit.score.unwrap_or_default();
                match self.store.fetch_scene_if_exists(&hit.id) {
                    Ok(Some(scene)) => Some(ScoredScene::new(scene, score)),
                    Ok(None) => {
                        debug!(scene = %hit.id, "Indexed scene missing from catalog");
                        None
                    }
                    Err(e) => {
                        warn!(scene = %hit.id, error = %e, "Failed to load scene");
                        None
                    }
                }
            })
            .collect();

        Ok(scenes)
    }

    /// Find scenes for a media filename.
    ///
    /// The canonical name is searched as plain words, so an apostrophe or a
    /// leftover `(` in a filename never reaches the query syntax.
    pub fn match_filename(&self, filename: &str) -> Vec<ScoredScene> {
        let canonical = canonicalize(filename);
        let query = plain_words(&canonical);
        debug!(filename, canonical = %canonical, query = %query, "Matching filename");
        self.fuzzy_search(&query)
    }
}

/// Lowercase `text` and blank out everything but letters, digits and
/// whitespace. The field analyzers split on the same characters, so the
/// terms searched are unchanged.
fn plain_words(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase()
}
