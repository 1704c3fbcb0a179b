//! Full-text scene index backed by tantivy.
//!
//! `SceneIndex` owns one named index directory for the duration of an
//! operation. It defines the document schema and field analyzers, stages
//! writes through a single `IndexWriter`, and answers query-string searches.
//!
//! ## Schema
//!
//! | field         | type | analyzer   | notes                               |
//! |---------------|------|------------|-------------------------------------|
//! | `id`          | text | raw        | stored, one term per document       |
//! | `title`       | text | `simple`   | whole words, lowercased             |
//! | `description` | text | `standard` | plus long-token and stop-word pass  |
//! | `cast`        | text | `simple`   | spaced and concatenated names       |
//! | `site`        | text | `standard` |                                     |
//! | `released`    | date |            | day precision, fast                 |
//! | `added`       | date |            | day precision, fast                 |
//! | `duration`    | u64  |            | seconds, fast                       |
//!
//! Analyzers are not persisted by tantivy, so they are registered on every
//! open.
//!
//! ## Visibility
//!
//! Writes become visible to searches after `commit`. `exists` also accounts
//! for writes staged on this handle, so a put is observable immediately.

use crate::document::IndexedDocument;
use crate::error::{Result, ScenedexError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, QueryParserError, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, INDEXED,
    STORED, STRING,
};
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer,
};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, Order, ReloadPolicy, TantivyDocument,
    TantivyError, Term,
};
use tracing::{debug, info, warn};

/// Analyzer for whole-word fields (title, cast)
pub const SIMPLE_ANALYZER: &str = "simple";
/// Analyzer for prose fields (description, site)
pub const STANDARD_ANALYZER: &str = "standard";

/// Tokens longer than this are dropped by the standard analyzer
const MAX_TOKEN_LEN: usize = 40;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Fields of an indexed scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexField {
    Id,
    Title,
    Description,
    Cast,
    Site,
    Released,
    Added,
    Duration,
}

impl IndexField {
    pub const ALL: [IndexField; 8] = [
        IndexField::Id,
        IndexField::Title,
        IndexField::Description,
        IndexField::Cast,
        IndexField::Site,
        IndexField::Released,
        IndexField::Added,
        IndexField::Duration,
    ];

    /// Fields returned with search hits unless a request asks otherwise
    pub const RESULT_FIELDS: [IndexField; 5] = [
        IndexField::Id,
        IndexField::Title,
        IndexField::Cast,
        IndexField::Site,
        IndexField::Description,
    ];

    /// Field name in the index schema and in query strings
    pub fn name(self) -> &'static str {
        match self {
            IndexField::Id => "id",
            IndexField::Title => "title",
            IndexField::Description => "description",
            IndexField::Cast => "cast",
            IndexField::Site => "site",
            IndexField::Released => "released",
            IndexField::Added => "added",
            IndexField::Duration => "duration",
        }
    }
}

/// Whether a handle may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadWrite,
    ReadOnly,
}

/// Engine tuning shared by every handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Memory budget of the index writer in bytes
    pub writer_memory_bytes: usize,

    /// Edit distance for fuzzy matching on title and cast (0 disables)
    ///
    /// Off by default: a fuzzy term scores a flat 1.0, and a title renamed
    /// by one letter would keep matching its old spelling.
    pub fuzzy_distance: u8,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            writer_memory_bytes: 50_000_000,
            fuzzy_distance: 0,
        }
    }
}

/// Sort direction for field-ordered searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Ascending => Order::Asc,
            Direction::Descending => Order::Desc,
        }
    }
}

/// Ordering of search hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Highest relevance score first
    #[default]
    Relevance,
    /// By release date
    Released(Direction),
    /// By running time
    Duration(Direction),
}

/// A query against the scene index.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query in the engine's query-string syntax
    pub query: String,

    /// Stored fields to return with each hit
    pub fields: Vec<IndexField>,

    /// Maximum number of hits
    pub limit: usize,

    pub sort: SortOrder,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            fields: IndexField::RESULT_FIELDS.to_vec(),
            limit: 25,
            sort: SortOrder::Relevance,
        }
    }

    pub fn with_fields(mut self, fields: impl Into<Vec<IndexField>>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// One document matched by a search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Scene id of the matched document
    pub id: String,

    /// Relevance score; `None` when hits were ordered by a field
    pub score: Option<f32>,

    /// Requested stored fields, formatted as text
    pub fields: HashMap<IndexField, String>,
}

impl SearchHit {
    pub fn field(&self, field: IndexField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy)]
struct SceneFields {
    id: Field,
    title: Field,
    description: Field,
    cast: Field,
    site: Field,
    released: Field,
    added: Field,
    duration: Field,
}

impl SceneFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        let get = |field: IndexField| {
            schema
                .get_field(field.name())
                .map_err(|_| ScenedexError::Schema {
                    reason: format!("missing field '{}'", field.name()),
                })
        };

        Ok(SceneFields {
            id: get(IndexField::Id)?,
            title: get(IndexField::Title)?,
            description: get(IndexField::Description)?,
            cast: get(IndexField::Cast)?,
            site: get(IndexField::Site)?,
            released: get(IndexField::Released)?,
            added: get(IndexField::Added)?,
            duration: get(IndexField::Duration)?,
        })
    }

    fn get(&self, field: IndexField) -> Field {
        match field {
            IndexField::Id => self.id,
            IndexField::Title => self.title,
            IndexField::Description => self.description,
            IndexField::Cast => self.cast,
            IndexField::Site => self.site,
            IndexField::Released => self.released,
            IndexField::Added => self.added,
            IndexField::Duration => self.duration,
        }
    }
}

/// An open handle on the scene index.
///
/// The handle is closed by `close`, or on drop: staged writes are committed
/// either way and the writer lock on the directory is released.
pub struct SceneIndex {
    path: PathBuf,
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter>,
    fields: SceneFields,
    fuzzy_distance: u8,

    /// Writes since the last commit: true for put, false for delete
    staged: HashMap<String, bool>,

    closed: bool,
}

impl SceneIndex {
    /// Open the index named `name` under `dir`, creating it if it does not
    /// exist yet.
    pub fn open_or_create(
        dir: &Path,
        name: &str,
        mode: OpenMode,
        options: &IndexOptions,
    ) -> Result<Self> {
        let path = dir.join(name);
        let path = path.as_path();
        let index = create_or_open(path)?;
        register_analyzers(&index);

        let fields = SceneFields::from_schema(&index.schema())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| ScenedexError::storage_open(path, e))?;

        let writer = match mode {
            OpenMode::ReadWrite => Some(
                index
                    .writer(options.writer_memory_bytes)
                    .map_err(|e| ScenedexError::storage_open(path, e))?,
            ),
            OpenMode::ReadOnly => None,
        };

        debug!(path = %path.display(), ?mode, "Opened scene index");

        Ok(SceneIndex {
            path: path.to_path_buf(),
            index,
            reader,
            writer,
            fields,
            fuzzy_distance: options.fuzzy_distance,
            staged: HashMap::new(),
            closed: false,
        })
    }

    /// Directory backing this index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    /// Check whether a document with the given id is present.
    ///
    /// Lookup failures are logged and reported as absent.
    pub fn exists(&self, id: &str) -> bool {
        if let Some(&present) = self.staged.get(id) {
            return present;
        }

        let searcher = self.reader.searcher();
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        match searcher.search(&query, &Count) {
            Ok(count) => count > 0,
            Err(e) => {
                debug!(id, error = %e, "Document lookup failed");
                false
            }
        }
    }

    /// Write a document, replacing any document with the same id.
    pub fn put(&mut self, doc: &IndexedDocument) -> Result<()> {
        let write_error = |reason: String| ScenedexError::DocumentWrite {
            id: doc.id.clone(),
            reason,
        };

        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| write_error("index is open read-only".to_string()))?;

        writer.delete_term(self.id_term(&doc.id));
        writer
            .add_document(self.to_engine_document(doc))
            .map_err(|e| write_error(e.to_string()))?;

        self.staged.insert(doc.id.clone(), true);
        Ok(())
    }

    /// Delete the document with the given id. Absent ids are not an error.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| ScenedexError::DocumentDelete {
                id: id.to_string(),
                reason: "index is open read-only".to_string(),
            })?;

        writer.delete_term(self.id_term(id));
        self.staged.insert(id.to_string(), false);
        Ok(())
    }

    /// Make staged writes durable and visible to searches.
    pub fn commit(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            if !self.staged.is_empty() {
                writer.commit()?;
                debug!(path = %self.path.display(), staged = self.staged.len(), "Committed index");
            }
        }
        self.reader.reload()?;
        self.staged.clear();
        Ok(())
    }

    /// Number of live committed documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Run a query-string search.
    ///
    /// The query is parsed over title, description, cast and site; field
    /// prefixes, boolean operators and ranges follow tantivy's query syntax.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let query_error = |reason: String| ScenedexError::Query {
            query: request.query.clone(),
            reason,
        };

        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .parse_query(&request.query)
            .map_err(|e| query_error(e.to_string()))?;

        let searcher = self.reader.searcher();
        let top = TopDocs::with_limit(request.limit);

        let matches: Vec<(Option<f32>, DocAddress)> = match request.sort {
            SortOrder::Relevance => searcher
                .search(&query, &top)
                .map_err(|e| query_error(e.to_string()))?
                .into_iter()
                .map(|(score, address)| (Some(score), address))
                .collect(),
            SortOrder::Released(direction) => searcher
                .search(
                    &query,
                    &top.order_by_fast_field::<tantivy::DateTime>(
                        IndexField::Released.name(),
                        direction.into(),
                    ),
                )
                .map_err(|e| query_error(e.to_string()))?
                .into_iter()
                .map(|(_, address)| (None, address))
                .collect(),
            SortOrder::Duration(direction) => searcher
                .search(
                    &query,
                    &top.order_by_fast_field::<u64>(IndexField::Duration.name(), direction.into()),
                )
                .map_err(|e| query_error(e.to_string()))?
                .into_iter()
                .map(|(_, address)| (None, address))
                .collect(),
        };

        let mut hits = Vec::with_capacity(matches.len());
        for (score, address) in matches {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| query_error(e.to_string()))?;
            hits.push(self.to_hit(&doc, score, &request.fields));
        }

        Ok(hits)
    }

    /// Commit staged writes and release the writer.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let committed = self.commit();
        if let Some(writer) = self.writer.take() {
            writer.wait_merging_threads()?;
        }
        committed
    }

    /// Parse `text` over the searchable fields.
    ///
    /// With a fuzzy distance set, the exact query stays alongside the fuzzy
    /// one so exact title and cast hits keep their BM25 score.
    fn parse_query(&self, text: &str) -> std::result::Result<Box<dyn Query>, QueryParserError> {
        let f = &self.fields;
        let exact = QueryParser::for_index(&self.index, vec![f.title, f.description, f.cast, f.site])
            .parse_query(text)?;
        if self.fuzzy_distance == 0 {
            return Ok(exact);
        }

        let mut parser = QueryParser::for_index(&self.index, vec![f.title, f.cast]);
        parser.set_field_fuzzy(f.title, false, self.fuzzy_distance, true);
        parser.set_field_fuzzy(f.cast, false, self.fuzzy_distance, true);
        let fuzzy = parser.parse_query(text)?;

        Ok(Box::new(BooleanQuery::new(vec![
            (Occur::Should, exact),
            (Occur::Should, fuzzy),
        ])))
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.fields.id, id)
    }

    fn to_engine_document(&self, doc: &IndexedDocument) -> TantivyDocument {
        let f = &self.fields;
        let mut out = TantivyDocument::default();
        out.add_text(f.id, &doc.id);
        out.add_text(f.title, &doc.title);
        out.add_text(f.description, &doc.description);
        out.add_text(f.cast, &doc.cast);
        out.add_text(f.site, &doc.site);
        if let Some(released) = doc.released {
            out.add_date(f.released, to_engine_date(released));
        }
        out.add_date(f.added, to_engine_date(doc.added));
        out.add_u64(f.duration, doc.duration);
        out
    }

    fn to_hit(&self, doc: &TantivyDocument, score: Option<f32>, wanted: &[IndexField]) -> SearchHit {
        let id = self.stored_value(doc, IndexField::Id).unwrap_or_default();
        let fields = wanted
            .iter()
            .filter_map(|&field| self.stored_value(doc, field).map(|v| (field, v)))
            .collect();

        SearchHit { id, score, fields }
    }

    fn stored_value(&self, doc: &TantivyDocument, field: IndexField) -> Option<String> {
        let value = doc.get_first(self.fields.get(field))?;
        match field {
            IndexField::Released | IndexField::Added => value
                .as_datetime()
                .and_then(|d| DateTime::<Utc>::from_timestamp(d.into_timestamp_secs(), 0))
                .map(|d| d.format("%Y-%m-%d").to_string()),
            IndexField::Duration => value.as_u64().map(|d| d.to_string()),
            _ => value.as_str().map(str::to_string),
        }
    }
}

impl Drop for SceneIndex {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(path = %self.path.display(), error = %e, "Failed to close scene index cleanly");
        }
    }
}

impl std::fmt::Debug for SceneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneIndex")
            .field("path", &self.path)
            .field("read_only", &self.is_read_only())
            .field("staged", &self.staged.len())
            .finish()
    }
}

/// Check whether index storage exists at `path`.
pub fn storage_exists(path: &Path) -> bool {
    path.join("meta.json").exists()
}

/// Delete the index storage at `path`.
///
/// Returns false if there was nothing to delete. The index can always be
/// rebuilt from the record store.
pub fn remove_storage(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    info!(path = %path.display(), "Removing index storage");
    fs::remove_dir_all(path)?;
    Ok(true)
}

fn create_or_open(path: &Path) -> Result<Index> {
    fs::create_dir_all(path).map_err(|e| ScenedexError::storage_open(path, e))?;

    match Index::create_in_dir(path, build_schema()) {
        Ok(index) => {
            info!(path = %path.display(), "Created scene index");
            Ok(index)
        }
        Err(TantivyError::IndexAlreadyExists) => {
            Index::open_in_dir(path).map_err(|e| ScenedexError::storage_open(path, e))
        }
        Err(e) => Err(ScenedexError::storage_open(path, e)),
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field(IndexField::Id.name(), STRING | STORED);
    builder.add_text_field(IndexField::Title.name(), text_options(SIMPLE_ANALYZER));
    builder.add_text_field(IndexField::Description.name(), text_options(STANDARD_ANALYZER));
    builder.add_text_field(IndexField::Cast.name(), text_options(SIMPLE_ANALYZER));
    builder.add_text_field(IndexField::Site.name(), text_options(STANDARD_ANALYZER));
    builder.add_date_field(IndexField::Released.name(), INDEXED | STORED | FAST);
    builder.add_date_field(IndexField::Added.name(), INDEXED | STORED | FAST);
    builder.add_u64_field(IndexField::Duration.name(), INDEXED | STORED | FAST);
    builder.build()
}

fn text_options(analyzer: &str) -> TextOptions {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(analyzer)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    TextOptions::default()
        .set_indexing_options(indexing)
        .set_stored()
}

fn register_analyzers(index: &Index) {
    let simple = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();

    let standard = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()),
        ))
        .build();

    index.tokenizers().register(SIMPLE_ANALYZER, simple);
    index.tokenizers().register(STANDARD_ANALYZER, standard);
}

fn to_engine_date(date: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(date.timestamp())
}
