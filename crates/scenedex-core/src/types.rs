//! Core data types for Scenedex.
//!
//! These types mirror the catalog records owned by the record store. The
//! core reads them but never mutates them; they are serializable so a
//! catalog can be exchanged as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cast member credited on a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
}

impl CastMember {
    pub fn new(name: impl Into<String>) -> Self {
        CastMember { name: name.into() }
    }
}

/// A tag attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag { name: name.into() }
    }
}

/// A catalog entry as stored by the record store.
///
/// `scene_id` is the identity used everywhere in the index: one indexed
/// document exists per scene id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Unique scene identifier
    pub scene_id: String,

    /// Scene title
    #[serde(default)]
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub synopsis: String,

    /// Site or studio the scene was published on
    #[serde(default)]
    pub site: String,

    /// Release date, if known
    #[serde(default)]
    pub release_date: Option<NaiveDate>,

    /// When the record was added to the catalog
    pub created_at: DateTime<Utc>,

    /// Running time in seconds
    #[serde(default)]
    pub duration: u64,

    /// Credited cast, eagerly loaded by the record store
    #[serde(default)]
    pub cast: Vec<CastMember>,

    /// Tags, eagerly loaded by the record store
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl SceneRecord {
    /// Create a record with the given id and title, added now.
    pub fn new(scene_id: impl Into<String>, title: impl Into<String>) -> Self {
        SceneRecord {
            scene_id: scene_id.into(),
            title: title.into(),
            synopsis: String::new(),
            site: String::new(),
            release_date: None,
            created_at: Utc::now(),
            duration: 0,
            cast: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_synopsis(mut self, synopsis: impl Into<String>) -> Self {
        self.synopsis = synopsis.into();
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    pub fn with_release_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    /// Add a cast member
    pub fn with_cast(mut self, name: impl Into<String>) -> Self {
        self.cast.push(CastMember::new(name));
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name));
        self
    }
}

impl fmt::Display for SceneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.site.is_empty() {
            write!(f, "{} ({})", self.title, self.scene_id)
        } else {
            write!(f, "{} - {} ({})", self.site, self.title, self.scene_id)
        }
    }
}

/// Lightweight record produced by the scraping pipeline.
///
/// Only the id is needed to resolve the full record; the remaining fields
/// are carried for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedScene {
    pub scene_id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub site: Option<String>,

    /// Name of the scraper that produced the record
    #[serde(default)]
    pub scraper: Option<String>,
}

impl ScrapedScene {
    pub fn new(scene_id: impl Into<String>) -> Self {
        ScrapedScene {
            scene_id: scene_id.into(),
            ..Default::default()
        }
    }
}

/// A scene returned by a search with its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredScene {
    /// The full record, resolved through the record store
    pub scene: SceneRecord,

    /// Relevance score (higher is more relevant)
    pub score: f32,
}

impl ScoredScene {
    pub fn new(scene: SceneRecord, score: f32) -> Self {
        ScoredScene { scene, score }
    }
}
