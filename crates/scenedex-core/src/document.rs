//! Mapping from catalog records to index documents.

use crate::types::SceneRecord;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// The indexed shape of a scene.
///
/// Dates are kept at day precision: time-of-day is dropped so that date
/// equality and range queries do not depend on the time zone a record was
/// written in.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Cast names, spaced then concatenated (`Jane Doe JaneDoe`)
    pub cast: String,
    pub site: String,
    pub released: Option<DateTime<Utc>>,
    pub added: DateTime<Utc>,
    /// Running time in seconds
    pub duration: u64,
}

/// Build the index document for a scene.
pub fn to_document(scene: &SceneRecord) -> IndexedDocument {
    IndexedDocument {
        id: scene.scene_id.clone(),
        title: scene.title.clone(),
        description: scene.synopsis.clone(),
        cast: cast_field(scene),
        site: scene.site.clone(),
        released: scene.release_date.map(midnight_utc),
        added: midnight_utc(scene.created_at.date_naive()),
        duration: scene.duration,
    }
}

/// Every cast name as written, followed by every name with its whitespace
/// removed, so both `Jane Doe` and `JaneDoe` match.
fn cast_field(scene: &SceneRecord) -> String {
    let spaced = scene.cast.iter().map(|c| c.name.trim().to_string());
    let joined = scene
        .cast
        .iter()
        .map(|c| c.name.split_whitespace().collect::<String>());

    spaced
        .chain(joined)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cast_has_spaced_and_joined_names() {
        let scene = SceneRecord::new("s1", "Title")
            .with_cast("Jane Doe")
            .with_cast("Bob");

        let doc = to_document(&scene);
        assert_eq!(doc.cast, "Jane Doe Bob JaneDoe Bob");
    }

    #[test]
    fn test_no_cast() {
        let doc = to_document(&SceneRecord::new("s1", "Title"));
        assert_eq!(doc.cast, "");
    }

    #[test]
    fn test_dates_truncated_to_day() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 58).unwrap();
        let scene = SceneRecord::new("s1", "Title")
            .with_release_date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .with_created_at(created);

        let doc = to_document(&scene);
        assert_eq!(
            doc.released,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(doc.added, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_direct_projections() {
        let scene = SceneRecord::new("s9", "Night Drive")
            .with_synopsis("A long drive")
            .with_site("Studio X")
            .with_duration(2400);

        let doc = to_document(&scene);
        assert_eq!(doc.id, "s9");
        assert_eq!(doc.title, "Night Drive");
        assert_eq!(doc.description, "A long drive");
        assert_eq!(doc.site, "Studio X");
        assert_eq!(doc.duration, 2400);
        assert_eq!(doc.released, None);
    }
}
