//! End-to-end behavior of indexing and search against an on-disk index.

use scenedex_core::{
    canonicalize, IndexOptions, IndexSettings, Indexer, LockRegistry, MemorySceneStore, OpenMode,
    SceneIndex, SceneRecord, SceneSearcher, SearchSettings, INDEX_LOCK,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    store: Arc<MemorySceneStore>,
    locks: Arc<LockRegistry>,
    indexer: Indexer,
    searcher: SceneSearcher,
}

impl Fixture {
    fn new(scenes: Vec<SceneRecord>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("scenedex_core=debug")
            .try_init();

        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemorySceneStore::from_scenes(scenes));
        let locks = Arc::new(LockRegistry::new());
        let indexer = Indexer::new(
            store.clone(),
            locks.clone(),
            IndexSettings::new(dir.path(), "scenes").with_page_size(3),
        );
        let searcher = SceneSearcher::new(store.clone(), SearchSettings::new(dir.path(), "scenes"));

        Fixture {
            _dir: dir,
            store,
            locks,
            indexer,
            searcher,
        }
    }

    fn ids(&self, query: &str) -> Vec<String> {
        self.searcher
            .fuzzy_search(query)
            .into_iter()
            .map(|s| s.scene.scene_id)
            .collect()
    }

    fn num_docs(&self) -> u64 {
        let settings = self.indexer.settings();
        SceneIndex::open_or_create(
            &settings.dir,
            &settings.name,
            OpenMode::ReadOnly,
            &IndexOptions::default(),
        )
        .unwrap()
        .num_docs()
    }
}

fn catalog() -> Vec<SceneRecord> {
    vec![
        SceneRecord::new("s1", "Harbor Lights")
            .with_site("PXVR")
            .with_cast("Jane Doe"),
        SceneRecord::new("s2", "Canyon Echo").with_cast("Mark Stone"),
        SceneRecord::new("s3", "Desert Bloom").with_synopsis("Wildflowers after the rain"),
        SceneRecord::new("s4", "Night Market"),
        SceneRecord::new("s5", "Glacier Run"),
    ]
}

#[test]
fn rebuild_then_search() {
    let fx = Fixture::new(catalog());
    let outcome = fx.indexer.rebuild().unwrap();
    assert_eq!(outcome.report().unwrap().written, 5);

    assert_eq!(fx.ids("canyon"), vec!["s2"]);
    assert_eq!(fx.ids("wildflowers"), vec!["s3"]);
}

#[test]
fn repeated_rebuild_is_stable() {
    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();
    let first = fx.num_docs();
    fx.indexer.rebuild().unwrap();
    assert_eq!(fx.num_docs(), first);
    assert_eq!(first, 5);
}

#[test]
fn changed_title_replaces_old_terms() {
    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();

    let renamed = SceneRecord::new("s4", "Lantern Festival");
    fx.store.upsert(renamed.clone());
    fx.indexer.index_scenes(&[renamed]).unwrap();

    assert_eq!(fx.ids("lantern"), vec!["s4"]);
    assert!(fx.ids("market").is_empty());
}

#[test]
fn one_letter_rename_drops_old_spelling() {
    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();
    assert_eq!(fx.ids("harbor"), vec!["s1"]);

    let renamed = SceneRecord::new("s1", "Harbour Lights");
    fx.store.upsert(renamed.clone());
    fx.indexer.index_scenes(&[renamed]).unwrap();

    assert!(fx.ids("harbor").is_empty());
    assert_eq!(fx.ids("harbour"), vec!["s1"]);
}

#[test]
fn possessive_filename_matches() {
    let fx = Fixture::new(vec![
        SceneRecord::new("s1", "Jane's Day Out"),
        SceneRecord::new("s2", "Canyon Echo"),
    ]);
    fx.indexer.rebuild().unwrap();

    let matches = fx.searcher.match_filename("Jane_s_Day_Out.mp4");
    assert_eq!(matches[0].scene.scene_id, "s1");
}

#[test]
fn deleted_scenes_disappear() {
    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();
    assert_eq!(fx.ids("glacier"), vec!["s5"]);

    fx.indexer.delete_scene_ids(&["s5".to_string()]).unwrap();
    assert!(fx.ids("glacier").is_empty());
    assert_eq!(fx.num_docs(), 4);
}

#[test]
fn joined_cast_name_finds_same_scene() {
    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();

    assert_eq!(fx.ids("Jane Doe"), vec!["s1"]);
    assert_eq!(fx.ids("JaneDoe"), vec!["s1"]);
}

#[test]
fn held_lock_skips_rebuild() {
    let fx = Fixture::new(catalog());
    let guard = fx.locks.acquire(INDEX_LOCK).unwrap();

    assert!(fx.indexer.rebuild().unwrap().is_skipped());
    drop(guard);

    assert!(!fx.indexer.rebuild().unwrap().is_skipped());
    assert_eq!(fx.num_docs(), 5);
}

#[test]
fn search_before_any_rebuild_is_empty() {
    let fx = Fixture::new(catalog());
    assert!(fx.searcher.fuzzy_search("harbor").is_empty());
}

#[test]
fn filename_matching() {
    assert_eq!(canonicalize("My.Scene_1080p.h264.mp4"), "My Scene");

    let canonical = canonicalize("PXVR 258.mp4");
    for variant in ["PXVR 258", "PXVR00258", "PXVR258"] {
        assert!(canonical.contains(variant), "{} missing {}", canonical, variant);
    }

    let fx = Fixture::new(catalog());
    fx.indexer.rebuild().unwrap();
    let matches = fx.searcher.match_filename("Harbor_Lights-4k.mp4");
    assert_eq!(matches[0].scene.scene_id, "s1");
}
