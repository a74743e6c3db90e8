use agent_memory::{
    Attributes, LessonQuery, MemoryStore, Outcome, RememberOptions, StorePath,
};
use serde_json::json;

fn attrs(value: serde_json::Value) -> Attributes {
    value.as_object().cloned().unwrap()
}

#[test]
fn memory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("memory.db");

    let (fact_id, replacement) = {
        let mut store = MemoryStore::open(db.as_path()).unwrap();
        let fact_id = store
            .remember("The build server is ci-01", RememberOptions::default().with_tags(["infra"]))
            .unwrap();
        let replacement = store
            .supersede(fact_id, "The build server is ci-02", RememberOptions::default().with_tags(["infra"]))
            .unwrap();
        store
            .learn("restarted ci-01", Some("outage"), Outcome::Failure, "ci-01 needs a disk swap")
            .unwrap();
        store
            .track_entity("ci-02", attrs(json!({"name": "Build box", "cores": 16})))
            .unwrap();
        store.close().unwrap();
        (fact_id, replacement)
    };

    let mut store = MemoryStore::open(db.as_path()).unwrap();
    assert_eq!(store.path(), &StorePath::File(db.clone()));

    let stats = store.stats().unwrap();
    assert_eq!((stats.facts, stats.lessons, stats.entities), (1, 1, 1));

    let hits = store.recall("build server", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fact.id, replacement);

    let old = store.get_fact(fact_id).unwrap().unwrap();
    assert_eq!(old.superseded_by, Some(replacement));

    let lessons = store.get_lessons(&LessonQuery::default().outcome(Outcome::Failure)).unwrap();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].context.as_deref(), Some("outage"));

    let entity = store.get_entity("ci-02", false).unwrap().unwrap();
    assert_eq!(entity.name, "Build box");
    assert_eq!(entity.attribute("cores"), Some(&json!(16)));

    assert!(store.check_index().unwrap().is_consistent());
}

#[test]
fn dropped_store_releases_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("memory.db");

    {
        let mut store = MemoryStore::open(db.as_path()).unwrap();
        store.remember("scoped", RememberOptions::default()).unwrap();
        // Dropped here without an explicit close
    }

    let mut store = MemoryStore::open(db.as_path()).unwrap();
    let id = store.remember("SCOPED", RememberOptions::default()).unwrap();
    assert_eq!(store.get_fact(id).unwrap().unwrap().access_count, 1);
}

#[test]
fn in_memory_sentinel_is_not_persisted() {
    let mut store = MemoryStore::open(":memory:").unwrap();
    assert!(store.path().is_in_memory());
    store.remember("ephemeral", RememberOptions::default()).unwrap();
    drop(store);

    let store = MemoryStore::open(":memory:").unwrap();
    assert_eq!(store.stats().unwrap().facts, 0);
}
