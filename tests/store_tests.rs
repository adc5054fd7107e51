use std::sync::Arc;
use std::thread;

use graphbench::{
    GraphBenchError, SqliteStore, Store, UnitOfWork,
    store::{ENTITY_INDEX, EntityHandle},
};
use serde_json::json;
use tempfile::TempDir;

fn store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("store")
}

#[test]
fn test_commit_publishes_changes() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let a = uow.create_entity().expect("create");
    uow.set_property(a, "name", json!("alpha")).expect("set");
    uow.commit().expect("commit");

    let uow = store.begin_unit_of_work().expect("uow");
    assert_eq!(uow.get_entity(a.id()).expect("get"), a);
    assert_eq!(uow.properties(a).expect("props"), vec![("name".to_string(), json!("alpha"))]);
}

#[test]
fn test_rollback_and_drop_discard_changes() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let rolled_back = uow.create_entity().expect("create");
    uow.rollback().expect("rollback");

    let dropped = {
        let uow = store.begin_unit_of_work().expect("uow");
        uow.create_entity().expect("create")
    };

    let uow = store.begin_unit_of_work().expect("uow");
    for handle in [rolled_back, dropped] {
        assert!(matches!(uow.get_entity(handle.id()), Err(GraphBenchError::NotFound(_))));
    }
    assert!(uow.entity_ids(0, 10).expect("ids").is_empty());
}

#[test]
fn test_delete_requires_relationships_removed_first() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let a = uow.create_entity().expect("a");
    let b = uow.create_entity().expect("b");
    let rel = uow.create_relationship(a, b, "RELATED_TO").expect("rel");
    assert!(uow.delete_entity(a).is_err());

    let rels = uow.relationships(b).expect("rels");
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].other(b), a);

    uow.delete_relationship(rel).expect("delete rel");
    uow.delete_entity(a).expect("delete a");
    assert!(uow.relationships(b).expect("rels").is_empty());
    assert!(matches!(uow.delete_entity(a), Err(GraphBenchError::NotFound(_))));
    uow.commit().expect("commit");
}

#[test]
fn test_relationship_validation() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let a = uow.create_entity().expect("a");
    assert!(uow.create_relationship(a, a, "LOOP").is_err());
    assert!(uow.create_relationship(a, EntityHandle::new(999), "X").is_err());
    let b = uow.create_entity().expect("b");
    assert!(uow.create_relationship(a, b, " ").is_err());
}

#[test]
fn test_index_lookup_and_cleanup_on_delete() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let a = uow.create_entity().expect("a");
    let b = uow.create_entity().expect("b");
    uow.index_add(ENTITY_INDEX, a, "color", &json!("red")).expect("index a");
    uow.index_add(ENTITY_INDEX, b, "color", &json!("red")).expect("index b");
    uow.index_add(ENTITY_INDEX, b, "size", &json!(3)).expect("index size");

    let mut red = uow.index_lookup(ENTITY_INDEX, "color", &json!("red")).expect("lookup");
    red.sort();
    assert_eq!(red, vec![a, b]);
    assert_eq!(uow.index_lookup(ENTITY_INDEX, "size", &json!(3)).expect("lookup"), vec![b]);
    assert!(uow.index_lookup(ENTITY_INDEX, "size", &json!("3")).expect("lookup").is_empty());
    assert!(uow.index_lookup("other", "color", &json!("red")).expect("lookup").is_empty());

    uow.delete_entity(a).expect("delete");
    assert_eq!(uow.index_lookup(ENTITY_INDEX, "color", &json!("red")).expect("lookup"), vec![b]);
}

#[test]
fn test_entity_ids_pages_in_order() {
    let store = store();
    let uow = store.begin_unit_of_work().expect("uow");
    let created: Vec<EntityHandle> = (0..5).map(|_| uow.create_entity().expect("create")).collect();
    let first = uow.entity_ids(0, 3).expect("page");
    assert_eq!(first, created[..3].to_vec());
    let rest = uow.entity_ids(first[2].id(), 10).expect("page");
    assert_eq!(rest, created[3..].to_vec());
}

#[test]
fn test_file_store_persists_across_opens() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("store.db");
    let id = {
        let store = SqliteStore::open(&path).expect("open");
        let uow = store.begin_unit_of_work().expect("uow");
        let a = uow.create_entity().expect("create");
        uow.commit().expect("commit");
        a.id()
    };
    let store = SqliteStore::open(&path).expect("reopen");
    let uow = store.begin_unit_of_work().expect("uow");
    assert!(uow.get_entity(id).is_ok());
}

#[test]
fn test_units_of_work_from_many_threads() {
    let store = Arc::new(store());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    let uow = store.begin_unit_of_work().expect("uow");
                    uow.create_entity().expect("create");
                    uow.commit().expect("commit");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }
    let uow = store.begin_unit_of_work().expect("uow");
    assert_eq!(uow.entity_ids(0, 1_000).expect("ids").len(), 100);
}

#[test]
fn test_connection_counts() {
    let dir = TempDir::new().expect("tempdir");
    assert_eq!(store().connection_count(), 1);
    let single = SqliteStore::open_with_connections(dir.path().join("a.db"), 0).expect("open");
    assert_eq!(single.connection_count(), 1);
    let pooled = SqliteStore::open_with_connections(dir.path().join("b.db"), 3).expect("open");
    assert_eq!(pooled.connection_count(), 3);
}

#[test]
fn test_file_store_runs_units_of_work_side_by_side() {
    let dir = TempDir::new().expect("tempdir");
    let store = SqliteStore::open_with_connections(dir.path().join("store.db"), 2).expect("open");
    // With one connection the second begin would wait on the first forever.
    let first = store.begin_unit_of_work().expect("first");
    let second = store.begin_unit_of_work().expect("second");
    first.create_entity().expect("create");
    first.commit().expect("commit");
    second.create_entity().expect("create");
    second.commit().expect("commit");

    let uow = store.begin_unit_of_work().expect("uow");
    assert_eq!(uow.entity_ids(0, 10).expect("ids").len(), 2);
}

#[test]
fn test_file_store_connections_shared_by_threads() {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(
        SqliteStore::open_with_connections(dir.path().join("store.db"), 4).expect("open"),
    );
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    let uow = store.begin_unit_of_work().expect("uow");
                    uow.create_entity().expect("create");
                    uow.commit().expect("commit");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("join");
    }
    let uow = store.begin_unit_of_work().expect("uow");
    assert_eq!(uow.entity_ids(0, 1_000).expect("ids").len(), 100);
}
