use super::*;
use crate::object::ObjectKind;
use serde_json::json;

fn rect(x: f64, y: f64) -> DrawingObject {
    DrawingObject::new(
        ObjectKind::Rectangle,
        json!({"x": x, "y": y, "width": 10.0, "height": 10.0}),
        None,
    )
}

#[test]
fn insert_then_query_and_get() {
    let mut store = ObjectStore::new();
    let obj = rect(0.0, 0.0);
    let id = obj.id;
    store.insert(obj).unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.get(id).is_some());
    assert_eq!(store.query_rect(&Bounds::new(-5.0, -5.0, 20.0, 20.0)), vec![id]);
}

#[test]
fn duplicate_insert_is_rejected() {
    let mut store = ObjectStore::new();
    let obj = rect(0.0, 0.0);
    let dup = obj.clone();
    store.insert(obj).unwrap();
    assert_eq!(store.insert(dup.clone()), Err(StoreError::DuplicateId(dup.id)));
    assert_eq!(store.len(), 1);
}

#[test]
fn remove_clears_map_index_and_z_order() {
    let mut store = ObjectStore::new();
    let obj = rect(0.0, 0.0);
    let id = obj.id;
    store.insert(obj).unwrap();

    let removed = store.remove(id).unwrap();
    assert_eq!(removed.id, id);
    assert!(store.is_empty());
    assert!(store.query_rect(&Bounds::new(-100.0, -100.0, 200.0, 200.0)).is_empty());
    assert_eq!(store.remove(id), Err(StoreError::NotFound(id)));
}

#[test]
fn update_with_reindexes_at_new_bounds() {
    let mut store = ObjectStore::new();
    let obj = rect(0.0, 0.0);
    let id = obj.id;
    store.insert(obj).unwrap();

    store.update_with(id, |o| o.translate(200.0, 200.0)).unwrap();

    assert!(store.query_rect(&Bounds::new(0.0, 0.0, 20.0, 20.0)).is_empty());
    assert_eq!(store.query_rect(&Bounds::new(195.0, 195.0, 20.0, 20.0)), vec![id]);
}

#[test]
fn replace_swaps_payload_for_known_id() {
    let mut store = ObjectStore::new();
    let obj = rect(0.0, 0.0);
    let id = obj.id;
    store.insert(obj).unwrap();

    let mut incoming = rect(50.0, 50.0);
    incoming.id = id;
    incoming.owner_user_id = Some("u-2".into());
    store.replace(incoming).unwrap();

    let stored = store.get(id).unwrap();
    assert_eq!(stored.owner_user_id.as_deref(), Some("u-2"));
    assert_eq!(store.query_rect(&Bounds::new(45.0, 45.0, 20.0, 20.0)), vec![id]);
}

#[test]
fn query_rect_returns_back_to_front_order() {
    let mut store = ObjectStore::new();
    let a = rect(0.0, 0.0);
    let b = rect(5.0, 5.0);
    let (id_a, id_b) = (a.id, b.id);
    store.insert(a).unwrap();
    store.insert(b).unwrap();

    assert_eq!(store.query_rect(&Bounds::new(0.0, 0.0, 20.0, 20.0)), vec![id_a, id_b]);

    store.bring_to_front(id_a);
    assert_eq!(store.query_rect(&Bounds::new(0.0, 0.0, 20.0, 20.0)), vec![id_b, id_a]);
}

#[test]
fn load_snapshot_replaces_document() {
    let mut store = ObjectStore::new();
    store.insert(rect(0.0, 0.0)).unwrap();

    let fresh = vec![rect(100.0, 100.0), rect(200.0, 200.0)];
    let ids: Vec<_> = fresh.iter().map(|o| o.id).collect();
    store.load_snapshot(fresh);

    assert_eq!(store.len(), 2);
    assert_eq!(store.snapshot().iter().map(|o| o.id).collect::<Vec<_>>(), ids);
    assert!(store.query_rect(&Bounds::new(0.0, 0.0, 20.0, 20.0)).is_empty());
}

#[test]
fn load_snapshot_keeps_last_duplicate() {
    let mut store = ObjectStore::new();
    let first = rect(0.0, 0.0);
    let mut second = rect(300.0, 300.0);
    second.id = first.id;
    let id = first.id;

    store.load_snapshot(vec![first, second]);

    assert_eq!(store.len(), 1);
    assert_eq!(store.query_rect(&Bounds::new(295.0, 295.0, 20.0, 20.0)), vec![id]);
    assert!(store.query_rect(&Bounds::new(0.0, 0.0, 20.0, 20.0)).is_empty());
}
