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

fn add_and_record(store: &mut ObjectStore, history: &mut HistoryManager) -> DrawingObject {
    let obj = rect(0.0, 0.0);
    store.insert(obj.clone()).unwrap();
    history.record(Operation::AddObject { object: obj.clone() }, Some("me".into()));
    obj
}

#[test]
fn undo_add_removes_object() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let obj = add_and_record(&mut store, &mut history);

    let entry = history.undo(&mut store).unwrap();
    assert_eq!(entry.op, Operation::AddObject { object: obj });
    assert!(store.is_empty());
    assert!(!history.can_undo());
    assert!(history.can_redo());
}

#[test]
fn redo_reapplies_add() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let obj = add_and_record(&mut store, &mut history);

    history.undo(&mut store).unwrap();
    let entry = history.redo(&mut store).unwrap();
    assert_eq!(entry.op, Operation::AddObject { object: obj.clone() });
    assert!(store.contains(obj.id));
    assert!(!history.can_redo());
}

#[test]
fn three_adds_two_undos_leaves_first() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let a = add_and_record(&mut store, &mut history);
    let b = add_and_record(&mut store, &mut history);
    let c = add_and_record(&mut store, &mut history);

    history.undo(&mut store).unwrap();
    history.undo(&mut store).unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.contains(a.id));
    assert!(!store.contains(b.id));
    assert!(!store.contains(c.id));

    // Redo brings the second back.
    history.redo(&mut store).unwrap();
    assert!(store.contains(b.id));
    assert_eq!(store.len(), 2);
}

#[test]
fn recording_truncates_redo_tail() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    add_and_record(&mut store, &mut history);
    let b = add_and_record(&mut store, &mut history);

    history.undo(&mut store).unwrap();
    assert!(history.can_redo());

    // New mutation while mid-stack: the undone branch is gone for good.
    add_and_record(&mut store, &mut history);
    assert!(!history.can_redo());
    assert!(history.redo(&mut store).is_none());
    assert!(!store.contains(b.id));
}

#[test]
fn undo_update_restores_before_state() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let before = rect(0.0, 0.0);
    let id = before.id;
    store.insert(before.clone()).unwrap();

    let mut after = before.clone();
    after.data = json!({"x": 50.0, "y": 50.0, "width": 10.0, "height": 10.0});
    store.replace(after.clone()).unwrap();
    history.record(Operation::UpdateObject { id, before: before.clone(), after }, None);

    history.undo(&mut store).unwrap();
    assert_eq!(store.get(id).unwrap().data, before.data);

    history.redo(&mut store).unwrap();
    let b = store.get(id).unwrap().bounds();
    assert_eq!((b.x, b.y), (50.0, 50.0));
}

#[test]
fn undo_move_shifts_group_back() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let a = rect(0.0, 0.0);
    let b = rect(100.0, 100.0);
    let ids = vec![a.id, b.id];
    store.insert(a.clone()).unwrap();
    store.insert(b.clone()).unwrap();

    for id in &ids {
        store.update_with(*id, |o| o.translate(5.0, 7.0)).unwrap();
    }
    history.record(Operation::MoveObjects { ids: ids.clone(), dx: 5.0, dy: 7.0 }, None);

    history.undo(&mut store).unwrap();
    let ba = store.get(a.id).unwrap().bounds();
    assert_eq!((ba.x, ba.y), (0.0, 0.0));
    let bb = store.get(b.id).unwrap().bounds();
    assert_eq!((bb.x, bb.y), (100.0, 100.0));
}

#[test]
fn undo_remove_restores_object() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let obj = rect(0.0, 0.0);
    store.insert(obj.clone()).unwrap();

    let removed = store.remove(obj.id).unwrap();
    history.record(Operation::RemoveObject { object: removed }, None);

    history.undo(&mut store).unwrap();
    assert!(store.contains(obj.id));
}

#[test]
fn undo_survives_remotely_deleted_target() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    let obj = add_and_record(&mut store, &mut history);

    // Another user deleted it in the meantime.
    store.remove(obj.id).unwrap();

    // Undo of the add finds nothing to delete; it must not panic or error.
    let entry = history.undo(&mut store);
    assert!(entry.is_some());
    assert!(store.is_empty());
}

#[test]
fn stack_is_capped() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    for _ in 0..150 {
        add_and_record(&mut store, &mut history);
    }
    assert_eq!(history.depth(), 100);

    let mut undone = 0;
    while history.undo(&mut store).is_some() {
        undone += 1;
    }
    assert_eq!(undone, 100);
    assert_eq!(store.len(), 50);
}

#[test]
fn clear_drops_both_directions() {
    let mut store = ObjectStore::new();
    let mut history = HistoryManager::new();
    add_and_record(&mut store, &mut history);
    history.undo(&mut store).unwrap();

    history.clear();
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}
