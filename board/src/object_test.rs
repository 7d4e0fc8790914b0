use super::*;
use serde_json::json;

fn rect(x: f64, y: f64, w: f64, h: f64) -> DrawingObject {
    DrawingObject::new(
        ObjectKind::Rectangle,
        json!({"x": x, "y": y, "width": w, "height": h}),
        None,
    )
}

// =============================================================================
// BOUNDS DERIVATION
// =============================================================================

#[test]
fn rectangle_bounds_mirror_payload() {
    let obj = rect(10.0, 20.0, 30.0, 40.0);
    assert_eq!(obj.bounds(), crate::geometry::Bounds::new(10.0, 20.0, 30.0, 40.0));
}

#[test]
fn circle_bounds_span_diameter() {
    let obj = DrawingObject::new(ObjectKind::Circle, json!({"cx": 50.0, "cy": 50.0, "radius": 10.0}), None);
    let b = obj.bounds();
    assert_eq!((b.x, b.y, b.width, b.height), (40.0, 40.0, 20.0, 20.0));
}

#[test]
fn line_bounds_normalize_endpoint_order() {
    let obj = DrawingObject::new(ObjectKind::Line, json!({"x1": 30.0, "y1": 5.0, "x2": 10.0, "y2": 25.0}), None);
    let b = obj.bounds();
    assert_eq!((b.x, b.y, b.width, b.height), (10.0, 5.0, 20.0, 20.0));
}

#[test]
fn stroke_bounds_cover_all_points() {
    let obj = DrawingObject::new(
        ObjectKind::Stroke,
        json!({"points": [[0.0, 0.0], [10.0, -5.0], [4.0, 8.0]]}),
        None,
    );
    let b = obj.bounds();
    assert_eq!((b.x, b.y, b.width, b.height), (0.0, -5.0, 10.0, 13.0));
}

#[test]
fn malformed_payload_degrades_to_zero_bounds() {
    let obj = DrawingObject::new(ObjectKind::Stroke, json!({"points": "oops"}), None);
    let b = obj.bounds();
    assert_eq!((b.width, b.height), (0.0, 0.0));
}

// =============================================================================
// HIT TESTING
// =============================================================================

#[test]
fn rectangle_contains_interior_not_exterior() {
    let obj = rect(0.0, 0.0, 10.0, 10.0);
    assert!(obj.contains_point(crate::geometry::Point::new(5.0, 5.0)));
    assert!(!obj.contains_point(crate::geometry::Point::new(15.0, 5.0)));
}

#[test]
fn line_hit_respects_slop() {
    let obj = DrawingObject::new(ObjectKind::Line, json!({"x1": 0.0, "y1": 0.0, "x2": 100.0, "y2": 0.0}), None);
    assert!(obj.contains_point(crate::geometry::Point::new(50.0, 3.0)));
    assert!(!obj.contains_point(crate::geometry::Point::new(50.0, 30.0)));
}

#[test]
fn stroke_hit_checks_each_segment() {
    let obj = DrawingObject::new(
        ObjectKind::Stroke,
        json!({"points": [[0.0, 0.0], [50.0, 0.0], [50.0, 50.0]]}),
        None,
    );
    assert!(obj.contains_point(crate::geometry::Point::new(50.0, 25.0)));
    assert!(!obj.contains_point(crate::geometry::Point::new(0.0, 50.0)));
}

#[test]
fn empty_stroke_hits_nothing() {
    let obj = DrawingObject::new(ObjectKind::Stroke, json!({"points": []}), None);
    assert!(!obj.contains_point(crate::geometry::Point::new(0.0, 0.0)));
}

// =============================================================================
// TRANSLATE
// =============================================================================

#[test]
fn translate_rectangle_moves_origin() {
    let mut obj = rect(10.0, 10.0, 5.0, 5.0);
    obj.translate(3.0, -2.0);
    let b = obj.bounds();
    assert_eq!((b.x, b.y), (13.0, 8.0));
}

#[test]
fn translate_stroke_moves_every_point() {
    let mut obj = DrawingObject::new(
        ObjectKind::Stroke,
        json!({"points": [[0.0, 0.0], [10.0, 10.0]]}),
        None,
    );
    obj.translate(5.0, 5.0);
    let b = obj.bounds();
    assert_eq!((b.x, b.y, b.width, b.height), (5.0, 5.0, 10.0, 10.0));
}

#[test]
fn translate_line_moves_both_endpoints() {
    let mut obj = DrawingObject::new(ObjectKind::Line, json!({"x1": 0.0, "y1": 0.0, "x2": 10.0, "y2": 0.0}), None);
    obj.translate(1.0, 1.0);
    let b = obj.bounds();
    assert_eq!((b.x, b.y, b.width), (1.0, 1.0, 10.0));
}

// =============================================================================
// PAYLOAD CONVERSION
// =============================================================================

#[test]
fn payload_round_trip_drops_selection() {
    let mut obj = rect(1.0, 2.0, 3.0, 4.0);
    obj.selected = true;
    obj.owner_user_id = Some("u-1".into());

    let payload = obj.to_payload();
    assert_eq!(payload.id, obj.id);
    assert_eq!(payload.user_id.as_deref(), Some("u-1"));

    let restored = DrawingObject::from_payload(payload);
    assert!(!restored.selected);
    assert_eq!(restored.data, obj.data);
}
