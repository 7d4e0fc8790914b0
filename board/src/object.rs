//! Drawing object model and bounds derivation.
//!
//! A [`DrawingObject`] couples an id and kind with an open JSON `data`
//! payload (geometry + style). The engine never caches derived bounds on the
//! object — [`DrawingObject::bounds`] recomputes from `data` on every call,
//! and the quadtree entry is the only transient copy.
//!
//! Payload conventions per kind:
//!
//! | Kind | Geometry fields in `data` |
//! |------|---------------------------|
//! | `stroke` | `points: [[x, y], ...]` |
//! | `rectangle` | `x, y, width, height` |
//! | `circle` | `cx, cy, radius` |
//! | `line` | `x1, y1, x2, y2` |
//! | `text` | `x, y, text, fontSize` |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use wire::{ObjectId, ObjectKind, ObjectPayload};

use crate::geometry::{Bounds, Point, point_to_segment_distance};

/// Screen-independent hit slop for thin geometry (strokes, lines), in world units.
const HIT_SLOP: f64 = 4.0;

/// Fallback metrics for text bounds when the payload carries no explicit size.
const TEXT_CHAR_ASPECT: f64 = 0.6;
const TEXT_LINE_FACTOR: f64 = 1.2;
const DEFAULT_FONT_SIZE: f64 = 16.0;

// =============================================================================
// DRAWING OBJECT
// =============================================================================

/// A drawing object as held by the store.
///
/// `selected` is transient UI state: never persisted, never broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingObject {
    /// Unique identifier; generated when absent from inbound data.
    pub id: ObjectId,
    /// Shape kind.
    pub kind: ObjectKind,
    /// Opaque geometry + style payload.
    pub data: Value,
    /// Transient selection flag.
    #[serde(skip)]
    pub selected: bool,
    /// Owning user, if known.
    pub owner_user_id: Option<String>,
}

impl DrawingObject {
    /// Create a new object with a fresh id.
    #[must_use]
    pub fn new(kind: ObjectKind, data: Value, owner_user_id: Option<String>) -> Self {
        Self { id: Uuid::new_v4(), kind, data, selected: false, owner_user_id }
    }

    /// Build from a wire payload, keeping the payload's id.
    #[must_use]
    pub fn from_payload(payload: ObjectPayload) -> Self {
        Self {
            id: payload.id,
            kind: payload.kind,
            data: payload.data,
            selected: false,
            owner_user_id: payload.user_id,
        }
    }

    /// Convert to a wire payload (drops the transient `selected` flag).
    #[must_use]
    pub fn to_payload(&self) -> ObjectPayload {
        ObjectPayload {
            id: self.id,
            kind: self.kind,
            data: self.data.clone(),
            user_id: self.owner_user_id.clone(),
        }
    }

    /// Derive this object's axis-aligned bounds from its payload.
    ///
    /// Missing or malformed geometry degrades to a zero-size box at the
    /// origin rather than failing: a damaged payload should never take the
    /// index down with it.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let d = Data::new(&self.data);
        match self.kind {
            ObjectKind::Stroke => points_bounds(&self.data),
            ObjectKind::Rectangle => {
                Bounds::new(d.f64("x"), d.f64("y"), d.f64("width"), d.f64("height"))
            }
            ObjectKind::Circle => {
                let r = d.f64("radius");
                Bounds::new(d.f64("cx") - r, d.f64("cy") - r, r * 2.0, r * 2.0)
            }
            ObjectKind::Line => {
                let (x1, y1, x2, y2) = (d.f64("x1"), d.f64("y1"), d.f64("x2"), d.f64("y2"));
                Bounds::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
            }
            ObjectKind::Text => {
                let font = d.f64_or("fontSize", DEFAULT_FONT_SIZE);
                #[allow(clippy::cast_precision_loss)]
                let width = d.str("text").chars().count() as f64 * font * TEXT_CHAR_ASPECT;
                Bounds::new(d.f64("x"), d.f64("y"), width, font * TEXT_LINE_FACTOR)
            }
        }
    }

    /// Precise containment test used after a coarse index query.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        let d = Data::new(&self.data);
        let slop = d.f64_or("strokeWidth", 2.0) / 2.0 + HIT_SLOP;
        match self.kind {
            ObjectKind::Rectangle | ObjectKind::Text => self.bounds().contains_point(p),
            ObjectKind::Circle => {
                let center = Point::new(d.f64("cx"), d.f64("cy"));
                p.distance_to(center) <= d.f64("radius") + slop
            }
            ObjectKind::Line => {
                let a = Point::new(d.f64("x1"), d.f64("y1"));
                let b = Point::new(d.f64("x2"), d.f64("y2"));
                point_to_segment_distance(p, a, b) <= slop
            }
            ObjectKind::Stroke => {
                let pts = points_of(&self.data);
                match pts.len() {
                    0 => false,
                    1 => p.distance_to(pts[0]) <= slop,
                    _ => pts
                        .windows(2)
                        .any(|w| point_to_segment_distance(p, w[0], w[1]) <= slop),
                }
            }
        }
    }

    /// Shift the object's geometry by a delta, mutating `data` in place.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self.kind {
            ObjectKind::Stroke => {
                if let Some(points) = self.data.get_mut("points").and_then(Value::as_array_mut) {
                    for pair in points.iter_mut().filter_map(Value::as_array_mut) {
                        shift_value(pair.get_mut(0), dx);
                        shift_value(pair.get_mut(1), dy);
                    }
                }
            }
            ObjectKind::Rectangle | ObjectKind::Text => {
                shift_field(&mut self.data, "x", dx);
                shift_field(&mut self.data, "y", dy);
            }
            ObjectKind::Circle => {
                shift_field(&mut self.data, "cx", dx);
                shift_field(&mut self.data, "cy", dy);
            }
            ObjectKind::Line => {
                shift_field(&mut self.data, "x1", dx);
                shift_field(&mut self.data, "y1", dy);
                shift_field(&mut self.data, "x2", dx);
                shift_field(&mut self.data, "y2", dy);
            }
        }
    }
}

// =============================================================================
// PAYLOAD ACCESS
// =============================================================================

/// Typed read access to common fields of a `data` JSON bag.
struct Data<'a> {
    value: &'a Value,
}

impl<'a> Data<'a> {
    fn new(value: &'a Value) -> Self {
        Self { value }
    }

    fn f64(&self, key: &str) -> f64 {
        self.f64_or(key, 0.0)
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.value.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn str(&self, key: &str) -> &str {
        self.value.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

fn points_of(data: &Value) -> Vec<Point> {
    data.get("points")
        .and_then(Value::as_array)
        .map(|pts| {
            pts.iter()
                .filter_map(|pair| {
                    let xs = pair.as_array()?;
                    Some(Point::new(xs.first()?.as_f64()?, xs.get(1)?.as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn points_bounds(data: &Value) -> Bounds {
    let pts = points_of(data);
    let Some(first) = pts.first() else {
        return Bounds::new(0.0, 0.0, 0.0, 0.0);
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &pts[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

fn shift_field(data: &mut Value, key: &str, delta: f64) {
    if let Some(v) = data.get_mut(key) {
        shift_value(Some(v), delta);
    }
}

fn shift_value(slot: Option<&mut Value>, delta: f64) {
    if let Some(v) = slot {
        if let Some(n) = v.as_f64() {
            if let Some(num) = serde_json::Number::from_f64(n + delta) {
                *v = Value::Number(num);
            }
        }
    }
}

#[cfg(test)]
#[path = "object_test.rs"]
mod tests;
