//! Document engine for the collaborative whiteboard.
//!
//! This crate owns everything that lives on the drawing surface: the object
//! model, the quadtree spatial index, the authoritative object store, the
//! operation-based undo/redo history, and transient selection/clipboard
//! state. The [`manager::ObjectManager`] is the single entry point — it
//! decides which mutations are recorded in history (local, user-initiated)
//! and which bypass it entirely (remote, applied on behalf of peers).
//!
//! The crate is synchronous and single-owner by design: all store, index,
//! and history mutations flow through one `ObjectManager`, so the
//! remove-then-reinsert index invariant and the history push are atomic with
//! respect to each other. Network concerns live in the `session` crate,
//! reached only through the [`manager::Broadcaster`] trait.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | World-space points and axis-aligned bounds |
//! | [`object`] | [`object::DrawingObject`] model and bounds derivation |
//! | [`quadtree`] | [`quadtree::SpatialIndex`] for bounds-overlap queries |
//! | [`store`] | Authoritative object collection + index consistency |
//! | [`history`] | Reversible [`history::Operation`] log with undo/redo |
//! | [`selection`] | Selected-id set and clipboard snapshots |
//! | [`ui_state`] | Observer-pattern tool/color store |
//! | [`manager`] | [`manager::ObjectManager`] orchestrator |

pub mod geometry;
pub mod history;
pub mod manager;
pub mod object;
pub mod quadtree;
pub mod selection;
pub mod store;
pub mod ui_state;
