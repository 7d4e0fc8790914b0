//! Observable UI state: active tool and style settings.
//!
//! A small keyed observer store. Components subscribe to one path ("tool",
//! "color", "strokeWidth") and are called back with the new value whenever
//! it changes. Setting a path to its current value does not notify.

use std::collections::HashMap;

/// Active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Stroke,
    Rectangle,
    Circle,
    Line,
    Text,
    Eraser,
}

/// Value delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum UiValue {
    Tool(Tool),
    Color(String),
    StrokeWidth(f64),
}

type Listener = Box<dyn FnMut(&UiValue) + Send>;

/// Handle identifying one subscription, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

// =============================================================================
// UI STORE
// =============================================================================

/// Holder of tool/style state plus per-path listener lists.
pub struct UiStore {
    tool: Tool,
    color: String,
    stroke_width: f64,
    listeners: HashMap<&'static str, Vec<(SubscriptionId, Listener)>>,
    next_id: u64,
}

impl Default for UiStore {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            color: "#000000".to_owned(),
            stroke_width: 2.0,
            listeners: HashMap::new(),
            next_id: 0,
        }
    }
}

impl std::fmt::Debug for UiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiStore")
            .field("tool", &self.tool)
            .field("color", &self.color)
            .field("stroke_width", &self.stroke_width)
            .finish_non_exhaustive()
    }
}

impl UiStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.tool = tool;
            self.notify("tool", &UiValue::Tool(tool));
        }
    }

    pub fn set_color(&mut self, color: String) {
        if self.color != color {
            self.color.clone_from(&color);
            self.notify("color", &UiValue::Color(color));
        }
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        if (self.stroke_width - width).abs() > f64::EPSILON {
            self.stroke_width = width;
            self.notify("strokeWidth", &UiValue::StrokeWidth(width));
        }
    }

    /// Subscribe to changes of one path. Unknown paths are accepted and
    /// simply never fire.
    pub fn subscribe<F>(&mut self, path: &'static str, listener: F) -> SubscriptionId
    where
        F: FnMut(&UiValue) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(path).or_default().push((id, Box::new(listener)));
        id
    }

    /// Remove a subscription. Removing twice is a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(sid, _)| *sid != id);
        }
    }

    fn notify(&mut self, path: &str, value: &UiValue) {
        if let Some(listeners) = self.listeners.get_mut(path) {
            for (_, listener) in listeners.iter_mut() {
                listener(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn tool_change_notifies_subscribers() {
        let mut store = UiStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe("tool", move |v| sink.lock().unwrap().push(v.clone()));

        store.set_tool(Tool::Rectangle);
        store.set_tool(Tool::Rectangle); // no change, no callback
        store.set_tool(Tool::Eraser);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![UiValue::Tool(Tool::Rectangle), UiValue::Tool(Tool::Eraser)]);
    }

    #[test]
    fn listeners_are_scoped_to_their_path() {
        let mut store = UiStore::new();
        let tool_calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&tool_calls);
        store.subscribe("tool", move |_| *sink.lock().unwrap() += 1);

        store.set_color("#ff0000".to_owned());
        store.set_stroke_width(5.0);
        assert_eq!(*tool_calls.lock().unwrap(), 0);

        store.set_tool(Tool::Line);
        assert_eq!(*tool_calls.lock().unwrap(), 1);
    }

    #[test]
    fn unsubscribe_stops_callbacks() {
        let mut store = UiStore::new();
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        let id = store.subscribe("color", move |_| *sink.lock().unwrap() += 1);

        store.set_color("#111111".to_owned());
        store.unsubscribe(id);
        store.unsubscribe(id);
        store.set_color("#222222".to_owned());

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
