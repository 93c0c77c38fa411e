//! Host contract
//!
//! Everything the runtime asks of the environment that shows the page:
//! element replacement (through [`Surface`]), the address bar, form field
//! values and a few layout signals.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use parking_lot::RwLock;
use tkml_render::{HostTarget, Surface};

pub trait Host: Surface {
    /// What the address bar shows now, in the configured history form.
    fn visible_location(&self) -> String;

    /// Append a history entry showing `visible`.
    fn push_history(&self, visible: &str);

    fn set_loading(&self, identity: &str, loading: bool);

    /// Current value of the form field with this identity.
    fn field_value(&self, identity: &str) -> Option<String>;

    fn mark_invalid(&self, identity: &str);

    fn viewport_width(&self) -> u32;

    fn set_menu_open(&self, trigger: &str, open: bool);

    fn scroll_into_view(&self, identity: &str) {
        let _ = identity;
    }

    fn scroll_to_top(&self) {}

    fn remeasure_footers(&self) {}
}

/// One call made on a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    ReplaceRoot(String),
    ReplaceElement(HostTarget, String),
    Failed(String),
    PushHistory(String),
    Loading(String, bool),
    Invalid(String),
    ScrollIntoView(String),
    ScrollToTop,
    MenuOpen(String, bool),
    RemeasureFooters,
}

/// In-memory host that records every call.
///
/// Used by tests and by the command line renderer.
pub struct RecordingHost {
    ops: Arc<RwLock<Vec<HostOp>>>,
    visible: Arc<RwLock<String>>,
    fields: Arc<RwLock<HashMap<String, String>>>,
    viewport_width: Arc<RwLock<u32>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            ops: Arc::new(RwLock::new(Vec::new())),
            visible: Arc::new(RwLock::new(String::from("/"))),
            fields: Arc::new(RwLock::new(HashMap::new())),
            viewport_width: Arc::new(RwLock::new(1280)),
        }
    }

    /// Simulate the user moving through history to `visible`.
    pub fn set_visible(&self, visible: &str) {
        *self.visible.write() = visible.to_string();
    }

    pub fn set_field(&self, identity: &str, value: &str) {
        self.fields
            .write()
            .insert(identity.to_string(), value.to_string());
    }

    pub fn set_viewport_width(&self, width: u32) {
        *self.viewport_width.write() = width;
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.read().clone()
    }

    pub fn clear(&self) {
        self.ops.write().clear();
    }

    /// Most recent page root markup.
    pub fn root(&self) -> Option<String> {
        self.ops.read().iter().rev().find_map(|op| match op {
            HostOp::ReplaceRoot(markup) => Some(markup.clone()),
            _ => None,
        })
    }

    /// Markup written to `identity`, in order.
    pub fn replaced(&self, identity: &str) -> Vec<String> {
        self.ops
            .read()
            .iter()
            .filter_map(|op| match op {
                HostOp::ReplaceElement(target, markup) if target.identity() == identity => {
                    Some(markup.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn history(&self) -> Vec<String> {
        self.ops
            .read()
            .iter()
            .filter_map(|op| match op {
                HostOp::PushHistory(visible) => Some(visible.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.ops
            .read()
            .iter()
            .filter_map(|op| match op {
                HostOp::Failed(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, op: &HostOp) -> bool {
        self.ops.read().contains(op)
    }

    fn record(&self, op: HostOp) {
        self.ops.write().push(op);
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RecordingHost {
    fn clone(&self) -> Self {
        Self {
            ops: Arc::clone(&self.ops),
            visible: Arc::clone(&self.visible),
            fields: Arc::clone(&self.fields),
            viewport_width: Arc::clone(&self.viewport_width),
        }
    }
}

impl Surface for RecordingHost {
    fn replace_element(&self, target: &HostTarget, markup: &str) {
        self.record(HostOp::ReplaceElement(target.clone(), markup.to_string()));
    }

    fn replace_root(&self, markup: &str) {
        self.record(HostOp::ReplaceRoot(markup.to_string()));
    }

    fn failed(&self, error: &(dyn Error + 'static)) {
        tracing::warn!(error = %error, "Page load failed");
        self.record(HostOp::Failed(error.to_string()));
    }
}

impl Host for RecordingHost {
    fn visible_location(&self) -> String {
        self.visible.read().clone()
    }

    fn push_history(&self, visible: &str) {
        *self.visible.write() = visible.to_string();
        self.record(HostOp::PushHistory(visible.to_string()));
    }

    fn set_loading(&self, identity: &str, loading: bool) {
        self.record(HostOp::Loading(identity.to_string(), loading));
    }

    fn field_value(&self, identity: &str) -> Option<String> {
        self.fields.read().get(identity).cloned()
    }

    fn mark_invalid(&self, identity: &str) {
        self.record(HostOp::Invalid(identity.to_string()));
    }

    fn viewport_width(&self) -> u32 {
        *self.viewport_width.read()
    }

    fn set_menu_open(&self, trigger: &str, open: bool) {
        self.record(HostOp::MenuOpen(trigger.to_string(), open));
    }

    fn scroll_into_view(&self, identity: &str) {
        self.record(HostOp::ScrollIntoView(identity.to_string()));
    }

    fn scroll_to_top(&self) {
        self.record(HostOp::ScrollToTop);
    }

    fn remeasure_footers(&self) {
        self.record(HostOp::RemeasureFooters);
    }
}
