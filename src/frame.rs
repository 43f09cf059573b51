//! Frame Stack
//!
//! The (component, action, namespace) frame that is current while rendering.
//! Pushing returns what was current before so it can be restored on exit;
//! outside this crate frames are only entered through
//! [`crate::context::FrameScope`], which restores unconditionally on drop.

use serde::Serialize;
use std::sync::Arc;

use crate::descriptor::Descriptor;

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCES
// ═══════════════════════════════════════════════════════════════════════════════

/// A component instance within one response tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub descriptor: Descriptor,
    /// Unique within the response, `"{local id}:{context num}"`.
    pub global_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
}

impl Component {
    pub fn new(descriptor: Descriptor, global_id: impl Into<String>) -> Self {
        Self {
            descriptor,
            global_id: global_id.into(),
            local_id: None,
        }
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }
}

/// A server action being executed for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    /// Controller method, e.g. `java://ui.searchController/ACTION$run`.
    pub descriptor: String,
}

impl Action {
    pub fn new(id: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            descriptor: descriptor.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAMES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub component: Option<Arc<Component>>,
    pub action: Option<Arc<Action>>,
    /// Namespace of the markup currently being compiled.
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SavedFrame {
    frame: Frame,
    depth: usize,
}

#[derive(Debug, Default)]
pub struct FrameStack {
    current: Frame,
    depth: usize,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Frame {
        &self.current
    }

    pub fn current_component(&self) -> Option<&Arc<Component>> {
        self.current.component.as_ref()
    }

    pub fn current_action(&self) -> Option<&Arc<Action>> {
        self.current.action.as_ref()
    }

    pub fn current_namespace(&self) -> Option<&str> {
        self.current.namespace.as_deref()
    }

    /// Number of frames entered and not yet restored.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn push_component(&mut self, component: Option<Arc<Component>>) -> Option<Arc<Component>> {
        self.depth += 1;
        std::mem::replace(&mut self.current.component, component)
    }

    pub(crate) fn push_action(&mut self, action: Option<Arc<Action>>) -> Option<Arc<Action>> {
        self.depth += 1;
        std::mem::replace(&mut self.current.action, action)
    }

    pub(crate) fn push_namespace(&mut self, namespace: Option<String>) -> Option<String> {
        self.depth += 1;
        std::mem::replace(&mut self.current.namespace, namespace)
    }

    pub(crate) fn save(&self) -> SavedFrame {
        SavedFrame {
            frame: self.current.clone(),
            depth: self.depth,
        }
    }

    /// Put back a frame taken with [`FrameStack::save`], undoing every push
    /// made since.
    pub(crate) fn restore(&mut self, saved: SavedFrame) {
        self.current = saved.frame;
        self.depth = saved.depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DefType;

    fn comp(name: &str, id: u32) -> Arc<Component> {
        Arc::new(Component::new(
            Descriptor::new(DefType::Component, "markup", "ui", name),
            format!("{}:0", id),
        ))
    }

    #[test]
    fn test_push_returns_previous() {
        let mut stack = FrameStack::new();
        let a = comp("a", 1);
        assert_eq!(stack.push_component(Some(a.clone())), None);
        assert_eq!(stack.push_component(Some(comp("b", 2))), Some(a));
    }

    #[test]
    fn test_restore_after_nesting() {
        let mut stack = FrameStack::new();
        let outer = comp("outer", 1);
        stack.push_component(Some(outer.clone()));
        stack.push_namespace(Some("ui".into()));
        let before = stack.current().clone();
        let depth = stack.depth();

        let mut saved = Vec::new();
        for i in 0..4 {
            saved.push(stack.save());
            stack.push_component(Some(comp("inner", 10 + i)));
            stack.push_action(Some(Arc::new(Action::new("7;a", "java://ui.c/ACTION$go"))));
        }
        assert_eq!(stack.depth(), depth + 8);
        assert_ne!(stack.current(), &before);

        while let Some(s) = saved.pop() {
            stack.restore(s);
        }

        assert_eq!(stack.current(), &before);
        assert_eq!(stack.current_component(), Some(&outer));
        assert_eq!(stack.current_namespace(), Some("ui"));
        assert_eq!(stack.depth(), depth);
    }
}
