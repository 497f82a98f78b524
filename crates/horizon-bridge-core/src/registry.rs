//! The handle registry.
//!
//! Every live widget occupies one slot in an arena keyed by [`WidgetId`].
//! The slot records the widget's parent and children, and the native handles
//! it owns. A side table maps each native [`Handle`] back to the owning
//! widget so native callbacks can be routed to their wrapper.
//!
//! Widgets enter the registry in two steps. [`HandleRegistry::reserve`]
//! hands out an id before the wrapper exists, and [`HandleRegistry::attach`]
//! stores the finished wrapper. Until it is attached, a reserved slot is
//! invisible to [`HandleRegistry::lookup`] and [`HandleRegistry::get`].
//!
//! The registry holds a strong reference to each attached widget. The
//! reference is released only by [`HandleRegistry::remove`], which runs as
//! the final step of disposal.
//!
//! # Related Modules
//!
//! - [`crate::Display`] - Owns one registry and routes native events through it
//! - [`crate::widget`] - Creation and disposal populate and drain the registry

use std::collections::HashMap;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::native::Handle;
use crate::widget::NativeWidget;

new_key_type! {
    /// A unique identifier for a widget within its display.
    ///
    /// Ids stay valid until the widget is disposed. A stale id never
    /// resolves to a different widget.
    pub struct WidgetId;
}

impl WidgetId {
    /// Convert the id to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Create an id from a raw u64 value.
    ///
    /// This does not check that the id is live.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// One arena slot.
struct WidgetEntry<W: ?Sized> {
    widget: Option<Arc<W>>,
    type_name: &'static str,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    handles: Vec<Handle>,
}

/// Maps native handles to widgets and widgets to their tree position.
pub struct HandleRegistry<W: ?Sized = dyn NativeWidget> {
    widgets: SlotMap<WidgetId, WidgetEntry<W>>,
    handles: HashMap<Handle, WidgetId>,
}

impl<W: ?Sized> HandleRegistry<W> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            widgets: SlotMap::with_key(),
            handles: HashMap::new(),
        }
    }

    /// Reserve a slot for a widget of `type_name` under `parent`.
    ///
    /// Fails with [`Error::InvalidArgument`] if `parent` is not live.
    pub fn reserve(&mut self, type_name: &'static str, parent: Option<WidgetId>) -> Result<WidgetId> {
        if let Some(parent) = parent
            && !self.widgets.contains_key(parent)
        {
            return Err(Error::InvalidArgument("parent widget is disposed"));
        }

        let id = self.widgets.insert(WidgetEntry {
            widget: None,
            type_name,
            parent,
            children: Vec::new(),
            handles: Vec::new(),
        });
        if let Some(parent) = parent
            && let Some(entry) = self.widgets.get_mut(parent)
        {
            entry.children.push(id);
        }
        tracing::trace!(target: targets::REGISTRY, ?id, type_name, "reserved widget slot");
        Ok(id)
    }

    /// Store the wrapper for a reserved slot.
    ///
    /// Returns `false` if the slot no longer exists.
    pub fn attach(&mut self, id: WidgetId, widget: Arc<W>) -> bool {
        match self.widgets.get_mut(id) {
            Some(entry) => {
                entry.widget = Some(widget);
                true
            }
            None => false,
        }
    }

    /// Associate `handle` with the widget `id`.
    ///
    /// Registering the same pair twice is a no-op. Registering a handle that
    /// belongs to a different live widget fails with [`Error::HandleInUse`].
    pub fn register(&mut self, handle: Handle, id: WidgetId) -> Result<()> {
        if let Some(&owner) = self.handles.get(&handle) {
            if owner == id {
                return Ok(());
            }
            if self.widgets.contains_key(owner) {
                return Err(Error::HandleInUse(handle));
            }
        }

        let entry = self
            .widgets
            .get_mut(id)
            .ok_or(Error::InvalidArgument("widget is not registered"))?;
        entry.handles.push(handle);
        self.handles.insert(handle, id);
        tracing::trace!(target: targets::REGISTRY, %handle, ?id, "registered handle");
        Ok(())
    }

    /// Remove the mapping for `handle`.
    ///
    /// Returns the previous owner. Deregistering an unknown handle is a no-op.
    pub fn deregister(&mut self, handle: Handle) -> Option<WidgetId> {
        let owner = self.handles.remove(&handle)?;
        if let Some(entry) = self.widgets.get_mut(owner) {
            entry.handles.retain(|&h| h != handle);
        }
        Some(owner)
    }

    /// Find the widget owning `handle`.
    pub fn lookup(&self, handle: Handle) -> Option<Arc<W>> {
        let id = self.handles.get(&handle)?;
        self.get(*id)
    }

    /// Find the id of the widget owning `handle`.
    pub fn lookup_id(&self, handle: Handle) -> Option<WidgetId> {
        self.handles
            .get(&handle)
            .copied()
            .filter(|id| self.widgets.get(*id).is_some_and(|e| e.widget.is_some()))
    }

    /// Get an attached widget by id.
    pub fn get(&self, id: WidgetId) -> Option<Arc<W>> {
        self.widgets.get(id).and_then(|entry| entry.widget.clone())
    }

    /// Whether `id` names a live (reserved or attached) slot.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(id)
    }

    /// Remove a slot, its handle mappings and its link from the parent.
    ///
    /// Children still in the registry become roots.
    pub fn remove(&mut self, id: WidgetId) -> Option<Arc<W>> {
        let entry = self.widgets.remove(id)?;
        for handle in &entry.handles {
            if self.handles.get(handle) == Some(&id) {
                self.handles.remove(handle);
            }
        }
        if let Some(parent) = entry.parent
            && let Some(parent_entry) = self.widgets.get_mut(parent)
        {
            parent_entry.children.retain(|&child| child != id);
        }
        for child in entry.children {
            if let Some(child_entry) = self.widgets.get_mut(child) {
                child_entry.parent = None;
            }
        }
        tracing::trace!(target: targets::REGISTRY, ?id, type_name = entry.type_name, "removed widget");
        entry.widget
    }

    /// The parent of `id`.
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets.get(id).and_then(|entry| entry.parent)
    }

    /// The children of `id`, in creation order.
    pub fn children(&self, id: WidgetId) -> Vec<WidgetId> {
        self.widgets
            .get(id)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    /// The handles owned by `id`, in registration order.
    pub fn handles_of(&self, id: WidgetId) -> Vec<Handle> {
        self.widgets
            .get(id)
            .map(|entry| entry.handles.clone())
            .unwrap_or_default()
    }

    /// The type name recorded for `id`.
    pub fn type_name(&self, id: WidgetId) -> Option<&'static str> {
        self.widgets.get(id).map(|entry| entry.type_name)
    }

    /// Widgets without a parent, in slot order.
    pub fn roots(&self) -> Vec<WidgetId> {
        self.widgets
            .iter()
            .filter(|(_, entry)| entry.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Every widget below `id`, children before their parents.
    pub fn descendants_postorder(&self, id: WidgetId) -> Vec<WidgetId> {
        let mut result = Vec::new();
        self.collect_postorder(id, &mut result);
        result
    }

    fn collect_postorder(&self, id: WidgetId, result: &mut Vec<WidgetId>) {
        if let Some(entry) = self.widgets.get(id) {
            for &child in &entry.children {
                self.collect_postorder(child, result);
                result.push(child);
            }
        }
    }

    /// The number of live slots.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// The number of registered handles.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

impl<W: ?Sized> Default for HandleRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
