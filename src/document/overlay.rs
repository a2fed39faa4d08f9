use std::collections::HashSet;
use std::hash::Hash;

/// Capability contract for objects that carry their own visual
/// selection state. Objects routed through `NodeOverlayHandler` must
/// provide all four operations.
pub trait Selectable {
    fn select(&mut self);
    fn unselect(&mut self);
    fn hover_enter(&mut self);
    fn hover_leave(&mut self);
}

/// Strategy invoked per selection-lifecycle event for one object.
/// The handler for a visualizer is fixed at construction time; the
/// capability the handler needs is checked by the compiler there, not
/// at event dispatch time.
pub trait OverlayHandler<T> {
    fn on_highlight(&self, _obj :&mut T) {}
    fn on_clear_highlight(&self, _obj :&mut T) {}
    fn on_selected(&self, _obj :&mut T) {}
    fn on_unselected(&self, _obj :&mut T) {}
    fn on_added(&self, _obj :&mut T) {}
    fn on_updated(&self, _obj :&mut T) {}
    fn on_removed(&self, _obj :&mut T) {}
}

/// Default handler: every event is a no-op, so object kinds with no
/// specialized overlay behavior are silently inert.
pub struct EmptyOverlayHandler;
impl<T> OverlayHandler<T> for EmptyOverlayHandler {}

/// Forwards lifecycle events to the object's own `Selectable`
/// implementation. Removal implies losing the selection.
pub struct NodeOverlayHandler;
impl<T :Selectable> OverlayHandler<T> for NodeOverlayHandler {
    fn on_highlight(&self, obj :&mut T) { obj.hover_enter(); }
    fn on_clear_highlight(&self, obj :&mut T) { obj.hover_leave(); }
    fn on_selected(&self, obj :&mut T) { obj.select(); }
    fn on_unselected(&self, obj :&mut T) { obj.unselect(); }
    fn on_removed(&self, obj :&mut T) { obj.unselect(); }
}

/// Tracks highlight and selection state for one category of objects,
/// keyed by `K`, and forwards lifecycle events to the handler bound at
/// construction. Disabling suppresses handler side effects without
/// losing the tracked set.
pub struct Visualizer<K :Eq + Hash + Clone, T> {
    handler :Box<dyn OverlayHandler<T>>,
    highlighted :HashSet<K>,
    selected :Option<K>,
    enabled :bool,
}

impl<K :Eq + Hash + Clone, T> Visualizer<K, T> {
    pub fn new(handler :impl OverlayHandler<T> + 'static) -> Self {
        Visualizer {
            handler: Box::new(handler),
            highlighted: HashSet::new(),
            selected: None,
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled :bool) { self.enabled = enabled; }
    pub fn is_enabled(&self) -> bool { self.enabled }

    pub fn highlighted(&self) -> impl Iterator<Item = &K> { self.highlighted.iter() }
    pub fn is_highlighted(&self, key :&K) -> bool { self.highlighted.contains(key) }
    pub fn selected(&self) -> Option<&K> { self.selected.as_ref() }

    pub fn highlight(&mut self, key :K, obj :&mut T) {
        if self.highlighted.insert(key) && self.enabled {
            self.handler.on_highlight(obj);
        }
    }

    pub fn unhighlight(&mut self, key :&K, obj :&mut T) {
        if self.highlighted.remove(key) && self.enabled {
            self.handler.on_clear_highlight(obj);
        }
    }

    /// Drop the whole highlighted set, returning the keys so the caller
    /// can deliver the clear event per object.
    pub fn take_highlighted(&mut self) -> Vec<K> {
        self.highlighted.drain().collect()
    }

    pub fn clear_highlight_event(&self, obj :&mut T) {
        if self.enabled { self.handler.on_clear_highlight(obj); }
    }

    pub fn select(&mut self, key :K, obj :&mut T) {
        self.selected = Some(key);
        if self.enabled { self.handler.on_selected(obj); }
    }

    pub fn unselect(&mut self, key :&K, obj :&mut T) {
        if self.selected.as_ref() == Some(key) {
            self.selected = None;
            if self.enabled { self.handler.on_unselected(obj); }
        }
    }

    /// Drop tracking state for a key whose object no longer exists.
    /// No handler events fire; there is nothing left to call them on.
    pub fn forget(&mut self, key :&K) {
        self.highlighted.remove(key);
        if self.selected.as_ref() == Some(key) {
            self.selected = None;
        }
    }

    pub fn added(&mut self, _key :&K, obj :&mut T) {
        if self.enabled { self.handler.on_added(obj); }
    }

    pub fn updated(&mut self, _key :&K, obj :&mut T) {
        if self.enabled { self.handler.on_updated(obj); }
    }

    pub fn removed(&mut self, key :&K, obj :&mut T) {
        self.highlighted.remove(key);
        if self.selected.as_ref() == Some(key) {
            self.selected = None;
        }
        if self.enabled { self.handler.on_removed(obj); }
    }
}
