use crate::debugger::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, Weak};
use url::Url;
use uuid::Uuid;

/// Debug model identifier of XSL breakpoints.
pub const XSL_DEBUG_MODEL: &str = "org.eclipse.wst.xsl.launching.xslDebugModel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointKind {
    Line,
    /// Any breakpoint without line information (exception breakpoint, watchpoint, etc.).
    Other,
}

/// Resource location of a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub resource: PathBuf,
    pub line: u32,
}

impl Marker {
    /// Resource location as a `file:` url, as expected by the debugee.
    pub fn file_url(&self) -> Result<Url, Error> {
        Url::from_file_path(&self.resource)
            .map_err(|_| Error::BreakpointLocation(self.resource.clone()))
    }
}

/// Breakpoint registered by a user. Breakpoint marker may be deleted at any time,
/// after that the breakpoint is still alive but can't be installed anymore.
#[derive(Debug)]
pub struct Breakpoint {
    id: Uuid,
    model_id: String,
    kind: BreakpointKind,
    enabled: RwLock<bool>,
    marker: RwLock<Option<Marker>>,
}

impl Breakpoint {
    pub fn new(
        model_id: impl Into<String>,
        kind: BreakpointKind,
        marker: Option<Marker>,
        enabled: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id: model_id.into(),
            kind,
            enabled: RwLock::new(enabled),
            marker: RwLock::new(marker),
        }
    }

    /// Create enabled XSL line breakpoint.
    pub fn line(resource: impl Into<PathBuf>, line: u32) -> Self {
        Self::new(
            XSL_DEBUG_MODEL,
            BreakpointKind::Line,
            Some(Marker {
                resource: resource.into(),
                line,
            }),
            true,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn kind(&self) -> BreakpointKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.read().unwrap()
    }

    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.write().unwrap() = enabled;
    }

    /// Return breakpoint marker, [`None`] if marker was deleted.
    pub fn marker(&self) -> Option<Marker> {
        self.marker.read().unwrap().clone()
    }

    pub fn delete_marker(&self) {
        *self.marker.write().unwrap() = None;
    }

    pub fn line_number(&self) -> Option<u32> {
        self.marker.read().unwrap().as_ref().map(|m| m.line)
    }

    /// True if breakpoint placed at `resource:line`.
    pub fn is_placed_at(&self, resource: &Path, line: u32) -> bool {
        self.marker
            .read()
            .unwrap()
            .as_ref()
            .map(|m| m.resource == resource && m.line == line)
            .unwrap_or(false)
    }
}

/// Observer of breakpoint manager changes.
pub trait BreakpointListener: Send + Sync {
    fn breakpoint_added(&self, breakpoint: &Breakpoint);
    fn breakpoint_removed(&self, breakpoint: &Breakpoint);
    fn breakpoint_changed(&self, breakpoint: &Breakpoint);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

/// Source of user breakpoints.
pub trait BreakpointManager: Send + Sync {
    /// Return all breakpoints registered for a debug model.
    fn breakpoints(&self, model_id: &str) -> Vec<Arc<Breakpoint>>;

    /// Subscribe to breakpoint changes. Listener is held weakly.
    fn add_listener(&self, listener: Weak<dyn BreakpointListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// In-memory breakpoint manager.
#[derive(Default)]
pub struct BreakpointRegistry {
    breakpoints: Mutex<Vec<Arc<Breakpoint>>>,
    listeners: Mutex<Vec<(ListenerId, Weak<dyn BreakpointListener>)>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new breakpoint and notify listeners.
    pub fn add(&self, breakpoint: Breakpoint) -> Arc<Breakpoint> {
        let breakpoint = Arc::new(breakpoint);
        self.breakpoints.lock().unwrap().push(breakpoint.clone());
        self.notify(|l| l.breakpoint_added(&breakpoint));
        breakpoint
    }

    /// Unregister breakpoint and notify listeners. Return [`None`] if breakpoint not found.
    pub fn remove(&self, id: Uuid) -> Option<Arc<Breakpoint>> {
        let removed = {
            let mut breakpoints = self.breakpoints.lock().unwrap();
            let pos = breakpoints.iter().position(|bp| bp.id() == id)?;
            breakpoints.remove(pos)
        };
        self.notify(|l| l.breakpoint_removed(&removed));
        Some(removed)
    }

    /// Enable or disable a breakpoint and notify listeners.
    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> Option<Arc<Breakpoint>> {
        let breakpoint = self.find(|bp| bp.id() == id)?;
        breakpoint.set_enabled(enabled);
        self.notify(|l| l.breakpoint_changed(&breakpoint));
        Some(breakpoint)
    }

    /// Find first breakpoint that satisfies a predicate.
    pub fn find(&self, predicate: impl Fn(&Breakpoint) -> bool) -> Option<Arc<Breakpoint>> {
        self.breakpoints
            .lock()
            .unwrap()
            .iter()
            .find(|bp| predicate(bp))
            .cloned()
    }

    pub fn all(&self) -> Vec<Arc<Breakpoint>> {
        self.breakpoints.lock().unwrap().clone()
    }

    fn notify(&self, f: impl Fn(&dyn BreakpointListener)) {
        // listeners are called outside the lock, they are free to query the registry
        let listeners: Vec<_> = {
            let mut listeners = self.listeners.lock().unwrap();
            listeners.retain(|(_, l)| l.strong_count() > 0);
            listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
        };
        listeners.iter().for_each(|l| f(l.as_ref()));
    }
}

impl BreakpointManager for BreakpointRegistry {
    fn breakpoints(&self, model_id: &str) -> Vec<Arc<Breakpoint>> {
        self.breakpoints
            .lock()
            .unwrap()
            .iter()
            .filter(|bp| bp.model_id() == model_id)
            .cloned()
            .collect()
    }

    fn add_listener(&self, listener: Weak<dyn BreakpointListener>) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
    }
}
