//! Boundary to the native drag-and-drop layer
//!
//! The coordinator never talks to a toolkit directly. An integration layer
//! implements [`NativeBackend`] for its toolkit and forwards the toolkit's
//! drag signals to [`NativeDragHandler`] (implemented by the coordinator).
//! While the coordinator waits for drag data it pumps the toolkit itself
//! through [`NativeBackend::iterate`], which hands back the signal that one
//! step produced.

use crate::types::{
    ActionSet, ContextId, DragResult, GrabId, Point, Timestamp, WidgetId, WindowId,
};

/// Display server type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
    /// X11 protocol served by a Wayland compositor
    XWayland,
    Unknown,
}

impl DisplayServer {
    /// Detect which display server we're running on
    pub fn detect() -> Self {
        Self::detect_with(|name| std::env::var(name).ok())
    }

    fn detect_with(var: impl Fn(&str) -> Option<String>) -> Self {
        let wayland = var("WAYLAND_DISPLAY").is_some();
        let forced_x11 = var("GDK_BACKEND").is_some_and(|backend| backend.starts_with("x11"));

        if wayland && forced_x11 && var("DISPLAY").is_some() {
            tracing::debug!("detected XWayland");
            return DisplayServer::XWayland;
        }
        if wayland {
            tracing::debug!("detected Wayland display server");
            return DisplayServer::Wayland;
        }

        match var("XDG_SESSION_TYPE").as_deref() {
            Some("wayland") => {
                tracing::debug!("detected Wayland via XDG_SESSION_TYPE");
                return DisplayServer::Wayland;
            }
            Some("x11") => {
                tracing::debug!("detected X11 via XDG_SESSION_TYPE");
                return DisplayServer::X11;
            }
            _ => {}
        }

        if var("DISPLAY").is_some() {
            tracing::debug!("detected X11 via DISPLAY");
            return DisplayServer::X11;
        }

        tracing::debug!("could not detect display server");
        DisplayServer::Unknown
    }
}

/// Pointer motion seen by the source grab, in root coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionEvent {
    pub root: Point,
    /// Modifier state
    pub state: u32,
    pub time: Timestamp,
}

/// Events observed on the grab widget during a source drag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabEvent {
    Motion(MotionEvent),
    Key { state: u32 },
}

/// One native step's worth of drag activity
#[derive(Clone, Debug, PartialEq)]
pub enum NativeSignal {
    Motion {
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    },
    Leave,
    Drop {
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    },
    DataReceived {
        context: ContextId,
        flavor: String,
        data: Vec<u8>,
    },
    DataRequested {
        context: ContextId,
        flavor: String,
        time: Timestamp,
    },
    SourceBegin {
        context: ContextId,
    },
    SourceEnd {
        context: ContextId,
    },
    SourceFailed {
        context: ContextId,
        result: DragResult,
    },
    Grab(GrabEvent),
    /// Non-drag event; processing it is all that was needed
    Other,
}

/// The toolkit side of a drag
pub trait NativeBackend {
    fn display_server(&self) -> DisplayServer {
        DisplayServer::detect()
    }

    // Target contexts

    /// Formats offered by the drag source, in the source's order
    fn targets(&self, context: ContextId) -> Vec<String>;
    fn actions(&self, context: ContextId) -> ActionSet;
    /// Action chosen through modifier keys, where the backend reports it
    /// separately from the allowed set
    fn selected_action(&self, context: ContextId) -> ActionSet;
    /// Whether the drag was started by this process
    fn source_is_local(&self, context: ContextId) -> bool;
    /// Accept (non-empty action) or refuse the drop at the last position
    fn drag_status(&mut self, context: ContextId, action: ActionSet, time: Timestamp);
    fn drag_finish(&mut self, context: ContextId, success: bool, time: Timestamp);
    /// Ask the source for `flavor`; the answer arrives as
    /// [`NativeSignal::DataReceived`]
    fn request_data(&mut self, context: ContextId, flavor: &str, time: Timestamp);
    /// Process one pending native event, never the whole application loop
    fn iterate(&mut self) -> Option<NativeSignal>;

    // Windows

    fn window_widget(&self, window: WindowId) -> Option<WidgetId>;
    fn window_is_destroyed(&self, window: WindowId) -> bool;
    /// Whether `window` belongs to this process
    fn is_app_window(&self, window: WindowId) -> bool;
    fn window_at_pointer(&self) -> Option<WindowId>;
    /// Screen position of a point relative to `window`
    fn window_to_screen(&self, window: WindowId, point: Point) -> Point;

    // Source drags

    /// Start a drag offering `targets`; `None` if the toolkit refused
    fn begin_drag(&mut self, targets: &[String], actions: ActionSet) -> Option<ContextId>;
    /// Widget holding the pointer grab of the drag just started
    fn current_grab(&self) -> Option<GrabId>;
    fn grab_is_active(&self, grab: GrabId) -> bool;
    fn propagate_motion(&mut self, grab: GrabId, motion: &MotionEvent);
    fn release_grab(&mut self, grab: GrabId);
    /// Register (`Some`) or clear (`None`) the drag context on the window the
    /// drag started from
    fn set_drag_source(&mut self, window: WindowId, context: Option<ContextId>);
    /// Destination window of a source drag, if the drop reached one
    fn dest_window(&self, context: ContextId) -> Option<WindowId>;
    /// Answer a data request that arrived through [`NativeBackend::iterate`]
    fn reply_data(&mut self, context: ContextId, flavor: &str, data: Option<&[u8]>);
    /// Publish (`Some`) or delete (`None`) the direct save file name
    fn set_direct_save(&mut self, context: ContextId, file_name: Option<&str>);
    /// URI the destination wrote back for a direct save
    fn direct_save_uri(&self, context: ContextId) -> Option<String>;

    // Event delivery

    fn suspend_native_events(&mut self);
    fn resume_native_events(&mut self);

    fn pointer_position(&self) -> Point;
    fn current_modifiers(&self) -> u32;
}

/// Native events stay suspended while this guard lives
pub(crate) struct SuspendedEvents<'a, B: NativeBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: NativeBackend + ?Sized> SuspendedEvents<'a, B> {
    pub(crate) fn new(backend: &'a mut B) -> Self {
        backend.suspend_native_events();
        Self { backend }
    }
}

impl<B: NativeBackend + ?Sized> Drop for SuspendedEvents<'_, B> {
    fn drop(&mut self) {
        self.backend.resume_native_events();
    }
}

/// Native drag signals, one method per signal
pub trait NativeDragHandler {
    /// Returns `false` if the motion could not be scheduled
    fn drag_motion(
        &mut self,
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    ) -> bool;
    /// Returns `false` if a drop was already claimed
    fn drag_leave(&mut self) -> bool;
    /// Returns `false` if the drop was refused; otherwise the drop is
    /// finished later through [`NativeBackend::drag_finish`]
    fn drag_drop(
        &mut self,
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    ) -> bool;
    fn drag_data_received(&mut self, context: ContextId, flavor: &str, data: &[u8]);
    fn source_drag_begin(&mut self, context: ContextId);
    fn source_drag_data_get(
        &mut self,
        context: ContextId,
        flavor: &str,
        time: Timestamp,
    ) -> Option<Vec<u8>>;
    fn source_drag_end(&mut self, context: ContextId);
    /// Returns whether the failure animation should be suppressed
    fn source_drag_failed(&mut self, context: ContextId, result: DragResult) -> bool;
    fn source_grab_event(&mut self, event: GrabEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect(vars: &[(&str, &str)]) -> DisplayServer {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DisplayServer::detect_with(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_detect_display_server() {
        assert_eq!(detect(&[("WAYLAND_DISPLAY", "wayland-0")]), DisplayServer::Wayland);
        assert_eq!(detect(&[("XDG_SESSION_TYPE", "wayland")]), DisplayServer::Wayland);
        assert_eq!(detect(&[("XDG_SESSION_TYPE", "x11")]), DisplayServer::X11);
        assert_eq!(detect(&[("DISPLAY", ":0")]), DisplayServer::X11);
        assert_eq!(detect(&[]), DisplayServer::Unknown);
        assert_eq!(
            detect(&[("WAYLAND_DISPLAY", "wayland-0"), ("DISPLAY", ":0"), ("GDK_BACKEND", "x11")]),
            DisplayServer::XWayland
        );
    }
}
