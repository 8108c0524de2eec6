//! Recording doubles for the native layer and the application

use std::collections::{HashMap, HashSet, VecDeque};

use super::dispatch::{AppDispatcher, DragEvent, DragEventKind, DragSession};
use super::native::{DisplayServer, MotionEvent, NativeBackend, NativeSignal};
use crate::types::{ActionSet, ContextId, GrabId, Point, Timestamp, WidgetId, WindowId};

/// A toolkit that answers data requests from a table and records replies
#[derive(Default)]
pub struct MockBackend {
    pub targets: HashMap<ContextId, Vec<String>>,
    pub actions: HashMap<ContextId, ActionSet>,
    pub selected: HashMap<ContextId, ActionSet>,
    pub local_sources: HashSet<ContextId>,
    /// Data the source delivers on request; absent entries never arrive
    pub source_data: HashMap<(ContextId, String), Vec<u8>>,
    pub queue: VecDeque<NativeSignal>,
    pub statuses: Vec<(ContextId, ActionSet, Timestamp)>,
    pub finishes: Vec<(ContextId, bool, Timestamp)>,
    pub requests: Vec<(ContextId, String)>,
    pub widgets: HashMap<WindowId, WidgetId>,
    pub destroyed: HashSet<WindowId>,
    pub app_windows: HashSet<WindowId>,
    pub pointer_window: Option<WindowId>,
    pub begin_result: Option<ContextId>,
    pub begun: Vec<(Vec<String>, ActionSet)>,
    pub grab: Option<GrabId>,
    pub grab_active: bool,
    pub propagated: Vec<MotionEvent>,
    pub released: Vec<GrabId>,
    pub drag_sources: Vec<(WindowId, Option<ContextId>)>,
    pub dest_windows: HashMap<ContextId, WindowId>,
    pub data_replies: Vec<(ContextId, String, Option<Vec<u8>>)>,
    pub direct_save: HashMap<ContextId, String>,
    pub direct_save_uris: HashMap<ContextId, String>,
    pub suspended: u32,
    pub suspend_calls: u32,
    pub pointer: Point,
    /// Screen origin of each window; absent windows sit at the screen origin
    pub origins: HashMap<WindowId, Point>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A foreign drag offering `data` (flavor, bytes) on `context`
    pub fn offer(&mut self, context: ContextId, data: &[(&str, &[u8])]) {
        self.targets
            .insert(context, data.iter().map(|(flavor, _)| flavor.to_string()).collect());
        for (flavor, bytes) in data {
            self.source_data
                .insert((context, flavor.to_string()), bytes.to_vec());
        }
    }

    pub fn add_window(&mut self, window: WindowId) {
        self.widgets.insert(window, WidgetId(window.0 + 1000));
        self.app_windows.insert(window);
    }
}

impl NativeBackend for MockBackend {
    fn display_server(&self) -> DisplayServer {
        DisplayServer::Unknown
    }

    fn targets(&self, context: ContextId) -> Vec<String> {
        self.targets.get(&context).cloned().unwrap_or_default()
    }

    fn actions(&self, context: ContextId) -> ActionSet {
        self.actions.get(&context).copied().unwrap_or(ActionSet::COPY)
    }

    fn selected_action(&self, context: ContextId) -> ActionSet {
        self.selected.get(&context).copied().unwrap_or_default()
    }

    fn source_is_local(&self, context: ContextId) -> bool {
        self.local_sources.contains(&context)
    }

    fn drag_status(&mut self, context: ContextId, action: ActionSet, time: Timestamp) {
        self.statuses.push((context, action, time));
    }

    fn drag_finish(&mut self, context: ContextId, success: bool, time: Timestamp) {
        self.finishes.push((context, success, time));
    }

    fn request_data(&mut self, context: ContextId, flavor: &str, _time: Timestamp) {
        self.requests.push((context, flavor.to_string()));
        if let Some(data) = self.source_data.get(&(context, flavor.to_string())) {
            self.queue.push_back(NativeSignal::DataReceived {
                context,
                flavor: flavor.to_string(),
                data: data.clone(),
            });
        }
    }

    fn iterate(&mut self) -> Option<NativeSignal> {
        self.queue.pop_front()
    }

    fn window_widget(&self, window: WindowId) -> Option<WidgetId> {
        self.widgets.get(&window).copied()
    }

    fn window_is_destroyed(&self, window: WindowId) -> bool {
        self.destroyed.contains(&window)
    }

    fn is_app_window(&self, window: WindowId) -> bool {
        self.app_windows.contains(&window)
    }

    fn window_at_pointer(&self) -> Option<WindowId> {
        self.pointer_window
    }

    fn window_to_screen(&self, window: WindowId, point: Point) -> Point {
        let origin = self.origins.get(&window).copied().unwrap_or_default();
        Point::new(origin.x + point.x, origin.y + point.y)
    }

    fn begin_drag(&mut self, targets: &[String], actions: ActionSet) -> Option<ContextId> {
        self.begun.push((targets.to_vec(), actions));
        if self.begin_result.is_some() {
            self.grab_active = self.grab.is_some();
        }
        self.begin_result
    }

    fn current_grab(&self) -> Option<GrabId> {
        self.grab
    }

    fn grab_is_active(&self, grab: GrabId) -> bool {
        self.grab_active && self.grab == Some(grab)
    }

    fn propagate_motion(&mut self, _grab: GrabId, motion: &MotionEvent) {
        self.propagated.push(*motion);
    }

    fn release_grab(&mut self, grab: GrabId) {
        self.released.push(grab);
        self.grab_active = false;
    }

    fn set_drag_source(&mut self, window: WindowId, context: Option<ContextId>) {
        self.drag_sources.push((window, context));
    }

    fn dest_window(&self, context: ContextId) -> Option<WindowId> {
        self.dest_windows.get(&context).copied()
    }

    fn reply_data(&mut self, context: ContextId, flavor: &str, data: Option<&[u8]>) {
        self.data_replies
            .push((context, flavor.to_string(), data.map(<[u8]>::to_vec)));
    }

    fn set_direct_save(&mut self, context: ContextId, file_name: Option<&str>) {
        match file_name {
            Some(name) => {
                self.direct_save.insert(context, name.to_string());
            }
            None => {
                self.direct_save.remove(&context);
            }
        }
    }

    fn direct_save_uri(&self, context: ContextId) -> Option<String> {
        self.direct_save_uris.get(&context).cloned()
    }

    fn suspend_native_events(&mut self) {
        self.suspended += 1;
        self.suspend_calls += 1;
    }

    fn resume_native_events(&mut self) {
        self.suspended -= 1;
    }

    fn pointer_position(&self) -> Point {
        self.pointer
    }

    fn current_modifiers(&self) -> u32 {
        0
    }
}

type Handler = Box<dyn FnMut(&DragEvent, &mut dyn DragSession)>;

/// Records every dispatched event and optionally reacts to it
#[derive(Default)]
pub struct RecordingDispatcher {
    pub events: Vec<DragEvent>,
    handler: Option<Handler>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: impl FnMut(&DragEvent, &mut dyn DragSession) + 'static) -> Self {
        Self {
            events: Vec::new(),
            handler: Some(Box::new(handler)),
        }
    }

    pub fn kinds(&self) -> Vec<DragEventKind> {
        self.events.iter().map(|event| event.kind).collect()
    }

    pub fn of_kind(&self, kind: DragEventKind) -> Vec<&DragEvent> {
        self.events.iter().filter(|event| event.kind == kind).collect()
    }
}

impl AppDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, event: &DragEvent, session: &mut dyn DragSession) {
        self.events.push(event.clone());
        if let Some(handler) = self.handler.as_mut() {
            handler(event, session);
        }
    }
}
