//! The drag session coordinator
//!
//! `DragService` sits between the native drag signals and the application's
//! drag events:
//! - native signals are answered at once and recorded as one pending task
//! - the embedding runs [`DragService::run_scheduled_task`] from its loop,
//!   which dispatches application events for the recorded task
//! - while an event handler waits for drag data, only native steps are pumped
//!   and no further application events are dispatched
//!
//! The same instance also runs drags started by this process: it advertises
//! the formats, serves data requests and reports the end of the drag.

use std::time::Instant;

use super::cache::TargetDataCache;
use super::dispatch::{AppDispatcher, DragEvent, DragEventKind, DragSession};
use super::encoding::count_uri_list_items;
use super::flavors;
use super::native::{GrabEvent, MotionEvent, NativeBackend, NativeDragHandler, NativeSignal};
use super::negotiate::{self, action_from_native, motion_reply};
use super::scheduler::{PendingTask, SourcePhase, TargetPhase, TaskKind, TaskScheduler};
use super::source;
use super::temp_files::{FileUriOpener, TempFileManager, UriOpener};
use super::transferable::Transferable;
use crate::config::{BackendQuirks, DragServiceConfig};
use crate::error::{Error, Result};
use crate::types::{
    ActionSet, ContextId, DragAction, DragResult, GrabId, Point, Timestamp, WidgetId, WindowId,
};

/// Grab state of a running source drag
///
/// The toolkit only sends drag position messages in response to pointer
/// motion, so the last motion is re-sent periodically while the pointer
/// rests, letting the destination update its feedback.
#[derive(Debug)]
struct SourceGrab {
    widget: GrabId,
    motion: Option<MotionEvent>,
    repeat_at: Option<Instant>,
}

pub struct DragService<B: NativeBackend> {
    backend: B,
    config: DragServiceConfig,
    quirks: BackendQuirks,
    scheduler: TaskScheduler,
    cache: TargetDataCache,
    temp_files: TempFileManager,

    doing_drag: bool,
    can_drop: bool,
    drag_action: DragAction,
    drop_effect: DragAction,
    user_cancelled: bool,
    end_point: Option<Point>,
    target_phase: TargetPhase,
    source_phase: SourcePhase,

    target_window: Option<WindowId>,
    target_point: Point,
    entered_window: Option<WindowId>,
    // Valid only while a tick processes its task
    target_widget: Option<WidgetId>,
    target_context: Option<ContextId>,
    target_time: Timestamp,
    /// Set by a handler that replies from another process
    reply_from_remote: bool,
    remote_reply_context: Option<ContextId>,
    received: Option<Vec<u8>>,
    fetching: bool,

    source_active: bool,
    source_items: Option<Vec<Transferable>>,
    source_context: Option<ContextId>,
    source_window: Option<WindowId>,
    grab: Option<SourceGrab>,
}

impl<B: NativeBackend> DragService<B> {
    pub fn new(backend: B, config: DragServiceConfig) -> Self {
        Self::with_uri_opener(backend, config, Box::new(FileUriOpener))
    }

    /// `opener` fetches the sources of promised files
    pub fn with_uri_opener(backend: B, config: DragServiceConfig, opener: Box<dyn UriOpener>) -> Self {
        let quirks = config.quirks_for(backend.display_server());
        tracing::debug!("drag service created with {:?}", quirks);
        let temp_files = TempFileManager::new(config.temp_dir(), opener);
        Self {
            backend,
            config,
            quirks,
            scheduler: TaskScheduler::new(),
            cache: TargetDataCache::new(),
            temp_files,
            doing_drag: false,
            can_drop: false,
            drag_action: DragAction::None,
            drop_effect: DragAction::None,
            user_cancelled: false,
            end_point: None,
            target_phase: TargetPhase::Idle,
            source_phase: SourcePhase::Idle,
            target_window: None,
            target_point: Point::default(),
            entered_window: None,
            target_widget: None,
            target_context: None,
            target_time: 0,
            reply_from_remote: false,
            remote_reply_context: None,
            received: None,
            fetching: false,
            source_active: false,
            source_items: None,
            source_context: None,
            source_window: None,
            grab: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &DragServiceConfig {
        &self.config
    }

    pub fn quirks(&self) -> &BackendQuirks {
        &self.quirks
    }

    pub fn target_phase(&self) -> TargetPhase {
        self.target_phase
    }

    pub fn source_phase(&self) -> SourcePhase {
        self.source_phase
    }

    pub fn is_doing_drag(&self) -> bool {
        self.doing_drag
    }

    pub fn pending_task(&self) -> Option<PendingTask> {
        self.scheduler.pending().copied()
    }

    /// Whether [`DragService::run_scheduled_task`] has work to do
    pub fn tick_armed(&self) -> bool {
        self.scheduler.tick_armed()
    }

    /// Earliest deadline [`DragService::poll_timers`] acts on
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        let repeat = self.grab.as_ref().and_then(|grab| grab.repeat_at);
        [repeat, self.temp_files.cleanup_deadline()].into_iter().flatten().min()
    }

    // Source sessions

    /// Start a drag of `items` from this process
    ///
    /// Fails with [`Error::NotAvailable`] while the end of the previous
    /// source drag has not been processed. A drop on this process ends the
    /// session before the native end signal arrives; the items stay reserved
    /// until that signal.
    pub fn invoke_drag_session(&mut self, items: Vec<Transferable>, actions: ActionSet) -> Result<()> {
        tracing::debug!("invoke drag session with {} items", items.len());
        if self.source_active || self.source_items.is_some() {
            return Err(Error::NotAvailable);
        }
        if items.is_empty() {
            return Err(Error::NoItems);
        }

        let targets = negotiate::build_advertised_formats(&items, &self.quirks);
        let mut native_actions = ActionSet::DEFAULT;
        for action in [ActionSet::COPY, ActionSet::MOVE, ActionSet::LINK] {
            if actions.contains(action) {
                native_actions |= action;
            }
        }

        let Some(context) = self.backend.begin_drag(&targets, native_actions) else {
            tracing::warn!("native layer refused to start the drag");
            return Err(Error::FailedToStartDrag);
        };
        tracing::debug!("source drag started on {}", context);

        if self.quirks.track_source_window {
            self.source_window = self.backend.window_at_pointer();
            if let Some(window) = self.source_window {
                self.backend.set_drag_source(window, Some(context));
            }
        }

        self.source_items = Some(items);
        self.source_active = true;
        self.source_context = Some(context);
        self.start_drag_session();
        self.grab = self.backend.current_grab().map(|widget| SourceGrab {
            widget,
            motion: None,
            repeat_at: None,
        });
        self.end_point = None;
        self.source_phase = SourcePhase::Began;
        Ok(())
    }

    fn is_external_drop(&self, context: ContextId) -> bool {
        let dest = self.backend.dest_window(context);
        if self.quirks.dest_window_identifies_external {
            dest.map_or(true, |window| !self.backend.is_app_window(window))
        } else {
            dest.is_none()
        }
    }

    fn source_end_drag_session(&mut self, context: ContextId, result: DragResult) {
        tracing::debug!("source end drag session {} result {:?}", context, result);
        if self.source_context != Some(context) {
            tracing::debug!("end of stale source context {} ignored", context);
            return;
        }
        self.source_context = None;
        self.source_items = None;
        if self.quirks.direct_save_supported {
            self.backend.set_direct_save(context, None);
        }

        // Already ended by a drop on ourselves, or by a failure signal
        if !self.doing_drag || self.scheduler.pending_kind() == Some(TaskKind::SourceEnd) {
            return;
        }

        if self.end_point.is_none() {
            let guess = self.backend.pointer_position();
            tracing::debug!("guess drag end point {:?}", guess);
            self.end_point = Some(guess);
        }

        self.drop_effect = if result == DragResult::Success {
            let accepted = match self.backend.dest_window(context) {
                Some(_) => self.backend.actions(context),
                None => ActionSet::NONE,
            };
            negotiate::drop_effect(accepted)
        } else {
            if result != DragResult::NoTarget {
                tracing::debug!("drop is user cancelled");
                self.user_cancelled = true;
            }
            DragAction::None
        };

        self.schedule(PendingTask::new(TaskKind::SourceEnd));
    }

    // Timers

    /// Fire the synthetic motion repeat and the temp file cleanup when due
    pub fn poll_timers(&mut self, now: Instant) {
        if let Some(grab) = self.grab.as_mut() {
            if grab.repeat_at.is_some_and(|at| now >= at) {
                grab.repeat_at = None;
                if let Some(motion) = grab.motion.take() {
                    if self.backend.grab_is_active(grab.widget) {
                        self.backend.propagate_motion(grab.widget, &motion);
                    }
                }
            }
        }
        if self.temp_files.run_due_cleanup(now) {
            tracing::debug!("temporary drag files removed");
        }
    }

    fn release_source_grab(&mut self) {
        if let Some(grab) = self.grab.take() {
            tracing::debug!("release source grab {}", grab.widget);
            self.backend.release_grab(grab.widget);
        }
    }

    // Scheduling

    fn schedule(&mut self, task: PendingTask) -> bool {
        tracing::debug!(
            "schedule {} context {:?} window {:?}",
            task.kind,
            task.context,
            task.window
        );
        if !self.scheduler.schedule(task) {
            return false;
        }

        if self.quirks.reply_immediately_on_motion && task.kind == TaskKind::Motion {
            if let Some(context) = task.context {
                self.update_drag_action(Some(context));
                self.reply_to_drag_motion(context, task.time);
            }
        }
        true
    }

    /// Process the pending task; call while [`DragService::tick_armed`]
    ///
    /// Returns whether the tick is still armed, which happens when handlers
    /// caused new native signals while the task was processed.
    pub fn run_scheduled_task(&mut self, app: &mut dyn AppDispatcher) -> bool {
        if self.scheduler.is_running() || self.fetching {
            tracing::debug!("scheduled task is already running, quit");
            return self.scheduler.tick_armed();
        }
        if !self.scheduler.tick_armed() {
            return false;
        }
        self.scheduler.begin_tick();
        tracing::debug!(
            "run scheduled task {:?} target window {:?} pending window {:?}",
            self.scheduler.pending_kind(),
            self.target_window,
            self.scheduler.pending_window()
        );

        let pending_window = self.scheduler.pending_window();
        if let Some(old) = self.target_window.filter(|window| Some(*window) != pending_window) {
            tracing::debug!("dispatch exit at {}", old);
            self.entered_window = None;
            self.dispatch(app, DragEvent::new(DragEventKind::Exit, Some(old), self.target_point, 0));
            self.target_phase = TargetPhase::LeftWithoutDrop;
            if !self.source_active {
                // A foreign drag left us; no native signal will end it
                self.end_drag_session(false, app);
            }
        }

        // Anything scheduled from here on belongs to the next tick
        let Some(task) = self.scheduler.take() else {
            return self.scheduler.end_tick();
        };
        let position_changed = task.window != self.target_window || task.point != self.target_point;
        self.target_window = task.window;
        self.target_point = task.point;

        if matches!(task.kind, TaskKind::Leave | TaskKind::SourceEnd) {
            tracing::debug!("quit, selected task {}", task.kind);
            if task.kind == TaskKind::SourceEnd {
                self.end_drag_session(true, app);
            }
            return self.scheduler.end_tick();
        }

        self.start_drag_session();
        if !matches!(self.target_phase, TargetPhase::Began | TargetPhase::Moving) {
            self.target_phase = TargetPhase::Began;
        }

        // The window may have been destroyed; the native layer still gets
        // its reply below
        self.target_widget = task.window.and_then(|window| self.backend.window_widget(window));
        self.target_context = task.context;
        self.target_time = task.time;
        tracing::debug!(
            "target window {:?} widget {:?} context {:?}",
            self.target_window,
            self.target_widget,
            self.target_context
        );

        // A drop without preceding motion still gets an over event first,
        // so handlers can decide whether dropping is allowed
        if task.kind == TaskKind::Motion || position_changed {
            self.update_drag_action(self.target_context);
            self.reply_from_remote = false;
            self.target_phase = TargetPhase::Moving;
            self.dispatch_motion_events(app);
            if task.kind == TaskKind::Motion {
                if std::mem::take(&mut self.reply_from_remote) {
                    self.remote_reply_context = self.target_context;
                } else if let Some(context) = self.target_context {
                    self.reply_to_drag_motion(context, self.target_time);
                }
            }
        }

        if task.kind == TaskKind::Drop {
            let success = self.dispatch_drop_event(app);
            if let Some(context) = self.target_context {
                tracing::debug!("drag finished, success {}", success);
                self.backend.drag_finish(context, success, self.target_time);
            }
            self.target_phase = TargetPhase::Dropped;
            // Dropped on ourselves: the source learns the effect from this tick
            if success && self.source_active {
                self.drop_effect = self.drag_action;
            }
            // A drag from another application gets no end signal
            self.end_drag_session(true, app);
        }

        self.target_widget = None;
        self.target_context = None;
        self.scheduler.end_tick()
    }

    fn start_drag_session(&mut self) -> bool {
        if self.doing_drag {
            return false;
        }
        tracing::debug!("start drag session");
        self.doing_drag = true;
        true
    }

    /// End the running session; `done` dispatches the end event at the
    /// source when this process started the drag
    pub fn end_drag_session(&mut self, done: bool, app: &mut dyn AppDispatcher) {
        if !self.doing_drag {
            return;
        }
        tracing::debug!("end drag session, done {}", done);

        if done && self.source_active {
            let mut event = DragEvent::new(
                DragEventKind::End,
                None,
                self.end_point.unwrap_or_default(),
                0,
            );
            event.drop_effect = self.drop_effect;
            event.user_cancelled = self.user_cancelled;
            self.dispatch(app, event);
        }

        self.release_source_grab();
        self.drag_action = DragAction::None;

        if self.temp_files.has_artifacts() && !self.temp_files.cleanup_armed() {
            self.temp_files.schedule_cleanup(self.config.temp_cleanup_delay());
        }
        self.temp_files.end_session();

        if let Some(window) = self.source_window.take() {
            self.backend.set_drag_source(window, None);
        }
        self.remote_reply_context = None;
        self.target_window = None;
        self.entered_window = None;
        self.cache.reset();

        if self.source_active {
            self.source_phase = SourcePhase::Ended(self.drop_effect);
        }
        if self.target_phase != TargetPhase::Idle {
            self.target_phase = TargetPhase::Ended;
        }

        self.doing_drag = false;
        self.can_drop = false;
        self.source_active = false;
        self.user_cancelled = false;
        self.drop_effect = DragAction::None;
        self.end_point = None;
    }

    /// Send the motion reply a remote handler asked to defer
    pub fn update_drag_effect(&mut self) {
        tracing::debug!("update drag effect from remote handler");
        if let Some(context) = self.remote_reply_context.take() {
            self.reply_to_drag_motion(context, self.target_time);
        }
    }

    fn dispatch(&mut self, app: &mut dyn AppDispatcher, mut event: DragEvent) {
        event.modifiers = self.backend.current_modifiers();
        app.dispatch(&event, self);
    }

    fn dispatch_motion_events(&mut self, app: &mut dyn AppDispatcher) {
        if self.source_active {
            let point = self.end_point.unwrap_or_default();
            self.dispatch(app, DragEvent::new(DragEventKind::Drag, None, point, self.target_time));
        }
        if let Some(window) = self.target_window {
            if self.entered_window != Some(window) {
                self.entered_window = Some(window);
                let enter = DragEvent::new(
                    DragEventKind::Enter,
                    Some(window),
                    self.target_point,
                    self.target_time,
                );
                self.dispatch(app, enter);
            }
            let over = DragEvent::new(
                DragEventKind::Over,
                Some(window),
                self.target_point,
                self.target_time,
            );
            self.dispatch(app, over);
        }
    }

    /// Returns whether the drop was accepted
    fn dispatch_drop_event(&mut self, app: &mut dyn AppDispatcher) -> bool {
        let Some(window) = self
            .target_window
            .filter(|window| !self.backend.window_is_destroyed(*window))
        else {
            return false;
        };
        let kind = if self.can_drop {
            DragEventKind::Drop
        } else {
            self.entered_window = None;
            DragEventKind::Exit
        };
        let event = DragEvent::new(kind, Some(window), self.target_point, self.target_time);
        self.dispatch(app, event);
        self.can_drop
    }

    fn update_drag_action(&mut self, context: Option<ContextId>) {
        let mut actions = ActionSet::DEFAULT;
        if let Some(context) = context {
            actions = self.backend.actions(context);
            if self.quirks.prefer_selected_action {
                let selected = self.backend.selected_action(context);
                if !selected.is_empty() {
                    actions = selected;
                }
            }
        }
        self.drag_action = action_from_native(actions);
        tracing::debug!("drag action {:?} from {:?}", self.drag_action, actions);
    }

    fn reply_to_drag_motion(&mut self, context: ContextId, time: Timestamp) {
        let status = motion_reply(self.can_drop, self.drag_action, &self.quirks);
        tracing::debug!("reply to drag motion {} can drop {} status {:?}", context, self.can_drop, status);
        self.backend.drag_status(context, status, time);
    }

    // Target data

    fn target_formats(&self) -> Vec<String> {
        self.target_context
            .map(|context| self.backend.targets(context))
            .unwrap_or_default()
    }

    /// Drags of several items inside this process carry the items directly
    fn is_target_context_list(&self) -> bool {
        let Some(context) = self.target_context else {
            return false;
        };
        if !self.backend.source_is_local(context) {
            return false;
        }
        self.backend
            .targets(context)
            .iter()
            .any(|flavor| flavor == flavors::INTERNAL_ITEM_LIST)
    }

    /// Bytes of `flavor` for the current target context, from the cache or
    /// fetched with a bounded wait. Empty payloads count as missing.
    fn get_target_drag_data(&mut self, flavor: &str, offered: &[String]) -> Option<Vec<u8>> {
        tracing::debug!("get target drag data {:?} {}", self.target_context, flavor);
        if !offered.iter().any(|f| f == flavor) {
            tracing::debug!("{} is missing", flavor);
            return None;
        }
        let context = self.target_context?;

        if let Some(cached) = self.cache.lookup(context, flavor) {
            tracing::debug!("{} found in cache, {} bytes", flavor, cached.len());
            return (!cached.is_empty()).then(|| cached.to_vec());
        }

        self.received = None;
        self.fetching = true;
        self.backend.request_data(context, flavor, self.target_time);
        self.pump_native();

        let deadline = Instant::now() + self.config.fetch_timeout();
        while self.received.is_none() && self.doing_drag {
            std::thread::sleep(self.config.fetch_poll_interval());
            if Instant::now() > deadline {
                tracing::warn!("failed to get drag data {} in time", flavor);
                break;
            }
            self.pump_native();
        }
        self.fetching = false;

        let data = self.received.take().filter(|data| !data.is_empty());
        if data.is_none() {
            tracing::debug!("{} failed to get from system", flavor);
        }
        data
    }

    fn pump_native(&mut self) {
        if let Some(signal) = self.backend.iterate() {
            self.handle_native_signal(signal);
        }
    }

    /// Route a signal produced by the native layer to its handler
    pub fn handle_native_signal(&mut self, signal: NativeSignal) {
        match signal {
            NativeSignal::Motion {
                window,
                context,
                point,
                time,
            } => {
                self.drag_motion(window, context, point, time);
            }
            NativeSignal::Leave => {
                self.drag_leave();
            }
            NativeSignal::Drop {
                window,
                context,
                point,
                time,
            } => {
                self.drag_drop(window, context, point, time);
            }
            NativeSignal::DataReceived {
                context,
                flavor,
                data,
            } => self.drag_data_received(context, &flavor, &data),
            NativeSignal::DataRequested {
                context,
                flavor,
                time,
            } => {
                let data = self.source_drag_data_get(context, &flavor, time);
                self.backend.reply_data(context, &flavor, data.as_deref());
            }
            NativeSignal::SourceBegin { context } => self.source_drag_begin(context),
            NativeSignal::SourceEnd { context } => self.source_drag_end(context),
            NativeSignal::SourceFailed { context, result } => {
                self.source_drag_failed(context, result);
            }
            NativeSignal::Grab(event) => self.source_grab_event(event),
            NativeSignal::Other => {}
        }
    }
}

impl<B: NativeBackend> NativeDragHandler for DragService<B> {
    fn drag_motion(
        &mut self,
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    ) -> bool {
        if self.scheduler.pending_kind() == Some(TaskKind::Motion) {
            tracing::debug!("drag motion received before previous reply was sent");
        }
        self.schedule(PendingTask::at(TaskKind::Motion, window, context, point, time))
    }

    fn drag_leave(&mut self) -> bool {
        // A drop signal may still follow before the tick runs; it then
        // replaces the leave
        if !self.schedule(PendingTask::new(TaskKind::Leave)) {
            tracing::warn!("drag leave after drop");
            return false;
        }
        true
    }

    fn drag_drop(
        &mut self,
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    ) -> bool {
        if !self.schedule(PendingTask::at(TaskKind::Drop, window, context, point, time)) {
            tracing::warn!("additional drag drop ignored");
            return false;
        }
        // The end event reports screen coordinates
        self.end_point = Some(self.backend.window_to_screen(window, point));
        true
    }

    fn drag_data_received(&mut self, context: ContextId, flavor: &str, data: &[u8]) {
        tracing::debug!("target data received {} {}, {} bytes", context, flavor, data.len());
        self.cache.store(context, flavor, data.to_vec());
        self.received = Some(data.to_vec());
    }

    fn source_drag_begin(&mut self, context: ContextId) {
        tracing::debug!("source drag begin {}", context);
        if self.source_phase == SourcePhase::Began {
            self.source_phase = SourcePhase::Dragging;
        }
        if !self.quirks.direct_save_supported {
            return;
        }
        let file_name = self
            .source_items
            .as_ref()
            .and_then(|items| items.first())
            .and_then(source::direct_save_file_name);
        if let Some(file_name) = file_name {
            self.backend.set_direct_save(context, Some(&file_name));
        }
    }

    fn source_drag_data_get(
        &mut self,
        context: ContextId,
        flavor: &str,
        _time: Timestamp,
    ) -> Option<Vec<u8>> {
        tracing::debug!("source data requested {} as {}", context, flavor);
        let Some(items) = self.source_items.as_ref() else {
            tracing::debug!("no source data items");
            return None;
        };

        if flavor == flavors::URI_LIST {
            let external = self.is_external_drop(context);
            let items = self.source_items.as_deref().unwrap_or_default();
            return Some(source::uri_list(items, external, &mut self.temp_files, &mut self.backend));
        }
        if items.len() > 1 {
            tracing::debug!("{} items dragged, only the first provides {}", items.len(), flavor);
        }

        let item = self.source_items.as_mut()?.first_mut()?;
        match flavor {
            flavors::TEXT | flavors::TEXT_UTF8 => source::text(item, flavors::TEXT),
            flavors::DIRECT_SAVE => {
                let written = self.backend.direct_save_uri(context);
                Some(vec![source::direct_save(item, written.as_deref())])
            }
            image if flavors::is_image(image) => match source::image(item, image) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("failed to encode drag image as {}: {}", image, e);
                    None
                }
            },
            flavors::NETSCAPE_URL => {
                source::text(item, flavors::URL).or_else(|| source::verbatim(item, flavor))
            }
            _ => source::verbatim(item, flavor),
        }
    }

    fn source_drag_end(&mut self, context: ContextId) {
        self.source_end_drag_session(context, DragResult::Success);
    }

    fn source_drag_failed(&mut self, context: ContextId, mut result: DragResult) -> bool {
        // Without knowledge of other applications' windows the backend
        // reports a tab dropped on nothing as an error
        if self.quirks.error_result_as_no_target_for_tab_drops
            && result == DragResult::Error
            && self.backend.targets(context).iter().any(|f| f == flavors::TAB_DROP)
        {
            tracing::debug!("tab drop on nothing");
            result = DragResult::NoTarget;
        }
        self.source_end_drag_session(context, result);
        false
    }

    fn source_grab_event(&mut self, event: GrabEvent) {
        let Some(grab) = self.grab.as_mut() else {
            return;
        };
        if !self.backend.grab_is_active(grab.widget) {
            return;
        }
        match event {
            GrabEvent::Motion(motion) => {
                grab.motion = Some(motion);
                self.end_point = Some(motion.root);
            }
            GrabEvent::Key { state } => match grab.motion.as_mut() {
                Some(motion) => motion.state = state,
                None => return,
            },
        }
        grab.repeat_at = Some(Instant::now() + self.config.motion_repeat_interval());
        if self.source_phase == SourcePhase::Began {
            self.source_phase = SourcePhase::Dragging;
        }
    }
}

impl<B: NativeBackend> DragSession for DragService<B> {
    fn can_drop(&self) -> bool {
        self.can_drop
    }

    fn set_can_drop(&mut self, can_drop: bool) {
        self.can_drop = can_drop;
    }

    fn drag_action(&self) -> DragAction {
        self.drag_action
    }

    fn set_drag_action(&mut self, action: DragAction) {
        self.drag_action = action;
    }

    fn num_drop_items(&mut self) -> usize {
        if self.target_widget.is_none() {
            return 0;
        }
        if self.is_target_context_list() {
            return self.source_items.as_ref().map_or(0, Vec::len);
        }
        let offered = self.target_formats();
        match self.get_target_drag_data(flavors::URI_LIST, &offered) {
            Some(list) => count_uri_list_items(&list),
            None => 1,
        }
    }

    fn is_data_flavor_supported(&self, flavor: &str) -> bool {
        if self.target_widget.is_none() {
            tracing::warn!("flavor query without a target widget");
            return false;
        }
        if self.is_target_context_list() {
            // Only our own items can be in the list
            return self.source_items.as_ref().is_some_and(|items| {
                items
                    .iter()
                    .any(|item| item.exportable_flavors().any(|f| f == flavor))
            });
        }
        negotiate::flavor_supported(&self.target_formats(), flavor)
    }

    fn get_data(&mut self, item: &mut Transferable, index: usize) -> Result<()> {
        tracing::debug!("get data, index {}", index);
        if self.target_widget.is_none() {
            return Err(Error::NoTargetWidget);
        }
        let wanted: Vec<String> = item.flavors().map(String::from).collect();

        if self.is_target_context_list() {
            let source = self
                .source_items
                .as_ref()
                .and_then(|items| items.get(index));
            if let Some(source) = source {
                for flavor in &wanted {
                    if let Some(data) = source.data(flavor) {
                        item.set_data(flavor.as_str(), data.clone());
                        return Ok(());
                    }
                }
            }
            tracing::debug!("failed to match flavors in item list");
            return Ok(());
        }

        let offered = self.target_formats();
        'flavors: for flavor in &wanted {
            for attempt in negotiate::resolve_format(flavor, &offered) {
                let Some(bytes) = self.get_target_drag_data(&attempt.native, &offered) else {
                    continue;
                };
                tracing::debug!("data for {} found as {}", flavor, attempt.native);
                let Some(data) = negotiate::convert(flavor, attempt.conversion, &bytes, index) else {
                    continue 'flavors;
                };
                item.set_data(flavor.as_str(), data);
                // Images keep looking for a better (textual) representation
                if flavors::is_image(flavor) {
                    continue 'flavors;
                }
                return Ok(());
            }
        }
        Ok(())
    }

    fn reply_asynchronously(&mut self) {
        self.reply_from_remote = true;
    }

    fn is_source_session(&self) -> bool {
        self.source_active
    }
}

impl<B: NativeBackend> Drop for DragService<B> {
    fn drop(&mut self) {
        self.release_source_grab();
        self.temp_files.cleanup_now();
    }
}
