//! Task coalescing for native drag signals
//!
//! Native drag signals must be answered immediately, while application
//! events may run nested event loops. Signals are therefore only recorded
//! here, as at most one pending task, and dispatched later from a deferred
//! tick. Rules for a new request against the pending task:
//! - anything replaces a pending motion or leave
//! - nothing but a source end replaces a pending drop
//! - nothing replaces a pending source end

use std::fmt;

use crate::types::{ContextId, DragAction, Point, Timestamp, WindowId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Motion,
    Leave,
    Drop,
    SourceEnd,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Motion => "motion",
            TaskKind::Leave => "leave",
            TaskKind::Drop => "drop",
            TaskKind::SourceEnd => "source-end",
        };
        f.write_str(name)
    }
}

/// The coalesced unit of scheduled work
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTask {
    pub kind: TaskKind,
    pub window: Option<WindowId>,
    pub context: Option<ContextId>,
    pub point: Point,
    pub time: Timestamp,
}

impl PendingTask {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            window: None,
            context: None,
            point: Point::default(),
            time: 0,
        }
    }

    pub fn at(
        kind: TaskKind,
        window: WindowId,
        context: ContextId,
        point: Point,
        time: Timestamp,
    ) -> Self {
        Self {
            kind,
            window: Some(window),
            context: Some(context),
            point,
            time,
        }
    }
}

/// A one-shot deferred invocation owned by its user
#[derive(Debug, Default)]
pub struct DeferredTask {
    armed: bool,
}

impl DeferredTask {
    /// Returns `true` if the task was not armed yet
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Debug, Default)]
pub struct TaskScheduler {
    pending: Option<PendingTask>,
    tick: DeferredTask,
    running: bool,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `task`, replacing or being rejected by the pending task
    ///
    /// Returns `false` when rejected; the native layer then falls back to
    /// its own default handling of the signal.
    pub fn schedule(&mut self, task: PendingTask) -> bool {
        if let Some(pending) = &self.pending {
            let rejected = match pending.kind {
                TaskKind::SourceEnd => true,
                TaskKind::Drop => task.kind != TaskKind::SourceEnd,
                TaskKind::Motion | TaskKind::Leave => false,
            };
            if rejected {
                tracing::debug!("task {} does not fit pending task {}", task.kind, pending.kind);
                return false;
            }
        }
        self.pending = Some(task);
        if self.tick.arm() {
            tracing::debug!("drag tick armed by {}", task.kind);
        }
        true
    }

    pub fn pending(&self) -> Option<&PendingTask> {
        self.pending.as_ref()
    }

    pub fn pending_kind(&self) -> Option<TaskKind> {
        self.pending.map(|task| task.kind)
    }

    pub fn pending_window(&self) -> Option<WindowId> {
        self.pending.and_then(|task| task.window)
    }

    /// Snapshot and clear the pending task; anything scheduled afterwards
    /// belongs to the next tick
    pub fn take(&mut self) -> Option<PendingTask> {
        self.pending.take()
    }

    pub fn tick_armed(&self) -> bool {
        self.tick.is_armed()
    }

    /// Enter the tick; `false` if a tick is already executing
    pub fn begin_tick(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Leave the tick. The tick stays armed only when work was scheduled
    /// while it ran; returns whether it is still armed.
    pub fn end_tick(&mut self) -> bool {
        self.running = false;
        if self.pending.is_none() {
            self.tick.disarm();
        }
        self.tick.is_armed()
    }
}

/// Lifecycle of the session in which this process is the drop target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetPhase {
    #[default]
    Idle,
    Began,
    Moving,
    Dropped,
    LeftWithoutDrop,
    Ended,
}

/// Lifecycle of the session in which this process is the drag source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourcePhase {
    #[default]
    Idle,
    Began,
    Dragging,
    /// The drop effect reported with the end event
    Ended(DragAction),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion(x: i32, y: i32) -> PendingTask {
        PendingTask::at(TaskKind::Motion, WindowId(1), ContextId(1), Point::new(x, y), 0)
    }

    #[test]
    fn test_motion_coalesces_to_latest() {
        let mut scheduler = TaskScheduler::new();
        for i in 0..5 {
            assert!(scheduler.schedule(motion(i, i * 2)));
        }
        assert_eq!(scheduler.take().map(|t| t.point), Some(Point::new(4, 8)));
        assert!(scheduler.take().is_none());
    }

    #[test]
    fn test_leave_replaces_motion() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule(motion(1, 1));
        assert!(scheduler.schedule(PendingTask::new(TaskKind::Leave)));
        assert_eq!(scheduler.pending_kind(), Some(TaskKind::Leave));
        assert_eq!(scheduler.pending_window(), None);
    }

    #[test]
    fn test_drop_is_reserved() {
        let mut scheduler = TaskScheduler::new();
        let drop = PendingTask::at(TaskKind::Drop, WindowId(1), ContextId(1), Point::new(3, 4), 9);
        assert!(scheduler.schedule(drop));
        assert!(!scheduler.schedule(PendingTask::new(TaskKind::Leave)));
        assert!(!scheduler.schedule(motion(5, 5)));
        assert!(!scheduler.schedule(drop));
        assert_eq!(scheduler.pending(), Some(&drop));
    }

    #[test]
    fn test_source_end_preempts_drop() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule(PendingTask::at(
            TaskKind::Drop,
            WindowId(1),
            ContextId(1),
            Point::default(),
            0,
        ));
        assert!(scheduler.schedule(PendingTask::new(TaskKind::SourceEnd)));
        assert_eq!(scheduler.pending_kind(), Some(TaskKind::SourceEnd));

        // Nothing replaces a pending source end
        assert!(!scheduler.schedule(PendingTask::new(TaskKind::SourceEnd)));
        assert!(!scheduler.schedule(motion(1, 1)));
    }

    #[test]
    fn test_tick_arming() {
        let mut scheduler = TaskScheduler::new();
        assert!(!scheduler.tick_armed());
        scheduler.schedule(motion(1, 1));
        assert!(scheduler.tick_armed());

        assert!(scheduler.begin_tick());
        assert!(!scheduler.begin_tick());
        scheduler.take();
        // Scheduled while the tick ran: stays armed
        scheduler.schedule(motion(2, 2));
        assert!(scheduler.end_tick());

        assert!(scheduler.begin_tick());
        scheduler.take();
        assert!(!scheduler.end_tick());
        assert!(!scheduler.tick_armed());
    }

    #[test]
    fn test_deferred_task() {
        let mut task = DeferredTask::default();
        assert!(task.arm());
        assert!(!task.arm());
        task.disarm();
        assert!(!task.is_armed());
    }
}
