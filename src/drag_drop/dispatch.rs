//! Application side of the coordinator
//!
//! The coordinator turns native signals into [`DragEvent`]s and hands them to
//! an [`AppDispatcher`]. While handling an event the application sees the
//! running session through [`DragSession`]: it decides whether a drop is
//! allowed and pulls the dragged data.

use serde::Serialize;

use super::transferable::Transferable;
use crate::error::Result;
use crate::types::{DragAction, Point, Timestamp, WindowId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragEventKind {
    Enter,
    Over,
    Exit,
    Drop,
    /// Periodic event at the drag source
    Drag,
    /// The source drag finished
    End,
}

/// An event dispatched to the application
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DragEvent {
    pub kind: DragEventKind,
    /// Target window; `None` for events at the drag source
    pub window: Option<WindowId>,
    pub point: Point,
    pub time: Timestamp,
    pub modifiers: u32,
    /// Effect of a finished source drag (only for `End`)
    pub drop_effect: DragAction,
    pub user_cancelled: bool,
}

impl DragEvent {
    pub fn new(kind: DragEventKind, window: Option<WindowId>, point: Point, time: Timestamp) -> Self {
        Self {
            kind,
            window,
            point,
            time,
            modifiers: 0,
            drop_effect: DragAction::None,
            user_cancelled: false,
        }
    }
}

/// Receives drag events
///
/// Handlers may take their time (and spin their own loops); the coordinator
/// only dispatches from its tick, never from inside a native signal.
pub trait AppDispatcher {
    fn dispatch(&mut self, event: &DragEvent, session: &mut dyn DragSession);
}

/// The running drag as seen from an event handler
pub trait DragSession {
    fn can_drop(&self) -> bool;
    fn set_can_drop(&mut self, can_drop: bool);
    fn drag_action(&self) -> DragAction;
    fn set_drag_action(&mut self, action: DragAction);
    /// Number of dropped items; may fetch data from the source
    fn num_drop_items(&mut self) -> usize;
    fn is_data_flavor_supported(&self, flavor: &str) -> bool;
    /// Fill `item` with the first of its flavors that item `index` of the
    /// drop can provide. Missing data leaves `item` untouched.
    fn get_data(&mut self, item: &mut Transferable, index: usize) -> Result<()>;
    /// The handler answers from another process; the motion reply waits
    /// for [`crate::DragService::update_drag_effect`]
    fn reply_asynchronously(&mut self);
    /// Whether this process started the drag
    fn is_source_session(&self) -> bool;
}
