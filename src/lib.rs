//! Drag-and-drop session coordinator for GTK-style native drag protocols
//!
//! The embedding implements [`NativeBackend`] for its toolkit, forwards the
//! toolkit's drag signals to a [`DragService`] and runs
//! [`DragService::run_scheduled_task`] from its event loop whenever
//! [`DragService::tick_armed`] reports work. Application events are delivered
//! to an [`AppDispatcher`].

pub mod config;
pub mod drag_drop;
pub mod error;
pub mod types;

pub use config::{BackendQuirks, DragServiceConfig};
pub use drag_drop::dispatch::{AppDispatcher, DragEvent, DragEventKind, DragSession};
pub use drag_drop::native::{
    DisplayServer, GrabEvent, MotionEvent, NativeBackend, NativeDragHandler, NativeSignal,
};
pub use drag_drop::scheduler::{SourcePhase, TargetPhase};
pub use drag_drop::service::DragService;
pub use drag_drop::temp_files::{FileUriOpener, UriOpener};
pub use drag_drop::transferable::{TransferData, Transferable};
pub use error::{Error, Result};
pub use types::{
    ActionSet, ContextId, DragAction, DragResult, GrabId, Point, Timestamp, WidgetId, WindowId,
};
