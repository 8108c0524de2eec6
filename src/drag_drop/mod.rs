//! Drag-and-drop session coordination
//!
//! The coordinator runs both sides of a drag:
//! - **Target**: native drag signals from other applications (or from this
//!   one) become `enter`/`over`/`exit`/`drop` events for the application,
//!   and the dropped data is fetched and converted on demand
//! - **Source**: drags started by the application are advertised in native
//!   formats, data requests are served and the drag's end is reported back
//!
//! ## Shared utilities
//! - `flavors` - application and native format names
//! - `encoding` - text decoding (UTF-8, UTF-16 LE/BE) and `text/uri-list` parsing
//! - `sanitize` - checks for data leaving the application
//!
//! ## Structure
//! - `native` - the toolkit boundary ([`native::NativeBackend`]) and the signals it delivers
//! - `dispatch` - the application boundary ([`dispatch::AppDispatcher`], [`dispatch::DragSession`])
//! - `service` - [`service::DragService`], which owns the session state
//! - `scheduler` - the single pending task that decouples signals from dispatch
//! - `negotiate`, `cache` - format negotiation and received data
//! - `source`, `temp_files` - data provision for source drags

pub mod cache;
pub mod dispatch;
pub mod encoding;
pub mod flavors;
pub mod native;
pub mod negotiate;
pub mod sanitize;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod temp_files;
pub mod transferable;

#[cfg(test)]
pub(crate) mod testing;
