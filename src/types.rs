//! Core data types for the drag coordinator
//!
//! This module contains the vocabulary shared by every drag component:
//! - Opaque handles for native windows, widgets, drag contexts and grabs
//! - Window-relative points and native timestamps
//! - Drag actions and the native allowed-action bit set
//! - Native drag results reported at the end of a source drag

use serde::{Deserialize, Serialize};
use std::fmt;

/// Native timestamp carried by every drag signal
pub type Timestamp = u32;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// An application window that can receive drag events
    WindowId
);
handle!(
    /// A native drag context. Borrowed from the toolkit, valid for one tick only.
    ContextId
);
handle!(
    /// The native widget backing a window
    WidgetId
);
handle!(
    /// The hidden widget that holds the pointer grab during a source drag
    GrabId
);

/// A window-relative (or, for the drag end point, screen) position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The single action a drag resolves to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragAction {
    #[default]
    None,
    Copy,
    Move,
    Link,
}

/// Bit set of native drag actions, as reported by the toolkit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet(pub u8);

impl ActionSet {
    pub const NONE: ActionSet = ActionSet(0);
    pub const DEFAULT: ActionSet = ActionSet(1 << 0);
    pub const COPY: ActionSet = ActionSet(1 << 1);
    pub const MOVE: ActionSet = ActionSet(1 << 2);
    pub const LINK: ActionSet = ActionSet(1 << 3);
    pub const PRIVATE: ActionSet = ActionSet(1 << 4);
    pub const ASK: ActionSet = ActionSet(1 << 5);

    pub fn contains(self, other: ActionSet) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The native action that carries a single application action
    pub fn from_action(action: DragAction) -> Self {
        match action {
            DragAction::None => ActionSet::NONE,
            DragAction::Copy => ActionSet::COPY,
            DragAction::Move => ActionSet::MOVE,
            DragAction::Link => ActionSet::LINK,
        }
    }
}

impl std::ops::BitOr for ActionSet {
    type Output = ActionSet;

    fn bitor(self, rhs: ActionSet) -> ActionSet {
        ActionSet(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ActionSet {
    fn bitor_assign(&mut self, rhs: ActionSet) {
        self.0 |= rhs.0;
    }
}

/// How a source drag ended, as reported by the toolkit's end/failed signals
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragResult {
    Success,
    NoTarget,
    UserCancelled,
    TimeoutExpired,
    GrabBroken,
    Error,
}
