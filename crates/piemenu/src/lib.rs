pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod geometry;
pub mod macros;
pub mod menu;
pub mod timing;
pub mod tree;

pub use config::{Appearance, OpenPolicy, Policy};
pub use dispatch::{Button, Host, HostAttachment, HostRequest, PointerEvent, PointerKind};
pub use error::MenuError;
pub use events::{ListenerId, MenuEvent};
pub use geometry::{Point, Rect};
pub use menu::{MenuState, PieMenu};
pub use timing::{ManualClock, Scheduler, TaskId, TokioScheduler};
pub use tree::{Entry, IconName, Label, MenuItem, MenuNode, MenuTree, NodeId};
