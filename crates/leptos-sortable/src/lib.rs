//! Leptos Sortable
//!
//! Drag-and-drop reordering of server-rendered lists with persisted order.
//!
//! - `model`, `geometry`, `persist`, `sync`: DOM-free, testable natively
//! - `dom`: web-sys binding that drives a [`SortableSync`] from mouse events

pub mod dom;
pub mod geometry;
pub mod model;
pub mod persist;
pub mod sync;
pub mod view;

pub use dom::{attach, attach_all, DomListView, POSITION_ATTRIBUTE};
pub use geometry::{Containment, DragGeometry};
pub use model::{ItemId, OrderableItem, ReorderError, ReorderModel};
pub use persist::{
    OrderTransport, ParentRef, PayloadShape, PersistOutcome, PersistRequest, ReorderCommand,
    RetryPolicy, Sleeper, TimerSleeper, TransportError, CSRF_FIELD,
};
pub use sync::{SortableOptions, SortableSync};
pub use view::ListView;
