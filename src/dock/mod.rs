//! The dock engine: tile order, drag gestures, ingestion of dropped paths and
//! the controller that wires them to persistence and launching.

pub mod controller;
pub mod geometry;
pub mod ingest;
pub mod session;
pub mod store;

pub use controller::Dock;
pub use geometry::Orientation;
pub use session::{SessionOutcome, TileLayout};
pub use store::{ShortcutId, StoreEvent, VisualSlot};
