//! Replay buffer crate root: re-exports and module wiring.
//!
//! Records a set of named scalar variables once per simulation step into
//! equal-length per-variable arrays, lets an operator scrub a cursor through
//! that history and edits it destructively (pack, crop, cut, thin, resize).
//!
//! Modules:
//! - `variable`: the read/write-as-double capability the buffer records from
//! - `data`: bounds cache, key points, per-variable entries and the
//!   `DataBuffer` controller
//! - `events`: synchronous listener lists and channel subscribers
//! - `config`: serde-backed buffer settings
//! - `error`: the shared error type

pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod variable;

// Public re-exports for a compact external API
pub use config::BufferConfig;
pub use data::bounds::{Bounds, BoundsCache};
pub use data::buffer::DataBuffer;
pub use data::entry::BufferEntry;
pub use data::is_in_window;
pub use data::key_points::KeyPoints;
pub use data::processor::BufferProcessor;
pub use error::{BufferError, Result};
pub use events::{
    BufferEvent, EditMeta, EditOp, EventController, EventFilter, EventKind, KeyPointsChange, ListenerId,
};
pub use variable::{ScalarVariable, Variable, VariableRef};
