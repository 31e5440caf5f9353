//! State Management Module
//!
//! Editable session state, undo/redo history, the editor store, scripted
//! edit operations, and saved works.

pub mod history;
pub mod ops;
pub mod snapshot;
pub mod store;
pub mod work;

pub use history::History;
pub use ops::{apply_ops, EditOp, OpOutcome};
pub use snapshot::{ColorData, EditableState, HistorySnapshot, ImageData, Transform};
pub use store::EditorStore;
pub use work::{LocalStore, Work};
