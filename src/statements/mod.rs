//! Statement engine
//!
//! Executes the statements of a [`crate::model::Description`] against a
//! target session and maintains the output tree:
//! - [`engine`]: the [`StatementEngine`] pass driver and [`PassReport`]
//! - [`tree`]: statements in line order
//! - [`host`]: the resolution host expressions see during a pass
//! - [`gui`]: the arena output tree and its reconciliation
//! - `reads`, `loops`, `output`: the statement kinds
//! - [`errors`]: statement and pass errors
//!
//! # Execution Model
//!
//! Per statement: skip if its condition is false, otherwise execute it and
//! then its children in line order. A failing statement is logged, recorded
//! in the [`PassReport`] and skipped; its siblings still run. Only
//! cancellation or an exceeded deadline abort the pass, and an aborted pass
//! leaves the previous output tree in place.

pub mod engine;
pub mod errors;
pub mod gui;
pub mod host;
mod loops;
mod output;
mod reads;
pub mod tree;

pub use engine::{PassEvent, PassReport, StatementEngine};
pub use errors::{EngineError, StatementError};
pub use gui::{GuiId, GuiTree, OutputNode};
pub use host::{EngineHost, HostRef};
