//! # Introduction
//!
//! scvd-view is the engine behind a component viewer: it evaluates the
//! expressions of an SCVD description against live target memory and
//! registers, formats the results through printf-style templates, and keeps
//! a display tree that is reconciled on every refresh.
//!
//! ## Refresh pipeline
//!
//! ```text
//! Description → Statements → (Parser → Evaluator ⇄ Caches ⇄ Target) → Format → GUI tree
//! ```
//!
//! 1. [`parser`]: tokenises expression text, builds an AST, folds constants
//!    and splits printf templates into segments.
//! 2. [`interpreter`]: evaluates an AST against a
//!    [`interpreter::ResolutionHost`], which resolves symbols, members and
//!    intrinsics for the data model.
//! 3. [`memory`]: typed values and their arithmetic, the validity cache,
//!    the register cache, the chunked memory cache and the symbol store.
//! 4. [`format`]: printf specifiers (`%d`, `%x`, `%E`, `%I`, `%M`, ...).
//! 5. [`model`] and [`statements`]: the parsed description and the engine
//!    that executes it in line order, one pass per refresh.
//! 6. [`config`]: limits and policies for a refresh pass.
//!
//! ## Example
//!
//! ```
//! use scvd_view::config::EngineConfig;
//! use scvd_view::memory::target::SimulatedTarget;
//! use scvd_view::model::{Description, Node, VarSpec};
//! use scvd_view::statements::StatementEngine;
//!
//! let description = Description::new().with_object(
//!     Node::object(1, "demo")
//!         .child(Node::var(2, VarSpec::new("count", "uint32_t").value("3")))
//!         .child(Node::out(3, "Demo").child(Node::item(4, "count", "%d[count]"))),
//! );
//! let mut engine = StatementEngine::new(&description, SimulatedTarget::new(), EngineConfig::default());
//! engine.refresh().unwrap();
//! assert_eq!(engine.gui().render_text(), "Demo\n  count: 3\n");
//! ```

pub mod config;
pub mod format;
pub mod interpreter;
pub mod memory;
pub mod model;
pub mod parser;
pub mod statements;
