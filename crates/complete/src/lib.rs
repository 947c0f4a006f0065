//! augur-complete: scope-aware completion for JavaScript buffers.
//!
//! Given a buffer and a caret, the engine works out what is being typed
//! (an identifier chain, a property access, a string or regex member),
//! analyzes the parsed buffer into a tree of symbols annotated with
//! heuristic types, and ranks candidates from three sources: static
//! analysis, an optional live object graph (the sandbox), and a keyword
//! table.
//!
//! Nothing here executes the analyzed code. Analysis is best-effort: a
//! buffer that does not parse is answered from the last good analysis.
//!
//! # Public API
//!
//! - [`Session`] -- the entry point an editor holds per buffer
//! - [`contextualize()`] -- caret to [`Intent`]
//! - [`analyze_scope()`] -- syntax tree to [`TypeStore`]
//! - [`lookup_completions()`] -- chain query against a store
//! - [`rank()`] -- merge static, sandbox and keyword candidates
//! - [`ObjectGraph`], [`Reflect`] -- sandbox object graphs
//! - [`EngineConfig`] -- rebuild policy, sources and limits

pub mod candidate;
pub mod config;
pub mod context;
pub mod error;
pub mod infer;
pub mod keywords;
pub mod rank;
pub mod sandbox;
pub mod scope;
pub mod session;
pub mod store;

// ── Convenience re-exports: key types ────────────────────────────────

pub use candidate::{Candidate, CompletionSet};
pub use config::{AnalysisLimits, EngineConfig, RebuildPolicy};
pub use context::{Intent, IntentKind};
pub use error::EngineError;
pub use sandbox::{ObjectGraph, ObjectRef, Reflect, Slot};
pub use session::{PendingParse, Session, SharedSandbox};
pub use store::{AtomicType, CompoundType, TypeStore};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use context::contextualize;
pub use infer::lookup_completions;
pub use rank::rank;
pub use scope::analyze_scope;
