//! gitscope — change-impact selection over static Python import graphs
//!
//! Given a set of candidate files ("targets") and a set of recently
//! changed files, computes which targets are transitively impacted through
//! the static import graph, so unaffected targets can be skipped.
//!
//! Components:
//! - [`ModuleRegistry`]: dotted module name ↔ project-relative path,
//!   seeded from a host snapshot, lazily extended, fully memoized
//! - [`DependencyExtractor`]: memoized one-hop import sets, parsed with
//!   tree-sitter (never executed)
//! - [`ImpactSelector`]: the iterative fixed-point propagation with
//!   explicit cycle/diamond handling and a defensive round cap
//! - [`ShortCircuitPolicy`] / [`SelectionEngine`]: bypass selection
//!   entirely when the graph-based answer cannot be trusted
//!
//! Inputs are in-memory path sets; retrieving the changed-file set from
//! version control and wiring the outcome into a test framework are host
//! concerns.

mod engine;
mod errors;
mod extractor;
mod imports;
mod policy;
mod registry;
mod selector;

pub use engine::{SelectionEngine, SelectionOutcome};
pub use errors::{Result, SelectError};
pub use extractor::DependencyExtractor;
pub use imports::PythonImport;
pub use policy::{ShortCircuitPolicy, ShortCircuitReason, FIXTURE_FILE_NAME, RISK_FILES};
pub use registry::{FsModuleResolver, ModuleRegistry, ModuleResolver};
pub use selector::{ImpactSelector, MAX_ROUNDS};
