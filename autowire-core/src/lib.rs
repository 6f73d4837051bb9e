//! Autowire core — compile-time dependency-injection analysis.
//!
//! Scans a tree of decorator-annotated source files, reconstructs the
//! interface → implementation → dependency graph, validates it, and
//! emits a content-hash-keyed configuration artifact that the runtime
//! container loads.
//!
//! The pipeline, in order:
//!
//! 1. [`scanner::Analyzer`] walks the scan roots and parses every
//!    implementation file ([`source`]).
//! 2. [`resolver::InterfaceResolver`] classifies each service-marked
//!    class under four registration strategies ([`extract`], [`keys`])
//!    and records constructor dependencies.
//! 3. [`validator::validate`] checks the projected class graph
//!    ([`graph`]) for missing edges, cycles, scope and profile
//!    mismatches.
//! 4. [`generate::ConfigGenerator`] persists factory descriptors under
//!    a stable content hash.

pub mod error;
pub mod extract;
pub mod generate;
pub mod graph;
pub mod keys;
pub mod model;
pub mod options;
pub mod resolver;
pub mod scanner;
pub mod source;
pub mod validator;

pub use error::AnalyzerError;
pub use generate::{ConfigArtifact, ConfigMeta, DependencySlot, FactoryEntry};
pub use graph::DependencyGraph;
pub use model::{Binding, BindingKind, ConstructorParam, DependencyRecord, Scope};
pub use options::AnalyzerOptions;
pub use resolver::{BindingsTable, InterfaceResolver, Resolution};
pub use scanner::{AnalysisReport, Analyzer};
pub use validator::{Issue, IssueKind, Severity, ValidationResult};
