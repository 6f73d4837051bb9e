//! Autowire — compile-time dependency injection for decorator-annotated
//! sources.
//!
//! This facade crate re-exports the Autowire sub-crates through a single
//! dependency:
//!
//! | Feature     | Default | Crate                 |
//! |-------------|---------|-----------------------|
//! | `container` | **yes** | `autowire-container`  |
//!
//! The analyzer half is always available:
//!
//! ```ignore
//! use autowire::{Analyzer, AnalyzerOptions};
//!
//! let mut analyzer = Analyzer::new(AnalyzerOptions::new("src"));
//! let report = analyzer.analyze()?;
//! ```

pub extern crate autowire_core;

// Re-export everything from the core at the top level for convenience.
pub use autowire_core::*;

#[cfg(feature = "container")]
pub use autowire_container;

#[cfg(feature = "container")]
pub use autowire_container::{Container, ConstructorRegistry, ContainerError};
