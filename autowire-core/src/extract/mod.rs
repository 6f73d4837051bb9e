//! Per-class extraction: the five classification steps that feed the
//! resolver's registration passes.

pub mod dependencies;
pub mod inheritance;
pub mod interfaces;
pub mod markers;
pub mod state;

pub use dependencies::extract_dependencies;
pub use inheritance::{analyze_inheritance, InheritanceInfo, InheritanceMapping};
pub use interfaces::{implemented_interfaces, ImplementedInterface};
pub use markers::{
    is_configuration, is_primary, is_service, profiles_of, qualifier_of, scope_of, SERVICE_MARKERS,
};
pub use state::{extract_state, StateRegistration};
