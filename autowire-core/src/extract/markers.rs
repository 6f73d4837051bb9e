//! Service-marker recognition and decorator metadata.
//!
//! Only classes carrying one of the service-marker decorators take part
//! in registration; everything else is invisible to the analyzer, even
//! when it implements interfaces.

use crate::model::Scope;
use crate::source::ClassDecl;

/// The recognized service-marker decorator family (case-sensitive).
pub const SERVICE_MARKERS: [&str; 6] = [
    "Service",
    "Component",
    "Injectable",
    "Repository",
    "Controller",
    "Provider",
];

/// Gating predicate for every extraction step.
pub fn is_service(class: &ClassDecl) -> bool {
    SERVICE_MARKERS.iter().any(|m| class.has_decorator(m))
}

/// Provider-method container marker.
pub fn is_configuration(class: &ClassDecl) -> bool {
    class.has_decorator("Configuration")
}

/// Declared scope, defaulting to singleton.
pub fn scope_of(class: &ClassDecl) -> Scope {
    class
        .decorator("Scope")
        .and_then(|d| d.args.first())
        .and_then(|arg| Scope::parse(arg))
        .unwrap_or_default()
}

pub fn is_primary(class: &ClassDecl) -> bool {
    class.has_decorator("Primary")
}

pub fn qualifier_of(class: &ClassDecl) -> Option<String> {
    class
        .decorator("Qualifier")
        .and_then(|d| d.args.first())
        .cloned()
}

/// All `@Profile` arguments, in declaration order.
pub fn profiles_of(class: &ClassDecl) -> Vec<String> {
    class
        .decorators
        .iter()
        .filter(|d| d.name == "Profile")
        .flat_map(|d| d.args.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_source;
    use std::path::PathBuf;

    fn first_class(src: &str) -> ClassDecl {
        parse_source(&PathBuf::from("t.ts"), "t.ts", src)
            .unwrap()
            .classes
            .remove(0)
    }

    #[test]
    fn marker_family_is_recognized() {
        for marker in SERVICE_MARKERS {
            let class = first_class(&format!("@{marker}()\nclass X {{}}"));
            assert!(is_service(&class), "@{marker} should mark a service");
        }
    }

    #[test]
    fn unmarked_class_is_not_a_service() {
        let class = first_class("class X implements LoggerInterface {}");
        assert!(!is_service(&class));
    }

    #[test]
    fn markers_are_case_sensitive() {
        let class = first_class("@service()\nclass X {}");
        assert!(!is_service(&class));
    }

    #[test]
    fn metadata_decorators() {
        let class = first_class(
            "@Service()\n@Scope(\"transient\")\n@Primary()\n@Qualifier(\"fast\")\n@Profile(\"dev\", \"test\")\nclass X {}",
        );
        assert_eq!(scope_of(&class), Scope::Transient);
        assert!(is_primary(&class));
        assert_eq!(qualifier_of(&class).as_deref(), Some("fast"));
        assert_eq!(profiles_of(&class), vec!["dev", "test"]);
    }

    #[test]
    fn unknown_scope_falls_back_to_singleton() {
        let class = first_class("@Service()\n@Scope(\"request\")\nclass X {}");
        assert_eq!(scope_of(&class), Scope::Singleton);
    }
}
