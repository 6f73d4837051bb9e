//! Implemented-interface extraction.

use crate::source::ClassDecl;

/// One interface a class claims to implement. Existence of the interface
/// is not checked here; dangling claims surface during resolution.
#[derive(Debug, Clone)]
pub struct ImplementedInterface {
    pub name: String,
    /// The full written type, generic arguments included.
    pub full_type: String,
    pub is_generic: bool,
    pub type_parameters: Vec<String>,
}

/// Ordered list of interfaces the class implements.
pub fn implemented_interfaces(class: &ClassDecl) -> Vec<ImplementedInterface> {
    class
        .implements
        .iter()
        .filter_map(|ty| {
            let name = ty.head_name()?.to_string();
            Some(ImplementedInterface {
                name,
                full_type: ty.raw.clone(),
                is_generic: ty.is_generic(),
                type_parameters: ty.args().iter().map(|a| a.raw.clone()).collect(),
            })
        })
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
    fn ordered_interfaces_with_generics() {
        let class = first_class(
            "@Service()\nclass C implements Plain, CacheInterface<string>, Pair<A, B> {}",
        );
        let ifaces = implemented_interfaces(&class);
        assert_eq!(ifaces.len(), 3);
        assert_eq!(ifaces[0].name, "Plain");
        assert!(!ifaces[0].is_generic);
        assert_eq!(ifaces[1].full_type, "CacheInterface<string>");
        assert!(ifaces[1].is_generic);
        assert_eq!(ifaces[2].type_parameters, vec!["A", "B"]);
    }

    #[test]
    fn no_implements_clause() {
        let class = first_class("@Service()\nclass C {}");
        assert!(implemented_interfaces(&class).is_empty());
    }
}
