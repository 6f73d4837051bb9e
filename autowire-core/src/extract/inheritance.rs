//! Base-class chain analysis.
//!
//! Walks `extends` clauses upward through every class visible in the
//! scan, recording each base with its instantiated generic arguments.
//! The walk terminates on a base that is not defined in the scanned tree
//! (still recorded — it is a legitimate registration target) and is
//! bounded by a configurable depth.

use std::collections::HashMap;

use crate::keys;
use crate::source::ClassDecl;

/// One link of the base-class chain.
#[derive(Debug, Clone)]
pub struct InheritanceMapping {
    /// Simple name of the base class.
    pub base_class: String,
    /// The full written base type, e.g. `StatefulService<TodoState>`.
    pub base_class_generic: String,
    pub base_type_name: String,
    pub is_generic: bool,
    pub type_parameters: Vec<String>,
    /// Inheritance-flavored canonical key for the written base type.
    pub inheritance_key: String,
}

/// Result of walking one class's chain.
#[derive(Debug, Clone, Default)]
pub struct InheritanceInfo {
    pub mappings: Vec<InheritanceMapping>,
    /// Subclass-to-root chain, starting with the class itself.
    pub chain: Vec<String>,
    /// A base was reached twice; the chain is cyclic.
    pub cycle: bool,
}

/// Walk the base-class chain of `class` across the whole parsed tree.
pub fn analyze_inheritance(
    class: &ClassDecl,
    classes_by_name: &HashMap<String, ClassDecl>,
    max_depth: usize,
) -> InheritanceInfo {
    let mut info = InheritanceInfo {
        chain: vec![class.name.clone()],
        ..Default::default()
    };

    let mut current = class;
    for _ in 0..max_depth {
        let Some(base_ty) = current.extends.as_ref() else {
            break;
        };
        let Some(base_name) = base_ty.head_name() else {
            break;
        };

        if info.chain.iter().any(|seen| seen == base_name) {
            info.cycle = true;
            break;
        }

        info.mappings.push(InheritanceMapping {
            base_class: base_name.to_string(),
            base_class_generic: base_ty.raw.clone(),
            base_type_name: base_name.to_string(),
            is_generic: base_ty.is_generic(),
            type_parameters: base_ty.args().iter().map(|a| a.raw.clone()).collect(),
            inheritance_key: keys::sanitize_inheritance(&base_ty.raw),
        });
        info.chain.push(base_name.to_string());

        match classes_by_name.get(base_name) {
            Some(base_decl) => current = base_decl,
            // Base outside the scanned tree: chain ends here.
            None => break,
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_source;
    use std::path::PathBuf;

    fn class_map(src: &str) -> HashMap<String, ClassDecl> {
        parse_source(&PathBuf::from("t.ts"), "t.ts", src)
            .unwrap()
            .classes
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect()
    }

    #[test]
    fn walks_the_full_chain() {
        let classes = class_map(
            "class Root {}\nclass Mid extends Root {}\n@Service()\nclass Leaf extends Mid {}",
        );
        let info = analyze_inheritance(&classes["Leaf"], &classes, 10);
        assert_eq!(info.chain, vec!["Leaf", "Mid", "Root"]);
        assert_eq!(info.mappings.len(), 2);
        assert_eq!(info.mappings[0].base_class, "Mid");
        assert_eq!(info.mappings[1].base_class, "Root");
        assert!(!info.cycle);
    }

    #[test]
    fn records_instantiated_generics() {
        let classes = class_map(
            "@Service()\nclass TodoService extends StatefulService<TodoState> {}",
        );
        let info = analyze_inheritance(&classes["TodoService"], &classes, 10);
        let mapping = &info.mappings[0];
        assert_eq!(mapping.base_class_generic, "StatefulService<TodoState>");
        assert!(mapping.is_generic);
        assert_eq!(mapping.type_parameters, vec!["TodoState"]);
        assert_eq!(mapping.inheritance_key, "StatefulService_TodoState");
    }

    #[test]
    fn out_of_tree_base_still_registers() {
        let classes = class_map("@Service()\nclass C extends LibraryBase<string> {}");
        let info = analyze_inheritance(&classes["C"], &classes, 10);
        assert_eq!(info.mappings.len(), 1);
        assert_eq!(info.mappings[0].inheritance_key, "LibraryBase_str");
        assert_eq!(info.chain, vec!["C", "LibraryBase"]);
    }

    #[test]
    fn inheritance_cycle_is_flagged() {
        let classes = class_map("class A extends B {}\nclass B extends A {}");
        let info = analyze_inheritance(&classes["A"], &classes, 10);
        assert!(info.cycle);
        // The revisited base is not pushed twice.
        assert_eq!(info.chain, vec!["A", "B"]);
    }

    #[test]
    fn depth_is_bounded() {
        let src: String = (0..30)
            .map(|i| format!("class C{} extends C{} {{}}\n", i, i + 1))
            .collect();
        let classes = class_map(&src);
        let info = analyze_inheritance(&classes["C0"], &classes, 5);
        assert_eq!(info.mappings.len(), 5);
    }
}
