//! State-container pattern detection.
//!
//! Recognizes `class C extends Base<S>` where `Base` is one of the
//! configured state-container bases, yielding a second registration for
//! the same implementation keyed on the state shape `S`.

use crate::keys;
use crate::source::{ClassDecl, TypeShape};

/// A state-based registration emitted alongside the inheritance mapping.
#[derive(Debug, Clone)]
pub struct StateRegistration {
    /// The full service interface, e.g. `StatefulService<TodoState>`.
    pub service_interface: String,
    /// The state shape as written, e.g. `TodoState` or an object literal.
    pub state_type: String,
    /// State-flavored canonical key for the shape.
    pub state_key: String,
}

/// Detect the state-container pattern on a class, if configured bases
/// match and the base carries a distinct state argument.
pub fn extract_state(class: &ClassDecl, state_base_names: &[String]) -> Option<StateRegistration> {
    let base = class.extends.as_ref()?;
    let base_name = base.head_name()?;
    if !state_base_names.iter().any(|n| n == base_name) {
        return None;
    }

    let state_arg = base.args().first()?;
    // A bare type parameter of the class itself is not a concrete state
    // shape; `class Generic<S> extends StatefulService<S>` registers
    // nothing state-wise.
    if class
        .type_params
        .iter()
        .any(|p| state_arg.head_name() == Some(p.as_str()))
    {
        return None;
    }

    let state_key = match &state_arg.shape {
        TypeShape::Object => keys::sanitize_object(&state_arg.raw),
        _ => keys::sanitize_state(&state_arg.raw),
    };

    Some(StateRegistration {
        service_interface: base.raw.clone(),
        state_type: state_arg.raw.clone(),
        state_key,
    })
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

    fn bases() -> Vec<String> {
        vec!["StatefulService".into(), "StateContainer".into()]
    }

    #[test]
    fn detects_the_pattern() {
        let class =
            first_class("@Service()\nclass TodoService extends StatefulService<TodoState> {}");
        let reg = extract_state(&class, &bases()).unwrap();
        assert_eq!(reg.service_interface, "StatefulService<TodoState>");
        assert_eq!(reg.state_type, "TodoState");
        assert_eq!(reg.state_key, "TodoState");
    }

    #[test]
    fn non_state_base_is_ignored() {
        let class = first_class("@Service()\nclass C extends OtherBase<TodoState> {}");
        assert!(extract_state(&class, &bases()).is_none());
    }

    #[test]
    fn unparameterized_base_is_ignored() {
        let class = first_class("@Service()\nclass C extends StatefulService {}");
        assert!(extract_state(&class, &bases()).is_none());
    }

    #[test]
    fn passthrough_type_param_is_ignored() {
        let class =
            first_class("@Service()\nclass Generic<S> extends StatefulService<S> {}");
        assert!(extract_state(&class, &bases()).is_none());
    }

    #[test]
    fn object_literal_state_hashes() {
        let class = first_class(
            "@Service()\nclass C extends StateContainer<{ todos: string[] }> {}",
        );
        let reg = extract_state(&class, &bases()).unwrap();
        assert!(reg.state_key.starts_with("ObjectType_"));
    }
}
