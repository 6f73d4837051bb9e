//! Constructor dependency extraction.
//!
//! A parameter takes part in injection when it carries the `@Inject` /
//! `@InjectOptional` decorator or is typed with the `Inject<T>` /
//! `InjectOptional<T>` wrapper. Anything else is the class's own
//! business; non-constructor injection does not exist.

use crate::model::{ConstructorParam, DependencyRecord};
use crate::source::{ClassDecl, ParamDecl, TypeExpr};

const INJECT_WRAPPERS: [&str; 2] = ["Inject", "InjectOptional"];

/// Build the dependency record for a service class, or `None` when no
/// constructor parameter is marked.
pub fn extract_dependencies(class: &ClassDecl, rel_path: &str) -> Option<DependencyRecord> {
    let params: Vec<ConstructorParam> = class
        .ctor_params
        .iter()
        .filter_map(extract_param)
        .collect();

    if params.is_empty() {
        return None;
    }

    Some(DependencyRecord {
        service_class: class.name.clone(),
        file_path: rel_path.to_string(),
        constructor_params: params,
    })
}

fn extract_param(param: &ParamDecl) -> Option<ConstructorParam> {
    let has_marker_decorator = param
        .decorators
        .iter()
        .any(|d| INJECT_WRAPPERS.contains(&d.name.as_str()));

    let (declared, wrapper_optional) = match unwrap_inject(param.ty.as_ref()) {
        Some((inner, optional)) => (Some(inner), optional),
        None if has_marker_decorator => (param.ty.as_ref(), false),
        None => return None,
    };

    let declared = declared?;
    let optional_decorator = param.decorators.iter().any(|d| d.name == "InjectOptional");
    let qualifier = param
        .decorators
        .iter()
        .find(|d| d.name == "Qualifier")
        .and_then(|d| d.args.first())
        .cloned();

    Some(ConstructorParam {
        param_name: param.name.clone(),
        declared_type: declared.raw.clone(),
        sanitized_key: declared.canonical_key(),
        is_optional: param.optional || wrapper_optional || optional_decorator,
        qualifier,
    })
}

/// Peel the `Inject<T>` / `InjectOptional<T>` wrapper, returning the
/// inner type and whether the wrapper communicates optionality.
fn unwrap_inject(ty: Option<&TypeExpr>) -> Option<(&TypeExpr, bool)> {
    let ty = ty?;
    let head = ty.head_name()?;
    if !INJECT_WRAPPERS.contains(&head) {
        return None;
    }
    let inner = ty.args().first()?;
    Some((inner, head == "InjectOptional"))
}
