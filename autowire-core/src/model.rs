//! Core data model: bindings, dependency records, scopes.

use serde::{Deserialize, Serialize};

use crate::keys;

/// The four registration strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Interface,
    Inheritance,
    State,
    Class,
}

impl BindingKind {
    /// Suffix used in composite binding ids.
    pub fn suffix(self) -> &'static str {
        match self {
            BindingKind::Interface => "interface",
            BindingKind::Inheritance => "inheritance",
            BindingKind::State => "state",
            BindingKind::Class => "class",
        }
    }
}

/// Service lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Singleton,
    Transient,
    Scoped,
}

impl Scope {
    pub fn parse(text: &str) -> Option<Scope> {
        match text {
            "singleton" => Some(Scope::Singleton),
            "transient" => Some(Scope::Transient),
            "scoped" => Some(Scope::Scoped),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Transient => "transient",
            Scope::Scoped => "scoped",
        }
    }
}

/// One registered implementation.
///
/// Created by the resolver during Pass 1, never mutated afterwards, and
/// dropped wholesale when the resolver is reset for a full rescan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// The user-written symbol this binding answers to (interface name,
    /// base-class spelling, state shape, or the class's own name).
    pub interface_name: String,
    pub implementation_class: String,
    pub file_path: String,
    pub line_number: usize,
    pub is_generic: bool,
    pub type_parameters: Vec<String>,
    pub sanitized_key: String,
    pub kind: BindingKind,
    /// Class-kind secondary registration permitting direct-by-class
    /// lookup; always loses to a primary binding with the same key.
    pub direct: bool,
    /// Set by the `@Primary` decorator.
    pub primary: bool,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    // Inheritance-kind extras.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_class_generic: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inheritance_chain: Vec<String>,

    // State-kind extras.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_interface: Option<String>,
}

impl Binding {
    /// Composite id: unique per `(sanitizedKey, implementationClass,
    /// kind-suffix)` triple.
    pub fn composite_id(&self) -> String {
        let suffix = if self.direct {
            "class_direct"
        } else {
            self.kind.suffix()
        };
        format!(
            "{}::{}::{}",
            self.sanitized_key, self.implementation_class, suffix
        )
    }

    /// Location-qualified key for this binding's source location.
    pub fn location_key(&self) -> String {
        keys::location_key(&self.sanitized_key, &self.file_path, self.line_number)
    }

    /// Whether this binding is active under the given profile set.
    ///
    /// A binding with no `@Profile` decorator is active everywhere; an
    /// empty active set enables only profile-less bindings.
    pub fn active_under(&self, active_profiles: &[String]) -> bool {
        self.profiles.is_empty() || self.profiles.iter().any(|p| active_profiles.contains(p))
    }
}

/// One injection site: a service class and its marked constructor params.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub service_class: String,
    pub file_path: String,
    pub constructor_params: Vec<ConstructorParam>,
}

/// One marked constructor parameter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorParam {
    pub param_name: String,
    /// The literal user-written type text.
    pub declared_type: String,
    pub sanitized_key: String,
    pub is_optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}
