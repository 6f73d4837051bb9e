//! Serialized configuration artifact types.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Scope;

/// One resolvable dependency of a factory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencySlot {
    /// Sanitized key (or location-qualified key) to resolve.
    pub token: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// One factory descriptor, keyed by sanitized or location-qualified key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactoryEntry {
    /// Human-readable construction expression, e.g.
    /// `new ConsoleLogger(LoggerInterface)` or
    /// `AppConfig.createLogger(ApiInterface:fast)`.
    pub factory: String,
    pub scope: Scope,
    pub dependencies: Vec<DependencySlot>,
    pub interface_name: String,
    pub implementation_class: String,
    pub is_auto_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_bean: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bean_method_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
}

/// The persisted output: an ordered mapping from key to factory entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ConfigArtifact {
    pub entries: BTreeMap<String, FactoryEntry>,
}

impl ConfigArtifact {
    pub fn entry(&self, key: &str) -> Option<&FactoryEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("artifact serialization cannot fail")
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(std::io::Error::other)
    }
}

/// Sidecar metadata identifying an artifact directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMeta {
    pub hash: String,
    pub timestamp: String,
    pub enable_functional_di: bool,
    pub enable_interface_resolution: bool,
    pub package_name: String,
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> FactoryEntry {
        FactoryEntry {
            factory: "new ConsoleLogger(LoggerInterface)".into(),
            scope: Scope::Singleton,
            dependencies: vec![DependencySlot {
                token: "LoggerInterface".into(),
                optional: false,
                qualifier: None,
            }],
            interface_name: "LoggerInterface".into(),
            implementation_class: "ConsoleLogger".into(),
            is_auto_resolved: true,
            qualifier: None,
            is_bean: false,
            bean_method_name: None,
            configuration_class: None,
            profiles: vec![],
        }
    }

    #[test]
    fn serializes_as_a_plain_mapping() {
        let mut artifact = ConfigArtifact::default();
        artifact
            .entries
            .insert("LoggerInterface".into(), sample_entry());
        let json = artifact.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("LoggerInterface").is_some());
        assert_eq!(
            value["LoggerInterface"]["implementationClass"],
            "ConsoleLogger"
        );
        // Absent optionals stay out of the payload.
        assert!(value["LoggerInterface"].get("isBean").is_none());
    }

    #[test]
    fn round_trips() {
        let mut artifact = ConfigArtifact::default();
        artifact
            .entries
            .insert("LoggerInterface".into(), sample_entry());
        let parsed = ConfigArtifact::from_json(&artifact.to_json()).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn entries_are_ordered() {
        let mut artifact = ConfigArtifact::default();
        artifact.entries.insert("Zeta".into(), sample_entry());
        artifact.entries.insert("Alpha".into(), sample_entry());
        let json = artifact.to_json();
        assert!(json.find("Alpha").unwrap() < json.find("Zeta").unwrap());
    }
}
