//! Analyzer configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AnalyzerError;

/// Options driving a scan. Construct with [`AnalyzerOptions::new`] and
/// the `with_*` builder methods, or deserialize from an `autowire.yaml`
/// project file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnalyzerOptions {
    /// Root directories to scan.
    pub src_dirs: Vec<PathBuf>,
    /// Substring exclusion patterns applied to relative paths.
    pub exclude: Vec<String>,
    /// Where artifact directories are written.
    pub output_dir: PathBuf,
    /// Implementation extensions, without the leading dot.
    pub extensions: Vec<String>,
    pub enable_inheritance_di: bool,
    pub enable_state_di: bool,
    pub enable_interface_resolution: bool,
    pub enable_functional_di: bool,
    /// Promote partial-key resolution hits to errors.
    pub strict: bool,
    /// Base-class names recognized as state containers.
    pub state_base_names: Vec<String>,
    pub max_inheritance_depth: usize,
    /// How many old artifact directories to keep.
    pub retention: usize,
    pub package_name: String,
    pub environment: String,
    pub active_profiles: Vec<String>,
    /// Window during which an unchanged input set is a cache hit.
    #[serde(with = "duration_secs")]
    pub debounce_window: Duration,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            src_dirs: vec![PathBuf::from("src")],
            exclude: vec!["node_modules".into(), ".generated".into()],
            output_dir: PathBuf::from("src/.generated"),
            extensions: vec!["ts".into(), "tsx".into(), "mts".into()],
            enable_inheritance_di: true,
            enable_state_di: true,
            enable_interface_resolution: true,
            enable_functional_di: true,
            strict: false,
            state_base_names: vec!["StatefulService".into(), "StateContainer".into()],
            max_inheritance_depth: 10,
            retention: 5,
            package_name: "app".into(),
            environment: "development".into(),
            active_profiles: Vec::new(),
            debounce_window: Duration::from_secs(5),
        }
    }
}

impl AnalyzerOptions {
    pub fn new(src_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dirs: vec![src_dir.into()],
            ..Self::default()
        }
    }

    /// Load options from an `autowire.yaml` file.
    pub fn from_yaml_file(path: &std::path::Path) -> Result<Self, AnalyzerError> {
        let content = std::fs::read_to_string(path).map_err(|e| AnalyzerError::Options {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| AnalyzerError::Options {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn with_src(mut self, dir: impl Into<PathBuf>) -> Self {
        self.src_dirs.push(dir.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = String>) -> Self {
        self.active_profiles.extend(profiles);
        self
    }

    pub fn with_state_base(mut self, name: impl Into<String>) -> Self {
        self.state_base_names.push(name.into());
        self
    }

    /// Whether a relative path is excluded from the scan.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude.iter().any(|pat| rel_path.contains(pat.as_str()))
    }

    /// Whether a file name carries one of the implementation extensions.
    pub fn matches_extension(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

/// Stable label for a scan root: relative roots keep their written
/// spelling, absolute roots reduce to their final segment. Keeps
/// location keys and content hashes relocatable across checkouts.
pub(crate) fn scan_root_label(root: &std::path::Path) -> String {
    if root.is_absolute() {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned())
    } else {
        root.to_string_lossy()
            .replace('\\', "/")
            .trim_end_matches('/')
            .to_string()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(de)?;
        Ok(Duration::from_secs(secs))
    }
}
