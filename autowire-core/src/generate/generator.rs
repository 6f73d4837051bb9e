//! Factory-descriptor generation and the on-disk artifact lifecycle.
//!
//! Artifacts live in hash-named directories under the output dir and are
//! never rewritten: an existing directory with valid metadata is reused
//! verbatim, new hashes get new directories, and old directories are
//! pruned down to a retention count. A bridge copy at the output root
//! re-exports the current artifact under a stable path.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::artifact::{ConfigArtifact, ConfigMeta, DependencySlot, FactoryEntry};
use crate::error::AnalyzerError;
use crate::extract;
use crate::model::{DependencyRecord, Scope};
use crate::options::AnalyzerOptions;
use crate::resolver::InterfaceResolver;
use crate::source::{MethodDecl, SourceFile};

/// Canonical artifact file name, inside hash directories and as the
/// stable bridge copy at the output root.
pub const ARTIFACT_FILE: &str = "di-config.json";
/// Metadata sidecar name.
pub const META_FILE: &str = ".config-meta.json";

const WRITE_ATTEMPTS: u32 = 3;

/// Outcome of persisting an artifact.
#[derive(Debug, Clone)]
pub struct GeneratedConfig {
    pub hash: String,
    pub dir: PathBuf,
    /// An existing directory with valid metadata was reused verbatim.
    pub reused: bool,
}

/// Builds [`ConfigArtifact`]s from resolver tables and manages their
/// on-disk lifecycle.
pub struct ConfigGenerator<'a> {
    resolver: &'a InterfaceResolver,
    options: &'a AnalyzerOptions,
}

impl<'a> ConfigGenerator<'a> {
    pub fn new(resolver: &'a InterfaceResolver, options: &'a AnalyzerOptions) -> Self {
        Self { resolver, options }
    }

    // ── Artifact construction ───────────────────────────────────────────

    /// Convert bindings and dependencies into factory entries. `files`
    /// is consulted for `@Configuration` / `@Bean` provider methods.
    pub fn build_artifact(&self, files: &[SourceFile]) -> ConfigArtifact {
        let mut artifact = ConfigArtifact::default();

        // Plain keys: the resolution winner per key.
        let mut plain_keys: Vec<&str> = self
            .resolver
            .bindings()
            .all()
            .iter()
            .map(|b| b.sanitized_key.as_str())
            .collect();
        plain_keys.sort_unstable();
        plain_keys.dedup();

        for key in plain_keys {
            if let Some(res) = self.resolver.resolve(key) {
                let entry = self.entry_for_class(
                    &res.binding.interface_name,
                    &res.binding.implementation_class,
                    res.binding.scope,
                    res.binding.qualifier.clone(),
                    res.binding.profiles.clone(),
                );
                artifact.entries.insert(key.to_string(), entry);
            }
        }

        // Location-qualified keys: every binding, exact.
        for binding in self.resolver.bindings().all() {
            let entry = self.entry_for_class(
                &binding.interface_name,
                &binding.implementation_class,
                binding.scope,
                binding.qualifier.clone(),
                binding.profiles.clone(),
            );
            artifact.entries.insert(binding.location_key(), entry);
        }

        if self.options.enable_functional_di {
            self.add_bean_entries(files, &mut artifact);
        }

        artifact
    }

    fn entry_for_class(
        &self,
        interface_name: &str,
        class: &str,
        scope: Scope,
        qualifier: Option<String>,
        profiles: Vec<String>,
    ) -> FactoryEntry {
        let record = self.resolver.dependencies().get(class);
        let dependencies = record.map(dependency_slots).unwrap_or_default();

        FactoryEntry {
            factory: class_factory_descriptor(class, &dependencies),
            scope,
            dependencies,
            interface_name: interface_name.to_string(),
            implementation_class: class.to_string(),
            is_auto_resolved: true,
            qualifier,
            is_bean: false,
            bean_method_name: None,
            configuration_class: None,
            profiles,
        }
    }

    /// Walk `@Configuration` classes and emit one entry per `@Bean`
    /// method, keyed by the canonicalized return type (plus a
    /// `key:qualifier` alias when the method carries `@Qualifier`).
    fn add_bean_entries(&self, files: &[SourceFile], artifact: &mut ConfigArtifact) {
        for file in files {
            for class in &file.classes {
                if !extract::is_configuration(class) {
                    continue;
                }
                for method in &class.methods {
                    if !method.has_decorator("Bean") {
                        continue;
                    }
                    let Some(return_type) = &method.return_type else {
                        debug!(
                            class = class.name,
                            method = method.name,
                            "@Bean method without return type skipped"
                        );
                        continue;
                    };

                    let key = return_type.canonical_key();
                    let entry = self.bean_entry(&class.name, method, return_type.raw.as_str());

                    if let Some(qualifier) = &entry.qualifier {
                        artifact
                            .entries
                            .insert(format!("{key}:{qualifier}"), entry.clone());
                    }
                    artifact.entries.entry(key).or_insert(entry);
                }
            }
        }
    }

    fn bean_entry(&self, config_class: &str, method: &MethodDecl, return_raw: &str) -> FactoryEntry {
        let dependencies: Vec<DependencySlot> = method
            .params
            .iter()
            .filter_map(|p| {
                let ty = p.ty.as_ref()?;
                let qualifier = p
                    .decorators
                    .iter()
                    .find(|d| d.name == "Qualifier")
                    .and_then(|d| d.args.first())
                    .cloned();
                Some(DependencySlot {
                    token: ty.canonical_key(),
                    optional: p.optional,
                    qualifier,
                })
            })
            .collect();

        let scope = method
            .decorator("Scope")
            .and_then(|d| d.args.first())
            .and_then(|arg| Scope::parse(arg))
            .unwrap_or_default();
        let qualifier = method
            .decorator("Qualifier")
            .and_then(|d| d.args.first())
            .cloned();
        let profiles: Vec<String> = method
            .decorators
            .iter()
            .filter(|d| d.name == "Profile")
            .flat_map(|d| d.args.iter().cloned())
            .collect();

        FactoryEntry {
            factory: bean_factory_descriptor(config_class, &method.name, &dependencies),
            scope,
            dependencies,
            interface_name: return_raw.to_string(),
            implementation_class: config_class.to_string(),
            is_auto_resolved: false,
            qualifier,
            is_bean: true,
            bean_method_name: Some(method.name.clone()),
            configuration_class: Some(config_class.to_string()),
            profiles,
        }
    }

    // ── Disk lifecycle ──────────────────────────────────────────────────

    /// Persist the artifact under `<output>/<hash>/`, reusing a valid
    /// existing directory, then refresh the bridge copy and prune old
    /// directories.
    pub fn write(
        &self,
        artifact: &ConfigArtifact,
        hash: &str,
    ) -> Result<GeneratedConfig, AnalyzerError> {
        let out_dir = &self.options.output_dir;
        let final_dir = out_dir.join(hash);

        let reused = if self.is_reusable(&final_dir, hash) {
            debug!(hash, "artifact directory reused");
            true
        } else {
            self.write_fresh(artifact, hash, &final_dir)?;
            info!(hash, dir = %final_dir.display(), "artifact written");
            false
        };

        self.write_bridge(artifact, hash)?;
        self.prune(hash);

        Ok(GeneratedConfig {
            hash: hash.to_string(),
            dir: final_dir,
            reused,
        })
    }

    /// An existing directory is reusable when its metadata parses and
    /// records the same hash.
    fn is_reusable(&self, dir: &Path, hash: &str) -> bool {
        if !dir.is_dir() {
            return false;
        }
        let meta_ok = std::fs::read_to_string(dir.join(META_FILE))
            .ok()
            .and_then(|raw| serde_json::from_str::<ConfigMeta>(&raw).ok())
            .is_some_and(|meta| meta.hash == hash);
        if !meta_ok {
            warn!(dir = %dir.display(), "stale artifact directory; rewriting");
            let _ = std::fs::remove_dir_all(dir);
        }
        meta_ok
    }

    /// Write-temp-then-rename, with retries.
    fn write_fresh(
        &self,
        artifact: &ConfigArtifact,
        hash: &str,
        final_dir: &Path,
    ) -> Result<(), AnalyzerError> {
        let out_dir = &self.options.output_dir;
        let meta = ConfigMeta {
            hash: hash.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            enable_functional_di: self.options.enable_functional_di,
            enable_interface_resolution: self.options.enable_interface_resolution,
            package_name: self.options.package_name.clone(),
            environment: self.options.environment.clone(),
        };

        let mut last_error = String::new();
        for attempt in 1..=WRITE_ATTEMPTS {
            match self.try_write_once(artifact, &meta, hash, final_dir) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(attempt, error = %err, "artifact write failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(AnalyzerError::ArtifactWrite {
            path: out_dir.clone(),
            attempts: WRITE_ATTEMPTS,
            message: last_error,
        })
    }

    fn try_write_once(
        &self,
        artifact: &ConfigArtifact,
        meta: &ConfigMeta,
        hash: &str,
        final_dir: &Path,
    ) -> std::io::Result<()> {
        let out_dir = &self.options.output_dir;
        let tmp_dir = out_dir.join(format!(".tmp-{hash}"));

        if tmp_dir.exists() {
            std::fs::remove_dir_all(&tmp_dir)?;
        }
        std::fs::create_dir_all(&tmp_dir)?;
        std::fs::write(tmp_dir.join(ARTIFACT_FILE), artifact.to_json())?;
        std::fs::write(
            tmp_dir.join(META_FILE),
            serde_json::to_string_pretty(meta).expect("meta serialization cannot fail"),
        )?;
        if final_dir.exists() {
            std::fs::remove_dir_all(final_dir)?;
        }
        std::fs::rename(&tmp_dir, final_dir)?;
        Ok(())
    }

    /// Refresh the stable bridge copy at the output root.
    fn write_bridge(&self, artifact: &ConfigArtifact, hash: &str) -> Result<(), AnalyzerError> {
        let out_dir = &self.options.output_dir;
        let write = || -> std::io::Result<()> {
            std::fs::write(out_dir.join(ARTIFACT_FILE), artifact.to_json())?;
            let current = self.options.output_dir.join(hash).join(META_FILE);
            if current.exists() {
                std::fs::copy(current, out_dir.join(META_FILE))?;
            }
            Ok(())
        };
        write().map_err(|err| AnalyzerError::ArtifactWrite {
            path: out_dir.clone(),
            attempts: 1,
            message: err.to_string(),
        })
    }

    /// Remove old hash directories beyond the retention count. Pruning
    /// failures are logged, never fatal.
    fn prune(&self, current_hash: &str) {
        let out_dir = &self.options.output_dir;
        let Ok(read) = std::fs::read_dir(out_dir) else {
            return;
        };

        let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = read
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if !path.is_dir() || name.starts_with('.') || name == current_hash {
                    return None;
                }
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((modified, path))
            })
            .collect();

        // Newest first; keep retention-1 old directories beside the
        // current one.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        let keep = self.options.retention.saturating_sub(1);
        for (_, path) in candidates.into_iter().skip(keep) {
            debug!(dir = %path.display(), "pruning old artifact directory");
            if let Err(err) = std::fs::remove_dir_all(&path) {
                warn!(dir = %path.display(), error = %err, "prune failed");
            }
        }
    }
}

fn dependency_slots(record: &DependencyRecord) -> Vec<DependencySlot> {
    record
        .constructor_params
        .iter()
        .map(|p| DependencySlot {
            token: p.sanitized_key.clone(),
            optional: p.is_optional,
            qualifier: p.qualifier.clone(),
        })
        .collect()
}

fn class_factory_descriptor(class: &str, deps: &[DependencySlot]) -> String {
    format!("new {class}({})", render_args(deps))
}

fn bean_factory_descriptor(config_class: &str, method: &str, deps: &[DependencySlot]) -> String {
    format!("{config_class}.{method}({})", render_args(deps))
}

fn render_args(deps: &[DependencySlot]) -> String {
    deps.iter()
        .map(|slot| {
            let mut arg = slot.token.clone();
            if let Some(q) = &slot.qualifier {
                arg.push(':');
                arg.push_str(q);
            }
            if slot.optional {
                arg.push('?');
            }
            arg
        })
        .collect::<Vec<_>>()
        .join(", ")
}
