//! The scan driver: file discovery, the two resolver passes, validation,
//! and artifact generation.
//!
//! One `Analyzer` owns the resolver tables between runs. Re-entrant
//! invocations are short-circuited, and an unchanged input set inside
//! the debounce window is answered from the previous run without
//! rework.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::AnalyzerError;
use crate::generate::{content_hash, ConfigGenerator};
use crate::graph::DependencyGraph;
use crate::options::AnalyzerOptions;
use crate::resolver::InterfaceResolver;
use crate::source::{parse_source, ClassDecl, SourceFile};
use crate::validator::{validate, ValidationResult};

/// Everything one run produces. This is also the snapshot shape debug
/// tooling serializes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub validation: ValidationResult,
    pub graph: DependencyGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
    /// The artifact directory was reused from a previous identical run.
    pub reused: bool,
    pub files_scanned: usize,
    pub duration_ms: u64,
}

struct LastRun {
    hash: String,
    at: Instant,
    report: AnalysisReport,
}

/// Drives scans over the configured source roots.
pub struct Analyzer {
    options: AnalyzerOptions,
    resolver: InterfaceResolver,
    files: Vec<SourceFile>,
    transforming: AtomicBool,
    last_run: Option<LastRun>,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            resolver: InterfaceResolver::new(options.clone()),
            options,
            files: Vec::new(),
            transforming: AtomicBool::new(false),
            last_run: None,
        }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// The resolver populated by the most recent run.
    pub fn resolver(&self) -> &InterfaceResolver {
        &self.resolver
    }

    /// Parsed sources from the most recent run.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Full pipeline: scan, resolve, validate, and persist the artifact.
    pub fn analyze(&mut self) -> Result<AnalysisReport, AnalyzerError> {
        self.run(true)
    }

    /// Scan, resolve and validate without touching the output directory.
    pub fn check(&mut self) -> Result<AnalysisReport, AnalyzerError> {
        self.run(false)
    }

    fn run(&mut self, write_artifact: bool) -> Result<AnalysisReport, AnalyzerError> {
        if self.transforming.swap(true, Ordering::SeqCst) {
            // A newer request replaces this one; hand back the previous
            // result when there is one.
            return self
                .last_run
                .as_ref()
                .map(|last| last.report.clone())
                .ok_or(AnalyzerError::RebuildInProgress);
        }
        let result = self.run_inner(write_artifact);
        self.transforming.store(false, Ordering::SeqCst);
        result
    }

    fn run_inner(&mut self, write_artifact: bool) -> Result<AnalysisReport, AnalyzerError> {
        let started = Instant::now();
        let sources = self.collect_sources()?;
        let hash = content_hash(
            &self.options,
            &sources
                .iter()
                .map(|s| (s.rel_path.clone(), s.content.clone()))
                .collect::<Vec<_>>(),
        );

        if let Some(last) = &self.last_run {
            let fresh = last.hash == hash && last.at.elapsed() <= self.options.debounce_window;
            let covers_request = !write_artifact || last.report.artifact_hash.is_some();
            if fresh && covers_request {
                debug!(hash, "input set unchanged inside debounce window; reusing result");
                return Ok(last.report.clone());
            }
        }

        // Parse; a malformed file never aborts the scan.
        self.files = sources
            .iter()
            .filter_map(|s| {
                parse_source(&s.abs_path, &s.rel_path, &s.content)
                    .map_err(|err| {
                        warn!(file = s.rel_path, error = %err, "parse failed; file skipped");
                    })
                    .ok()
            })
            .collect();

        let mut classes_by_name: HashMap<String, ClassDecl> = HashMap::new();
        for file in &self.files {
            for class in &file.classes {
                classes_by_name
                    .entry(class.name.clone())
                    .or_insert_with(|| class.clone());
            }
        }

        // Pass 1: bindings. File order is the lexicographic path order.
        self.resolver.reset();
        for file in &self.files {
            for class in &file.classes {
                self.resolver
                    .register_class(class, &file.rel_path, &classes_by_name);
            }
        }
        // Pass 2: dependencies.
        for file in &self.files {
            for class in &file.classes {
                self.resolver.register_dependencies(class, &file.rel_path);
            }
        }

        let graph = DependencyGraph::project(&self.resolver);
        let validation = validate(&self.resolver, &graph);
        info!(
            services = validation.stats.services,
            bindings = validation.stats.bindings,
            errors = validation.errors.len(),
            warnings = validation.warnings.len(),
            "scan complete"
        );

        let (artifact_hash, artifact_dir, reused) = if write_artifact {
            let generator = ConfigGenerator::new(&self.resolver, &self.options);
            let artifact = generator.build_artifact(&self.files);
            let written = generator.write(&artifact, &hash)?;
            (Some(written.hash), Some(written.dir), written.reused)
        } else {
            (None, None, false)
        };

        let report = AnalysisReport {
            validation,
            graph,
            artifact_hash,
            artifact_dir,
            reused,
            files_scanned: self.files.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        self.last_run = Some(LastRun {
            hash,
            at: Instant::now(),
            report: report.clone(),
        });
        Ok(report)
    }

    /// Walk every scan root, filter by extension and exclusions, read
    /// contents, and sort lexicographically by relative path.
    fn collect_sources(&self) -> Result<Vec<RawSource>, AnalyzerError> {
        let mut sources = Vec::new();

        for root in &self.options.src_dirs {
            if !root.is_dir() {
                return Err(AnalyzerError::ScanRoot {
                    path: root.clone(),
                    message: "not a readable directory".into(),
                });
            }
            let label = crate::options::scan_root_label(root);

            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(error = %err, "walk error; entry skipped");
                        continue;
                    }
                };
                if !entry.file_type().is_file()
                    || !self.options.matches_extension(entry.path())
                {
                    continue;
                }
                if entry.path().starts_with(&self.options.output_dir) {
                    continue;
                }

                let rel_path = match entry.path().strip_prefix(root) {
                    Ok(stripped) => format!(
                        "{label}/{}",
                        stripped.to_string_lossy().replace('\\', "/")
                    ),
                    Err(_) => entry.path().to_string_lossy().replace('\\', "/"),
                };
                if self.options.is_excluded(&rel_path) {
                    continue;
                }

                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => sources.push(RawSource {
                        rel_path,
                        abs_path: entry.path().to_path_buf(),
                        content,
                    }),
                    Err(err) => {
                        warn!(file = %entry.path().display(), error = %err, "unreadable file skipped");
                    }
                }
            }
        }

        sources.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(sources)
    }
}

struct RawSource {
    rel_path: String,
    abs_path: PathBuf,
    content: String,
}
