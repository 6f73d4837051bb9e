//! Graph validation: the checks that run after both resolver passes.
//!
//! Issues are accumulated into a [`ValidationResult`] and returned —
//! validation never aborts the pipeline.

use serde::Serialize;

use crate::graph::DependencyGraph;
use crate::model::Scope;
use crate::resolver::InterfaceResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Issue taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingService,
    CircularDependency,
    ScopeMismatch,
    OrphanedService,
    InvalidInterface,
    ProfileMismatch,
    ConfigurationError,
    ResolutionError,
}

/// One validation finding, attributed to a file and line when possible.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_tokens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Ordered cycle for circular-dependency issues, e.g. `[A, B, A]`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<String>,
}

impl Issue {
    fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            token: None,
            related_tokens: vec![],
            file_path: None,
            line: None,
            suggestion: None,
            cycle: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub services: usize,
    pub bindings: usize,
    pub dependencies: usize,
    pub edges: usize,
}

/// Accumulated validation outcome.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub info: Vec<Issue>,
    pub stats: ValidationStats,
}

impl ValidationResult {
    fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
            Severity::Info => self.info.push(issue),
        }
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }

    /// All issues in severity order.
    pub fn all_issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.info.iter())
    }
}

/// Run every check over the resolver's tables and the projected graph.
pub fn validate(resolver: &InterfaceResolver, graph: &DependencyGraph) -> ValidationResult {
    let mut result = ValidationResult {
        is_valid: true,
        ..Default::default()
    };

    check_dependencies(resolver, &mut result);
    check_inheritance_cycles(resolver, &mut result);
    check_cycles(graph, &mut result);
    check_scopes(resolver, graph, &mut result);
    check_orphans(resolver, graph, &mut result);
    check_ambiguous_primaries(resolver, &mut result);
    check_profiles(resolver, graph, &mut result);

    result.stats = ValidationStats {
        services: resolver.service_classes().count(),
        bindings: resolver.bindings().len(),
        dependencies: resolver.dependencies().len(),
        edges: graph.edges.len(),
    };
    result.is_valid = result.errors.is_empty();
    result
}

// ── Missing services & resolution quality ───────────────────────────────────

fn check_dependencies(resolver: &InterfaceResolver, result: &mut ValidationResult) {
    for (service, record) in resolver.dependencies() {
        for param in &record.constructor_params {
            match resolver.resolve(&param.declared_type) {
                None if !param.is_optional => {
                    let mut issue = Issue::new(
                        IssueKind::MissingService,
                        Severity::Error,
                        format!(
                            "No implementation registered for '{}' required by {}",
                            param.declared_type, service
                        ),
                    );
                    issue.token = Some(param.declared_type.clone());
                    issue.related_tokens = vec![service.clone()];
                    issue.file_path = Some(record.file_path.clone());
                    issue.suggestion = closest_binding(resolver, &param.declared_type)
                        .map(|name| format!("Did you mean '{name}'?"));
                    result.push(issue);
                }
                Some(res) if res.partial => {
                    let severity = if resolver.options().strict {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    let mut issue = Issue::new(
                        IssueKind::ResolutionError,
                        severity,
                        format!(
                            "'{}' required by {} only resolved by partial key containment (matched {})",
                            param.declared_type, service, res.binding.implementation_class
                        ),
                    );
                    issue.token = Some(param.declared_type.clone());
                    issue.related_tokens = vec![service.clone()];
                    issue.file_path = Some(record.file_path.clone());
                    issue.suggestion =
                        Some("Declare the dependency with its exact registered type".into());
                    result.push(issue);
                }
                _ => {}
            }
        }
    }
}

/// Closest-name heuristic for missing-service suggestions: strip the
/// semantic suffix from the request, then look for a registered name
/// containing it (or contained by it).
fn closest_binding(resolver: &InterfaceResolver, token: &str) -> Option<String> {
    let base = token
        .trim_end_matches("Interface")
        .trim_end_matches("Service")
        .trim_end_matches("Type");
    if base.len() < 3 {
        return None;
    }

    let mut best: Option<&str> = None;
    for binding in resolver.bindings().all() {
        for candidate in [
            binding.implementation_class.as_str(),
            binding.interface_name.as_str(),
        ] {
            if candidate == token {
                continue;
            }
            if candidate.contains(base) || base.contains(candidate) {
                let better = best.is_none_or(|b| candidate.len() < b.len());
                if better {
                    best = Some(candidate);
                }
            }
        }
    }
    best.map(str::to_string)
}

// ── Circular dependencies ───────────────────────────────────────────────────

fn check_inheritance_cycles(resolver: &InterfaceResolver, result: &mut ValidationResult) {
    for (class, chain) in resolver.inheritance_cycles() {
        let mut issue = Issue::new(
            IssueKind::CircularDependency,
            Severity::Error,
            format!(
                "Inheritance cycle detected for {class}: {}",
                chain.join(" extends ")
            ),
        );
        issue.token = Some(class.clone());
        issue.related_tokens = chain.clone();
        issue.suggestion = Some("Remove the looping extends clause".into());
        result.push(issue);
    }
}

fn check_cycles(graph: &DependencyGraph, result: &mut ValidationResult) {
    for component in graph.cycles() {
        let ordered = graph.ordered_cycle(&component);

        let all_required = graph
            .edges
            .iter()
            .filter(|e| component.contains(&e.from) && component.contains(&e.to))
            .all(|e| !e.optional);
        let severity = if all_required {
            Severity::Error
        } else {
            Severity::Warning
        };

        let mut issue = Issue::new(
            IssueKind::CircularDependency,
            severity,
            format!("Circular dependency detected: {}", ordered.join(" -> ")),
        );
        issue.related_tokens = component.clone();
        issue.cycle = ordered;
        issue.suggestion =
            Some("Break the cycle with a lazy lookup or a factory-provided dependency".into());
        result.push(issue);
    }
}

// ── Scope compatibility ─────────────────────────────────────────────────────

fn check_scopes(
    resolver: &InterfaceResolver,
    graph: &DependencyGraph,
    result: &mut ValidationResult,
) {
    for edge in &graph.edges {
        let from_scope = resolver.scope_of_class(&edge.from);
        let to_scope = resolver.scope_of_class(&edge.to);

        match (from_scope, to_scope) {
            (Scope::Singleton, Scope::Transient) => {
                let mut issue = Issue::new(
                    IssueKind::ScopeMismatch,
                    Severity::Warning,
                    format!(
                        "Singleton {} depends on transient {}; the transient instance will be captured once",
                        edge.from, edge.to
                    ),
                );
                issue.token = Some(edge.token.clone());
                issue.related_tokens = vec![edge.from.clone(), edge.to.clone()];
                issue.suggestion = Some(format!(
                    "Make {} singleton or inject a factory instead",
                    edge.to
                ));
                result.push(issue);
            }
            (Scope::Scoped, Scope::Singleton) => {
                let mut issue = Issue::new(
                    IssueKind::ScopeMismatch,
                    Severity::Info,
                    format!(
                        "Scoped {} depends on singleton {}; the singleton outlives every scope",
                        edge.from, edge.to
                    ),
                );
                issue.related_tokens = vec![edge.from.clone(), edge.to.clone()];
                result.push(issue);
            }
            _ => {}
        }
    }
}

// ── Orphans ─────────────────────────────────────────────────────────────────

fn check_orphans(
    resolver: &InterfaceResolver,
    graph: &DependencyGraph,
    result: &mut ValidationResult,
) {
    let dependents = graph.dependents();
    for (service, _) in resolver.dependencies() {
        let has_dependents = dependents
            .get(service.as_str())
            .is_some_and(|d| !d.is_empty());
        if !has_dependents {
            let mut issue = Issue::new(
                IssueKind::OrphanedService,
                Severity::Info,
                format!("{service} consumes dependencies but nothing depends on it"),
            );
            issue.token = Some(service.clone());
            result.push(issue);
        }
    }
}

// ── Ambiguous primaries ─────────────────────────────────────────────────────

fn check_ambiguous_primaries(resolver: &InterfaceResolver, result: &mut ValidationResult) {
    let mut contested: Vec<(&str, Vec<&crate::model::Binding>)> =
        resolver.bindings().contested_keys().collect();
    contested.sort_by_key(|(key, _)| *key);

    for (key, bindings) in contested {
        let primaries: Vec<&str> = bindings
            .iter()
            .filter(|b| b.primary)
            .map(|b| b.implementation_class.as_str())
            .collect();
        let implementations: Vec<String> = bindings
            .iter()
            .map(|b| b.implementation_class.clone())
            .collect();

        match primaries.len() {
            0 => {
                let mut issue = Issue::new(
                    IssueKind::InvalidInterface,
                    Severity::Warning,
                    format!(
                        "'{key}' has {} implementations and no @Primary; resolution falls back to file order",
                        implementations.len()
                    ),
                );
                issue.token = Some(key.to_string());
                issue.related_tokens = implementations;
                issue.suggestion =
                    Some("Mark one implementation @Primary or resolve by location-qualified key".into());
                result.push(issue);
            }
            1 => {}
            _ => {
                let mut issue = Issue::new(
                    IssueKind::InvalidInterface,
                    Severity::Error,
                    format!(
                        "'{key}' has multiple @Primary implementations: {}",
                        primaries.join(", ")
                    ),
                );
                issue.token = Some(key.to_string());
                issue.related_tokens = implementations;
                issue.suggestion = Some("Keep exactly one @Primary per key".into());
                result.push(issue);
            }
        }
    }
}

// ── Profiles ────────────────────────────────────────────────────────────────

fn check_profiles(
    resolver: &InterfaceResolver,
    graph: &DependencyGraph,
    result: &mut ValidationResult,
) {
    let active = &resolver.options().active_profiles;
    let is_active = |class: &str| {
        let profiles = resolver.profiles_of_class(class);
        profiles.is_empty() || profiles.iter().any(|p| active.contains(p))
    };

    for edge in &graph.edges {
        if is_active(&edge.from) && !is_active(&edge.to) {
            let mut issue = Issue::new(
                IssueKind::ProfileMismatch,
                Severity::Error,
                format!(
                    "{} is active but depends on {}, which is disabled under the current profiles",
                    edge.from, edge.to
                ),
            );
            issue.token = Some(edge.token.clone());
            issue.related_tokens = vec![edge.from.clone(), edge.to.clone()];
            issue.suggestion = Some(format!(
                "Activate a profile providing {}, or mark the dependency optional",
                edge.to
            ));
            result.push(issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::source::{parse_source, ClassDecl};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn validate_files(files: &[(&str, &str)], options: AnalyzerOptions) -> ValidationResult {
        let mut resolver = InterfaceResolver::new(options);
        let parsed: Vec<_> = files
            .iter()
            .map(|(rel, src)| parse_source(&PathBuf::from(rel), rel, src).unwrap())
            .collect();
        let classes_by_name: HashMap<String, ClassDecl> = parsed
            .iter()
            .flat_map(|f| f.classes.iter().cloned())
            .map(|c| (c.name.clone(), c))
            .collect();
        for file in &parsed {
            for class in &file.classes {
                resolver.register_class(class, &file.rel_path, &classes_by_name);
            }
        }
        for file in &parsed {
            for class in &file.classes {
                resolver.register_dependencies(class, &file.rel_path);
            }
        }
        let graph = DependencyGraph::project(&resolver);
        validate(&resolver, &graph)
    }

    #[test]
    fn clean_graph_is_valid() {
        let result = validate_files(
            &[
                (
                    "src/api.ts",
                    "@Service()\nclass ApiService { constructor(@Inject() logger: LoggerInterface) {} }",
                ),
                (
                    "src/logger.ts",
                    "@Service()\nclass ConsoleLogger implements LoggerInterface {}",
                ),
            ],
            AnalyzerOptions::default(),
        );
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.services, 2);
        assert_eq!(result.stats.edges, 1);
    }

    #[test]
    fn missing_service_with_suggestion() {
        let result = validate_files(
            &[
                (
                    "src/api.ts",
                    "@Service()\nclass ApiService { constructor(@Inject() logger: LoggerInterface) {} }",
                ),
                (
                    "src/logger.ts",
                    "@Service()\nclass ConsoleLogger implements OutputInterface {}",
                ),
            ],
            AnalyzerOptions::default(),
        );
        assert!(!result.is_valid);
        let issue = &result.errors[0];
        assert_eq!(issue.kind, IssueKind::MissingService);
        assert_eq!(issue.token.as_deref(), Some("LoggerInterface"));
        assert_eq!(issue.related_tokens, vec!["ApiService"]);
        assert!(issue.suggestion.as_deref().unwrap().contains("ConsoleLogger"));
    }

    #[test]
    fn optional_missing_dependency_is_fine() {
        let result = validate_files(
            &[(
                "src/api.ts",
                "@Service()\nclass ApiService { constructor(@Inject() metrics?: MetricsInterface) {} }",
            )],
            AnalyzerOptions::default(),
        );
        assert!(result.is_valid);
        assert!(result
            .all_issues()
            .all(|i| i.kind != IssueKind::MissingService));
    }

    #[test]
    fn circular_dependency_reported_with_ordered_cycle() {
        let result = validate_files(
            &[
                (
                    "src/a.ts",
                    "@Service()\nclass CircularA implements CircularAInterface { constructor(@Inject() b: CircularBInterface) {} }",
                ),
                (
                    "src/b.ts",
                    "@Service()\nclass CircularB implements CircularBInterface { constructor(@Inject() a: CircularAInterface) {} }",
                ),
            ],
            AnalyzerOptions::default(),
        );
        assert!(!result.is_valid);
        let issue = result
            .errors
            .iter()
            .find(|i| i.kind == IssueKind::CircularDependency)
            .unwrap();
        assert_eq!(issue.cycle.len(), 3);
        assert_eq!(issue.cycle.first(), issue.cycle.last());
        assert!(issue.cycle.contains(&"CircularA".to_string()));
        assert!(issue.cycle.contains(&"CircularB".to_string()));
    }

    #[test]
    fn cycle_with_optional_edge_is_a_warning() {
        let result = validate_files(
            &[
                (
                    "src/a.ts",
                    "@Service()\nclass CircularA implements CircularAInterface { constructor(@Inject() b?: CircularBInterface) {} }",
                ),
                (
                    "src/b.ts",
                    "@Service()\nclass CircularB implements CircularBInterface { constructor(@Inject() a: CircularAInterface) {} }",
                ),
            ],
            AnalyzerOptions::default(),
        );
        assert!(result.is_valid);
        assert!(result
            .warnings
            .iter()
            .any(|i| i.kind == IssueKind::CircularDependency));
    }

    #[test]
    fn singleton_on_transient_is_a_warning() {
        let result = validate_files(
            &[
                (
                    "src/user.ts",
                    "@Service()\nclass UserService { constructor(@Inject() form: FormServiceInterface) {} }",
                ),
                (
                    "src/form.ts",
                    "@Service()\n@Scope(\"transient\")\nclass FormService implements FormServiceInterface {}",
                ),
            ],
            AnalyzerOptions::default(),
        );
        assert!(result.is_valid, "scope mismatch is not an error");
        let issue = result
            .warnings
            .iter()
            .find(|i| i.kind == IssueKind::ScopeMismatch)
            .unwrap();
        assert!(issue.message.contains("UserService"));
        assert!(issue.suggestion.as_deref().unwrap().contains("FormService"));
    }

    #[test]
    fn orphan_is_informational() {
        let result = validate_files(
            &[
                (
                    "src/top.ts",
                    "@Service()\nclass TopService { constructor(@Inject() dep: DepInterface) {} }",
                ),
                (
                    "src/dep.ts",
                    "@Service()\nclass DepService implements DepInterface {}",
                ),
            ],
            AnalyzerOptions::default(),
        );
        let orphan = result
            .info
            .iter()
            .find(|i| i.kind == IssueKind::OrphanedService)
            .unwrap();
        assert_eq!(orphan.token.as_deref(), Some("TopService"));
    }

    #[test]
    fn ambiguous_primary_severities() {
        let two_impls = &[
            (
                "src/a.ts",
                "@Service()\nclass FirstLogger implements LoggerInterface {}",
            ),
            (
                "src/b.ts",
                "@Service()\nclass SecondLogger implements LoggerInterface {}",
            ),
        ];
        let result = validate_files(two_impls, AnalyzerOptions::default());
        assert!(result
            .warnings
            .iter()
            .any(|i| i.kind == IssueKind::InvalidInterface));

        let both_primary = &[
            (
                "src/a.ts",
                "@Service()\n@Primary()\nclass FirstLogger implements LoggerInterface {}",
            ),
            (
                "src/b.ts",
                "@Service()\n@Primary()\nclass SecondLogger implements LoggerInterface {}",
            ),
        ];
        let result = validate_files(both_primary, AnalyzerOptions::default());
        assert!(result
            .errors
            .iter()
            .any(|i| i.kind == IssueKind::InvalidInterface));
    }

    #[test]
    fn inheritance_cycle_is_an_error() {
        let result = validate_files(
            &[(
                "src/loop.ts",
                "@Service()\nclass A extends B {}\n@Service()\nclass B extends A {}",
            )],
            AnalyzerOptions::default(),
        );
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|i| i.kind == IssueKind::CircularDependency
                && i.message.contains("Inheritance cycle")));
    }

    #[test]
    fn profile_mismatch_is_an_error() {
        let result = validate_files(
            &[
                (
                    "src/api.ts",
                    "@Service()\nclass ApiService { constructor(@Inject() db: DbInterface) {} }",
                ),
                (
                    "src/db.ts",
                    "@Service()\n@Profile(\"prod\")\nclass ProdDb implements DbInterface {}",
                ),
            ],
            AnalyzerOptions::default().with_profiles(["dev".to_string()]),
        );
        assert!(result
            .errors
            .iter()
            .any(|i| i.kind == IssueKind::ProfileMismatch));
    }

    #[test]
    fn strict_mode_promotes_partial_hits() {
        let files = &[(
            "src/a.ts",
            "@Service()\nclass Consumer { constructor(@Inject() log: AppLogger) {} }\n@Service()\nclass ConsoleLogger implements AppLoggerInterface {}",
        )];
        let relaxed = validate_files(files, AnalyzerOptions::default());
        assert!(relaxed.is_valid);
        assert!(relaxed
            .warnings
            .iter()
            .any(|i| i.kind == IssueKind::ResolutionError));

        let strict = validate_files(files, AnalyzerOptions::default().with_strict(true));
        assert!(!strict.is_valid);
        assert!(strict
            .errors
            .iter()
            .any(|i| i.kind == IssueKind::ResolutionError));
    }
}
