//! End-to-end scenarios driven through the full analyzer pipeline.

use std::fs;
use std::time::Duration;

use autowire_core::validator::IssueKind;
use autowire_core::{keys, Analyzer, AnalyzerOptions, ConfigArtifact};

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    tmp
}

fn analyzer_for(tmp: &tempfile::TempDir) -> Analyzer {
    let mut options = AnalyzerOptions::new(tmp.path().join("src"));
    options.output_dir = tmp.path().join("out");
    options.debounce_window = Duration::ZERO;
    Analyzer::new(options)
}

// ── Scenario: single service, single interface ──────────────────────────

#[test]
fn single_service_single_interface() {
    let tmp = project(&[(
        "src/logger.ts",
        "@Service()\nexport class ConsoleLogger implements LoggerInterface {\n  log(msg: string): void {}\n}\n",
    )]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();
    assert!(report.validation.is_valid);
    assert_eq!(report.validation.stats.bindings, 2);

    let resolver = analyzer.resolver();
    let by_iface = resolver.resolve("LoggerInterface").unwrap();
    assert_eq!(by_iface.binding.implementation_class, "ConsoleLogger");
    let by_class = resolver.resolve("ConsoleLogger").unwrap();
    assert_eq!(by_class.binding.implementation_class, "ConsoleLogger");
}

// ── Scenario: collision by simple name ──────────────────────────────────

#[test]
fn simple_name_collision() {
    let tmp = project(&[
        (
            "src/legacy/todo.ts",
            "interface TodoServiceInterface { loadTodos(): void; }\n@Service()\nclass LegacyTodoService implements TodoServiceInterface {}\n",
        ),
        (
            "src/modern/todo.ts",
            "interface TodoServiceInterface { state: { todos: string[] }; }\n@Service()\nclass ModernTodoService implements TodoServiceInterface {}\n",
        ),
    ]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();
    assert_eq!(report.validation.stats.bindings, 4);

    let resolver = analyzer.resolver();
    let plain = resolver.resolve("TodoServiceInterface").unwrap();
    assert!(plain.is_ambiguous());
    assert_eq!(plain.binding.implementation_class, "LegacyTodoService");

    // Location-qualified keys resolve each implementation exactly.
    for binding in resolver.bindings().all() {
        if binding.kind == autowire_core::BindingKind::Interface {
            let exact = resolver.resolve(&binding.location_key()).unwrap();
            assert_eq!(
                exact.binding.implementation_class,
                binding.implementation_class
            );
            assert!(!exact.is_ambiguous());
        }
    }

    // The ambiguity is also a validation warning.
    assert!(report
        .validation
        .warnings
        .iter()
        .any(|i| i.kind == IssueKind::InvalidInterface));
}

// ── Scenario: generic cache ─────────────────────────────────────────────

#[test]
fn generic_cache_erasure() {
    let tmp = project(&[(
        "src/cache.ts",
        "@Service()\nclass MemoryCache<T> implements CacheInterface<T> {}\n",
    )]);
    let mut analyzer = analyzer_for(&tmp);
    analyzer.analyze().unwrap();
    let resolver = analyzer.resolver();

    for spelling in [
        "CacheInterface<string>",
        "CacheInterface<User>",
        "CacheInterface<any>",
    ] {
        let res = resolver.resolve(spelling).unwrap();
        assert_eq!(res.binding.implementation_class, "MemoryCache");
        assert_eq!(res.binding.sanitized_key, "CacheInterface_any");
    }
}

// ── Scenario: circular dependency ───────────────────────────────────────

#[test]
fn circular_dependency() {
    let tmp = project(&[
        (
            "src/a.ts",
            "@Service()\nclass CircularA implements CircularAInterface {\n  constructor(@Inject() b: CircularBInterface) {}\n}\n",
        ),
        (
            "src/b.ts",
            "@Service()\nclass CircularB implements CircularBInterface {\n  constructor(@Inject() a: CircularAInterface) {}\n}\n",
        ),
    ]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();

    assert!(!report.validation.is_valid);
    let issue = report
        .validation
        .errors
        .iter()
        .find(|i| i.kind == IssueKind::CircularDependency)
        .unwrap();
    assert_eq!(issue.cycle.len(), 3);
    assert_eq!(issue.cycle.first(), issue.cycle.last());
}

// ── Scenario: missing service ───────────────────────────────────────────

#[test]
fn missing_service_with_suggestion() {
    let tmp = project(&[
        (
            "src/api.ts",
            "@Service()\nclass ApiService {\n  constructor(@Inject() logger: LoggerInterface) {}\n}\n",
        ),
        (
            "src/logger.ts",
            "@Service()\nclass ConsoleLogger implements PrinterInterface {}\n",
        ),
    ]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();

    assert!(!report.validation.is_valid);
    let issue = report
        .validation
        .errors
        .iter()
        .find(|i| i.kind == IssueKind::MissingService)
        .unwrap();
    assert_eq!(issue.token.as_deref(), Some("LoggerInterface"));
    assert_eq!(issue.related_tokens, vec!["ApiService"]);
    assert!(issue
        .suggestion
        .as_deref()
        .unwrap()
        .contains("ConsoleLogger"));
}

// ── Scenario: scope mismatch ────────────────────────────────────────────

#[test]
fn scope_mismatch_warns_but_stays_valid() {
    let tmp = project(&[
        (
            "src/user.ts",
            "@Service()\nclass UserService {\n  constructor(@Inject() form: FormInterface) {}\n}\n",
        ),
        (
            "src/form.ts",
            "@Service()\n@Scope(\"transient\")\nclass FormService implements FormInterface {}\n",
        ),
    ]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();

    assert!(report.validation.is_valid);
    let issue = report
        .validation
        .warnings
        .iter()
        .find(|i| i.kind == IssueKind::ScopeMismatch)
        .unwrap();
    assert!(issue.suggestion.is_some());
}

// ── Round-trip and determinism properties ───────────────────────────────

#[test]
fn idempotent_rebuilds_share_hash_and_bytes() {
    let files: &[(&str, &str)] = &[
        (
            "src/api.ts",
            "@Service()\nclass ApiService implements ApiInterface {\n  constructor(@Inject() logger: LoggerInterface) {}\n}\n",
        ),
        (
            "src/logger.ts",
            "@Service()\nclass ConsoleLogger implements LoggerInterface {}\n",
        ),
    ];
    let tmp = project(files);
    let mut analyzer = analyzer_for(&tmp);

    let first = analyzer.analyze().unwrap();
    let artifact_path = first
        .artifact_dir
        .clone()
        .unwrap()
        .join("di-config.json");
    let bytes = fs::read(&artifact_path).unwrap();

    let second = analyzer.analyze().unwrap();
    assert_eq!(first.artifact_hash, second.artifact_hash);
    assert!(second.reused);
    assert_eq!(bytes, fs::read(&artifact_path).unwrap());
}

#[test]
fn file_discovery_order_is_irrelevant() {
    // Same source set written in opposite order; discovery sorts paths,
    // so resolution decisions and the artifact must not change.
    let files: &[(&str, &str)] = &[
        (
            "src/zz.ts",
            "@Service()\nclass Zed implements ZedInterface {}\n",
        ),
        (
            "src/aa.ts",
            "@Service()\nclass Ace implements AceInterface {\n  constructor(@Inject() z: ZedInterface) {}\n}\n",
        ),
    ];
    let tmp_a = project(files);
    let mut reversed: Vec<(&str, &str)> = files.to_vec();
    reversed.reverse();
    let tmp_b = project(&reversed);

    let report_a = analyzer_for(&tmp_a).analyze().unwrap();
    let report_b = analyzer_for(&tmp_b).analyze().unwrap();

    let load = |report: &autowire_core::AnalysisReport| {
        ConfigArtifact::load(&report.artifact_dir.clone().unwrap().join("di-config.json")).unwrap()
    };
    assert_eq!(load(&report_a), load(&report_b));
}

// ── Artifact shape ──────────────────────────────────────────────────────

#[test]
fn artifact_entries_carry_factory_metadata() {
    let tmp = project(&[
        (
            "src/api.ts",
            "@Service()\nclass ApiService implements ApiInterface {\n  constructor(@Inject() logger: LoggerInterface) {}\n}\n",
        ),
        (
            "src/logger.ts",
            "@Service()\nclass ConsoleLogger implements LoggerInterface {}\n",
        ),
        (
            "src/config.ts",
            "@Configuration()\nclass AppConfig {\n  @Bean()\n  createMetrics(logger: LoggerInterface): MetricsInterface {\n    return new Metrics(logger);\n  }\n}\n",
        ),
    ]);
    let mut analyzer = analyzer_for(&tmp);
    let report = analyzer.analyze().unwrap();
    let artifact =
        ConfigArtifact::load(&report.artifact_dir.unwrap().join("di-config.json")).unwrap();

    let api = artifact.entry("ApiInterface").unwrap();
    assert_eq!(api.factory, "new ApiService(LoggerInterface)");
    assert_eq!(api.dependencies[0].token, "LoggerInterface");
    assert!(api.is_auto_resolved);

    let bean = artifact.entry("MetricsInterface").unwrap();
    assert!(bean.is_bean);
    assert_eq!(bean.bean_method_name.as_deref(), Some("createMetrics"));
    assert_eq!(bean.configuration_class.as_deref(), Some("AppConfig"));

    // Location-qualified keys are present for every binding.
    let logger_binding = analyzer
        .resolver()
        .bindings()
        .all()
        .iter()
        .find(|b| b.sanitized_key == "LoggerInterface")
        .unwrap();
    assert!(artifact
        .entry(&keys::location_key(
            "LoggerInterface",
            &logger_binding.file_path,
            logger_binding.line_number
        ))
        .is_some());
}
