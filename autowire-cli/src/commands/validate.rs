use std::process::ExitCode;

use clap::ValueEnum;
use colored::Colorize;

use autowire_core::validator::{Issue, IssueKind};
use autowire_core::Analyzer;

use super::{exit_code, print_issue};

/// Issue-category filter for `validate --type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckType {
    Circular,
    Missing,
    Scopes,
    Orphaned,
    All,
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckType::Circular => "circular",
            CheckType::Missing => "missing",
            CheckType::Scopes => "scopes",
            CheckType::Orphaned => "orphaned",
            CheckType::All => "all",
        };
        f.write_str(name)
    }
}

impl CheckType {
    fn matches(self, issue: &Issue) -> bool {
        match self {
            CheckType::All => true,
            CheckType::Circular => issue.kind == IssueKind::CircularDependency,
            CheckType::Missing => issue.kind == IssueKind::MissingService,
            CheckType::Scopes => issue.kind == IssueKind::ScopeMismatch,
            CheckType::Orphaned => issue.kind == IssueKind::OrphanedService,
        }
    }
}

/// Validate the graph without writing the artifact.
pub fn run(
    analyzer: &mut Analyzer,
    check_type: CheckType,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let report = analyzer.check()?;

    let issues: Vec<&Issue> = report
        .validation
        .all_issues()
        .filter(|i| check_type.matches(i))
        .collect();
    let errors = issues
        .iter()
        .filter(|i| i.severity == autowire_core::Severity::Error)
        .count();

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(exit_code(errors));
    }

    println!("{}", "Autowire validation".bold());
    println!();
    if issues.is_empty() {
        println!(
            "{} ({} services, {} edges checked)",
            "No issues found.".green(),
            report.validation.stats.services,
            report.validation.stats.edges
        );
    } else {
        for issue in &issues {
            print_issue(issue);
        }
        println!();
        println!("{} issue(s), {} error-severity", issues.len(), errors);
    }

    Ok(exit_code(errors))
}
