pub mod analyze;
pub mod graph;
pub mod trace;
pub mod validate;

use std::process::ExitCode;

use colored::Colorize;

use autowire_core::validator::{Issue, Severity};

/// Non-zero exactly when error-severity issues exist.
pub fn exit_code(errors: usize) -> ExitCode {
    if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// One-line issue rendering shared by `analyze` and `validate`.
pub fn print_issue(issue: &Issue) {
    let tag = match issue.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".blue(),
    };
    let location = issue
        .file_path
        .as_deref()
        .map(|f| match issue.line {
            Some(line) => format!(" [{f}:{line}]"),
            None => format!(" [{f}]"),
        })
        .unwrap_or_default();
    println!("  {tag}: {}{}", issue.message, location.dimmed());
    if let Some(suggestion) = &issue.suggestion {
        println!("    {} {}", "hint:".dimmed(), suggestion.dimmed());
    }
}
