use std::process::ExitCode;

use colored::Colorize;

use autowire_core::Analyzer;

use super::{exit_code, print_issue};

/// Run the full pipeline and persist the artifact.
pub fn run(analyzer: &mut Analyzer, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let report = analyzer.analyze()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(exit_code(report.validation.errors.len()));
    }

    println!("{}", "Autowire analysis".bold());
    println!();
    println!(
        "  {} files, {} services, {} bindings, {} dependency records",
        report.files_scanned,
        report.validation.stats.services,
        report.validation.stats.bindings,
        report.validation.stats.dependencies,
    );

    if let (Some(hash), Some(dir)) = (&report.artifact_hash, &report.artifact_dir) {
        let state = if report.reused { "reused" } else { "written" };
        println!(
            "  artifact {} {} ({})",
            state,
            dir.display().to_string().cyan(),
            hash.dimmed()
        );
    }
    println!("  completed in {} ms", report.duration_ms);
    println!();

    if report.validation.issue_count() == 0 {
        println!("{}", "No issues found.".green());
    } else {
        for issue in report.validation.all_issues() {
            print_issue(issue);
        }
        println!();
        println!(
            "{} error(s), {} warning(s), {} info",
            report.validation.errors.len().to_string().red(),
            report.validation.warnings.len().to_string().yellow(),
            report.validation.info.len()
        );
    }

    Ok(exit_code(report.validation.errors.len()))
}
