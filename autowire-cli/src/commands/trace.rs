use std::collections::HashSet;
use std::process::ExitCode;

use colored::Colorize;

use autowire_core::validator::IssueKind;
use autowire_core::{Analyzer, InterfaceResolver};

use super::exit_code;

/// Explain one token's resolution, or list missing/circular findings.
pub fn run(
    analyzer: &mut Analyzer,
    token: Option<&str>,
    missing: bool,
    circular: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let report = analyzer.check()?;

    if missing {
        let issues: Vec<_> = report
            .validation
            .errors
            .iter()
            .filter(|i| i.kind == IssueKind::MissingService)
            .collect();
        if issues.is_empty() {
            println!("{}", "No missing dependencies.".green());
            return Ok(ExitCode::SUCCESS);
        }
        for issue in &issues {
            println!(
                "  {} {} {}",
                issue.token.as_deref().unwrap_or("?").red(),
                "required by".dimmed(),
                issue.related_tokens.join(", ")
            );
        }
        return Ok(exit_code(issues.len()));
    }

    if circular {
        let cycles = report.graph.cycles();
        if cycles.is_empty() {
            println!("{}", "No dependency cycles.".green());
            return Ok(ExitCode::SUCCESS);
        }
        for component in &cycles {
            let ordered = report.graph.ordered_cycle(component);
            println!("  {}", ordered.join(" -> ").red());
        }
        return Ok(exit_code(cycles.len()));
    }

    let Some(token) = token else {
        return Err("trace needs a token, --missing, or --circular".into());
    };

    let resolver = analyzer.resolver();
    match resolver.resolve(token) {
        None => {
            println!("{} '{}'", "Unresolved:".red().bold(), token);
            Ok(ExitCode::FAILURE)
        }
        Some(res) => {
            println!("{} '{}'", "Resolved:".green().bold(), token);
            println!(
                "  {} {} ({:?}, tier {})",
                "->".dimmed(),
                res.binding.implementation_class.bold(),
                res.binding.kind,
                res.tier
            );
            println!(
                "     {} {}:{}  key {}",
                "at".dimmed(),
                res.binding.file_path,
                res.binding.line_number,
                res.binding.sanitized_key.dimmed()
            );
            if res.partial {
                println!("     {}", "matched only by partial key containment".yellow());
            }
            if res.is_ambiguous() {
                println!("     {}", "ambiguous; other candidates:".yellow());
                for other in &res.ambiguous {
                    println!(
                        "       {} ({}:{})",
                        other.implementation_class, other.file_path, other.line_number
                    );
                }
            }

            let mut seen = HashSet::new();
            print_dependency_tree(
                resolver,
                &res.binding.implementation_class,
                1,
                &mut seen,
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Recursive dependency rendering with cycle protection.
fn print_dependency_tree(
    resolver: &InterfaceResolver,
    class: &str,
    depth: usize,
    seen: &mut HashSet<String>,
) {
    if !seen.insert(class.to_string()) {
        println!("{}{}", "  ".repeat(depth + 1), "(cycle)".red());
        return;
    }
    let Some(record) = resolver.dependencies().get(class) else {
        return;
    };
    for param in &record.constructor_params {
        let indent = "  ".repeat(depth + 1);
        match resolver.resolve(&param.declared_type) {
            Some(dep) => {
                let marker = if param.is_optional { "?" } else { "" };
                println!(
                    "{indent}{} {}{} {} {}",
                    "└─".dimmed(),
                    param.declared_type,
                    marker,
                    "->".dimmed(),
                    dep.binding.implementation_class
                );
                print_dependency_tree(resolver, &dep.binding.implementation_class, depth + 1, seen);
            }
            None => {
                let status = if param.is_optional {
                    "(optional, unresolved)".yellow()
                } else {
                    "(missing!)".red()
                };
                println!(
                    "{indent}{} {} {}",
                    "└─".dimmed(),
                    param.declared_type,
                    status
                );
            }
        }
    }
}
