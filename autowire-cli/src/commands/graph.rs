use std::collections::BTreeSet;
use std::process::ExitCode;

use clap::ValueEnum;
use colored::Colorize;

use autowire_core::{Analyzer, DependencyGraph};

/// Output renderings for `graph --format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Ascii,
    Json,
    Dot,
    Mermaid,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Ascii => "ascii",
            Format::Json => "json",
            Format::Dot => "dot",
            Format::Mermaid => "mermaid",
        };
        f.write_str(name)
    }
}

pub fn run(
    analyzer: &mut Analyzer,
    format: Format,
    highlight: &[String],
    max_depth: Option<usize>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let report = analyzer.check()?;
    let graph = &report.graph;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(graph)?),
        Format::Dot => print!("{}", render_dot(graph, highlight)),
        Format::Mermaid => print!("{}", render_mermaid(graph, highlight)),
        Format::Ascii => print_ascii(graph, highlight, max_depth.unwrap_or(usize::MAX)),
    }
    Ok(ExitCode::SUCCESS)
}

/// Graphviz rendering; highlighted nodes get a filled style.
fn render_dot(graph: &DependencyGraph, highlight: &[String]) -> String {
    let mut out = String::from("digraph dependencies {\n  rankdir=LR;\n");
    for node in &graph.nodes {
        if highlight.contains(node) {
            out.push_str(&format!(
                "  \"{node}\" [style=filled, fillcolor=gold];\n"
            ));
        } else {
            out.push_str(&format!("  \"{node}\";\n"));
        }
    }
    for edge in &graph.edges {
        let style = if edge.optional { " [style=dashed]" } else { "" };
        out.push_str(&format!("  \"{}\" -> \"{}\"{style};\n", edge.from, edge.to));
    }
    out.push_str("}\n");
    out
}

fn render_mermaid(graph: &DependencyGraph, highlight: &[String]) -> String {
    let mut out = String::from("graph TD\n");
    for node in &graph.nodes {
        out.push_str(&format!("  {node}[{node}]\n"));
    }
    for edge in &graph.edges {
        let arrow = if edge.optional { "-.->" } else { "-->" };
        out.push_str(&format!("  {} {arrow} {}\n", edge.from, edge.to));
    }
    for node in highlight {
        if graph.nodes.contains(node) {
            out.push_str(&format!("  style {node} fill:#f9d71c\n"));
        }
    }
    out
}

/// Tree rendering from the graph roots (nodes nothing depends on),
/// falling back to all nodes when everything is part of a cycle.
fn print_ascii(graph: &DependencyGraph, highlight: &[String], max_depth: usize) {
    if graph.nodes.is_empty() {
        println!("{}", "No services found.".dimmed());
        return;
    }

    let dependents = graph.dependents();
    let mut roots: Vec<&String> = graph
        .nodes
        .iter()
        .filter(|n| dependents.get(n.as_str()).is_none_or(BTreeSet::is_empty))
        .collect();
    if roots.is_empty() {
        roots = graph.nodes.iter().collect();
    }

    let adjacency = graph.adjacency();
    for root in roots {
        print_node(root, &adjacency, highlight, 0, max_depth, &mut Vec::new());
    }
}

fn print_node(
    node: &str,
    adjacency: &std::collections::BTreeMap<&str, BTreeSet<&str>>,
    highlight: &[String],
    depth: usize,
    max_depth: usize,
    path: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let label = if highlight.iter().any(|h| h == node) {
        format!("{node} *").yellow().bold().to_string()
    } else {
        node.to_string()
    };
    let prefix = if depth == 0 { "" } else { "└─ " };
    println!("{indent}{}{label}", prefix.dimmed());

    if depth >= max_depth {
        return;
    }
    if path.iter().any(|p| p == node) {
        println!("{indent}  {}", "(cycle)".red());
        return;
    }

    path.push(node.to_string());
    for dep in adjacency.get(node).into_iter().flatten().copied() {
        print_node(dep, adjacency, highlight, depth + 1, max_depth, path);
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use autowire_core::graph::Edge;

    fn sample_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        for node in ["ApiService", "ConsoleLogger"] {
            graph.nodes.insert(node.to_string());
        }
        graph.edges.push(Edge {
            from: "ApiService".into(),
            to: "ConsoleLogger".into(),
            token: "LoggerInterface".into(),
            optional: false,
        });
        graph
    }

    #[test]
    fn dot_rendering() {
        let out = render_dot(&sample_graph(), &["ConsoleLogger".to_string()]);
        assert!(out.starts_with("digraph dependencies {"));
        assert!(out.contains("\"ApiService\" -> \"ConsoleLogger\";"));
        assert!(out.contains("\"ConsoleLogger\" [style=filled, fillcolor=gold];"));
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn mermaid_rendering() {
        let out = render_mermaid(&sample_graph(), &[]);
        assert!(out.starts_with("graph TD\n"));
        assert!(out.contains("ApiService --> ConsoleLogger"));
    }

    #[test]
    fn mermaid_optional_edges_are_dashed() {
        let mut graph = sample_graph();
        graph.edges[0].optional = true;
        let out = render_mermaid(&graph, &[]);
        assert!(out.contains("ApiService -.-> ConsoleLogger"));
    }

    #[test]
    fn dot_escapes_nothing_but_quotes_names() {
        let out = render_dot(&sample_graph(), &[]);
        assert!(out.contains("\"ApiService\";"));
    }
}
