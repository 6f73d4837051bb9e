//! Projected class-to-class dependency graph.
//!
//! The bindings table relates interfaces to classes; cycles are only
//! meaningful between classes. This module projects every recorded
//! dependency to its implementing class (through the resolution ladder)
//! and exposes the resulting directed graph. Built once after Pass 2.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::resolver::InterfaceResolver;

/// One projected edge with the evidence it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// The dependency token that produced this edge.
    pub token: String,
    pub optional: bool,
}

/// Directed class graph; node order and edge order are deterministic.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    /// Every service class, dependents included.
    pub nodes: BTreeSet<String>,
    pub edges: Vec<Edge>,
}

impl DependencyGraph {
    /// Project the dependency table onto classes. Unresolvable
    /// dependencies produce no edge; the validator reports them.
    pub fn project(resolver: &InterfaceResolver) -> Self {
        let mut graph = DependencyGraph::default();

        for binding in resolver.bindings().all() {
            graph.nodes.insert(binding.implementation_class.clone());
        }

        for (service, record) in resolver.dependencies() {
            graph.nodes.insert(service.clone());
            for param in &record.constructor_params {
                if let Some(res) = resolver.resolve(&param.declared_type) {
                    graph.edges.push(Edge {
                        from: service.clone(),
                        to: res.binding.implementation_class.clone(),
                        token: param.declared_type.clone(),
                        optional: param.is_optional,
                    });
                }
            }
        }

        graph.edges.sort_by(|a, b| {
            (&a.from, &a.to, &a.token).cmp(&(&b.from, &b.to, &b.token))
        });
        graph
    }

    /// Adjacency view: class → set of classes it depends on.
    pub fn adjacency(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut adj: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for node in &self.nodes {
            adj.entry(node).or_default();
        }
        for edge in &self.edges {
            adj.entry(&edge.from).or_default().insert(&edge.to);
        }
        adj
    }

    /// Reverse adjacency: class → set of classes depending on it.
    pub fn dependents(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut rev: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for node in &self.nodes {
            rev.entry(node).or_default();
        }
        for edge in &self.edges {
            rev.entry(&edge.to).or_default().insert(&edge.from);
        }
        rev
    }

    /// Strongly connected components of size ≥ 2, plus self-loops, in
    /// deterministic order. Each component is the node set of one
    /// circular-dependency report.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let adj = self.adjacency();
        let nodes: Vec<&str> = adj.keys().copied().collect();
        let index_of: BTreeMap<&str, usize> =
            nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let succ: Vec<Vec<usize>> = nodes
            .iter()
            .map(|n| {
                adj[n]
                    .iter()
                    .filter_map(|t| index_of.get(t).copied())
                    .collect()
            })
            .collect();

        let sccs = tarjan_sccs(&succ);

        let mut cycles = Vec::new();
        for component in sccs {
            let is_cycle = component.len() > 1
                || component
                    .iter()
                    .any(|&n| succ[n].contains(&n));
            if is_cycle {
                let mut members: Vec<String> =
                    component.iter().map(|&n| nodes[n].to_string()).collect();
                members.sort();
                cycles.push(members);
            }
        }
        cycles.sort();
        cycles
    }

    /// Walk one ordered cycle through a component, starting from its
    /// first member and closing back on it: `[A, B, A]`.
    pub fn ordered_cycle(&self, component: &[String]) -> Vec<String> {
        let adj = self.adjacency();
        let Some(start) = component.first() else {
            return vec![];
        };

        let mut path = vec![start.clone()];
        let mut current = start.as_str();
        loop {
            let next = adj
                .get(current)
                .into_iter()
                .flatten()
                .copied()
                .find(|n| {
                    component.iter().any(|m| m.as_str() == *n)
                        && !path[1..].iter().any(|p| p == n)
                });
            let Some(next) = next else { break };
            path.push(next.to_string());
            if next == start.as_str() {
                return path;
            }
            current = next;
        }
        // Close the loop explicitly even when the walk dead-ends.
        path.push(start.clone());
        path
    }
}

/// Iterative Tarjan SCC. Node count is small (one per service class),
/// but recursion depth must not depend on user input.
fn tarjan_sccs(succ: &[Vec<usize>]) -> Vec<Vec<usize>> {
    #[derive(Clone, Copy)]
    struct NodeState {
        index: usize,
        lowlink: usize,
        on_stack: bool,
        visited: bool,
    }

    let n = succ.len();
    let mut state = vec![
        NodeState {
            index: 0,
            lowlink: 0,
            on_stack: false,
            visited: false,
        };
        n
    ];
    let mut next_index = 0;
    let mut stack: Vec<usize> = Vec::new();
    let mut sccs: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if state[root].visited {
            continue;
        }
        // Explicit DFS frame stack: (node, next-successor position).
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(v, pos)) = frames.last() {
            if pos == 0 && !state[v].visited {
                state[v].visited = true;
                state[v].index = next_index;
                state[v].lowlink = next_index;
                next_index += 1;
                stack.push(v);
                state[v].on_stack = true;
            }
            if pos < succ[v].len() {
                let w = succ[v][pos];
                frames.last_mut().expect("frame present").1 += 1;
                if !state[w].visited {
                    frames.push((w, 0));
                } else if state[w].on_stack {
                    state[v].lowlink = state[v].lowlink.min(state[w].index);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    let child_low = state[v].lowlink;
                    state[parent].lowlink = state[parent].lowlink.min(child_low);
                }
                if state[v].lowlink == state[v].index {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        state[w].on_stack = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    sccs.push(component);
                }
            }
        }
    }

    sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalyzerOptions;
    use crate::source::{parse_source, ClassDecl};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn graph_for(files: &[(&str, &str)]) -> DependencyGraph {
        let mut resolver = InterfaceResolver::new(AnalyzerOptions::default());
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
        DependencyGraph::project(&resolver)
    }

    #[test]
    fn projects_interface_edges_to_classes() {
        let graph = graph_for(&[
            (
                "src/a.ts",
                "@Service()\nclass ApiService { constructor(@Inject() logger: LoggerInterface) {} }",
            ),
            (
                "src/b.ts",
                "@Service()\nclass ConsoleLogger implements LoggerInterface {}",
            ),
        ]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, "ApiService");
        assert_eq!(graph.edges[0].to, "ConsoleLogger");
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn detects_indirect_cycle() {
        let graph = graph_for(&[
            (
                "src/a.ts",
                "@Service()\nclass CircularA implements CircularAInterface { constructor(@Inject() b: CircularBInterface) {} }",
            ),
            (
                "src/b.ts",
                "@Service()\nclass CircularB implements CircularBInterface { constructor(@Inject() a: CircularAInterface) {} }",
            ),
        ]);
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["CircularA", "CircularB"]);

        let ordered = graph.ordered_cycle(&cycles[0]);
        assert_eq!(ordered.first(), ordered.last());
        assert_eq!(ordered.len(), 3);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = graph_for(&[(
            "src/a.ts",
            "@Service()\nclass Selfish implements SelfInterface { constructor(@Inject() me: SelfInterface) {} }",
        )]);
        let cycles = graph.cycles();
        assert_eq!(cycles, vec![vec!["Selfish".to_string()]]);
        assert_eq!(
            graph.ordered_cycle(&cycles[0]),
            vec!["Selfish".to_string(), "Selfish".to_string()]
        );
    }

    #[test]
    fn unresolvable_dependency_produces_no_edge() {
        let graph = graph_for(&[(
            "src/a.ts",
            "@Service()\nclass Lonely { constructor(@Inject() gone: MissingInterface) {} }",
        )]);
        assert!(graph.edges.is_empty());
        assert!(graph.nodes.contains("Lonely"));
    }
}
