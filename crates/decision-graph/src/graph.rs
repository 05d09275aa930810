//! Evaluation graph over sources, measures and metrics.
//!
//! Edges run from an input to the node that consumes it: source to measure, and factor
//! (measure or metric) to metric, weighted by the declared factor weight. The graph is built
//! once from a [`DecisionConfig`], checked for cycles and then only queried.

use crate::error::ConfigError;
use crate::model::DecisionConfig;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    Measure,
    Metric,
}

impl NodeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Measure => "measure",
            Self::Metric => "metric",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

/// Validated, acyclic dependency graph with a fixed evaluation order.
#[derive(Debug, Clone)]
pub struct EvaluationGraph {
    graph: DiGraph<Node, f64>,
    names: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
    final_node: NodeIndex,
    reaches_final: HashSet<NodeIndex>,
}

impl EvaluationGraph {
    /// Build and validate the graph for `config`.
    ///
    /// Every metric node exists before any factor edge is added, so a metric may reference
    /// metrics declared after it; mutual references are then reported as a cycle.
    pub fn build(config: &DecisionConfig) -> Result<Self, ConfigError> {
        let mut builder = Builder::default();

        for measure in &config.measures {
            let source = builder.source(&measure.source)?;
            let node = builder.add(&measure.name, NodeKind::Measure)?;
            builder.graph.add_edge(source, node, 1.0);
        }

        for metric in &config.metrics {
            builder.add(&metric.name, NodeKind::Metric)?;
        }

        for metric in &config.metrics {
            if metric.factors.is_empty() {
                return Err(ConfigError::EmptyMetric {
                    metric: metric.name.clone(),
                });
            }
            let target = builder.names[metric.name.as_str()];
            let mut seen = HashSet::new();
            for factor in &metric.factors {
                let Some(&input) = builder.names.get(factor.name.as_str()) else {
                    return Err(ConfigError::UnknownFactor {
                        metric: metric.name.clone(),
                        factor: factor.name.clone(),
                    });
                };
                if builder.graph[input].kind == NodeKind::Source {
                    return Err(ConfigError::SourceAsFactor {
                        metric: metric.name.clone(),
                        factor: factor.name.clone(),
                    });
                }
                if !seen.insert(factor.name.as_str()) {
                    return Err(ConfigError::DuplicateFactor {
                        metric: metric.name.clone(),
                        factor: factor.name.clone(),
                    });
                }
                if !factor.weight.is_finite() || factor.weight < 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        metric: metric.name.clone(),
                        factor: factor.name.clone(),
                        weight: factor.weight,
                    });
                }
                builder.graph.add_edge(input, target, factor.weight);
            }
        }

        let Builder { graph, names } = builder;
        let order = topological_order(&graph).map_err(|path| ConfigError::Cycle {
            path: path
                .into_iter()
                .map(|index| graph[index].name.clone())
                .collect(),
        })?;

        let final_node = match names.get(config.final_metric.as_str()) {
            None => return Err(ConfigError::UnknownFinal(config.final_metric.clone())),
            Some(&index) if graph[index].kind != NodeKind::Metric => {
                return Err(ConfigError::FinalNotMetric {
                    name: config.final_metric.clone(),
                    kind: graph[index].kind,
                })
            }
            Some(&index) => index,
        };

        let reversed = Reversed(&graph);
        let mut dfs = Dfs::new(reversed, final_node);
        let mut reaches_final = HashSet::new();
        while let Some(index) = dfs.next(reversed) {
            reaches_final.insert(index);
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            final_metric = %config.final_metric,
            "evaluation graph built"
        );

        Ok(Self {
            graph,
            names,
            order,
            final_node,
            reaches_final,
        })
    }

    pub fn final_metric(&self) -> &str {
        &self.graph[self.final_node].name
    }

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        self.names.get(name).map(|&index| self.graph[index].kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Every node in dependency order; ties follow declaration order.
    pub fn topological_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.graph[index].name.as_str())
            .collect()
    }

    /// Metrics in the order the aggregation engine evaluates them.
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.names_of_kind(NodeKind::Metric, self.order.iter().copied())
    }

    /// Metrics that feed the final metric, final first: reverse evaluation order.
    pub fn print_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .rev()
            .filter(|index| {
                self.graph[**index].kind == NodeKind::Metric && self.reaches_final.contains(*index)
            })
            .map(|&index| self.graph[index].name.as_str())
            .collect()
    }

    /// Whether `name` is the final metric or has a path to it.
    pub fn reaches_final(&self, name: &str) -> bool {
        self.names
            .get(name)
            .is_some_and(|index| self.reaches_final.contains(index))
    }

    /// Metrics with no path to the final metric, in declaration order.
    pub fn ignored_metrics(&self) -> Vec<&str> {
        self.ignored(NodeKind::Metric)
    }

    /// Measures with no path to the final metric, in declaration order.
    pub fn ignored_measures(&self) -> Vec<&str> {
        self.ignored(NodeKind::Measure)
    }

    /// Factors of `metric` with their declared weights, in declaration order.
    pub fn factors(&self, metric: &str) -> Vec<(&str, f64)> {
        let Some(&index) = self.names.get(metric) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| (self.graph[edge.source()].name.as_str(), *edge.weight()))
            .collect()
    }

    /// All edges as `(from, to, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].name.as_str(),
                self.graph[edge.target()].name.as_str(),
                *edge.weight(),
            )
        })
    }

    pub fn edge_weight(&self, from: &str, to: &str) -> Option<f64> {
        let from = *self.names.get(from)?;
        let to = *self.names.get(to)?;
        self.graph
            .find_edge(from, to)
            .and_then(|edge| self.graph.edge_weight(edge))
            .copied()
    }

    fn ignored(&self, kind: NodeKind) -> Vec<&str> {
        let indices = self
            .graph
            .node_indices()
            .filter(|index| !self.reaches_final.contains(index));
        self.names_of_kind(kind, indices)
    }

    fn names_of_kind(&self, kind: NodeKind, indices: impl Iterator<Item = NodeIndex>) -> Vec<&str> {
        indices
            .filter(|&index| self.graph[index].kind == kind)
            .map(|index| self.graph[index].name.as_str())
            .collect()
    }
}

#[derive(Default)]
struct Builder {
    graph: DiGraph<Node, f64>,
    names: HashMap<String, NodeIndex>,
}

impl Builder {
    fn add(&mut self, name: &str, kind: NodeKind) -> Result<NodeIndex, ConfigError> {
        if let Some(&existing) = self.names.get(name) {
            return Err(ConfigError::DuplicateName {
                name: name.to_string(),
                existing: self.graph[existing].kind,
            });
        }
        let index = self.graph.add_node(Node {
            name: name.to_string(),
            kind,
        });
        self.names.insert(name.to_string(), index);
        Ok(index)
    }

    /// Sources are shared between measures; any other node of the same name is a collision.
    fn source(&mut self, name: &str) -> Result<NodeIndex, ConfigError> {
        match self.names.get(name) {
            Some(&index) if self.graph[index].kind == NodeKind::Source => Ok(index),
            _ => self.add(name, NodeKind::Source),
        }
    }
}

/// Kahn's algorithm, always releasing the earliest-declared ready node.
///
/// On failure returns one cycle as a closed path (first node repeated at the end).
fn topological_order(graph: &DiGraph<Node, f64>) -> Result<Vec<NodeIndex>, Vec<NodeIndex>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|index| graph.edges_directed(index, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|index| in_degree[index.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for edge in graph.edges_directed(index, Direction::Outgoing) {
            let target = edge.target();
            in_degree[target.index()] -= 1;
            if in_degree[target.index()] == 0 {
                ready.push(Reverse(target));
            }
        }
    }

    if order.len() == graph.node_count() {
        Ok(order)
    } else {
        Err(find_cycle(graph))
    }
}

fn find_cycle(graph: &DiGraph<Node, f64>) -> Vec<NodeIndex> {
    let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .collect();
    for component in &mut cycles {
        component.sort();
    }
    cycles.sort();

    let Some(component) = cycles.into_iter().next() else {
        return Vec::new();
    };
    let start = component[0];
    let members: HashSet<NodeIndex> = component.into_iter().collect();
    let mut path = vec![start];
    let mut visited = HashSet::from([start]);
    close_cycle(graph, start, start, &members, &mut visited, &mut path);
    path
}

fn close_cycle(
    graph: &DiGraph<Node, f64>,
    start: NodeIndex,
    node: NodeIndex,
    members: &HashSet<NodeIndex>,
    visited: &mut HashSet<NodeIndex>,
    path: &mut Vec<NodeIndex>,
) -> bool {
    let mut next: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
    next.sort();
    next.dedup();

    for neighbor in next {
        if neighbor == start {
            path.push(start);
            return true;
        }
        if members.contains(&neighbor) && visited.insert(neighbor) {
            path.push(neighbor);
            if close_cycle(graph, start, neighbor, members, visited, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Factor, Measure, Metric};
    use crate::scorers::ScorerConfig;
    use proptest::prelude::*;

    fn measure(name: &str, source: &str) -> Measure {
        Measure {
            name: name.to_string(),
            source: source.to_string(),
            scoring: ScorerConfig::Star { min: 1, max: 5 },
            doc: None,
        }
    }

    fn metric(name: &str, factors: &[(&str, f64)]) -> Metric {
        Metric {
            name: name.to_string(),
            factors: factors
                .iter()
                .map(|(factor, weight)| Factor::new(*factor, *weight))
                .collect(),
        }
    }

    fn config(measures: Vec<Measure>, metrics: Vec<Metric>, final_metric: &str) -> DecisionConfig {
        DecisionConfig {
            measures,
            metrics,
            final_metric: final_metric.to_string(),
            fetchers: Default::default(),
        }
    }

    fn car_config() -> DecisionConfig {
        config(
            vec![
                measure("cost", "price"),
                measure("size", "cargo"),
                measure("looks", "rating"),
                measure("economy", "mpg"),
                measure("power", "horsepower"),
            ],
            vec![
                metric("smart", &[("cost", 1.0), ("size", 1.0), ("economy", 1.0)]),
                metric("fun", &[("looks", 0.5), ("power", 0.5)]),
                metric("final", &[("smart", 0.67), ("fun", 0.33)]),
            ],
            "final",
        )
    }

    fn assert_edges_respect_order(graph: &EvaluationGraph) {
        let order = graph.topological_order();
        let position = |name: &str| order.iter().position(|entry| *entry == name);
        for (from, to, _) in graph.edges() {
            assert!(
                position(from) < position(to),
                "{from} must precede {to} in {order:?}"
            );
        }
    }

    #[test]
    fn builds_nodes_edges_and_orders() {
        let graph = EvaluationGraph::build(&car_config()).expect("valid graph");

        assert_eq!(graph.node_count(), 13);
        assert_eq!(graph.kind("price"), Some(NodeKind::Source));
        assert_eq!(graph.kind("cost"), Some(NodeKind::Measure));
        assert_eq!(graph.kind("final"), Some(NodeKind::Metric));
        assert_eq!(graph.edge_weight("smart", "final"), Some(0.67));
        assert_eq!(graph.edge_weight("price", "cost"), Some(1.0));
        assert_eq!(graph.edge_weight("cost", "fun"), None);

        assert_eq!(graph.evaluation_order(), vec!["smart", "fun", "final"]);
        assert_eq!(graph.print_order(), vec!["final", "fun", "smart"]);
        assert_eq!(
            graph.factors("fun"),
            vec![("looks", 0.5), ("power", 0.5)]
        );
        assert!(graph.ignored_metrics().is_empty());
        assert!(graph.ignored_measures().is_empty());
        assert_edges_respect_order(&graph);
    }

    #[test]
    fn metric_may_reference_a_later_declared_metric() {
        let graph = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![
                metric("final", &[("inner", 1.0)]),
                metric("inner", &[("looks", 1.0)]),
            ],
            "final",
        ))
        .expect("forward reference is fine");
        assert_eq!(graph.evaluation_order(), vec!["inner", "final"]);
    }

    #[test]
    fn reports_unreachable_nodes() {
        let graph = EvaluationGraph::build(&config(
            vec![measure("looks", "rating"), measure("size", "cargo")],
            vec![
                metric("side", &[("size", 1.0)]),
                metric("final", &[("looks", 1.0)]),
            ],
            "final",
        ))
        .expect("valid graph");

        assert_eq!(graph.ignored_metrics(), vec!["side"]);
        assert_eq!(graph.ignored_measures(), vec!["size"]);
        assert_eq!(graph.print_order(), vec!["final"]);
        assert!(graph.reaches_final("looks"));
        assert!(!graph.reaches_final("cargo"));
    }

    #[test]
    fn mutual_metrics_report_the_cycle() {
        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![
                metric("A", &[("B", 1.0), ("looks", 1.0)]),
                metric("B", &[("A", 1.0)]),
            ],
            "A",
        ))
        .expect_err("cycle");

        assert_eq!(
            error,
            ConfigError::Cycle {
                path: vec!["A".to_string(), "B".to_string(), "A".to_string()]
            }
        );
        assert_eq!(
            error.to_string(),
            "dependency graph is not acyclic: A -> B -> A"
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![metric("final", &[("final", 1.0), ("looks", 1.0)])],
            "final",
        ))
        .expect_err("self loop");
        assert_eq!(
            error,
            ConfigError::Cycle {
                path: vec!["final".to_string(), "final".to_string()]
            }
        );
    }

    #[test]
    fn unknown_factor_is_rejected() {
        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![metric("final", &[("looks", 1.0), ("speed", 1.0)])],
            "final",
        ))
        .expect_err("speed is undeclared");
        assert_eq!(
            error,
            ConfigError::UnknownFactor {
                metric: "final".to_string(),
                factor: "speed".to_string(),
            }
        );
    }

    #[test]
    fn namespace_collisions_are_rejected() {
        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating"), measure("looks", "rating")],
            vec![metric("final", &[("looks", 1.0)])],
            "final",
        ))
        .expect_err("duplicate measure");
        assert_eq!(
            error,
            ConfigError::DuplicateName {
                name: "looks".to_string(),
                existing: NodeKind::Measure,
            }
        );

        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![metric("rating", &[("looks", 1.0)])],
            "rating",
        ))
        .expect_err("metric named like a source");
        assert!(matches!(
            error,
            ConfigError::DuplicateName {
                existing: NodeKind::Source,
                ..
            }
        ));

        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating"), measure("size", "looks")],
            vec![metric("final", &[("looks", 1.0)])],
            "final",
        ))
        .expect_err("source named like a measure");
        assert!(matches!(
            error,
            ConfigError::DuplicateName {
                existing: NodeKind::Measure,
                ..
            }
        ));
    }

    #[test]
    fn shared_source_feeds_several_measures() {
        let graph = EvaluationGraph::build(&config(
            vec![measure("looks", "rating"), measure("style", "rating")],
            vec![metric("final", &[("looks", 1.0), ("style", 1.0)])],
            "final",
        ))
        .expect("sources may be shared");
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn rejects_invalid_factor_lists() {
        let cases = [
            (
                metric("final", &[("rating", 1.0)]),
                "source as factor",
            ),
            (
                metric("final", &[("looks", 1.0), ("looks", 2.0)]),
                "duplicate factor",
            ),
            (metric("final", &[("looks", -1.0)]), "negative weight"),
            (metric("final", &[("looks", f64::NAN)]), "nan weight"),
            (metric("final", &[]), "no factors"),
        ];
        for (metric, label) in cases {
            let result = EvaluationGraph::build(&config(
                vec![measure("looks", "rating")],
                vec![metric],
                "final",
            ));
            assert!(result.is_err(), "{label} should be rejected");
        }
    }

    #[test]
    fn final_selector_must_name_a_metric() {
        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![metric("fun", &[("looks", 1.0)])],
            "best",
        ))
        .expect_err("undeclared final");
        assert_eq!(error, ConfigError::UnknownFinal("best".to_string()));

        let error = EvaluationGraph::build(&config(
            vec![measure("looks", "rating")],
            vec![metric("fun", &[("looks", 1.0)])],
            "looks",
        ))
        .expect_err("measure as final");
        assert_eq!(
            error,
            ConfigError::FinalNotMetric {
                name: "looks".to_string(),
                kind: NodeKind::Measure,
            }
        );
    }

    proptest! {
        #[test]
        fn evaluation_order_respects_every_edge(
            links in prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 1..8),
        ) {
            // Metric `m{i}` may depend on any `m{j}` with j < i; declaring them in reverse
            // exercises forward references.
            let count = links.len();
            let metrics: Vec<Metric> = (0..count)
                .rev()
                .map(|i| {
                    let mut factors = vec![Factor::new("looks", 1.0)];
                    for j in 0..i {
                        if links[i][j] {
                            factors.push(Factor::new(format!("m{j}"), 1.0));
                        }
                    }
                    Metric { name: format!("m{i}"), factors }
                })
                .collect();
            let final_metric = format!("m{}", count - 1);
            let graph = EvaluationGraph::build(&config(
                vec![measure("looks", "rating")],
                metrics,
                &final_metric,
            ))
            .expect("acyclic by construction");

            assert_edges_respect_order(&graph);
            prop_assert_eq!(graph.evaluation_order().len(), count);
            prop_assert_eq!(graph.print_order().first().copied(), Some(final_metric.as_str()));
        }
    }
}
