//! Call graph: dependency edges, topological order, cycles and waves.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::descriptor::{node_id, PipelineDescriptor};

/// One executable call.
#[derive(Debug, Clone)]
pub struct CallNode {
    pub id: String,
    pub class_name: String,
    pub method: String,
    pub inputs: BTreeMap<String, Value>,
    /// Identifiers of pipeline nodes this call references, deduplicated.
    pub references: Vec<String>,
    /// Indices of referenced nodes that are themselves executable.
    pub deps: Vec<usize>,
}

/// Flattened pipeline with dependency edges.
///
/// Identifiers occurring more than once are excluded from the graph and
/// listed in `duplicates`; references to them stay in `references` so the
/// executor can skip dependents.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<CallNode>,
    duplicates: Vec<String>,
}

/// Execution order for a call graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Runnable nodes in dependency order (ties broken by declaration order).
    pub order: Vec<usize>,
    /// `order` grouped into waves; every dependency of a node lies in an
    /// earlier wave.
    pub waves: Vec<Vec<usize>>,
    /// Nodes on a cycle, with the members of that cycle.
    pub cyclic: Vec<(usize, Vec<String>)>,
    /// Nodes that depend on a cyclic node, with the dependency blocking them.
    pub blocked: Vec<(usize, String)>,
}

impl CallGraph {
    pub fn build(pipeline: &PipelineDescriptor) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for id in pipeline.node_ids() {
            *seen.entry(id).or_default() += 1;
        }

        let mut duplicates: Vec<String> = Vec::new();
        let mut nodes: Vec<CallNode> = Vec::new();
        for (class_name, m) in pipeline.nodes() {
            let id = node_id(class_name, &m.method);
            if seen.get(&id).copied().unwrap_or(0) > 1 {
                if !duplicates.contains(&id) {
                    duplicates.push(id);
                }
                continue;
            }
            nodes.push(CallNode {
                id,
                class_name: class_name.to_string(),
                method: m.method.clone(),
                inputs: m.inputs.clone(),
                references: Vec::new(),
                deps: Vec::new(),
            });
        }

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        for node in &mut nodes {
            let mut references: Vec<String> = Vec::new();
            for value in node.inputs.values() {
                if let Value::String(reference) = value {
                    if seen.contains_key(reference) && !references.contains(reference) {
                        references.push(reference.clone());
                    }
                }
            }
            node.deps = references.iter().filter_map(|r| index.get(r).copied()).collect();
            node.references = references;
        }

        Self { nodes, duplicates }
    }

    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &CallNode {
        &self.nodes[index]
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Kahn's algorithm over the runnable nodes. Whatever cannot be ordered
    /// is either on a cycle or downstream of one.
    pub fn plan(&self) -> ExecutionPlan {
        let n = self.nodes.len();
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|node| node.deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            for &dep in &node.deps {
                dependents[dep].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        let mut level = vec![0usize; n];
        for &i in &order {
            level[i] = self.nodes[i]
                .deps
                .iter()
                .map(|&d| level[d] + 1)
                .max()
                .unwrap_or(0);
        }
        let mut waves: Vec<Vec<usize>> = Vec::new();
        for &i in &order {
            if waves.len() <= level[i] {
                waves.resize_with(level[i] + 1, Vec::new);
            }
            waves[level[i]].push(i);
        }

        let ordered: BTreeSet<usize> = order.iter().copied().collect();
        let remaining: Vec<usize> = (0..n).filter(|i| !ordered.contains(i)).collect();
        let reach: HashMap<usize, BTreeSet<usize>> = remaining
            .iter()
            .map(|&i| (i, self.reachable(i, &ordered)))
            .collect();

        let mut cyclic = Vec::new();
        let mut blocked = Vec::new();
        for &i in &remaining {
            if reach[&i].contains(&i) {
                let members = remaining
                    .iter()
                    .filter(|&&j| reach[&i].contains(&j) && reach[&j].contains(&i))
                    .map(|&j| self.nodes[j].id.clone())
                    .collect();
                cyclic.push((i, members));
            } else {
                let blocker = self.nodes[i]
                    .deps
                    .iter()
                    .find(|d| !ordered.contains(d))
                    .map(|&d| self.nodes[d].id.clone())
                    .unwrap_or_default();
                blocked.push((i, blocker));
            }
        }

        ExecutionPlan {
            order,
            waves,
            cyclic,
            blocked,
        }
    }

    /// Nodes reachable from `start` by following dependencies, skipping
    /// nodes that were already ordered.
    fn reachable(&self, start: usize, ordered: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<usize> = self.nodes[start].deps.clone();
        while let Some(i) = stack.pop() {
            if ordered.contains(&i) || !visited.insert(i) {
                continue;
            }
            stack.extend(self.nodes[i].deps.iter().copied());
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline(value: Value) -> PipelineDescriptor {
        serde_json::from_value(value).unwrap()
    }

    fn ids(graph: &CallGraph, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| graph.node(i).id.clone()).collect()
    }

    #[test]
    fn test_dependency_runs_first() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]},
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": 1}}]}
        ]})));
        let plan = graph.plan();

        assert_eq!(ids(&graph, &plan.order), vec!["A.f", "B.g"]);
        assert_eq!(plan.waves.len(), 2);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn test_cycle_detected_and_independent_node_ordered() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": "B.g"}}]},
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]},
            {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 1}}]},
            {"class_name": "D", "methods": [{"method": "k", "inputs": {"x": "A.f"}}]}
        ]})));
        let plan = graph.plan();

        assert_eq!(ids(&graph, &plan.order), vec!["C.h"]);
        assert_eq!(plan.cyclic.len(), 2);
        for (_, members) in &plan.cyclic {
            assert_eq!(members, &vec!["A.f".to_string(), "B.g".to_string()]);
        }
        assert_eq!(plan.blocked.len(), 1);
        assert_eq!(graph.node(plan.blocked[0].0).id, "D.k");
        assert_eq!(plan.blocked[0].1, "A.f");
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": "A.f"}}]}
        ]})));
        let plan = graph.plan();

        assert!(plan.order.is_empty());
        assert_eq!(plan.cyclic, vec![(0, vec!["A.f".to_string()])]);
    }

    #[test]
    fn test_duplicates_excluded() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "A", "methods": [
                {"method": "f", "inputs": {}},
                {"method": "f", "inputs": {}}
            ]},
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]}
        ]})));

        assert_eq!(graph.duplicates(), ["A.f".to_string()]);
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.node(0).references, vec!["A.f"]);
        assert!(graph.node(0).deps.is_empty());
    }

    #[test]
    fn test_waves_group_independent_nodes() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "A", "methods": [
                {"method": "f", "inputs": {}},
                {"method": "g", "inputs": {}},
                {"method": "h", "inputs": {"x": "A.f", "y": "A.g"}}
            ]}
        ]})));
        let plan = graph.plan();

        assert_eq!(plan.waves, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_unknown_reference_is_literal() {
        let graph = CallGraph::build(&pipeline(json!({"classes": [
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": "hello.world"}}]}
        ]})));

        assert!(graph.node(0).references.is_empty());
        assert_eq!(graph.plan().order, vec![0]);
    }
}
