//! Cycle detection and deterministic topological ordering over the
//! requires-only subgraph.
//!
//! Exposed beyond this crate so `modlink-link`'s plugin pipeline can reuse
//! the same ordering primitive for its category-then-registration sort.

use crate::error::{Error, Result};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;
use std::hash::Hash;

/// Runs a DFS over `edges` rooted at each of `order` in turn, tracking the
/// current path; a back edge into that path is a cycle (spec §4.3 step 3).
///
/// # Errors
///
/// Returns [`Error::Cycle`] naming the cycle in encounter order, closing
/// back on its first element.
pub fn detect_cycle(order: &[String], edges: &std::collections::BTreeMap<String, BTreeSet<String>>) -> Result<()> {
    let mut visited: AHashSet<String> = AHashSet::default();
    let mut on_path: Vec<String> = Vec::new();
    let mut on_path_set: AHashSet<String> = AHashSet::default();

    for start in order {
        if visited.contains(start) {
            continue;
        }
        visit(start, edges, &mut visited, &mut on_path, &mut on_path_set)?;
    }
    Ok(())
}

fn visit(
    node: &str,
    edges: &std::collections::BTreeMap<String, BTreeSet<String>>,
    visited: &mut AHashSet<String>,
    on_path: &mut Vec<String>,
    on_path_set: &mut AHashSet<String>,
) -> Result<()> {
    on_path.push(node.to_string());
    on_path_set.insert(node.to_string());

    if let Some(targets) = edges.get(node) {
        for target in targets {
            if on_path_set.contains(target) {
                let start = on_path
                    .iter()
                    .position(|n| n == target)
                    .unwrap_or(0);
                let mut cycle: Vec<String> = on_path[start..].to_vec();
                cycle.push(target.clone());
                return Err(Error::Cycle { path: cycle });
            }
            if !visited.contains(target) {
                visit(target, edges, visited, on_path, on_path_set)?;
            }
        }
    }

    on_path.pop();
    on_path_set.remove(node);
    visited.insert(node.to_string());
    Ok(())
}

/// Orders `nodes` so that every node appears after everything `edges`
/// names as its dependency (Kahn's algorithm), breaking ties by the input
/// order for determinism.
///
/// # Errors
///
/// Returns [`Error::Cycle`] if `edges` is not a DAG over `nodes`.
pub fn topo_sort<T>(nodes: &[T], edges: impl Fn(&T) -> Vec<T>) -> Result<Vec<T>>
where
    T: Clone + Eq + Hash + ToString,
{
    let mut in_degree: AHashMap<T, usize> = AHashMap::default();
    let mut dependents: AHashMap<T, Vec<T>> = AHashMap::default();
    for node in nodes {
        in_degree.entry(node.clone()).or_insert(0);
    }
    for node in nodes {
        for dep in edges(node) {
            *in_degree.entry(node.clone()).or_insert(0) += 1;
            dependents.entry(dep).or_default().push(node.clone());
        }
    }

    let mut ready: Vec<T> = nodes
        .iter()
        .filter(|n| in_degree.get(*n).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();
    let mut result = Vec::with_capacity(nodes.len());

    while !ready.is_empty() {
        ready.sort_by_key(ToString::to_string);
        let node = ready.remove(0);
        result.push(node.clone());
        if let Some(deps) = dependents.get(&node) {
            for dependent in deps {
                if let Some(count) = in_degree.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(dependent.clone());
                    }
                }
            }
        }
    }

    if result.len() != nodes.len() {
        let remaining: Vec<String> = nodes
            .iter()
            .filter(|n| !result.contains(n))
            .map(ToString::to_string)
            .collect();
        return Err(Error::Cycle { path: remaining });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn detects_no_cycle_in_dag() {
        let mut edges = BTreeMap::new();
        edges.insert("a".to_string(), BTreeSet::from(["b".to_string()]));
        edges.insert("b".to_string(), BTreeSet::new());
        let order = vec!["a".to_string(), "b".to_string()];
        assert!(detect_cycle(&order, &edges).is_ok());
    }

    #[test]
    fn detects_direct_cycle() {
        let mut edges = BTreeMap::new();
        edges.insert("a".to_string(), BTreeSet::from(["b".to_string()]));
        edges.insert("b".to_string(), BTreeSet::from(["a".to_string()]));
        let order = vec!["a".to_string(), "b".to_string()];
        let result = detect_cycle(&order, &edges);
        assert!(matches!(result, Err(Error::Cycle { .. })));
    }

    #[test]
    fn topo_sort_orders_dependencies_first() {
        let nodes = vec!["c", "b", "a"];
        let sorted = topo_sort(&nodes, |n| match *n {
            "b" => vec!["a"],
            "c" => vec!["b"],
            _ => vec![],
        })
        .expect("sorts");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn topo_sort_rejects_cycle() {
        let nodes = vec!["a", "b"];
        let result = topo_sort(&nodes, |n| match *n {
            "a" => vec!["b"],
            "b" => vec!["a"],
            _ => vec![],
        });
        assert!(result.is_err());
    }
}
