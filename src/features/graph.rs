//! Feature dependency graph checks.

use std::collections::HashMap;

/// Find a dependency cycle using Kahn's algorithm.
///
/// `nodes` pairs each feature name with its dependency names; dependencies
/// that name no node are ignored. Returns the names along one cycle, first
/// name repeated at the end, or `None` if the graph is acyclic.
pub fn find_cycle(nodes: &[(&str, &[String])]) -> Option<Vec<String>> {
    let name_to_idx: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (*name, i))
        .collect();

    let edges: Vec<Vec<usize>> = nodes
        .iter()
        .map(|(_, deps)| {
            deps.iter()
                .filter_map(|d| name_to_idx.get(d.as_str()).copied())
                .collect()
        })
        .collect();

    let mut in_degree: Vec<usize> = edges.iter().map(Vec::len).collect();

    let mut reverse_deps: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, deps) in edges.iter().enumerate() {
        for &dep_idx in deps {
            if let Some(rd) = reverse_deps.get_mut(dep_idx) {
                rd.push(i);
            }
        }
    }

    let mut queue: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();

    while let Some(idx) = queue.pop() {
        if let Some(dependents) = reverse_deps.get(idx) {
            for &dep in dependents {
                if let Some(count) = in_degree.get_mut(dep) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(dep);
                    }
                }
            }
        }
    }

    // Every unprocessed node still has an unprocessed dependency, so walking
    // those edges from any of them must revisit a node.
    let start = in_degree.iter().position(|&d| d > 0)?;
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = edges
            .get(current)?
            .iter()
            .copied()
            .find(|&d| in_degree.get(d).is_some_and(|&n| n > 0))?;
        if let Some(pos) = path.iter().position(|&p| p == next) {
            let mut cycle: Vec<String> = path
                .get(pos..)?
                .iter()
                .filter_map(|&i| nodes.get(i).map(|(name, _)| (*name).to_string()))
                .collect();
            cycle.push(cycle.first()?.clone());
            return Some(cycle);
        }
        path.push(next);
        current = next;
    }
}
