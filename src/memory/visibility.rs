use std::collections::VecDeque;

use super::graph::{Edge, Node, VisibleSet};

fn flood(
    seeds: &[usize],
    edges: &[Edge],
    adjacency: &[Vec<usize>],
    can_expand: impl Fn(usize) -> bool,
    reached: &mut [bool],
) {
    let mut queue = VecDeque::new();
    for &seed in seeds {
        if !reached[seed] {
            reached[seed] = true;
            queue.push_back(seed);
        }
    }

    while let Some(current) = queue.pop_front() {
        if !can_expand(current) {
            continue;
        }

        for &edge_index in &adjacency[current] {
            if let Some(next) = edges[edge_index].follow_from(current)
                && !reached[next]
            {
                reached[next] = true;
                queue.push_back(next);
            }
        }
    }
}

fn sorted_by_id(nodes: &[Node], indices: &mut [usize]) {
    indices.sort_by(|a, b| nodes[*a].id.cmp(&nodes[*b].id));
}

/// Nodes without an incoming directed edge, plus the smallest id of every
/// component those cannot reach. Expansion flags are ignored.
pub(super) fn default_roots(nodes: &[Node], edges: &[Edge], adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut has_incoming = vec![false; nodes.len()];
    for edge in edges {
        if !edge.bidirectional && edge.source != edge.target {
            has_incoming[edge.target] = true;
        }
    }

    let mut roots = (0..nodes.len())
        .filter(|&index| !has_incoming[index])
        .collect::<Vec<_>>();

    let mut reached = vec![false; nodes.len()];
    flood(&roots, edges, adjacency, |_| true, &mut reached);

    let mut order = (0..nodes.len()).collect::<Vec<_>>();
    sorted_by_id(nodes, &mut order);
    for index in order {
        if reached[index] {
            continue;
        }
        roots.push(index);
        flood(&[index], edges, adjacency, |_| true, &mut reached);
    }

    sorted_by_id(nodes, &mut roots);
    roots
}

pub(super) fn collect_visible(
    nodes: &[Node],
    edges: &[Edge],
    adjacency: &[Vec<usize>],
    roots: &[usize],
) -> VisibleSet {
    let mut mask = vec![false; nodes.len()];
    flood(roots, edges, adjacency, |index| nodes[index].expanded, &mut mask);

    let mut visible_nodes = (0..nodes.len())
        .filter(|&index| mask[index])
        .collect::<Vec<_>>();
    sorted_by_id(nodes, &mut visible_nodes);

    let visible_edges = edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| mask[edge.source] && mask[edge.target])
        .map(|(index, _)| index)
        .collect();

    VisibleSet::new(visible_nodes, mask, visible_edges)
}
