use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::snapshot::{EdgeRecord, NodeRecord, Snapshot};
use super::visibility::{collect_visible, default_roots};
use crate::util::stable_pair;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    References,
    ReferencedBy,
    Extends,
    BuildsUpon,
    Contradicts,
    Implements,
    Clarifies,
    Supersedes,
    #[default]
    Unspecified,
}

impl LinkKind {
    pub const ALL: [Self; 9] = [
        Self::References,
        Self::ReferencedBy,
        Self::Extends,
        Self::BuildsUpon,
        Self::Contradicts,
        Self::Implements,
        Self::Clarifies,
        Self::Supersedes,
        Self::Unspecified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::References => "references",
            Self::ReferencedBy => "referenced_by",
            Self::Extends => "extends",
            Self::BuildsUpon => "builds_upon",
            Self::Contradicts => "contradicts",
            Self::Implements => "implements",
            Self::Clarifies => "clarifies",
            Self::Supersedes => "supersedes",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LinkKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == value)
            .ok_or_else(|| format!("unknown link kind `{value}`"))
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum GraphError {
    #[error("duplicate node id `{id}`")]
    DuplicateNode { id: String },
    #[error("edge #{index} ({from} -> {to}) references unknown node `{missing}`")]
    DanglingEdge {
        index: usize,
        from: String,
        to: String,
        missing: String,
    },
    #[error("edge #{index} has strength {strength}, expected a value in (0, 1]")]
    InvalidStrength { index: usize, strength: f64 },
    #[error("root `{id}` is not a node of the graph")]
    UnknownRoot { id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub category: String,
    pub importance: u8,
    pub weight: f64,
    pub position: DVec2,
    pub velocity: DVec2,
    pub expanded: bool,
    pub pinned: bool,
}

impl Node {
    const MAX_IMPORTANCE: u8 = 10;

    fn from_record(record: NodeRecord) -> Self {
        let importance = record.importance.min(Self::MAX_IMPORTANCE);
        let label = if record.label.trim().is_empty() {
            record.id.clone()
        } else {
            record.label
        };
        let (jx, jy) = stable_pair(&record.id);

        Self {
            label,
            category: record.category,
            importance,
            weight: 1.0 + f64::from(importance) / f64::from(Self::MAX_IMPORTANCE),
            position: DVec2::new(jx, jy),
            velocity: DVec2::ZERO,
            expanded: true,
            pinned: false,
            id: record.id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub kind: LinkKind,
    pub strength: f64,
    pub bidirectional: bool,
}

impl Edge {
    /// Endpoint reached when the edge is followed out of `from`.
    pub fn follow_from(&self, from: usize) -> Option<usize> {
        if from == self.source {
            Some(self.target)
        } else if self.bidirectional && from == self.target {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

/// Nodes reachable from the roots through expanded nodes, ordered by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleSet {
    nodes: Vec<usize>,
    mask: Vec<bool>,
    edges: Vec<usize>,
}

impl VisibleSet {
    pub(super) fn new(nodes: Vec<usize>, mask: Vec<bool>, edges: Vec<usize>) -> Self {
        Self { nodes, mask, edges }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn edges(&self) -> &[usize] {
        &self.edges
    }

    pub fn contains(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn position(&self, index: usize) -> Option<usize> {
        self.nodes.iter().position(|&candidate| candidate == index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index_by_id: HashMap<String, usize>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<usize>>,
    roots: Vec<usize>,
    explicit_roots: bool,
    visible: VisibleSet,
}

impl Graph {
    /// Builds a graph from a snapshot. Either the whole snapshot is accepted
    /// or an error describes the first offending record.
    pub fn load(snapshot: Snapshot) -> Result<Self, GraphError> {
        let Snapshot {
            roots,
            nodes,
            edges,
        } = snapshot;

        let mut graph = Self::default();
        graph.nodes.reserve(nodes.len());
        for record in nodes {
            graph.push_node(record)?;
        }

        graph.edges.reserve(edges.len());
        for (index, record) in edges.into_iter().enumerate() {
            let edge = graph.resolve_edge(index, record)?;
            graph.edges.push(edge);
        }
        graph.rebuild_adjacency();

        if roots.is_empty() {
            graph.roots = default_roots(&graph.nodes, &graph.edges, &graph.adjacency);
        } else {
            let mut resolved = Vec::with_capacity(roots.len());
            for id in roots {
                let Some(&index) = graph.index_by_id.get(&id) else {
                    return Err(GraphError::UnknownRoot { id });
                };
                if !resolved.contains(&index) {
                    resolved.push(index);
                }
            }
            graph.roots = resolved;
            graph.explicit_roots = true;
        }
        graph.refresh_visible();

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            roots = graph.roots.len(),
            visible = graph.visible.len(),
            "graph loaded"
        );
        Ok(graph)
    }

    pub fn insert_node(&mut self, record: NodeRecord) -> Result<usize, GraphError> {
        let index = self.push_node(record)?;
        self.adjacency.push(Vec::new());
        self.refresh_roots();
        self.refresh_visible();
        Ok(index)
    }

    pub fn insert_edge(&mut self, record: EdgeRecord) -> Result<usize, GraphError> {
        let index = self.edges.len();
        let edge = self.resolve_edge(index, record)?;
        self.edges.push(edge);
        self.rebuild_adjacency();
        self.refresh_roots();
        self.refresh_visible();
        Ok(index)
    }

    fn push_node(&mut self, record: NodeRecord) -> Result<usize, GraphError> {
        if self.index_by_id.contains_key(&record.id) {
            return Err(GraphError::DuplicateNode { id: record.id });
        }

        let index = self.nodes.len();
        self.index_by_id.insert(record.id.clone(), index);
        self.nodes.push(Node::from_record(record));
        Ok(index)
    }

    fn resolve_edge(&self, index: usize, record: EdgeRecord) -> Result<Edge, GraphError> {
        let source = self.index_by_id.get(&record.source).copied();
        let target = self.index_by_id.get(&record.target).copied();

        let (Some(source), Some(target)) = (source, target) else {
            let missing = if source.is_none() {
                record.source.clone()
            } else {
                record.target.clone()
            };
            return Err(GraphError::DanglingEdge {
                index,
                from: record.source,
                to: record.target,
                missing,
            });
        };

        if !(record.strength > 0.0 && record.strength <= 1.0) {
            return Err(GraphError::InvalidStrength {
                index,
                strength: record.strength,
            });
        }

        Ok(Edge {
            source,
            target,
            kind: record.kind,
            strength: record.strength,
            bidirectional: record.bidirectional,
        })
    }

    fn rebuild_adjacency(&mut self) {
        self.adjacency.clear();
        self.adjacency.resize(self.nodes.len(), Vec::new());
        for (index, edge) in self.edges.iter().enumerate() {
            self.adjacency[edge.source].push(index);
            if edge.target != edge.source {
                self.adjacency[edge.target].push(index);
            }
        }
    }

    fn refresh_roots(&mut self) {
        if !self.explicit_roots {
            self.roots = default_roots(&self.nodes, &self.edges, &self.adjacency);
        }
    }

    fn refresh_visible(&mut self) {
        self.visible = collect_visible(&self.nodes, &self.edges, &self.adjacency, &self.roots);
    }

    /// Flips `expanded` on a branch node. Unknown ids and leaves are ignored.
    pub fn toggle_expand(&mut self, id: &str) -> &VisibleSet {
        if let Some(index) = self.index_of(id)
            && self.has_children(index)
        {
            self.nodes[index].expanded = !self.nodes[index].expanded;
            self.refresh_visible();
        }
        &self.visible
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !self.has_children(index) || self.nodes[index].expanded == expanded {
            return false;
        }

        self.nodes[index].expanded = expanded;
        self.refresh_visible();
        true
    }

    pub fn pin(&mut self, id: &str) -> bool {
        self.set_pinned(id, true)
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        self.set_pinned(id, false)
    }

    fn set_pinned(&mut self, id: &str, pinned: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        if node.pinned == pinned {
            return false;
        }

        node.pinned = pinned;
        node.velocity = DVec2::ZERO;
        true
    }

    /// Moves a node and clears its velocity.
    pub fn place(&mut self, id: &str, position: DVec2) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.position = position;
        node.velocity = DVec2::ZERO;
        true
    }

    /// True when following an edge out of the node reaches another node.
    pub fn has_children(&self, index: usize) -> bool {
        self.adjacency.get(index).is_some_and(|incident| {
            incident.iter().any(|&edge_index| {
                self.edges[edge_index]
                    .follow_from(index)
                    .is_some_and(|next| next != index)
            })
        })
    }

    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.visible.nodes.iter().map(|&index| &self.nodes[index])
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.visible.edges.iter().map(|&index| &self.edges[index])
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible_nodes().map(|node| node.id.as_str()).collect()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_from(&self, id: &str) -> Vec<&Edge> {
        self.incident(id, |edge, index| edge.source == index)
    }

    pub fn edges_to(&self, id: &str) -> Vec<&Edge> {
        self.incident(id, |edge, index| edge.target == index)
    }

    fn incident(&self, id: &str, keep: impl Fn(&Edge, usize) -> bool) -> Vec<&Edge> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        self.adjacency[index]
            .iter()
            .map(|&edge_index| &self.edges[edge_index])
            .filter(|edge| keep(edge, index))
            .collect()
    }

    pub fn degree(&self, index: usize) -> usize {
        self.adjacency.get(index).map_or(0, Vec::len)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Split borrow used by the physics step: mutable kinematics, read-only
    /// structure.
    pub(crate) fn kinematics_mut(&mut self) -> (&mut [Node], &[Edge], &VisibleSet) {
        (&mut self.nodes, &self.edges, &self.visible)
    }
}
