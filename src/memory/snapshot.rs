use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::graph::LinkKind;

fn default_importance() -> u8 {
    5
}

fn default_strength() -> f64 {
    1.0
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_importance")]
    pub importance: u8,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: String::new(),
            importance: default_importance(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: LinkKind,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub bidirectional: bool,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            strength: default_strength(),
            bidirectional: false,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

/// A memory as listed by the store, with its outgoing links inline.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MemoryNote {
    pub id: String,
    #[serde(default, alias = "summary")]
    pub content: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(default)]
    pub links: Vec<MemoryLink>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MemoryLink {
    pub target_id: String,
    #[serde(default, alias = "link_type")]
    pub kind: LinkKind,
    #[serde(default = "default_strength")]
    pub strength: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Memories(Vec<MemoryNote>),
    Graph(Snapshot),
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: SnapshotFile =
            serde_json::from_str(raw).context("invalid graph snapshot JSON")?;
        match parsed {
            SnapshotFile::Graph(snapshot) => Ok(snapshot),
            SnapshotFile::Memories(memories) if memories.is_empty() => {
                Err(anyhow!("no memories to visualize"))
            }
            SnapshotFile::Memories(memories) => Ok(Self::from_memories(memories)),
        }
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    pub fn read_from(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .context("failed to read snapshot input")?;
        Self::from_json(&raw)
    }

    /// Flattens a memory list into a snapshot. Links whose target is not part
    /// of the list are dropped, since the list is a partial view of the store.
    pub fn from_memories(memories: Vec<MemoryNote>) -> Self {
        let known = memories
            .iter()
            .map(|memory| memory.id.clone())
            .collect::<HashSet<_>>();

        let mut nodes = Vec::with_capacity(memories.len());
        let mut edges = Vec::new();
        for memory in memories {
            for link in &memory.links {
                if !known.contains(&link.target_id) {
                    continue;
                }
                edges.push(
                    EdgeRecord::new(memory.id.clone(), link.target_id.clone(), link.kind)
                        .with_strength(link.strength),
                );
            }

            let label = memory.content.lines().next().unwrap_or_default().to_owned();
            nodes.push(
                NodeRecord::new(memory.id, label)
                    .with_category(memory.namespace)
                    .with_importance(memory.importance),
            );
        }

        Self {
            roots: Vec::new(),
            nodes,
            edges,
        }
    }

    pub fn demo() -> Self {
        const TOPICS: [(&str, &str); 24] = [
            ("arch", "Architecture overview"),
            ("storage", "Storage engine"),
            ("wal", "Write-ahead log"),
            ("compaction", "Compaction policy"),
            ("index", "Secondary indexes"),
            ("query", "Query planner"),
            ("cost", "Cost model"),
            ("cache", "Plan cache"),
            ("net", "Network layer"),
            ("rpc", "RPC framing"),
            ("auth", "Token auth"),
            ("tls", "TLS rollout"),
            ("ops", "Operations runbook"),
            ("backup", "Backup schedule"),
            ("restore", "Restore drill"),
            ("alerts", "Alert thresholds"),
            ("bug-241", "Bug: stale reads"),
            ("bug-305", "Bug: leaked handles"),
            ("adr-7", "ADR 7: async IO"),
            ("adr-9", "ADR 9: drop mmap"),
            ("perf", "Perf notes"),
            ("bench", "Benchmark harness"),
            ("ideas", "Open ideas"),
            ("glossary", "Glossary"),
        ];
        const TREE: [(&str, &str, LinkKind); 21] = [
            ("arch", "storage", LinkKind::References),
            ("arch", "query", LinkKind::References),
            ("arch", "net", LinkKind::References),
            ("arch", "ops", LinkKind::References),
            ("storage", "wal", LinkKind::Extends),
            ("storage", "compaction", LinkKind::Extends),
            ("storage", "index", LinkKind::Extends),
            ("query", "cost", LinkKind::BuildsUpon),
            ("query", "cache", LinkKind::BuildsUpon),
            ("net", "rpc", LinkKind::Implements),
            ("net", "auth", LinkKind::Implements),
            ("auth", "tls", LinkKind::Extends),
            ("ops", "backup", LinkKind::References),
            ("ops", "alerts", LinkKind::References),
            ("backup", "restore", LinkKind::BuildsUpon),
            ("wal", "bug-241", LinkKind::Clarifies),
            ("rpc", "bug-305", LinkKind::Clarifies),
            ("arch", "adr-7", LinkKind::References),
            ("adr-7", "adr-9", LinkKind::Supersedes),
            ("perf", "bench", LinkKind::BuildsUpon),
            ("ideas", "glossary", LinkKind::References),
        ];
        const CROSS: [(&str, &str, LinkKind, f64); 6] = [
            ("adr-9", "storage", LinkKind::Contradicts, 0.6),
            ("cost", "perf", LinkKind::References, 0.5),
            ("compaction", "perf", LinkKind::References, 0.4),
            ("bug-241", "cache", LinkKind::Contradicts, 0.7),
            ("alerts", "bench", LinkKind::Clarifies, 0.3),
            ("glossary", "arch", LinkKind::References, 0.2),
        ];
        const CATEGORIES: [&str; 4] = ["design", "ops", "bugs", "notes"];

        let nodes = TOPICS
            .iter()
            .enumerate()
            .map(|(index, (id, label))| {
                let category = if id.starts_with("bug") {
                    "bugs"
                } else {
                    CATEGORIES[index % CATEGORIES.len()]
                };
                NodeRecord::new(*id, *label)
                    .with_category(category)
                    .with_importance((10 - (index % 8)) as u8)
            })
            .collect();

        let edges = TREE
            .iter()
            .map(|(source, target, kind)| EdgeRecord::new(*source, *target, *kind))
            .chain(CROSS.iter().map(|(source, target, kind, strength)| {
                EdgeRecord::new(*source, *target, *kind)
                    .with_strength(*strength)
                    .bidirectional()
            }))
            .collect();

        Self {
            roots: vec!["arch".into(), "perf".into(), "ideas".into()],
            nodes,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Graph;

    #[test]
    fn graph_snapshot_fields_have_defaults() {
        let snapshot = Snapshot::from_json(
            r#"{
                "nodes": [{"id": "a"}, {"id": "b", "label": "Bee", "category": "x", "importance": 9}],
                "edges": [{"source": "a", "target": "b"}]
            }"#,
        )
        .unwrap();

        assert!(snapshot.roots.is_empty());
        assert_eq!(snapshot.nodes[0], NodeRecord::new("a", ""));
        assert_eq!(snapshot.nodes[1].importance, 9);
        assert_eq!(
            snapshot.edges[0],
            EdgeRecord::new("a", "b", LinkKind::Unspecified)
        );
    }

    #[test]
    fn link_kinds_use_snake_case() {
        let snapshot = Snapshot::from_json(
            r#"{"nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [{"source": "a", "target": "b", "kind": "builds_upon", "strength": 0.25, "bidirectional": true}]}"#,
        )
        .unwrap();
        let edge = &snapshot.edges[0];
        assert_eq!(edge.kind, LinkKind::BuildsUpon);
        assert_eq!(edge.strength, 0.25);
        assert!(edge.bidirectional);
    }

    #[test]
    fn memory_lists_drop_links_outside_the_list() {
        let snapshot = Snapshot::from_json(
            r#"[
                {"id": "m1", "content": "First line\nmore", "namespace": "project:x",
                 "links": [{"target_id": "m2", "link_type": "extends", "strength": 0.5},
                           {"target_id": "elsewhere"}]},
                {"id": "m2", "summary": "Second"}
            ]"#,
        )
        .unwrap();

        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].label, "First line");
        assert_eq!(snapshot.nodes[0].category, "project:x");
        assert_eq!(snapshot.nodes[1].label, "Second");
        assert_eq!(
            snapshot.edges,
            vec![EdgeRecord::new("m1", "m2", LinkKind::Extends).with_strength(0.5)]
        );
    }

    #[test]
    fn empty_memory_list_is_an_error() {
        let error = Snapshot::from_json("[]").unwrap_err();
        assert!(error.to_string().contains("no memories"));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(Snapshot::from_json("{not json").is_err());
        assert!(Snapshot::read_from("".as_bytes()).is_err());
    }

    #[test]
    fn demo_snapshot_loads() {
        let graph = Graph::load(Snapshot::demo()).expect("demo graph is well formed");
        assert_eq!(graph.node_count(), 24);
        assert_eq!(graph.visible().len(), 24);
    }
}
