mod graph;
mod snapshot;
mod visibility;

pub use graph::{Edge, Graph, GraphError, LinkKind, Node, VisibleSet};
pub use snapshot::{EdgeRecord, MemoryLink, MemoryNote, NodeRecord, Snapshot};
