use std::collections::HashMap;

use super::model::Pipeline;

/// An edge whose endpoints both resolved to known nodes. Duplicates are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub source: usize,
    pub target: usize,
}

/// Index-based adjacency view of a pipeline snapshot.
///
/// Node slots follow first-appearance order of each id; when an id repeats,
/// the later node's data wins (`node_slot` points at the last occurrence).
/// Edges naming unknown ids are dropped here and never reach layout or
/// highlighting.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
    pub ids: Vec<String>,
    pub index_by_id: HashMap<String, usize>,
    pub node_slot: Vec<usize>,
    pub parents: Vec<Vec<usize>>,
    pub edges: Vec<ResolvedEdge>,
    pub dropped_edges: usize,
}

impl GraphModel {
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut ids = Vec::with_capacity(pipeline.nodes.len());
        let mut index_by_id = HashMap::with_capacity(pipeline.nodes.len());
        let mut node_slot = Vec::with_capacity(pipeline.nodes.len());

        for (slot, node) in pipeline.nodes.iter().enumerate() {
            match index_by_id.get(&node.id) {
                Some(&index) => node_slot[index] = slot,
                None => {
                    index_by_id.insert(node.id.clone(), ids.len());
                    ids.push(node.id.clone());
                    node_slot.push(slot);
                }
            }
        }

        let mut parents = vec![Vec::new(); ids.len()];
        let mut edges = Vec::with_capacity(pipeline.edges.len());
        let mut dropped_edges = 0usize;

        for edge in &pipeline.edges {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(&edge.source),
                index_by_id.get(&edge.target),
            ) else {
                dropped_edges += 1;
                continue;
            };

            parents[target].push(source);
            edges.push(ResolvedEdge { source, target });
        }

        if dropped_edges > 0 {
            tracing::debug!(dropped_edges, "ignoring edges that reference unknown jobs");
        }

        Self {
            ids,
            index_by_id,
            node_slot,
            parents,
            edges,
            dropped_edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::{Edge, JobKind, JobStatus, Node};

    fn node(id: &str) -> Node {
        Node {
            id: id.to_owned(),
            kind: JobKind::Import,
            status: JobStatus::Finished,
            timestamp: None,
            binfactor: None,
            alias: None,
            has_results: false,
            has_3d: false,
            resolution: None,
        }
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.to_owned(),
            target: target.to_owned(),
        }
    }

    #[test]
    fn builds_parent_lists() {
        let pipeline = Pipeline {
            project_dir: String::new(),
            nodes: vec![node("A"), node("B"), node("C")],
            edges: vec![edge("A", "B"), edge("A", "C"), edge("B", "C")],
        };
        let graph = GraphModel::from_pipeline(&pipeline);

        assert_eq!(graph.parents[1], vec![0]);
        assert_eq!(graph.parents[2], vec![0, 1]);
        assert!(graph.parents[0].is_empty());
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let pipeline = Pipeline {
            project_dir: String::new(),
            nodes: vec![node("A"), node("B")],
            edges: vec![edge("A", "B"), edge("A", "ghost"), edge("ghost", "B")],
        };
        let graph = GraphModel::from_pipeline(&pipeline);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.dropped_edges, 2);
        assert_eq!(graph.edges[0], ResolvedEdge { source: 0, target: 1 });
    }

    #[test]
    fn duplicate_edges_are_kept() {
        let pipeline = Pipeline {
            project_dir: String::new(),
            nodes: vec![node("A"), node("B")],
            edges: vec![edge("A", "B"), edge("A", "B")],
        };
        let graph = GraphModel::from_pipeline(&pipeline);

        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.parents[1], vec![0, 0]);
    }

    #[test]
    fn repeated_ids_share_one_slot_pointing_at_last_node() {
        let pipeline = Pipeline {
            project_dir: String::new(),
            nodes: vec![node("A"), node("B"), node("A")],
            edges: Vec::new(),
        };
        let graph = GraphModel::from_pipeline(&pipeline);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.index_of("A"), Some(0));
        assert_eq!(graph.node_slot[0], 2);
    }
}
