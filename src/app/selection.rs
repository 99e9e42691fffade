use std::collections::HashSet;

use crate::pipeline::GraphModel;

/// The selected job id and the edges touching it.
///
/// The selection is kept across snapshot refreshes even when the id has
/// disappeared; it only changes when the user picks something else.
#[derive(Debug, Default)]
pub struct SelectionController {
    selected: Option<String>,
    highlighted_edges: HashSet<usize>,
}

impl SelectionController {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_current(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    pub fn select(&mut self, id: Option<String>, graph: &GraphModel) -> bool {
        if self.selected == id {
            return false;
        }
        self.selected = id;
        self.refresh_edges(graph);
        tracing::debug!(
            selected = ?self.selected,
            edges = self.highlighted_count(),
            "selection changed"
        );
        true
    }

    pub fn refresh_edges(&mut self, graph: &GraphModel) {
        self.highlighted_edges.clear();
        let Some(index) = self.selected.as_deref().and_then(|id| graph.index_of(id)) else {
            return;
        };
        self.highlighted_edges.extend(
            graph
                .edges
                .iter()
                .enumerate()
                .filter(|(_, edge)| edge.source == index || edge.target == index)
                .map(|(position, _)| position),
        );
    }

    pub fn is_edge_highlighted(&self, position: usize) -> bool {
        self.highlighted_edges.contains(&position)
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted_edges.len()
    }

    pub fn dangling(&self, graph: &GraphModel) -> Option<&str> {
        self.selected
            .as_deref()
            .filter(|id| graph.index_of(id).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Edge, JobKind, JobStatus, Node, Pipeline};

    fn pipeline(ids: &[&str], edges: &[(&str, &str)]) -> GraphModel {
        let pipeline = Pipeline {
            project_dir: String::new(),
            nodes: ids
                .iter()
                .map(|id| Node {
                    id: (*id).to_owned(),
                    kind: JobKind::Class2D,
                    status: JobStatus::Finished,
                    timestamp: None,
                    binfactor: None,
                    alias: None,
                    has_results: false,
                    has_3d: false,
                    resolution: None,
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(source, target)| Edge {
                    source: (*source).to_owned(),
                    target: (*target).to_owned(),
                })
                .collect(),
        };
        GraphModel::from_pipeline(&pipeline)
    }

    #[test]
    fn highlights_incoming_and_outgoing_edges() {
        let graph = pipeline(&["A", "B", "C", "D"], &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let mut selection = SelectionController::default();

        assert!(selection.select(Some("B".to_owned()), &graph));
        assert_eq!(selection.highlighted_count(), 2);
        assert!(selection.is_edge_highlighted(0));
        assert!(selection.is_edge_highlighted(2));
        assert!(!selection.is_edge_highlighted(1));
    }

    #[test]
    fn reselecting_same_id_is_not_a_change() {
        let graph = pipeline(&["A"], &[]);
        let mut selection = SelectionController::default();
        assert!(selection.select(Some("A".to_owned()), &graph));
        assert!(!selection.select(Some("A".to_owned()), &graph));
        assert!(selection.select(None, &graph));
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn vanished_selection_is_kept_but_has_no_edges() {
        let before = pipeline(&["A", "B"], &[("A", "B")]);
        let after = pipeline(&["A"], &[]);
        let mut selection = SelectionController::default();
        selection.select(Some("B".to_owned()), &before);
        assert_eq!(selection.highlighted_count(), 1);

        selection.refresh_edges(&after);
        assert!(selection.is_current("B"));
        assert_eq!(selection.highlighted_count(), 0);
        assert_eq!(selection.dangling(&after), Some("B"));
        assert_eq!(selection.dangling(&before), None);
    }

    #[test]
    fn refresh_picks_up_new_edges() {
        let before = pipeline(&["A", "B"], &[]);
        let after = pipeline(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let mut selection = SelectionController::default();
        selection.select(Some("B".to_owned()), &before);
        assert_eq!(selection.highlighted_count(), 0);

        selection.refresh_edges(&after);
        assert_eq!(selection.highlighted_count(), 2);
    }
}
