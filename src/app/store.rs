use crate::config::LayoutConfig;
use crate::layout::{DagLayout, layered_layout};
use crate::live::LiveMessage;
use crate::pipeline::{ApiError, GraphModel, Node, Pipeline};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotChange {
    Unchanged,
    Replaced,
    NewProject,
}

/// Owner of the pipeline snapshot and everything derived from it.
///
/// Fetches are sequenced; a reply only lands if it is newer than the last one
/// applied, so a slow early fetch cannot overwrite a later snapshot.
pub struct PipelineStore {
    layout_config: LayoutConfig,
    snapshot: Option<Pipeline>,
    graph: GraphModel,
    layout: DagLayout,
    error: Option<String>,
    issued_seq: u64,
    applied_seq: u64,
    revision: u64,
}

impl PipelineStore {
    pub fn new(layout_config: LayoutConfig) -> Self {
        Self {
            layout_config,
            snapshot: None,
            graph: GraphModel::default(),
            layout: DagLayout::default(),
            error: None,
            issued_seq: 0,
            applied_seq: 0,
            revision: 0,
        }
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.snapshot.as_ref()
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn layout(&self) -> &DagLayout {
        &self.layout
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[cfg(test)]
    pub fn fetches_issued(&self) -> u64 {
        self.issued_seq
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.snapshot.as_ref()?.node(id)
    }

    pub fn begin_fetch(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    pub fn on_live_message(&mut self, message: &LiveMessage) -> Option<u64> {
        if !message.wants_refresh() {
            return None;
        }
        tracing::debug!(kind = message.kind(), "live event invalidated the pipeline");
        Some(self.begin_fetch())
    }

    pub fn apply_fetch(&mut self, seq: u64, result: Result<Pipeline, ApiError>) -> SnapshotChange {
        if seq <= self.applied_seq {
            tracing::debug!(seq, applied = self.applied_seq, "discarding stale pipeline snapshot");
            return SnapshotChange::Unchanged;
        }

        let pipeline = match result {
            Ok(pipeline) => pipeline,
            Err(error) => {
                tracing::warn!(seq, %error, "pipeline fetch failed");
                self.error = Some(error.to_string());
                return SnapshotChange::Unchanged;
            }
        };

        self.applied_seq = seq;
        self.error = None;

        let change = match &self.snapshot {
            Some(previous) if previous.project_dir == pipeline.project_dir => {
                SnapshotChange::Replaced
            }
            _ => SnapshotChange::NewProject,
        };

        self.graph = GraphModel::from_pipeline(&pipeline);
        self.layout = layered_layout(&self.graph, &self.layout_config);
        self.snapshot = Some(pipeline);
        self.revision = self.revision.wrapping_add(1);

        tracing::info!(
            seq,
            revision = self.revision,
            nodes = self.graph.node_count(),
            edges = self.graph.edges.len(),
            dropped_edges = self.graph.dropped_edges,
            "pipeline snapshot applied"
        );
        change
    }
}
