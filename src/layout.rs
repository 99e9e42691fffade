use std::collections::BTreeMap;

use eframe::egui::{Rect, Vec2, pos2, vec2};

use crate::config::LayoutConfig;
use crate::pipeline::GraphModel;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DagLayout {
    pub positions: Vec<Vec2>,
    pub columns: Vec<usize>,
}

impl DagLayout {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[cfg(test)]
    pub fn position_of(&self, graph: &GraphModel, id: &str) -> Option<Vec2> {
        graph
            .index_of(id)
            .and_then(|index| self.positions.get(index).copied())
    }

    pub fn origin_bounds(&self) -> Option<Rect> {
        let first = *self.positions.first()?;
        let mut bounds = Rect::from_min_max(first.to_pos2(), first.to_pos2());
        for position in &self.positions[1..] {
            bounds.extend_with(position.to_pos2());
        }
        Some(bounds)
    }

    pub fn node_at(&self, config: &LayoutConfig, world: Vec2) -> Option<usize> {
        self.positions.iter().enumerate().rev().find_map(|(index, origin)| {
            let rect = Rect::from_min_size(
                pos2(origin.x, origin.y),
                vec2(config.node_width, config.node_height),
            );
            rect.contains(world.to_pos2()).then_some(index)
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Longest-path column per node: roots get 0, every other node one more than
/// its deepest parent. Walks parents with an explicit stack.
///
/// A parent that is still in progress when reached closes a cycle and counts
/// as column 0 for that child, which keeps the walk finite on cyclic input.
pub fn assign_columns(graph: &GraphModel) -> Vec<usize> {
    let n = graph.node_count();
    let mut columns = vec![0usize; n];
    let mut marks = vec![Mark::Unvisited; n];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some((node, next_parent)) = stack.last_mut() {
            let node = *node;
            let parents = &graph.parents[node];

            if *next_parent < parents.len() {
                let parent = parents[*next_parent];
                *next_parent += 1;
                if marks[parent] == Mark::Unvisited {
                    marks[parent] = Mark::InProgress;
                    stack.push((parent, 0));
                }
                continue;
            }

            let column = if parents.is_empty() {
                0
            } else {
                parents
                    .iter()
                    .map(|&parent| match marks[parent] {
                        Mark::Done => columns[parent],
                        _ => 0,
                    })
                    .max()
                    .unwrap_or(0)
                    + 1
            };
            columns[node] = column;
            marks[node] = Mark::Done;
            stack.pop();
        }
    }

    columns
}

pub fn layered_layout(graph: &GraphModel, config: &LayoutConfig) -> DagLayout {
    let n = graph.node_count();
    if n == 0 {
        return DagLayout::default();
    }

    let columns = assign_columns(graph);

    let mut by_column: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &column) in columns.iter().enumerate() {
        by_column.entry(column).or_default().push(index);
    }

    let mut positions = vec![Vec2::ZERO; n];
    for (column, members) in &by_column {
        let offset = (members.len() as f32 - 1.0) * config.row_spacing / 2.0;
        for (row, &index) in members.iter().enumerate() {
            positions[index] = vec2(
                *column as f32 * config.column_spacing,
                row as f32 * config.row_spacing - offset,
            );
        }
    }

    DagLayout { positions, columns }
}
