use eframe::egui::epaint::CubicBezierShape;
use eframe::egui::{
    self, Align2, Button, Color32, CornerRadius, FontId, Rect, RichText, Sense, Stroke,
    StrokeKind, Ui, pos2, vec2,
};

use crate::util::short_name;

use super::super::DashboardApp;
use super::super::render_utils::{draw_background, edge_visible, hover_summary};

const ZOOM_BUTTON: f32 = 28.0;

impl DashboardApp {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let palette = self.palette;

        self.handle_graph_zoom(ui, &response);
        self.handle_graph_pan(ui, rect, &response);

        let config = *self.store.layout_config();
        if self
            .viewport
            .auto_frame(self.store.layout().origin_bounds(), rect.height(), config.node_height)
        {
            ui.ctx().request_repaint();
        }

        let transform = self.viewport.transform();
        draw_background(&painter, rect, &palette, transform.pan, transform.zoom);

        let Some(pipeline) = self.store.pipeline() else {
            let (text, color) = match self.store.error() {
                Some(error) => (format!("Error: {error}"), Color32::from_rgb(239, 68, 68)),
                None => ("Loading pipeline…".to_owned(), palette.text_muted),
            };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                text,
                FontId::proportional(14.0),
                color,
            );
            return;
        };

        let graph = self.store.graph();
        let layout = self.store.layout();
        let zoom = transform.zoom;
        let node_size = vec2(config.node_width, config.node_height);

        if graph.node_count() == 0 {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No jobs in this project yet.",
                FontId::proportional(14.0),
                palette.text_muted,
            );
        }

        for (position, edge) in graph.edges.iter().enumerate() {
            let source = layout.positions[edge.source];
            let target = layout.positions[edge.target];
            let start = transform.world_to_screen(
                rect.min,
                source + vec2(config.node_width, config.node_height / 2.0),
            );
            let end = transform.world_to_screen(rect.min, target + vec2(0.0, config.node_height / 2.0));
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }

            let hot = self.selection.is_edge_highlighted(position);
            let stroke = if hot {
                Stroke::new(2.0 * zoom, palette.accent)
            } else {
                Stroke::new(zoom, palette.border2.gamma_multiply(0.35))
            };
            let mid_x = (start.x + end.x) / 2.0;
            painter.add(CubicBezierShape::from_points_stroke(
                [start, pos2(mid_x, start.y), pos2(mid_x, end.y), end],
                false,
                Color32::TRANSPARENT,
                stroke,
            ));
        }

        let hovered = self.hovered_index(ui, rect);
        let draw_labels = zoom >= 0.3;

        for (index, origin) in layout.positions.iter().enumerate() {
            let Some(node) = graph
                .node_slot
                .get(index)
                .and_then(|slot| pipeline.nodes.get(*slot))
            else {
                continue;
            };

            let node_rect =
                transform.world_rect_to_screen(rect.min, Rect::from_min_size(origin.to_pos2(), node_size));
            if !rect.intersects(node_rect.expand(4.0 * zoom)) {
                continue;
            }

            let type_color = palette.kind_color(&node.kind);
            let radius = CornerRadius::same((6.0 * zoom).round().clamp(0.0, 255.0) as u8);

            if self.selection.is_current(&node.id) {
                painter.rect_stroke(
                    node_rect.expand(3.0 * zoom),
                    CornerRadius::same((9.0 * zoom).round().clamp(0.0, 255.0) as u8),
                    Stroke::new(2.0 * zoom, palette.accent),
                    StrokeKind::Outside,
                );
            }

            let border = if hovered == Some(index) {
                palette.border2
            } else {
                palette.border
            };
            painter.rect_filled(node_rect, radius, palette.surface);
            painter.rect_stroke(node_rect, radius, Stroke::new(1.0, border), StrokeKind::Inside);
            painter.rect_filled(
                Rect::from_min_size(node_rect.min, vec2(4.0 * zoom, node_rect.height())),
                CornerRadius::same((2.0 * zoom).round().clamp(0.0, 255.0) as u8),
                type_color,
            );
            painter.circle_filled(
                pos2(node_rect.right() - 12.0 * zoom, node_rect.center().y),
                4.0 * zoom,
                palette.status_color(node.status),
            );

            if draw_labels {
                painter.text(
                    node_rect.min + vec2(12.0, 15.0) * zoom,
                    Align2::LEFT_CENTER,
                    short_name(&node.id),
                    FontId::monospace(11.0 * zoom),
                    palette.text,
                );
                painter.text(
                    node_rect.min + vec2(12.0, 31.0) * zoom,
                    Align2::LEFT_CENTER,
                    node.kind.label(),
                    FontId::proportional(10.0 * zoom),
                    type_color,
                );
            }
        }

        if let Some(index) = hovered
            && let Some(node) = graph
                .node_slot
                .get(index)
                .and_then(|slot| pipeline.nodes.get(*slot))
        {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);

            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                hover_summary(node),
                FontId::proportional(12.0),
                palette.text,
            );
        } else if self.viewport.is_dragging() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grabbing);
        }

        if let Some(error) = self.store.error() {
            painter.text(
                rect.left_bottom() + vec2(10.0, -10.0),
                Align2::LEFT_BOTTOM,
                format!("Refresh failed: {error}"),
                FontId::monospace(11.0),
                Color32::from_rgb(239, 68, 68),
            );
        }

        let pending_selection = self.clicked_node(rect, &response);

        self.draw_zoom_controls(ui, rect);

        if let Some(selected) = pending_selection {
            self.select(Some(selected));
        }
    }

    fn draw_zoom_controls(&mut self, ui: &mut Ui, rect: Rect) {
        let size = vec2(ZOOM_BUTTON, ZOOM_BUTTON);
        let right = rect.right() - 16.0;
        let bottom = rect.bottom() - 16.0;
        let slot = |row: f32| {
            Rect::from_min_size(
                pos2(right - ZOOM_BUTTON, bottom - ZOOM_BUTTON * (3.0 - row) - 4.0 * (2.0 - row)),
                size,
            )
        };

        if ui.put(slot(0.0), Button::new(RichText::new("+").size(16.0))).clicked() {
            self.viewport.zoom_in_step();
        }
        ui.put(
            slot(1.0),
            Button::new(
                RichText::new(format!("{}%", (self.viewport.zoom() * 100.0).round()))
                    .monospace()
                    .size(10.0),
            )
            .sense(Sense::hover()),
        );
        if ui.put(slot(2.0), Button::new(RichText::new("−").size(16.0))).clicked() {
            self.viewport.zoom_out_step();
        }
    }
}
