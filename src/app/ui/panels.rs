use eframe::egui::{
    self, Align, Color32, CursorIcon, Layout, Margin, Rect, RichText, ScrollArea, Sense, TextEdit,
    Ui, UiBuilder, pos2, vec2,
};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::live::ConnectionState;
use crate::pipeline::Node;
use crate::util::{format_binfactor, fuzzy_match_score};

use super::super::DashboardApp;
use super::super::prefs::ThemeName;
use super::super::render_utils::connection_color;

const DIVIDER_HEIGHT: f32 = 5.0;

#[derive(Debug, PartialEq)]
pub(in crate::app) enum SidebarRow<'a> {
    BinHeader(String),
    Job(&'a Node),
}

pub(in crate::app) fn sidebar_rows<'a>(nodes: &'a [Node], filter: &str) -> Vec<SidebarRow<'a>> {
    let filter = filter.trim();
    let matcher = SkimMatcherV2::default();
    let mut rows = Vec::with_capacity(nodes.len());
    let mut last_bin: Option<f64> = None;

    for node in nodes {
        if !filter.is_empty()
            && fuzzy_match_score(&matcher, &node.id, filter).is_none()
            && fuzzy_match_score(&matcher, node.kind.label(), filter).is_none()
        {
            continue;
        }

        if node.kind.groups_by_binfactor()
            && let Some(bin) = node.binfactor.filter(|bin| *bin != 0.0)
            && last_bin != Some(bin)
        {
            last_bin = Some(bin);
            rows.push(SidebarRow::BinHeader(format_binfactor(bin)));
        }
        rows.push(SidebarRow::Job(node));
    }

    rows
}

fn connection_hint(state: ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected {
            retry_in: Some(delay),
        } => format!("Live updates: disconnected, retrying in {}s", delay.as_secs().max(1)),
        other => format!("Live updates: {other}"),
    }
}

impl DashboardApp {
    pub(in crate::app) fn draw_top_bar(&self, ui: &mut Ui, theme_toggled: &mut bool) {
        let palette = self.palette;

        ui.horizontal(|ui| {
            ui.label(RichText::new("relion-dash").strong().color(palette.accent));
            if let Some(pipeline) = self.store.pipeline() {
                ui.label(
                    RichText::new(pipeline.project_dir.as_str())
                        .monospace()
                        .small()
                        .color(palette.text_muted),
                );
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let icon = match self.prefs.theme {
                    ThemeName::Dark => "☀",
                    ThemeName::Light => "🌙",
                };
                if ui.button(icon).on_hover_text("Toggle theme").clicked() {
                    *theme_toggled = true;
                }

                let (dot_rect, dot_response) = ui.allocate_exact_size(vec2(8.0, 8.0), Sense::hover());
                ui.painter()
                    .circle_filled(dot_rect.center(), 4.0, connection_color(self.connection));
                dot_response.on_hover_text(connection_hint(self.connection));

                if let Some(pipeline) = self.store.pipeline() {
                    for (status, count) in pipeline.status_counts().into_iter().rev() {
                        ui.label(
                            RichText::new(format!("{count} {status}"))
                                .small()
                                .color(palette.status_color(status)),
                        );
                    }
                }
            });
        });
    }

    pub(in crate::app) fn draw_sidebar(&mut self, ui: &mut Ui) {
        let palette = self.palette;

        ui.add_space(4.0);
        ui.add(
            TextEdit::singleline(&mut self.sidebar_filter)
                .hint_text("Filter jobs…")
                .desired_width(f32::INFINITY),
        );
        ui.separator();

        let Some(pipeline) = self.store.pipeline() else {
            ui.label(RichText::new("Loading pipeline…").color(palette.text_muted));
            return;
        };

        let rows = sidebar_rows(&pipeline.nodes, &self.sidebar_filter);
        if rows.is_empty() {
            ui.label(RichText::new("No jobs match the filter.").color(palette.text_muted));
            return;
        }

        let mut clicked = None;
        ScrollArea::vertical()
            .id_salt("job_list_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in &rows {
                    match row {
                        SidebarRow::BinHeader(bin) => {
                            ui.add_space(4.0);
                            ui.label(
                                RichText::new(format!("Binning {bin}×"))
                                    .small()
                                    .strong()
                                    .color(palette.accent),
                            );
                        }
                        SidebarRow::Job(node) => {
                            let selected = self.selection.is_current(&node.id);
                            let fill = if selected {
                                palette.surface2
                            } else {
                                Color32::TRANSPARENT
                            };

                            let response = egui::Frame::new()
                                .fill(fill)
                                .inner_margin(Margin::symmetric(8, 4))
                                .show(ui, |ui| {
                                    ui.set_width(ui.available_width());
                                    ui.horizontal(|ui| {
                                        let (dot, _) =
                                            ui.allocate_exact_size(vec2(7.0, 7.0), Sense::hover());
                                        ui.painter().circle_filled(
                                            dot.center(),
                                            3.5,
                                            palette.status_color(node.status),
                                        );
                                        ui.vertical(|ui| {
                                            ui.label(RichText::new(node.id.as_str()).small());
                                            ui.label(
                                                RichText::new(node.kind.label())
                                                    .small()
                                                    .color(palette.kind_color(&node.kind)),
                                            );
                                        });
                                    });
                                })
                                .response
                                .interact(Sense::click());

                            if selected {
                                ui.painter().rect_filled(
                                    Rect::from_min_size(
                                        response.rect.min,
                                        vec2(3.0, response.rect.height()),
                                    ),
                                    0.0,
                                    palette.accent,
                                );
                            }
                            if response.clicked() {
                                clicked = Some(node.id.clone());
                            }
                        }
                    }
                }
            });

        if let Some(id) = clicked {
            self.select(Some(id));
        }
    }

    pub(in crate::app) fn draw_split(&mut self, ui: &mut Ui) {
        let palette = self.palette;
        let full = ui.available_rect_before_wrap();
        let usable = (full.height() - DIVIDER_HEIGHT).max(0.0);
        let canvas_height = usable * self.prefs.split_percent() / 100.0;

        let canvas_rect = Rect::from_min_size(full.min, vec2(full.width(), canvas_height));
        let divider_rect = Rect::from_min_size(
            pos2(full.left(), canvas_rect.bottom()),
            vec2(full.width(), DIVIDER_HEIGHT),
        );
        let detail_rect = Rect::from_min_max(pos2(full.left(), divider_rect.bottom()), full.max);

        ui.scope_builder(UiBuilder::new().max_rect(canvas_rect), |ui| {
            self.draw_graph(ui);
        });

        let divider = ui.interact(divider_rect, ui.id().with("split_divider"), Sense::drag());
        let active = divider.hovered() || divider.dragged();
        ui.painter().rect_filled(
            divider_rect,
            0.0,
            if active { palette.accent } else { palette.border },
        );
        if active {
            ui.output_mut(|output| output.cursor_icon = CursorIcon::ResizeVertical);
        }
        if divider.dragged()
            && let Some(pointer) = divider.interact_pointer_pos()
            && full.height() > 0.0
        {
            self.prefs
                .set_split((pointer.y - full.top()) / full.height() * 100.0);
        }
        if divider.drag_stopped() {
            tracing::debug!(split = self.prefs.split_percent(), "split resized");
            self.prefs.commit_split();
        }

        ui.scope_builder(UiBuilder::new().max_rect(detail_rect), |ui| {
            ui.set_clip_rect(detail_rect);
            ui.painter().rect_filled(detail_rect, 0.0, palette.surface);
            egui::Frame::new()
                .inner_margin(Margin::symmetric(12, 8))
                .show(ui, |ui| self.draw_details(ui));
        });
    }
}
