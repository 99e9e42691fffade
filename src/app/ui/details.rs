use eframe::egui::{
    self, Align, CollapsingHeader, ComboBox, Grid, Layout, Margin, RichText, ScrollArea, Ui,
};
use serde_json::Value;

use crate::pipeline::MapInfo;

use super::super::DashboardApp;
use super::super::detail::{DetailTab, PanelState};
use super::super::render_utils::Palette;

const ERROR_RED: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);
const JSON_ARRAY_LIMIT: usize = 200;

fn panel_body<'a, T>(
    ui: &mut Ui,
    state: &'a PanelState<T>,
    palette: &Palette,
    unavailable: &str,
) -> Option<&'a T> {
    match state {
        PanelState::Ready(value) => return Some(value),
        PanelState::Idle => {}
        PanelState::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading…").color(palette.text_muted));
            });
        }
        PanelState::Unavailable => {
            ui.label(RichText::new(unavailable).color(palette.text_muted));
        }
        PanelState::Failed(error) => {
            ui.label(RichText::new(format!("Error: {error}")).color(ERROR_RED));
        }
    }
    None
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn json_tree(ui: &mut Ui, path: &str, key: &str, value: &Value, palette: &Palette, depth: usize) {
    let child_path = format!("{path}/{key}");
    match value {
        Value::Object(map) => {
            CollapsingHeader::new(RichText::new(key).monospace())
                .id_salt(&child_path)
                .default_open(depth == 0)
                .show(ui, |ui| {
                    for (child, value) in map {
                        json_tree(ui, &child_path, child, value, palette, depth + 1);
                    }
                });
        }
        Value::Array(items) => {
            CollapsingHeader::new(RichText::new(format!("{key} [{}]", items.len())).monospace())
                .id_salt(&child_path)
                .default_open(false)
                .show(ui, |ui| {
                    for (index, value) in items.iter().take(JSON_ARRAY_LIMIT).enumerate() {
                        json_tree(ui, &child_path, &index.to_string(), value, palette, depth + 1);
                    }
                    if items.len() > JSON_ARRAY_LIMIT {
                        ui.label(
                            RichText::new(format!("… {} more", items.len() - JSON_ARRAY_LIMIT))
                                .color(palette.text_muted),
                        );
                    }
                });
        }
        leaf => {
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new(key).monospace().color(palette.text_muted));
                ui.label(RichText::new(scalar_text(leaf)).monospace());
            });
        }
    }
}

fn map_header(ui: &mut Ui, info: &MapInfo, palette: &Palette) {
    Grid::new("map_header_grid")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            let row = |ui: &mut Ui, name: &str, value: String| {
                ui.label(RichText::new(name).color(palette.text_muted));
                ui.label(RichText::new(value).monospace());
                ui.end_row();
            };
            row(ui, "Dimensions", format!("{} × {} × {}", info.nx, info.ny, info.nz));
            row(ui, "Voxel size", format!("{:.3} Å", info.voxel_size));
            if let Some(rms) = info.rms {
                row(ui, "RMS", format!("{rms:.4}"));
            }
            if let Some(dmin) = info.dmin {
                row(ui, "Min", format!("{dmin:.4}"));
            }
            if let Some(dmax) = info.dmax {
                row(ui, "Max", format!("{dmax:.4}"));
            }
            for (name, value) in &info.extra {
                row(ui, name, scalar_text(value));
            }
        });
}

impl DashboardApp {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        let palette = self.palette;

        let Some(selected_id) = self.selection.selected().map(str::to_owned) else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Select a job to inspect").color(palette.text_muted));
            });
            return;
        };

        self.draw_detail_header(ui, &selected_id);
        ui.add_space(4.0);

        let tabs = self.details.tabs();
        if !tabs.contains(&self.details.tab) {
            self.details.tab = DetailTab::Params;
        }
        ui.horizontal(|ui| {
            for tab in &tabs {
                if ui
                    .selectable_label(self.details.tab == *tab, tab.label())
                    .clicked()
                {
                    self.details.tab = *tab;
                }
            }
        });
        ui.separator();

        match self.details.tab {
            DetailTab::Params => self.draw_params_tab(ui),
            DetailTab::Analysis => self.draw_analysis_tab(ui),
            DetailTab::Log => self.draw_log_tab(ui),
            DetailTab::Outputs => self.draw_outputs_tab(ui),
            DetailTab::Map3D => self.draw_map_tab(ui),
        }
    }

    fn draw_detail_header(&self, ui: &mut Ui, selected_id: &str) {
        let palette = self.palette;
        let node = self.store.node(selected_id);

        ui.horizontal(|ui| {
            ui.label(RichText::new(selected_id).monospace().strong());
            if let Some(node) = node {
                ui.label(RichText::new(node.kind.label()).color(palette.kind_color(&node.kind)));
                ui.label(
                    RichText::new(format!("● {}", node.status))
                        .small()
                        .color(palette.status_color(node.status)),
                );
                if let Some(alias) = node.alias.as_deref().filter(|alias| !alias.is_empty()) {
                    ui.label(RichText::new(alias).italics().color(palette.text_muted));
                }
                if let Some(timestamp) = node.timestamp.as_deref() {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(RichText::new(timestamp).small().color(palette.text_muted));
                    });
                }
            }
        });

        if self.selection.dangling(self.store.graph()).is_some() {
            ui.label(
                RichText::new("Selected job no longer exists in the pipeline.")
                    .small()
                    .color(palette.text_muted),
            );
        }
    }

    fn draw_params_tab(&self, ui: &mut Ui) {
        let palette = self.palette;
        let Some(job) = panel_body(ui, &self.details.job, &palette, "No parameters recorded.")
        else {
            return;
        };

        ScrollArea::vertical()
            .id_salt("params_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(command) = job.latest_command() {
                    ui.label(RichText::new("Latest command").small().color(palette.text_muted));
                    egui::Frame::new()
                        .fill(palette.surface2)
                        .inner_margin(Margin::symmetric(8, 6))
                        .show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.add(egui::Label::new(RichText::new(command).monospace()).wrap());
                        });
                    ui.add_space(8.0);
                }

                if job.parameters.is_empty() {
                    ui.label(RichText::new("No parameters recorded.").color(palette.text_muted));
                    return;
                }

                Grid::new("params_grid")
                    .num_columns(2)
                    .striped(true)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        for (name, value) in &job.parameters {
                            ui.label(RichText::new(name).monospace().color(palette.text_muted));
                            ui.label(RichText::new(value).monospace());
                            ui.end_row();
                        }
                    });
            });
    }

    fn draw_analysis_tab(&self, ui: &mut Ui) {
        let palette = self.palette;
        let Some(analysis) = panel_body(
            ui,
            &self.details.analysis,
            &palette,
            "No analysis available for this job type.",
        ) else {
            return;
        };

        ScrollArea::vertical()
            .id_salt("analysis_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| match analysis {
                Value::Object(map) => {
                    for (key, value) in map {
                        json_tree(ui, "analysis", key, value, &palette, 0);
                    }
                }
                other => json_tree(ui, "analysis", "value", other, &palette, 0),
            });
    }

    fn draw_log_tab(&mut self, ui: &mut Ui) {
        let palette = self.palette;
        let mut refresh = false;

        ui.horizontal(|ui| {
            ui.label(RichText::new("run.out").monospace().color(palette.text_muted));
            if self.log.is_polling() {
                ui.label(RichText::new("following").small().color(palette.accent));
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.checkbox(&mut self.log.auto_scroll, "Auto-scroll");
                if ui.button("↻ Refresh").clicked() {
                    refresh = true;
                }
            });
        });

        if refresh {
            let request = self.log.refresh();
            self.request(request);
        }

        let auto_scroll = self.log.auto_scroll;
        let Some(text) = panel_body(ui, self.log.text(), &palette, "No log for this job.") else {
            return;
        };

        ScrollArea::vertical()
            .id_salt("log_scroll")
            .auto_shrink([false, false])
            .stick_to_bottom(auto_scroll)
            .show(ui, |ui| {
                let body = if text.is_empty() { "(empty)" } else { text.as_str() };
                ui.label(RichText::new(body).monospace().size(11.0));
            });
    }

    fn draw_outputs_tab(&mut self, ui: &mut Ui) {
        let palette = self.palette;
        let Some(job_id) = self.details.job_id().map(str::to_owned) else {
            return;
        };
        let can_view_maps = self.details.has_map();
        let mut view_map = None;

        {
            let Some(files) = panel_body(ui, &self.details.files, &palette, "No outputs.") else {
                return;
            };
            if files.is_empty() {
                ui.label(RichText::new("No output files.").color(palette.text_muted));
                return;
            }

            let api = self.backend.api();
            ScrollArea::vertical()
                .id_salt("outputs_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for file in files {
                        ui.horizontal(|ui| {
                            ui.hyperlink_to(
                                RichText::new(file.as_str()).monospace(),
                                api.job_file_url(&job_id, file),
                            );
                            if can_view_maps
                                && file.to_ascii_lowercase().ends_with(".mrc")
                                && ui.small_button("3D").on_hover_text("Show map header").clicked()
                            {
                                view_map = Some(file.clone());
                            }
                        });
                    }
                });
        }

        if let Some(file) = view_map {
            self.details.tab = DetailTab::Map3D;
            let request = self.details.request_map(&file);
            self.request(request);
        }
    }

    fn draw_map_tab(&mut self, ui: &mut Ui) {
        let palette = self.palette;
        if panel_body(ui, &self.details.files, &palette, "No outputs.").is_none() {
            return;
        }

        let candidates: Vec<String> = self
            .details
            .map_candidates()
            .into_iter()
            .map(str::to_owned)
            .collect();
        if candidates.is_empty() {
            ui.label(RichText::new("No .mrc maps among this job's outputs.").color(palette.text_muted));
            return;
        }

        let current = self.details.selected_map().map(str::to_owned);
        let mut chosen = None;
        ComboBox::from_id_salt("map_picker")
            .selected_text(current.as_deref().unwrap_or("Choose a map"))
            .width(280.0)
            .show_ui(ui, |ui| {
                for candidate in &candidates {
                    if ui
                        .selectable_label(current.as_deref() == Some(candidate.as_str()), candidate.as_str())
                        .clicked()
                    {
                        chosen = Some(candidate.clone());
                    }
                }
            });
        if let Some(file) = chosen {
            let request = self.details.request_map(&file);
            self.request(request);
        }
        ui.add_space(6.0);

        let Some(state) = current.as_deref().and_then(|file| self.details.map_info(file)) else {
            ui.label(RichText::new("Choose a map to read its header.").color(palette.text_muted));
            return;
        };
        if let Some(info) = panel_body(ui, state, &palette, "Map header unavailable") {
            map_header(ui, info, &palette);
        }

        ui.add_space(8.0);
        ui.label(
            RichText::new("Volume rendering is not available here; use the download link under Outputs.")
                .small()
                .color(palette.text_muted),
        );
    }
}
