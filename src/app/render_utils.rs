use eframe::egui::{self, Color32, Context, Painter, Pos2, Rect, Stroke, Vec2};

use crate::live::ConnectionState;
use crate::pipeline::{JobKind, JobStatus, Node};

use super::prefs::ThemeName;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Palette {
    pub bg: Color32,
    pub surface: Color32,
    pub surface2: Color32,
    pub border: Color32,
    pub border2: Color32,
    pub text: Color32,
    pub text_muted: Color32,
    pub accent: Color32,
}

impl Palette {
    pub fn for_theme(theme: ThemeName) -> Self {
        match theme {
            ThemeName::Dark => Self {
                bg: Color32::from_rgb(7, 7, 15),
                surface: Color32::from_rgb(10, 10, 15),
                surface2: Color32::from_rgb(14, 14, 26),
                border: Color32::from_rgb(30, 30, 46),
                border2: Color32::from_rgb(45, 45, 78),
                text: Color32::from_rgb(226, 232, 240),
                text_muted: Color32::from_rgb(100, 116, 139),
                accent: Color32::from_rgb(167, 139, 250),
            },
            ThemeName::Light => Self {
                bg: Color32::from_rgb(248, 248, 252),
                surface: Color32::WHITE,
                surface2: Color32::from_rgb(241, 241, 248),
                border: Color32::from_rgb(226, 226, 240),
                border2: Color32::from_rgb(200, 200, 224),
                text: Color32::from_rgb(30, 30, 46),
                text_muted: Color32::from_rgb(107, 114, 128),
                accent: Color32::from_rgb(124, 58, 237),
            },
        }
    }

    pub fn kind_color(&self, kind: &JobKind) -> Color32 {
        type_color(kind).unwrap_or(self.text_muted)
    }

    pub fn status_color(&self, status: JobStatus) -> Color32 {
        status_color(status).unwrap_or(self.text_muted)
    }
}

pub(super) fn apply_theme(ctx: &Context, theme: ThemeName) {
    let palette = Palette::for_theme(theme);
    let mut visuals = match theme {
        ThemeName::Dark => egui::Visuals::dark(),
        ThemeName::Light => egui::Visuals::light(),
    };
    visuals.panel_fill = palette.surface;
    visuals.window_fill = palette.surface;
    visuals.extreme_bg_color = palette.surface2;
    visuals.faint_bg_color = palette.surface2;
    visuals.hyperlink_color = palette.accent;
    visuals.override_text_color = Some(palette.text);
    visuals.selection.bg_fill = palette.accent.gamma_multiply(0.35);
    visuals.selection.stroke = Stroke::new(1.0, palette.accent);
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, palette.border);
    ctx.set_visuals(visuals);
}

pub(super) fn type_color(kind: &JobKind) -> Option<Color32> {
    let color = match kind {
        JobKind::Import => Color32::from_rgb(99, 102, 241),
        JobKind::MotionCorr | JobKind::Reconstruct => Color32::from_rgb(139, 92, 246),
        JobKind::CtfFind => Color32::from_rgb(167, 139, 250),
        JobKind::ManualPick => Color32::from_rgb(14, 165, 233),
        JobKind::AutoPick => Color32::from_rgb(56, 189, 248),
        JobKind::Extract => Color32::from_rgb(6, 182, 212),
        JobKind::Class2D => Color32::from_rgb(249, 115, 22),
        JobKind::Select => Color32::from_rgb(251, 146, 60),
        JobKind::Class3D => Color32::from_rgb(239, 68, 68),
        JobKind::Refine3D => Color32::from_rgb(220, 38, 38),
        JobKind::PostProcess => Color32::from_rgb(16, 185, 129),
        JobKind::CtfRefine => Color32::from_rgb(132, 204, 22),
        JobKind::Polish => Color32::from_rgb(234, 179, 8),
        JobKind::LocalRes => Color32::from_rgb(20, 184, 166),
        JobKind::MaskCreate => Color32::from_rgb(100, 116, 139),
        JobKind::InitialModel | JobKind::Other(_) => return None,
    };
    Some(color)
}

pub(super) fn status_color(status: JobStatus) -> Option<Color32> {
    let color = match status {
        JobStatus::Running => Color32::from_rgb(245, 158, 11),
        JobStatus::Finished => Color32::from_rgb(16, 185, 129),
        JobStatus::Failed => Color32::from_rgb(239, 68, 68),
        JobStatus::Aborted => Color32::from_rgb(249, 115, 22),
        JobStatus::Queued => Color32::from_rgb(71, 85, 105),
        JobStatus::Unknown => return None,
    };
    Some(color)
}

pub(super) fn connection_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Connected => Color32::from_rgb(16, 185, 129),
        ConnectionState::Error => Color32::from_rgb(239, 68, 68),
        ConnectionState::Connecting => Color32::from_rgb(245, 158, 11),
        ConnectionState::Disconnected { .. } => Color32::from_rgb(71, 85, 105),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, palette: &Palette, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, palette.bg);

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + pan;
    let stroke = Stroke::new(1.0, palette.border.gamma_multiply(0.45));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

pub(super) fn hover_summary(node: &Node) -> String {
    let mut parts = vec![node.id.clone(), node.status.to_string()];
    if let Some(alias) = node.alias.as_deref().filter(|alias| !alias.is_empty()) {
        parts.push(alias.to_owned());
    }
    if let Some(resolution) = node.resolution {
        parts.push(format!("{resolution:.2} Å"));
    }
    if !node.has_results {
        parts.push("no results yet".to_owned());
    }
    parts.join("  |  ")
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn unknown_kinds_and_statuses_fall_back_to_muted_text() {
        let palette = Palette::for_theme(ThemeName::Dark);
        assert_eq!(
            palette.kind_color(&JobKind::Other("Tomography".to_owned())),
            palette.text_muted
        );
        assert_eq!(palette.kind_color(&JobKind::InitialModel), palette.text_muted);
        assert_eq!(palette.status_color(JobStatus::Unknown), palette.text_muted);
        assert_ne!(palette.status_color(JobStatus::Running), palette.text_muted);
    }

    #[test]
    fn hover_summary_flags_jobs_without_results() {
        let mut node = Node {
            id: "Refine3D/job010".to_owned(),
            kind: JobKind::Refine3D,
            status: JobStatus::Running,
            timestamp: None,
            binfactor: None,
            alias: Some("first pass".to_owned()),
            has_results: false,
            has_3d: false,
            resolution: None,
        };
        assert_eq!(
            hover_summary(&node),
            format!("Refine3D/job010  |  {}  |  first pass  |  no results yet", JobStatus::Running)
        );

        node.has_results = true;
        node.resolution = Some(3.214);
        assert!(hover_summary(&node).ends_with("first pass  |  3.21 Å"));
    }

    #[test]
    fn edges_outside_the_canvas_are_culled() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 60.0), 2.0));
        assert!(!edge_visible(rect, pos2(120.0, 10.0), pos2(300.0, 90.0), 2.0));
        assert!(!edge_visible(rect, pos2(10.0, -80.0), pos2(90.0, -10.0), 2.0));
    }
}
