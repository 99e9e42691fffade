use eframe::egui::{Pos2, Rect, Vec2, vec2};

use crate::config::ViewportConfig;

/// World to screen mapping: `screen = canvas_origin + pan + world * zoom`,
/// with the canvas origin at the top-left of the allocated rect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    pub pan: Vec2,
    pub zoom: f32,
}

impl ViewportTransform {
    pub fn world_to_screen(&self, origin: Pos2, world: Vec2) -> Pos2 {
        origin + self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, origin: Pos2, screen: Pos2) -> Vec2 {
        (screen - origin - self.pan) / self.zoom
    }

    pub fn world_rect_to_screen(&self, origin: Pos2, world: Rect) -> Rect {
        Rect::from_min_max(
            self.world_to_screen(origin, world.min.to_vec2()),
            self.world_to_screen(origin, world.max.to_vec2()),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSession {
    origin_pan: Vec2,
    origin_pointer: Pos2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    Node(usize),
    Canvas,
}

#[derive(Debug)]
pub struct ViewportController {
    config: ViewportConfig,
    transform: ViewportTransform,
    drag: Option<DragSession>,
    centered: bool,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            transform: ViewportTransform {
                pan: vec2(config.initial_pan.0, config.initial_pan.1),
                zoom: 1.0,
            },
            config,
            drag: None,
            centered: false,
        }
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    #[cfg(test)]
    pub fn has_centered(&self) -> bool {
        self.centered
    }

    pub fn pointer_down(&mut self, pointer: Pos2, target: HitTarget) -> bool {
        if target != HitTarget::Canvas {
            return false;
        }
        self.drag = Some(DragSession {
            origin_pan: self.transform.pan,
            origin_pointer: pointer,
        });
        true
    }

    pub fn pointer_move(&mut self, pointer: Pos2) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        self.transform.pan = drag.origin_pan + (pointer - drag.origin_pointer);
        true
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.transform.pan += delta;
    }

    pub fn wheel(&mut self, scroll_y: f32) {
        if scroll_y > 0.0 {
            self.zoom_by(self.config.wheel_step);
        } else if scroll_y < 0.0 {
            self.zoom_by(1.0 / self.config.wheel_step);
        }
    }

    pub fn zoom_in_step(&mut self) {
        self.zoom_by(self.config.button_zoom_in);
    }

    pub fn zoom_out_step(&mut self) {
        self.zoom_by(self.config.button_zoom_out);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.transform.zoom =
            (self.transform.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
    }

    pub fn reset_centering(&mut self) {
        self.centered = false;
    }

    pub fn auto_frame(&mut self, bounds: Option<Rect>, viewport_height: f32, node_height: f32) -> bool {
        if self.centered || viewport_height <= 0.0 {
            return false;
        }
        let Some(bounds) = bounds else {
            return false;
        };

        self.centered = true;
        self.transform.zoom = 1.0;
        self.transform.pan = vec2(
            self.config.frame_left_margin - bounds.min.x,
            viewport_height / 2.0 - (bounds.min.y + bounds.height() / 2.0 + node_height / 2.0),
        );
        tracing::debug!(pan = ?self.transform.pan, "auto-framed pipeline");
        true
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(ViewportConfig::default())
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut viewport = controller();
        for _ in 0..500 {
            viewport.wheel(1.0);
        }
        assert_eq!(viewport.zoom(), 3.0);
        for _ in 0..500 {
            viewport.wheel(-1.0);
            viewport.zoom_out_step();
        }
        assert_eq!(viewport.zoom(), 0.15);
        viewport.zoom_in_step();
        assert!((viewport.zoom() - 0.1875).abs() < 1e-6);
    }

    #[test]
    fn zero_scroll_leaves_zoom_alone() {
        let mut viewport = controller();
        viewport.wheel(0.0);
        assert_eq!(viewport.zoom(), 1.0);
    }

    #[test]
    fn drag_pans_relative_to_origin() {
        let mut viewport = controller();
        assert!(viewport.pointer_down(pos2(100.0, 100.0), HitTarget::Canvas));
        viewport.pointer_move(pos2(130.0, 80.0));
        viewport.pointer_move(pos2(150.0, 90.0));
        assert_eq!(viewport.transform().pan, vec2(110.0, -10.0));

        viewport.pointer_up();
        assert!(!viewport.pointer_move(pos2(500.0, 500.0)));
        assert_eq!(viewport.transform().pan, vec2(110.0, -10.0));
    }

    #[test]
    fn press_on_node_does_not_pan() {
        let mut viewport = controller();
        assert!(!viewport.pointer_down(pos2(10.0, 10.0), HitTarget::Node(3)));
        assert!(!viewport.is_dragging());
        assert!(!viewport.pointer_move(pos2(90.0, 90.0)));
        assert_eq!(viewport.transform().pan, vec2(60.0, 0.0));
    }

    #[test]
    fn auto_frame_centres_vertically_and_runs_once() {
        let mut viewport = controller();
        viewport.zoom_by(2.0);
        let bounds = Rect::from_min_max(pos2(0.0, -37.0), pos2(440.0, 37.0));

        assert!(!viewport.auto_frame(Some(bounds), 0.0, 50.0));
        assert!(viewport.auto_frame(Some(bounds), 600.0, 50.0));
        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.transform().pan, vec2(48.0, 275.0));

        viewport.pan_by(vec2(5.0, 5.0));
        assert!(!viewport.auto_frame(Some(bounds), 600.0, 50.0));
        assert_eq!(viewport.transform().pan, vec2(53.0, 280.0));

        viewport.reset_centering();
        assert!(viewport.auto_frame(Some(bounds), 600.0, 50.0));
        assert_eq!(viewport.transform().pan, vec2(48.0, 275.0));
    }

    #[test]
    fn empty_layout_waits_for_nodes() {
        let mut viewport = controller();
        assert!(!viewport.auto_frame(None, 600.0, 50.0));
        assert!(!viewport.has_centered());
    }

    #[test]
    fn screen_and_world_round_trip() {
        let transform = ViewportTransform {
            pan: vec2(48.0, 20.0),
            zoom: 2.0,
        };
        let origin = pos2(10.0, 30.0);
        let screen = transform.world_to_screen(origin, vec2(100.0, -5.0));
        assert_eq!(screen, pos2(258.0, 40.0));
        assert_eq!(transform.screen_to_world(origin, screen), vec2(100.0, -5.0));
    }
}
