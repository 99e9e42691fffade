use eframe::egui::{self, Pos2, Rect, Response, Ui, Vec2};

use super::super::DashboardApp;
use super::super::viewport::HitTarget;

impl DashboardApp {
    pub(in crate::app) fn hit_test(&self, rect: Rect, screen: Pos2) -> HitTarget {
        let world = self.viewport.transform().screen_to_world(rect.min, screen);
        match self
            .store
            .layout()
            .node_at(self.store.layout_config(), world)
        {
            Some(index) => HitTarget::Node(index),
            None => HitTarget::Canvas,
        }
    }

    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, response: &Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        ui.ctx().input_mut(|input| {
            input.raw_scroll_delta = Vec2::ZERO;
            input.smooth_scroll_delta = Vec2::ZERO;
        });
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        self.viewport.wheel(scroll);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(origin) = ui.input(|input| input.pointer.press_origin())
        {
            let target = self.hit_test(rect, origin);
            self.viewport.pointer_down(origin, target);
        }

        if self.viewport.is_dragging() {
            let pointer = ui.input(|input| input.pointer.latest_pos());
            match pointer {
                Some(pointer) if rect.contains(pointer) => {
                    self.viewport.pointer_move(pointer);
                }
                _ => self.viewport.pointer_up(),
            }
            if response.drag_stopped() || !response.dragged() {
                self.viewport.pointer_up();
            }
        }

        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan_by(response.drag_delta());
        }
    }

    pub(in crate::app) fn hovered_index(&self, ui: &Ui, rect: Rect) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }
        match self.hit_test(rect, pointer) {
            HitTarget::Node(index) => Some(index),
            HitTarget::Canvas => None,
        }
    }

    pub(in crate::app) fn clicked_node(&self, rect: Rect, response: &Response) -> Option<String> {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return None;
        }
        let pointer = response.interact_pointer_pos()?;
        match self.hit_test(rect, pointer) {
            HitTarget::Node(index) => self.store.graph().ids.get(index).cloned(),
            HitTarget::Canvas => None,
        }
    }
}
