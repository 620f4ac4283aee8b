use glam::Vec2;

use super::Viewer;
use crate::events::ViewerObserver;

impl Viewer {
    pub fn pointer_moved(&mut self, screen: Vec2, observer: &mut dyn ViewerObserver) {
        self.pointer_ndc = self.surface_rect.to_ndc(screen);
        self.hover_pass(observer);
    }

    /// Clicks do exactly what a move to the same spot does.
    pub fn pointer_clicked(&mut self, screen: Vec2, observer: &mut dyn ViewerObserver) {
        self.pointer_moved(screen, observer);
    }

    /// The pointer is no longer over the scene: nothing stays hovered.
    pub fn pointer_left(&mut self, observer: &mut dyn ViewerObserver) {
        self.pointer_ndc = None;
        self.hover_pass(observer);
    }

    pub fn pointer_ndc(&self) -> Option<Vec2> {
        self.pointer_ndc
    }

    /// Resets every clickable room, then highlights the one nearest under the
    /// last known pointer position.
    pub(super) fn hover_pass(&mut self, observer: &mut dyn ViewerObserver) {
        for id in self.clickable.values() {
            if let Some(shape) = self.shapes.get_mut(id.0) {
                shape.reset_highlight();
            }
        }

        let hit = self.pointer_ndc.and_then(|ndc| self.pick(ndc));
        if let Some(shape) = hit.and_then(|id| self.shapes.get_mut(id.0)) {
            shape.toggle_highlight();
        }

        if hit != self.hovered {
            self.hovered = hit;
            let name = hit.and_then(|id| self.shapes.get(id.0)).map(|shape| shape.name.as_str());
            tracing::trace!(room = name.unwrap_or("-"), "Hover changed");
            observer.on_hover_changed(name);
        }
    }
}
