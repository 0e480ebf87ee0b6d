use glam::DVec2;

use crate::config::ViewConfig;

/// Camera over world space. `pan` is the world point shown at the centre of
/// the drawable area; x is stretched by `aspect` because terminal cells are
/// taller than they are wide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pan: DVec2,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    aspect: f64,
}

impl Viewport {
    pub fn new(config: &ViewConfig) -> Self {
        let mut viewport = Self {
            pan: DVec2::ZERO,
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            aspect: config.cell_aspect,
        };
        viewport.reset();
        viewport
    }

    pub fn pan(&self) -> DVec2 {
        self.pan
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn pan_by(&mut self, delta: DVec2) {
        self.pan += delta;
    }

    /// Multiplies the zoom by `factor`, clamped to the configured bounds.
    /// Returns whether the zoom changed.
    pub fn zoom_by(&mut self, factor: f64) -> bool {
        if !(factor.is_finite() && factor > 0.0) {
            return false;
        }

        let next = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        let changed = next != self.zoom;
        self.zoom = next;
        changed
    }

    pub fn center_on(&mut self, world: DVec2) {
        self.pan = world;
    }

    pub fn reset(&mut self) {
        self.pan = DVec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    fn scale(&self) -> DVec2 {
        DVec2::new(self.zoom * self.aspect, self.zoom)
    }

    pub fn world_to_screen(&self, world: DVec2, center: DVec2) -> DVec2 {
        (world - self.pan) * self.scale() + center
    }

    pub fn screen_to_world(&self, screen: DVec2, center: DVec2) -> DVec2 {
        (screen - center) / self.scale() + self.pan
    }
}
