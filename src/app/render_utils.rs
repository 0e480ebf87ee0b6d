use glam::DVec2;

/// Axis-aligned rectangle in continuous screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Bounds {
    pub(super) min: DVec2,
    pub(super) max: DVec2,
}

impl Bounds {
    pub(super) fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub(super) fn expand(self, margin: f64) -> Self {
        Self {
            min: self.min - DVec2::splat(margin),
            max: self.max + DVec2::splat(margin),
        }
    }

    pub(super) fn contains(self, point: DVec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub(super) fn is_empty(self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }
}

/// Bounding-box test for a span of text starting at `start` and running
/// `width` cells to the right.
pub(super) fn label_visible(bounds: Bounds, start: DVec2, width: usize) -> bool {
    let end = start.x + width.saturating_sub(1) as f64;
    !(end < bounds.min.x || start.x > bounds.max.x || start.y < bounds.min.y || start.y > bounds.max.y)
}

pub(super) fn edge_visible(bounds: Bounds, start: DVec2, end: DVec2) -> bool {
    let min = start.min(end);
    let max = start.max(end);
    !(max.x < bounds.min.x || min.x > bounds.max.x || max.y < bounds.min.y || min.y > bounds.max.y)
}

/// Liang-Barsky clip of the segment against `bounds`. Returns the visible
/// part, or `None` when the segment misses the rectangle.
pub(super) fn clip_segment(start: DVec2, end: DVec2, bounds: Bounds) -> Option<(DVec2, DVec2)> {
    if !(start.is_finite() && end.is_finite()) || bounds.is_empty() {
        return None;
    }

    let delta = end - start;
    let checks = [
        (-delta.x, start.x - bounds.min.x),
        (delta.x, bounds.max.x - start.x),
        (-delta.y, start.y - bounds.min.y),
        (delta.y, bounds.max.y - start.y),
    ];

    let mut enter = 0.0_f64;
    let mut leave = 1.0_f64;
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }

        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            leave = leave.min(t);
        }
        if enter > leave {
            return None;
        }
    }

    Some((start + delta * enter, start + delta * leave))
}

/// Arrow pointing along the visual direction of a segment. Cells are
/// twice as tall as wide, so vertical distance counts double.
pub(super) fn arrow_glyph(delta: DVec2) -> char {
    let visual = DVec2::new(delta.x, delta.y * 2.0);
    if visual.x.abs() >= visual.y.abs() {
        if visual.x >= 0.0 { '→' } else { '←' }
    } else if visual.y >= 0.0 {
        '↓'
    } else {
        '↑'
    }
}
