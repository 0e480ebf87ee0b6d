use std::f64::consts::TAU;

use glam::DVec2;

use crate::util::stable_pair;

const JITTER_FRACTION: f64 = 0.15;

/// Places `ids` on a circle around `center`, nudged by a per-id jitter so
/// no two seeds coincide. The radius grows with the square root of the count.
pub fn jittered_circle(ids: &[&str], center: DVec2, spread: f64) -> Vec<DVec2> {
    let n = ids.len();
    if n == 0 {
        return Vec::new();
    }

    let base_radius = if n == 1 { 0.0 } else { (n as f64).sqrt() * spread };
    let jitter_scale = spread * JITTER_FRACTION;

    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            let angle = (index as f64 / n as f64) * TAU;
            let (jx, jy) = stable_pair(id);
            let jitter = DVec2::new(jx, jy) * jitter_scale;
            let radial = DVec2::new(angle.cos(), angle.sin()) * base_radius;
            center + radial + jitter
        })
        .collect()
}
