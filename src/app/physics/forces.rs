use std::f64::consts::TAU;

use glam::DVec2;

use super::grid::SpatialGrid;
use crate::config::{LinkSprings, PhysicsConfig};
use crate::memory::Edge;

const COINCIDENT_DISTANCE: f64 = 1e-9;

/// Unit vector pushing `from` away from `to`. Coincident pairs get a
/// deterministic angle derived from the pair, mirrored for the other side so
/// the two pushes cancel.
pub(super) fn separation_direction(delta: DVec2, distance: f64, from: usize, to: usize) -> DVec2 {
    if distance > COINCIDENT_DISTANCE {
        return delta / distance;
    }

    let (low, high) = (from.min(to), from.max(to));
    let angle = ((low as f64) * 0.618_034 + (high as f64) * 0.414_214) * TAU;
    let direction = DVec2::from_angle(angle);
    if from < to { direction } else { -direction }
}

/// Short-range repulsion between grid neighbours plus the collision push
/// for pairs closer than `min_separation`. The inverse-square term is
/// shifted so it reaches zero at the cutoff instead of jumping.
pub(super) fn accumulate_repulsion(
    grid: &SpatialGrid,
    positions: &[DVec2],
    config: &PhysicsConfig,
    forces: &mut [DVec2],
) {
    let cutoff = config.cell_size;
    let floor = config.min_distance.min(cutoff);
    let tail = 1.0 / (cutoff * cutoff);

    for slot in 0..positions.len() {
        for other in grid.neighbors(slot) {
            if other < slot {
                continue;
            }

            let delta = positions[slot] - positions[other];
            let distance = delta.length();
            if distance >= cutoff {
                continue;
            }

            let direction = separation_direction(delta, distance, slot, other);
            let clamped = distance.max(floor);
            let mut magnitude = config.repulsion * (1.0 / (clamped * clamped) - tail);
            if distance < config.min_separation {
                magnitude += config.collision * (config.min_separation - distance);
            }

            forces[slot] += direction * magnitude;
            forces[other] -= direction * magnitude;
        }
    }
}

/// Hooke springs along visible edges, tuned per link kind and scaled by the
/// edge strength.
pub(super) fn accumulate_springs<'a>(
    edges: impl Iterator<Item = &'a Edge>,
    slot_of: &[Option<usize>],
    positions: &[DVec2],
    links: &LinkSprings,
    forces: &mut [DVec2],
) {
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        let (Some(from), Some(to)) = (slot_of[edge.source], slot_of[edge.target]) else {
            continue;
        };

        let spring = links.spring(edge.kind);
        let delta = positions[from] - positions[to];
        let distance = delta.length();
        let direction = separation_direction(delta, distance, from, to);
        let pull = spring.stiffness * edge.strength * (distance - spring.rest_length);

        forces[from] -= direction * pull;
        forces[to] += direction * pull;
    }
}

pub(super) fn accumulate_centering(
    positions: &[DVec2],
    center: DVec2,
    strength: f64,
    forces: &mut [DVec2],
) {
    for (force, position) in forces.iter_mut().zip(positions) {
        *force -= (*position - center) * strength;
    }
}

/// Pushes overlapping pairs apart until they sit `min_separation` apart and
/// strips the velocity component carrying them back into each other.
/// Pinned slots never move; their partner takes the whole correction.
pub(super) fn resolve_overlaps(
    grid: &SpatialGrid,
    min_separation: f64,
    pinned: &[bool],
    positions: &mut [DVec2],
    velocities: &mut [DVec2],
) -> usize {
    let mut resolved = 0;
    for slot in 0..positions.len() {
        for other in grid.neighbors(slot) {
            if other < slot || (pinned[slot] && pinned[other]) {
                continue;
            }

            let delta = positions[slot] - positions[other];
            let distance = delta.length();
            if distance >= min_separation {
                continue;
            }

            let direction = separation_direction(delta, distance, slot, other);
            let overlap = min_separation - distance;
            let (share_slot, share_other) = match (pinned[slot], pinned[other]) {
                (true, _) => (0.0, 1.0),
                (_, true) => (1.0, 0.0),
                _ => (0.5, 0.5),
            };

            positions[slot] += direction * (overlap * share_slot);
            positions[other] -= direction * (overlap * share_other);

            if !pinned[slot] {
                let approach = velocities[slot].dot(direction);
                if approach < 0.0 {
                    velocities[slot] -= direction * approach;
                }
            }
            if !pinned[other] {
                let approach = velocities[other].dot(-direction);
                if approach < 0.0 {
                    velocities[other] += direction * approach;
                }
            }
            resolved += 1;
        }
    }
    resolved
}

pub(super) fn clamp_length(vector: DVec2, limit: f64) -> DVec2 {
    let length_sq = vector.length_squared();
    if length_sq > limit * limit {
        vector * (limit / length_sq.sqrt())
    } else {
        vector
    }
}
