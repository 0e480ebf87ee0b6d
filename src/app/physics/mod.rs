mod forces;
mod grid;

use glam::DVec2;
use tracing::{debug, info};

use crate::config::{LinkSprings, PhysicsConfig};
use crate::layout::jittered_circle;
use crate::memory::Graph;
use forces::{
    accumulate_centering, accumulate_repulsion, accumulate_springs, clamp_length,
    resolve_overlaps,
};
use grid::SpatialGrid;

/// World point the layout is seeded around and pulled toward. Panning moves
/// the camera, not this point.
pub const LAYOUT_CENTER: DVec2 = DVec2::ZERO;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Settled,
}

impl EngineState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Settled => "settled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Sum of squared speeds over visible, unpinned nodes.
    pub energy: f64,
    pub moved: usize,
    pub settled_now: bool,
}

#[derive(Debug, Default)]
struct Scratch {
    slots: Vec<usize>,
    slot_of: Vec<Option<usize>>,
    positions: Vec<DVec2>,
    velocities: Vec<DVec2>,
    pinned: Vec<bool>,
    forces: Vec<DVec2>,
}

impl Scratch {
    fn gather(&mut self, graph: &Graph) {
        self.slots.clear();
        self.slots.extend_from_slice(graph.visible().nodes());

        self.slot_of.clear();
        self.slot_of.resize(graph.node_count(), None);
        self.positions.clear();
        self.velocities.clear();
        self.pinned.clear();
        for (slot, &index) in self.slots.iter().enumerate() {
            let node = &graph.nodes()[index];
            self.slot_of[index] = Some(slot);
            self.positions.push(node.position);
            self.velocities.push(node.velocity);
            self.pinned.push(node.pinned);
        }

        self.forces.clear();
        self.forces.resize(self.slots.len(), DVec2::ZERO);
    }
}

pub struct PhysicsEngine {
    config: PhysicsConfig,
    links: LinkSprings,
    state: EngineState,
    calm_steps: usize,
    step_count: u64,
    last_energy: f64,
    grid: SpatialGrid,
    scratch: Scratch,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig, links: LinkSprings) -> Self {
        Self {
            config,
            links,
            state: EngineState::Running,
            calm_steps: 0,
            step_count: 0,
            last_energy: 0.0,
            grid: SpatialGrid::new(),
            scratch: Scratch::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state == EngineState::Settled
    }

    /// Consecutive steps whose energy stayed under the threshold.
    pub fn calm_steps(&self) -> usize {
        self.calm_steps
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn last_energy(&self) -> f64 {
        self.last_energy
    }

    pub fn wake(&mut self) {
        if self.state == EngineState::Settled {
            debug!(steps = self.step_count, "physics woken");
        }
        self.state = EngineState::Running;
        self.calm_steps = 0;
    }

    /// Places visible, unpinned nodes on a jittered circle around the layout
    /// centre and restarts the simulation. Structure is left untouched.
    pub fn reseed(&mut self, graph: &mut Graph) {
        let ids = graph
            .visible_nodes()
            .filter(|node| !node.pinned)
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();
        let borrowed = ids.iter().map(String::as_str).collect::<Vec<_>>();
        let seeds = jittered_circle(&borrowed, LAYOUT_CENTER, self.config.seed_spread);
        for (id, position) in ids.iter().zip(seeds) {
            graph.place(id, position);
        }

        self.step_count = 0;
        self.last_energy = 0.0;
        self.wake();
        debug!(nodes = ids.len(), "layout reseeded");
    }

    /// Advances one step regardless of state. A step taken while settled
    /// keeps the engine settled.
    pub fn step(&mut self, graph: &mut Graph) -> StepReport {
        let config = self.config;
        let scratch = &mut self.scratch;
        scratch.gather(graph);

        self.grid.rebuild(&scratch.positions, config.cell_size);
        accumulate_repulsion(&self.grid, &scratch.positions, &config, &mut scratch.forces);
        accumulate_springs(
            graph.visible_edges(),
            &scratch.slot_of,
            &scratch.positions,
            &self.links,
            &mut scratch.forces,
        );
        accumulate_centering(
            &scratch.positions,
            LAYOUT_CENTER,
            config.centering,
            &mut scratch.forces,
        );

        let mut moved = 0;
        for slot in 0..scratch.slots.len() {
            if scratch.pinned[slot] {
                scratch.velocities[slot] = DVec2::ZERO;
                continue;
            }

            let force = clamp_length(scratch.forces[slot], config.max_force);
            let velocity = (scratch.velocities[slot] + force * config.time_step) * config.damping;
            let velocity = clamp_length(velocity, config.max_speed);
            scratch.velocities[slot] = velocity;
            scratch.positions[slot] += velocity * config.time_step;
            moved += 1;
        }

        self.grid.rebuild(&scratch.positions, config.cell_size);
        resolve_overlaps(
            &self.grid,
            config.min_separation,
            &scratch.pinned,
            &mut scratch.positions,
            &mut scratch.velocities,
        );

        let energy = scratch
            .velocities
            .iter()
            .zip(&scratch.pinned)
            .filter(|(_, pinned)| !**pinned)
            .map(|(velocity, _)| velocity.length_squared())
            .sum::<f64>();

        let (nodes, _, _) = graph.kinematics_mut();
        for (slot, &index) in scratch.slots.iter().enumerate() {
            nodes[index].position = scratch.positions[slot];
            nodes[index].velocity = scratch.velocities[slot];
        }

        self.step_count += 1;
        self.last_energy = energy;
        if energy < config.energy_threshold {
            self.calm_steps += 1;
        } else {
            self.calm_steps = 0;
        }

        let settled_now =
            self.state == EngineState::Running && self.calm_steps >= config.settle_steps;
        if settled_now {
            self.state = EngineState::Settled;
            info!(steps = self.step_count, energy, "layout settled");
        }

        StepReport {
            energy,
            moved,
            settled_now,
        }
    }

    /// Steps only while running; this is what a host tick drives.
    pub fn tick(&mut self, graph: &mut Graph) -> Option<StepReport> {
        (self.state == EngineState::Running).then(|| self.step(graph))
    }

    /// Runs up to `max_steps` steps, stopping early once settled. Returns
    /// the number of steps taken.
    pub fn stabilize(&mut self, graph: &mut Graph, max_steps: usize) -> usize {
        let mut taken = 0;
        while taken < max_steps && self.state == EngineState::Running {
            self.step(graph);
            taken += 1;
        }
        taken
    }
}
