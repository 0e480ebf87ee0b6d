use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use glam::DVec2;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::memory::{Graph, GraphError, Node, Snapshot};

mod input;
mod physics;
mod render;
mod render_utils;
pub mod terminal;
mod viewport;

pub use input::{Command, KeyAction, PanDirection, key_action};
pub use physics::{EngineState, LAYOUT_CENTER, PhysicsEngine, StepReport};
pub use render::{Canvas, Cell, CellChange, FrameRenderer, RenderedFrame, Scene, Status, Tone};
pub use viewport::Viewport;

/// Messages for collaborators outside the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Selected(String),
    SelectionCleared,
    Activated(String),
}

/// Owns the graph and everything drawn from it. Every command applies
/// synchronously; ticks advance the layout while the engine is running.
pub struct GraphView {
    config: Config,
    graph: Graph,
    physics: PhysicsEngine,
    viewport: Viewport,
    renderer: FrameRenderer,
    selected: Option<usize>,
    prompt: Option<String>,
    last_error: Option<String>,
    size: (u16, u16),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl GraphView {
    pub fn new(config: Config) -> Self {
        Self {
            physics: PhysicsEngine::new(config.physics, config.links.clone()),
            viewport: Viewport::new(&config.view),
            graph: Graph::default(),
            renderer: FrameRenderer::new(),
            selected: None,
            prompt: None,
            last_error: None,
            size: (80, 24),
            config,
        }
    }

    /// Replaces the graph when the snapshot is valid. On failure the current
    /// graph stays on screen and the error is kept for the footer.
    ///
    /// A successful load warms the layout up for `warmup_steps` and always
    /// leaves the engine running, even if the warm-up already settled it.
    pub fn load(&mut self, snapshot: Snapshot) -> Result<(), GraphError> {
        let mut graph = match Graph::load(snapshot) {
            Ok(graph) => graph,
            Err(error) => {
                warn!(%error, "graph load rejected");
                self.last_error = Some(error.to_string());
                return Err(error);
            }
        };

        self.physics.reseed(&mut graph);
        let warmup = self
            .physics
            .stabilize(&mut graph, self.config.physics.warmup_steps);
        self.physics.wake();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            visible = graph.visible().len(),
            warmup,
            "graph loaded"
        );

        self.graph = graph;
        self.selected = None;
        self.last_error = None;
        self.viewport.reset();
        self.renderer.invalidate();
        Ok(())
    }

    pub fn apply(&mut self, command: Command) -> Vec<Notification> {
        debug!(?command, "command");
        if !matches!(command, Command::Resize { .. }) {
            self.last_error = None;
        }

        let mut notifications = Vec::new();
        match command {
            Command::Pan(direction) => {
                let step = self.config.view.pan_step / self.viewport.zoom();
                let delta = match direction {
                    PanDirection::Up => DVec2::new(0.0, -step),
                    PanDirection::Down => DVec2::new(0.0, step),
                    PanDirection::Left => DVec2::new(-step, 0.0),
                    PanDirection::Right => DVec2::new(step, 0.0),
                };
                self.viewport.pan_by(delta);
            }
            Command::ZoomIn => {
                self.viewport.zoom_by(self.config.view.zoom_step);
            }
            Command::ZoomOut => {
                self.viewport.zoom_by(1.0 / self.config.view.zoom_step);
            }
            Command::SelectNext => self.cycle_selection(true, &mut notifications),
            Command::SelectPrevious => self.cycle_selection(false, &mut notifications),
            Command::Expand => {
                if let Some(id) = self.selected_id().map(str::to_owned)
                    && self.graph.set_expanded(&id, true)
                {
                    self.physics.wake();
                }
            }
            Command::Collapse => {
                if let Some(id) = self.selected_id().map(str::to_owned)
                    && self.graph.set_expanded(&id, false)
                {
                    self.physics.wake();
                    self.drop_hidden_selection(&mut notifications);
                }
            }
            Command::ToggleExpand => {
                if let Some(index) = self.selected
                    && self.graph.has_children(index)
                {
                    let id = self.graph.nodes()[index].id.clone();
                    self.graph.toggle_expand(&id);
                    self.physics.wake();
                    self.drop_hidden_selection(&mut notifications);
                }
            }
            Command::TogglePin => {
                if let Some(id) = self.selected_id().map(str::to_owned) {
                    if self.graph.unpin(&id) {
                        self.physics.wake();
                    } else {
                        self.graph.pin(&id);
                    }
                }
            }
            Command::Center => {
                if let Some(node) = self.selected_node() {
                    let position = node.position;
                    self.viewport.center_on(position);
                }
            }
            Command::Relayout => {
                self.physics.reseed(&mut self.graph);
                info!(visible = self.graph.visible().len(), "relayout requested");
            }
            Command::Step => {
                self.physics.step(&mut self.graph);
            }
            Command::ResetView => self.viewport.reset(),
            Command::Search(query) => self.search(&query, &mut notifications),
            Command::Activate => {
                if let Some(id) = self.selected_id() {
                    notifications.push(Notification::Activated(id.to_owned()));
                }
            }
            Command::Resize { width, height } => {
                self.size = (width, height);
                self.renderer.invalidate();
            }
        }
        notifications
    }

    fn cycle_selection(&mut self, forward: bool, notifications: &mut Vec<Notification>) {
        let visible = self.graph.visible().nodes();
        if visible.is_empty() {
            return;
        }

        let current = self
            .selected
            .and_then(|index| self.graph.visible().position(index));
        let next = match (current, forward) {
            (Some(position), true) => (position + 1) % visible.len(),
            (Some(position), false) => (position + visible.len() - 1) % visible.len(),
            (None, true) => 0,
            (None, false) => visible.len() - 1,
        };

        let index = visible[next];
        self.selected = Some(index);
        notifications.push(Notification::Selected(self.graph.nodes()[index].id.clone()));
    }

    fn drop_hidden_selection(&mut self, notifications: &mut Vec<Notification>) {
        if let Some(index) = self.selected
            && !self.graph.visible().contains(index)
        {
            self.selected = None;
            notifications.push(Notification::SelectionCleared);
        }
    }

    /// Selects and centres the visible node whose label (or id) best matches
    /// `query`. Ties go to the smaller id.
    fn search(&mut self, query: &str, notifications: &mut Vec<Notification>) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let matcher = SkimMatcherV2::default();
        let mut best: Option<(i64, usize)> = None;
        for &index in self.graph.visible().nodes() {
            let node = &self.graph.nodes()[index];
            let score = fuzzy_match_score(&matcher, &node.label, query)
                .into_iter()
                .chain(fuzzy_match_score(&matcher, &node.id, query))
                .max();
            if let Some(score) = score
                && best.is_none_or(|(top, _)| score > top)
            {
                best = Some((score, index));
            }
        }

        let Some((score, index)) = best else {
            debug!(query, "search found nothing");
            return;
        };
        let node = &self.graph.nodes()[index];
        debug!(query, id = %node.id, score, "search hit");
        self.viewport.center_on(node.position);
        self.selected = Some(index);
        notifications.push(Notification::Selected(node.id.clone()));
    }

    /// One physics step followed by one render, only while the engine runs.
    pub fn tick(&mut self) -> Option<RenderedFrame> {
        self.physics.tick(&mut self.graph)?;
        Some(self.render())
    }

    pub fn wants_tick(&self) -> bool {
        self.physics.state() == EngineState::Running
    }

    pub fn render(&mut self) -> RenderedFrame {
        let status = match (&self.prompt, &self.last_error) {
            (Some(prompt), _) => Status::Prompt(prompt),
            (None, Some(error)) => Status::Error(error),
            (None, None) => Status::Hints,
        };
        let scene = Scene {
            graph: &self.graph,
            viewport: &self.viewport,
            view: &self.config.view,
            selected: self.selected,
            engine_state: self.physics.state(),
            step_count: self.physics.step_count(),
            status,
        };
        let (width, height) = self.size;
        self.renderer.render(&scene, width, height)
    }

    /// Shows a search prompt in the footer, or hides it with `None`.
    pub fn set_prompt(&mut self, prompt: Option<String>) {
        self.prompt = prompt;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    pub fn engine_state(&self) -> EngineState {
        self.physics.state()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_node().map(|node| node.id.as_str())
    }

    fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|index| self.graph.node(index))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EdgeRecord, LinkKind, NodeRecord};

    fn tree() -> Snapshot {
        Snapshot {
            roots: Vec::new(),
            nodes: [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma"), ("d", "Delta")]
                .into_iter()
                .map(|(id, label)| NodeRecord::new(id, label))
                .collect(),
            edges: vec![
                EdgeRecord::new("a", "b", LinkKind::References),
                EdgeRecord::new("a", "c", LinkKind::Extends),
                EdgeRecord::new("c", "d", LinkKind::Clarifies),
            ],
        }
    }

    fn view() -> GraphView {
        let mut view = GraphView::new(Config::default());
        view.load(tree()).expect("tree loads");
        view
    }

    fn select(view: &mut GraphView, id: &str) {
        for _ in 0..view.graph().visible().len() {
            view.apply(Command::SelectNext);
            if view.selected_id() == Some(id) {
                return;
            }
        }
        panic!("{id} is not selectable");
    }

    #[test]
    fn selection_wraps_in_both_directions() {
        let mut view = view();
        assert_eq!(
            view.apply(Command::SelectPrevious),
            vec![Notification::Selected("d".into())]
        );
        assert_eq!(
            view.apply(Command::SelectNext),
            vec![Notification::Selected("a".into())]
        );
    }

    #[test]
    fn collapse_hides_descendants_but_keeps_the_selection() {
        let mut view = view();
        select(&mut view, "c");
        assert!(view.apply(Command::Collapse).is_empty());
        assert_eq!(view.graph().visible_ids(), vec!["a", "b", "c"]);
        assert_eq!(view.selected_id(), Some("c"));
        assert_eq!(view.engine_state(), EngineState::Running);

        select(&mut view, "a");
        view.apply(Command::Collapse);
        assert_eq!(view.graph().visible_ids(), vec!["a"]);
        assert_eq!(view.selected_id(), Some("a"));

        view.apply(Command::Expand);
        assert_eq!(view.graph().visible_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn toggle_expand_flips_branches_and_ignores_leaves() {
        let mut view = view();
        select(&mut view, "d");
        assert!(view.apply(Command::ToggleExpand).is_empty());
        assert_eq!(view.graph().visible().len(), 4);

        select(&mut view, "c");
        view.apply(Command::ToggleExpand);
        assert_eq!(view.graph().visible_ids(), vec!["a", "b", "c"]);
        view.apply(Command::ToggleExpand);
        assert_eq!(view.graph().visible_ids(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn hidden_selection_is_cleared() {
        let mut view = view();
        select(&mut view, "d");
        view.graph.set_expanded("c", false);
        let mut notifications = Vec::new();
        view.drop_hidden_selection(&mut notifications);
        assert_eq!(notifications, vec![Notification::SelectionCleared]);
        assert_eq!(view.selected_id(), None);
    }

    #[test]
    fn search_selects_and_centres_the_best_match() {
        let mut view = view();
        let notifications = view.apply(Command::Search("gam".into()));
        assert_eq!(notifications, vec![Notification::Selected("c".into())]);
        let position = view.graph().node_by_id("c").unwrap().position;
        assert_eq!(view.viewport().pan(), position);

        assert!(view.apply(Command::Search("zzzz".into())).is_empty());
        assert!(view.apply(Command::Search("  ".into())).is_empty());
        assert_eq!(view.selected_id(), Some("c"));
    }

    #[test]
    fn activate_reports_the_selection() {
        let mut view = view();
        assert!(view.apply(Command::Activate).is_empty());
        select(&mut view, "b");
        assert_eq!(
            view.apply(Command::Activate),
            vec![Notification::Activated("b".into())]
        );
    }

    #[test]
    fn pin_toggle_freezes_and_unpinning_wakes() {
        let mut view = view();
        select(&mut view, "a");
        view.apply(Command::TogglePin);
        assert!(view.graph().node_by_id("a").unwrap().pinned);

        while view.tick().is_some() {}
        assert_eq!(view.engine_state(), EngineState::Settled);

        view.apply(Command::TogglePin);
        assert!(!view.graph().node_by_id("a").unwrap().pinned);
        assert_eq!(view.engine_state(), EngineState::Running);
        assert!(view.wants_tick());
    }

    #[test]
    fn load_leaves_the_engine_running_after_warmup() {
        let mut config = Config::default();
        config.physics.warmup_steps = 5_000;
        let mut view = GraphView::new(config);
        view.load(tree()).unwrap();

        assert!(view.physics().step_count() > 0);
        assert_eq!(view.engine_state(), EngineState::Running);
        assert_eq!(view.physics().calm_steps(), 0);
        assert!(view.wants_tick());
        assert!(view.tick().is_some());
    }

    #[test]
    fn failed_load_keeps_the_graph_and_shows_the_error() {
        let mut view = view();
        let mut broken = tree();
        broken.edges.push(EdgeRecord::new("a", "ghost", LinkKind::References));

        assert!(view.load(broken).is_err());
        assert_eq!(view.graph().node_count(), 4);
        assert!(view.last_error().is_some_and(|error| error.contains("ghost")));
        assert!(view.render().text.contains("error:"));

        view.apply(Command::ZoomIn);
        assert_eq!(view.last_error(), None);
    }

    #[test]
    fn resize_forces_a_full_frame_of_the_new_size() {
        let mut view = view();
        view.render();
        view.apply(Command::Resize {
            width: 40,
            height: 12,
        });
        let frame = view.render();
        assert!(frame.full_redraw);
        assert_eq!((frame.width, frame.height), (40, 12));
        assert_eq!(frame.text.lines().count(), 12);
    }

    #[test]
    fn prompt_replaces_the_footer() {
        let mut view = view();
        view.set_prompt(Some("alp".into()));
        assert!(view.render().text.lines().last().unwrap().contains("/alp"));
        view.set_prompt(None);
        assert!(!view.render().text.contains("/alp"));
    }
}
