use glam::DVec2;
use memgraph::app::{EngineState, GraphView, PhysicsEngine};
use memgraph::config::{Config, LinkSprings, PhysicsConfig};
use memgraph::memory::{EdgeRecord, Graph, LinkKind, NodeRecord, Snapshot};

/// Small deterministic generator so the random graph is the same every run.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

fn engine() -> PhysicsEngine {
    PhysicsEngine::new(PhysicsConfig::default(), LinkSprings::default())
}

#[test]
fn linked_pair_settles_at_the_rest_length() {
    let snapshot = Snapshot {
        roots: Vec::new(),
        nodes: vec![NodeRecord::new("a", "A"), NodeRecord::new("b", "B")],
        edges: vec![EdgeRecord::new("a", "b", LinkKind::References)],
    };
    let mut graph = Graph::load(snapshot).unwrap();
    graph.place("a", DVec2::new(-20.0, 0.0));
    graph.place("b", DVec2::new(20.0, 0.0));

    let rest = LinkSprings::default()
        .spring(LinkKind::References)
        .rest_length;
    assert_eq!(rest, 10.0);

    let mut engine = engine();
    engine.stabilize(&mut graph, 20_000);
    assert_eq!(engine.state(), EngineState::Settled);

    let a = graph.node_by_id("a").unwrap().position;
    let b = graph.node_by_id("b").unwrap().position;
    assert!((a.distance(b) - rest).abs() < 0.5, "distance {}", a.distance(b));
}

#[test]
fn two_hundred_nodes_keep_their_separation() {
    let mut rng = Lcg(0x5eed);
    let ids = (0..200).map(|index| format!("n{index:03}")).collect::<Vec<_>>();
    let edges = (1..ids.len())
        .map(|child| {
            let parent = rng.below(child);
            let kind = LinkKind::ALL[rng.below(LinkKind::ALL.len())];
            EdgeRecord::new(ids[parent].clone(), ids[child].clone(), kind)
        })
        .collect();
    let snapshot = Snapshot {
        roots: Vec::new(),
        nodes: ids.iter().map(|id| NodeRecord::new(id.clone(), id.clone())).collect(),
        edges,
    };
    let mut graph = Graph::load(snapshot).unwrap();
    assert_eq!(graph.visible().len(), 200);

    let config = PhysicsConfig::default();
    let mut engine = engine();
    engine.reseed(&mut graph);
    engine.stabilize(&mut graph, 20_000);
    assert_eq!(engine.state(), EngineState::Settled);

    let positions = graph
        .visible_nodes()
        .map(|node| node.position)
        .collect::<Vec<_>>();
    let mut closest = f64::INFINITY;
    for (index, first) in positions.iter().enumerate() {
        assert!(first.is_finite());
        for second in &positions[index + 1..] {
            closest = closest.min(first.distance(*second));
        }
    }
    assert!(
        closest >= config.min_separation * 0.9,
        "closest pair is {closest} apart"
    );
}

#[test]
fn relayout_always_restarts_the_engine() {
    let mut view = GraphView::new(Config::default());
    view.load(Snapshot::demo()).unwrap();
    while view.tick().is_some() {}
    assert_eq!(view.engine_state(), EngineState::Settled);
    assert!(!view.wants_tick());

    view.apply(memgraph::app::Command::Relayout);
    assert_eq!(view.engine_state(), EngineState::Running);
    assert_eq!(view.physics().calm_steps(), 0);
    assert_eq!(view.physics().step_count(), 0);
}

#[test]
fn manual_step_while_settled_keeps_the_engine_settled() {
    let mut view = GraphView::new(Config::default());
    view.load(Snapshot::demo()).unwrap();
    while view.tick().is_some() {}

    let before = view.physics().step_count();
    view.apply(memgraph::app::Command::Step);
    assert_eq!(view.physics().step_count(), before + 1);
    assert_eq!(view.engine_state(), EngineState::Settled);
}
