mod canvas;
mod diff;

use glam::DVec2;
use unicode_width::UnicodeWidthStr;

pub use canvas::{Canvas, Cell, Tone};
pub use diff::{CellChange, diff_frames};

use super::physics::EngineState;
use super::render_utils::{Bounds, arrow_glyph, clip_segment, edge_visible, label_visible};
use super::viewport::Viewport;
use crate::config::ViewConfig;
use crate::memory::{Graph, Node};
use crate::util::truncate_label;

const PLACEHOLDER: [&str; 2] = ["No graph to display", "Load a memory to view its graph."];
const IDLE_HINTS: &str =
    " tab: select  h/j/k/l: pan  +/-: zoom  space: step  r: relayout  /: search  q: quit";
const SELECTION_HINTS: &str = "enter: open  e/x: expand/collapse  p: pin  c: center";

/// What the footer line shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status<'a> {
    Hints,
    Prompt(&'a str),
    Error(&'a str),
}

/// Everything a frame is drawn from. Composition only reads it.
pub struct Scene<'a> {
    pub graph: &'a Graph,
    pub viewport: &'a Viewport,
    pub view: &'a ViewConfig,
    pub selected: Option<usize>,
    pub engine_state: EngineState,
    pub step_count: u64,
    pub status: Status<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    pub text: String,
    pub changes: Vec<CellChange>,
    pub full_redraw: bool,
    pub width: u16,
    pub height: u16,
}

/// Keeps the last composed canvas so each frame only carries changed cells.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    previous: Option<Canvas>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, scene: &Scene<'_>, width: u16, height: u16) -> RenderedFrame {
        let canvas = compose(scene, width, height);
        let (changes, full_redraw) = diff_frames(self.previous.as_ref(), &canvas);
        let frame = RenderedFrame {
            text: canvas.to_string(),
            changes,
            full_redraw,
            width,
            height,
        };
        self.previous = Some(canvas);
        frame
    }

    /// Forgets the previous frame; the next render is a full redraw.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }
}

fn rounded(point: DVec2) -> (i32, i32) {
    let point = point.round();
    (point.x as i32, point.y as i32)
}

fn node_glyph(graph: &Graph, index: usize, node: &Node) -> (char, Tone) {
    if node.pinned {
        ('◆', Tone::Pinned)
    } else if graph.has_children(index) {
        (if node.expanded { '▾' } else { '▸' }, Tone::Branch)
    } else if node.importance >= 8 {
        ('●', Tone::Node)
    } else if node.importance >= 4 {
        ('•', Tone::Node)
    } else {
        ('·', Tone::Node)
    }
}

pub fn compose(scene: &Scene<'_>, width: u16, height: u16) -> Canvas {
    let mut canvas = Canvas::new(width, height);
    if width == 0 || height == 0 {
        return canvas;
    }

    draw_header(&mut canvas, scene);
    if height >= 2 {
        draw_footer(&mut canvas, scene, i32::from(height) - 1);
    }
    if height < 3 {
        return canvas;
    }

    let top = 1.0;
    let bottom = f64::from(height) - 2.0;
    let area = Bounds::new(DVec2::new(0.0, top), DVec2::new(f64::from(width) - 1.0, bottom));
    let rows = bottom - top + 1.0;
    let center = DVec2::new((f64::from(width) / 2.0).floor(), top + (rows / 2.0).floor());

    if scene.graph.visible().is_empty() {
        draw_placeholder(&mut canvas, area, center);
        return canvas;
    }

    draw_edges(&mut canvas, scene, area, center);
    draw_nodes(&mut canvas, scene, area, center);
    canvas
}

fn draw_header(canvas: &mut Canvas, scene: &Scene<'_>) {
    let visible = scene.graph.visible();
    let text = format!(
        " Memory Graph ({} nodes, {} edges) | Zoom: {:.1}x | Layout steps: {} | {}",
        visible.len(),
        visible.edges().len(),
        scene.viewport.zoom(),
        scene.step_count,
        scene.engine_state.label(),
    );
    canvas.fill_row(0, Tone::Header);
    canvas.draw_text(0, 0, &text, Tone::Header);
}

fn draw_footer(canvas: &mut Canvas, scene: &Scene<'_>, y: i32) {
    let (text, tone) = match scene.status {
        Status::Error(message) => (format!(" error: {message}"), Tone::Error),
        Status::Prompt(query) => (format!(" /{query}"), Tone::Footer),
        Status::Hints => match scene.selected.and_then(|index| scene.graph.node(index)) {
            Some(node) => {
                let category = if node.category.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", node.category)
                };
                let pinned = if node.pinned { " pinned" } else { "" };
                (
                    format!(
                        " {}{category} importance {}{pinned} | {SELECTION_HINTS}",
                        node.label, node.importance
                    ),
                    Tone::Footer,
                )
            }
            None => (IDLE_HINTS.to_owned(), Tone::Footer),
        },
    };

    canvas.fill_row(y, tone);
    canvas.draw_text(0, y, &text, tone);
}

fn draw_placeholder(canvas: &mut Canvas, area: Bounds, center: DVec2) {
    let first_row = (center.y as i32 - 1).max(area.min.y as i32);
    for (offset, line) in PLACEHOLDER.iter().enumerate() {
        let y = first_row + offset as i32 * 2;
        if f64::from(y) > area.max.y {
            break;
        }
        let x = (center.x as i32 - line.width() as i32 / 2).max(0);
        canvas.draw_text(x, y, line, Tone::Muted);
    }
}

fn draw_edges(canvas: &mut Canvas, scene: &Scene<'_>, area: Bounds, center: DVec2) {
    let graph = scene.graph;
    let cull = area.expand(f64::from(scene.view.cull_margin));
    let nodes = graph.nodes();

    for edge in graph.visible_edges() {
        if edge.source == edge.target {
            continue;
        }

        let start = scene.viewport.world_to_screen(nodes[edge.source].position, center);
        let end = scene.viewport.world_to_screen(nodes[edge.target].position, center);
        if !edge_visible(cull, start, end) {
            continue;
        }
        let Some((clipped_start, clipped_end)) = clip_segment(start, end, area) else {
            continue;
        };
        canvas.draw_line(
            rounded(clipped_start),
            rounded(clipped_end),
            Tone::Link(edge.kind),
        );

        if !edge.bidirectional && start.distance(end) > 4.0 {
            let midpoint = ((start + end) * 0.5).round();
            if area.contains(midpoint) {
                let (x, y) = rounded(midpoint);
                canvas.put(x, y, arrow_glyph(end - start), Tone::Arrow);
            }
        }
    }
}

fn draw_nodes(canvas: &mut Canvas, scene: &Scene<'_>, area: Bounds, center: DVec2) {
    let graph = scene.graph;
    let cull = area.expand(f64::from(scene.view.cull_margin));
    let selected = scene
        .selected
        .filter(|&index| graph.visible().contains(index));

    // The selected node goes last so nothing overlaps it.
    let order = graph
        .visible()
        .nodes()
        .iter()
        .copied()
        .filter(|&index| Some(index) != selected)
        .chain(selected);

    for index in order {
        let node = &graph.nodes()[index];
        let screen = scene.viewport.world_to_screen(node.position, center).round();
        if !screen.is_finite() {
            continue;
        }

        let (glyph, tone) = node_glyph(graph, index, node);
        let label = truncate_label(&node.label, scene.view.max_label_width);
        let is_selected = Some(index) == selected;
        let text = if is_selected {
            format!("[{glyph} {label}]")
        } else {
            format!("{glyph} {label}")
        };
        let start = if is_selected {
            screen - DVec2::X
        } else {
            screen
        };

        if !label_visible(cull, start, text.width()) {
            continue;
        }
        if screen.y < area.min.y || screen.y > area.max.y {
            continue;
        }

        let (x, y) = rounded(start);
        if is_selected {
            canvas.draw_text(x, y, &text, Tone::Selected);
        } else {
            canvas.put(x, y, glyph, tone);
            canvas.draw_text(x + 1, y, &text[glyph.len_utf8()..], Tone::Node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EdgeRecord, LinkKind, NodeRecord, Snapshot};

    fn pair() -> Graph {
        let snapshot = Snapshot {
            roots: Vec::new(),
            nodes: vec![
                NodeRecord::new("a", "Alpha"),
                NodeRecord::new("b", "Beta").with_importance(2),
            ],
            edges: vec![EdgeRecord::new("a", "b", LinkKind::Extends)],
        };
        let mut graph = Graph::load(snapshot).unwrap();
        graph.place("a", DVec2::new(0.0, 0.0));
        graph.place("b", DVec2::new(10.0, 0.0));
        graph
    }

    fn scene<'a>(
        graph: &'a Graph,
        viewport: &'a Viewport,
        view: &'a ViewConfig,
        selected: Option<usize>,
    ) -> Scene<'a> {
        Scene {
            graph,
            viewport,
            view,
            selected,
            engine_state: EngineState::Running,
            step_count: 7,
            status: Status::Hints,
        }
    }

    #[test]
    fn nodes_edges_and_arrows_are_drawn() {
        let graph = pair();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let canvas = compose(&scene(&graph, &viewport, &view, None), 80, 24);

        let row = canvas.row_text(12);
        assert_eq!(row.chars().skip(40).take(7).collect::<String>(), "▾ Alpha");
        assert_eq!(row.chars().nth(47), Some('─'));
        assert_eq!(row.chars().nth(50), Some('→'));
        assert_eq!(row.chars().skip(60).take(6).collect::<String>(), "· Beta");
        assert_eq!(canvas.get(50, 12).unwrap().tone, Tone::Arrow);
        assert_eq!(canvas.get(48, 12).unwrap().tone, Tone::Link(LinkKind::Extends));

        let header = canvas.row_text(0);
        assert!(header.contains("Memory Graph (2 nodes, 1 edges)"));
        assert!(header.contains("Zoom: 1.0x"));
        assert!(header.contains("Layout steps: 7"));
        assert!(canvas.row_text(23).contains("tab: select"));
    }

    #[test]
    fn selection_is_bracketed_and_described() {
        let graph = pair();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let canvas = compose(&scene(&graph, &viewport, &view, Some(1)), 80, 24);

        let row = canvas.row_text(12);
        assert_eq!(row.chars().skip(59).take(8).collect::<String>(), "[· Beta]");
        assert_eq!(canvas.get(59, 12).unwrap().tone, Tone::Selected);
        assert!(canvas.row_text(23).contains("Beta importance 2"));
    }

    #[test]
    fn wide_labels_leave_room_for_each_glyph() {
        let snapshot = Snapshot {
            roots: Vec::new(),
            nodes: vec![NodeRecord::new("jp", "日本語メモ")],
            edges: Vec::new(),
        };
        let mut graph = Graph::load(snapshot).unwrap();
        graph.place("jp", DVec2::ZERO);
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let mut renderer = FrameRenderer::new();
        let frame = renderer.render(&scene(&graph, &viewport, &view, None), 40, 10);

        let printed = frame
            .changes
            .iter()
            .filter(|change| change.y == 5 && !change.cell.is_continuation())
            .filter(|change| change.cell.glyph != ' ')
            .map(|change| (change.x, change.cell.glyph))
            .collect::<Vec<_>>();
        assert_eq!(
            printed,
            vec![(20, '•'), (22, '日'), (24, '本'), (26, '語'), (28, 'メ'), (30, 'モ')]
        );
        assert!(frame.text.contains("• 日本語メモ"));
    }

    #[test]
    fn off_screen_nodes_are_culled() {
        let mut graph = pair();
        graph.place("b", DVec2::new(500.0, 300.0));
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let canvas = compose(&scene(&graph, &viewport, &view, None), 80, 24);
        assert!(!canvas.to_string().contains("Beta"));
        assert!(canvas.to_string().contains("Alpha"));
    }

    #[test]
    fn empty_graph_renders_the_placeholder() {
        let graph = Graph::default();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let canvas = compose(&scene(&graph, &viewport, &view, None), 60, 10);
        let text = canvas.to_string();
        assert!(text.contains("No graph to display"));
        assert!(text.contains("Load a memory to view its graph."));
    }

    #[test]
    fn tiny_terminals_do_not_panic() {
        let graph = pair();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        for (width, height) in [(0, 0), (1, 1), (5, 2), (3, 3)] {
            let canvas = compose(&scene(&graph, &viewport, &view, Some(0)), width, height);
            assert_eq!(canvas.size(), (width, height));
        }
    }

    #[test]
    fn error_status_replaces_the_footer() {
        let graph = pair();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let mut scene = scene(&graph, &viewport, &view, None);
        scene.status = Status::Error("edge #3 references unknown node `x`");
        let canvas = compose(&scene, 80, 24);
        assert!(canvas.row_text(23).starts_with(" error: edge #3"));
        assert_eq!(canvas.get(1, 23).unwrap().tone, Tone::Error);
    }

    #[test]
    fn unchanged_scenes_diff_to_nothing() {
        let graph = pair();
        let view = ViewConfig::default();
        let viewport = Viewport::new(&view);
        let scene = scene(&graph, &viewport, &view, None);
        let mut renderer = FrameRenderer::new();

        let first = renderer.render(&scene, 80, 24);
        assert!(first.full_redraw);
        assert!(!first.changes.is_empty());

        let second = renderer.render(&scene, 80, 24);
        assert!(!second.full_redraw);
        assert!(second.changes.is_empty());
        assert_eq!(first.text, second.text);

        renderer.invalidate();
        assert!(renderer.render(&scene, 80, 24).full_redraw);
    }
}
