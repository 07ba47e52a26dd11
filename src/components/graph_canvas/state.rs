use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::config::DomainColors;
use crate::graph::{ConceptGraph, matches_query};

pub const NODE_RADIUS: f64 = 6.0;
pub const HIT_RADIUS: f64 = 12.0;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;

// Simulation energy: every mutation reheats to 1.0 and the energy decays each
// tick until the layout idles below the floor. Dragging holds it elevated so
// neighbors keep reacting.
const ALPHA_MIN: f64 = 0.02;
const ALPHA_DECAY: f64 = 0.995;
const DRAG_ALPHA: f64 = 0.3;
// Gentle pull toward the simulation origin, which the view transform maps to
// the viewport center.
const CENTER_GRAVITY: f32 = 0.6;

const CLICK_SLOP: f64 = 4.0;

#[derive(Clone, Debug, Default)]
pub struct NodeVisual {
	pub id: String,
	pub label: String,
	pub domain: String,
	pub color: String,
	pub matched: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub moved: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
	pub id: Option<String>,
	pub idx: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
}

pub struct GraphCanvasState {
	pub sim: ForceGraph<NodeVisual, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: Option<DefaultNodeIdx>,
	pub pointer: (f64, f64),
	pub selection: SelectionState,
	pub width: f64,
	pub height: f64,
	pub selection_t: f64,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	index_of: HashMap<String, DefaultNodeIdx>,
	alpha: f64,
	query: String,
}

impl GraphCanvasState {
	pub fn new(view: &ConceptGraph, colors: &DomainColors, width: f64, height: f64) -> Self {
		let (sim, edges, index_of) = build_sim(view, colors, &HashMap::new());
		Self {
			sim,
			edges,
			index_of,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: None,
			pointer: (0.0, 0.0),
			selection: SelectionState::default(),
			width,
			height,
			selection_t: 0.0,
			alpha: 1.0,
			query: String::new(),
		}
	}

	/// Swap in a new visible graph, keeping the position of every node whose
	/// id survives so a filter change re-settles instead of snapping. The
	/// selection carries over when its node still exists; pan/zoom is
	/// untouched.
	pub fn rebuild(&mut self, view: &ConceptGraph, colors: &DomainColors) {
		let mut prior = HashMap::new();
		self.sim.visit_nodes(|node| {
			prior.insert(node.data.user_data.id.clone(), (node.x(), node.y()));
		});
		let (sim, edges, index_of) = build_sim(view, colors, &prior);
		self.sim = sim;
		self.edges = edges;
		self.index_of = index_of;
		self.drag = DragState::default();
		self.hover = None;
		let selected = self.selection.id.take();
		self.set_selected(selected.as_deref());
		self.apply_query_flags();
		self.reheat();
	}

	pub fn recolor(&mut self, colors: &DomainColors) {
		self.sim.visit_nodes_mut(|node| {
			node.data.user_data.color = colors.color_of(&node.data.user_data.domain).to_string();
		});
	}

	pub fn set_search(&mut self, query: &str) {
		self.query = query.trim().to_lowercase();
		self.apply_query_flags();
	}

	fn apply_query_flags(&mut self) {
		let query = self.query.clone();
		self.sim.visit_nodes_mut(|node| {
			node.data.user_data.matched = matches_query(&node.data.user_data.label, &query);
		});
	}

	pub fn has_query(&self) -> bool {
		!self.query.is_empty()
	}

	pub fn set_selected(&mut self, id: Option<&str>) {
		self.selection.id = id.map(str::to_owned);
		self.selection.idx = id.and_then(|i| self.index_of.get(i).copied());
		self.selection.neighbors.clear();
		if let Some(idx) = self.selection.idx {
			for &(src, tgt) in &self.edges {
				if src == idx {
					self.selection.neighbors.insert(tgt);
				} else if tgt == idx {
					self.selection.neighbors.insert(src);
				}
			}
		}
	}

	pub fn selection_active(&self) -> bool {
		self.selection.idx.is_some()
	}

	pub fn is_emphasized(&self, idx: DefaultNodeIdx) -> bool {
		self.selection.idx == Some(idx) || self.selection.neighbors.contains(&idx)
	}

	pub fn edge_adjacent_to_selection(&self, a: DefaultNodeIdx, b: DefaultNodeIdx) -> bool {
		self.selection.idx == Some(a) || self.selection.idx == Some(b)
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.sim.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn node_visual(&self, idx: DefaultNodeIdx) -> Option<NodeVisual> {
		let mut found = None;
		self.sim.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.clone());
			}
		});
		found
	}

	pub fn begin_drag(&mut self, idx: DefaultNodeIdx, sx: f64, sy: f64) {
		self.drag = DragState {
			active: true,
			node_idx: Some(idx),
			start_x: sx,
			start_y: sy,
			..DragState::default()
		};
		let mut start = (0.0, 0.0);
		self.sim.visit_nodes(|node| {
			if node.index() == idx {
				start = (node.x(), node.y());
			}
		});
		(self.drag.node_start_x, self.drag.node_start_y) = start;
	}

	/// Pin the dragged node to the pointer. The pin only exists while the
	/// gesture lasts.
	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(idx) = self.drag.node_idx.filter(|_| self.drag.active) else {
			return;
		};
		let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
		if dx.abs() + dy.abs() > CLICK_SLOP {
			self.drag.moved = true;
		}
		let (nx, ny) = (
			self.drag.node_start_x + (dx / self.transform.k) as f32,
			self.drag.node_start_y + (dy / self.transform.k) as f32,
		);
		self.sim.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = nx;
				node.data.y = ny;
				node.data.is_anchor = true;
			}
		});
	}

	/// Release the drag, clearing the pin. Returns the node's id when the
	/// gesture never moved past the click slop, i.e. it was a click.
	pub fn end_drag(&mut self) -> Option<String> {
		let idx = self.drag.node_idx.take();
		let was_click = self.drag.active && !self.drag.moved;
		self.drag.active = false;
		if let Some(idx) = idx {
			self.sim.visit_nodes_mut(|node| {
				if node.index() == idx {
					node.data.is_anchor = false;
				}
			});
			if was_click {
				return self.node_visual(idx).map(|v| v.id);
			}
		}
		None
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan = PanState {
			active: true,
			moved: false,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	/// Shift the view with the pointer. The hover is dropped for the duration
	/// of the gesture; the tooltip would otherwise chase the moving pointer.
	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if !self.pan.active {
			return;
		}
		if (sx - self.pan.start_x).abs() + (sy - self.pan.start_y).abs() > CLICK_SLOP {
			self.pan.moved = true;
		}
		self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
		self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		self.hover = None;
	}

	/// Release the pan. Returns true when the gesture never moved past the
	/// click slop, i.e. it was a click on empty canvas.
	pub fn end_pan(&mut self) -> bool {
		let was_click = self.pan.active && !self.pan.moved;
		self.pan.active = false;
		was_click
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn reheat(&mut self) {
		self.alpha = 1.0;
	}

	pub fn cooled(&self) -> bool {
		self.alpha <= ALPHA_MIN
	}

	pub fn tick(&mut self, dt: f32) {
		if self.drag.active {
			self.alpha = self.alpha.max(DRAG_ALPHA);
		}
		if self.alpha > ALPHA_MIN {
			self.sim.update(dt);
			let pull = CENTER_GRAVITY * dt;
			self.sim.visit_nodes_mut(|node| {
				if !node.data.is_anchor {
					node.data.x -= node.data.x * pull;
					node.data.y -= node.data.y * pull;
				}
			});
			self.alpha *= ALPHA_DECAY;
		}

		let target = if self.selection_active() { 1.0 } else { 0.0 };
		self.selection_t += (target - self.selection_t) * (3.0 * dt as f64).min(1.0);
		if target == 0.0 && self.selection_t < 0.01 {
			self.selection_t = 0.0;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.reheat();
	}
}

fn build_sim(
	view: &ConceptGraph,
	colors: &DomainColors,
	prior: &HashMap<String, (f32, f32)>,
) -> (
	ForceGraph<NodeVisual, ()>,
	Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	HashMap<String, DefaultNodeIdx>,
) {
	let mut sim = ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	});
	let mut index_of = HashMap::new();
	let mut edges = Vec::new();

	for (i, node) in view.nodes.iter().enumerate() {
		let domain = if node.domain.is_empty() {
			"Unknown"
		} else {
			node.domain.as_str()
		};
		// New nodes seed on a ring around the origin; survivors keep their
		// previous position.
		let (x, y) = prior.get(&node.id).copied().unwrap_or_else(|| {
			let angle = (i as f64) * 2.0 * PI / view.nodes.len().max(1) as f64;
			((100.0 * angle.cos()) as f32, (100.0 * angle.sin()) as f32)
		});
		let idx = sim.add_node(NodeData {
			x,
			y,
			mass: 10.0,
			is_anchor: false,
			user_data: NodeVisual {
				id: node.id.clone(),
				label: node.display_label().to_string(),
				domain: domain.to_string(),
				color: colors.color_of(domain).to_string(),
				matched: true,
			},
		});
		index_of.insert(node.id.clone(), idx);
	}

	for link in &view.links {
		if let (Some(&src), Some(&tgt)) = (index_of.get(&link.source), index_of.get(&link.target))
		{
			sim.add_edge(src, tgt, EdgeData::default());
			edges.push((src, tgt));
		}
	}
	(sim, edges, index_of)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{ConceptLink, ConceptNode};

	fn graph(nodes: &[&str], links: &[(&str, &str)]) -> ConceptGraph {
		ConceptGraph {
			nodes: nodes
				.iter()
				.map(|id| ConceptNode {
					id: (*id).into(),
					label: format!("Node {id}"),
					..Default::default()
				})
				.collect(),
			links: links
				.iter()
				.map(|(s, t)| ConceptLink {
					source: (*s).into(),
					target: (*t).into(),
					..Default::default()
				})
				.collect(),
		}
	}

	fn positions(state: &GraphCanvasState) -> HashMap<String, (f32, f32)> {
		let mut out = HashMap::new();
		state.sim.visit_nodes(|node| {
			out.insert(node.data.user_data.id.clone(), (node.x(), node.y()));
		});
		out
	}

	#[test]
	fn rebuild_keeps_surviving_positions() {
		let colors = DomainColors::default();
		let full = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		let mut state = GraphCanvasState::new(&full, &colors, 800.0, 600.0);
		for _ in 0..60 {
			state.tick(0.016);
		}
		let before = positions(&state);

		state.rebuild(&graph(&["a", "b"], &[("a", "b")]), &colors);
		let after = positions(&state);
		assert_eq!(after.len(), 2);
		assert_eq!(after["a"], before["a"]);
		assert_eq!(after["b"], before["b"]);
		assert!(!state.cooled());
	}

	#[test]
	fn selecting_a_node_emphasizes_it_and_its_neighbors() {
		let colors = DomainColors::default();
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		state.set_selected(Some("b"));
		for id in ["a", "b", "c"] {
			let idx = state.index_of[id];
			assert!(state.is_emphasized(idx), "{id} should be emphasized");
		}
	}

	#[test]
	fn selection_survives_rebuild_only_while_the_node_exists() {
		let colors = DomainColors::default();
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		state.set_selected(Some("b"));
		state.rebuild(&g, &colors);
		assert!(state.selection_active());
		state.rebuild(&graph(&["a"], &[]), &colors);
		assert!(!state.selection_active());
	}

	#[test]
	fn search_dims_non_matching_nodes_and_empty_query_restores() {
		let colors = DomainColors::default();
		let g = graph(&["alpha", "beta"], &[]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		state.set_search("Node ALPHA");
		let mut flags = HashMap::new();
		state.sim.visit_nodes(|node| {
			flags.insert(node.data.user_data.id.clone(), node.data.user_data.matched);
		});
		assert!(flags["alpha"]);
		assert!(!flags["beta"]);

		state.set_search("");
		state
			.sim
			.visit_nodes(|node| assert!(node.data.user_data.matched));
	}

	#[test]
	fn drag_pins_only_for_the_duration_of_the_gesture() {
		let colors = DomainColors::default();
		let g = graph(&["a", "b"], &[("a", "b")]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		let idx = state.index_of["a"];
		state.begin_drag(idx, 10.0, 10.0);
		state.drag_to(60.0, 60.0);
		let mut pinned = false;
		state.sim.visit_nodes(|node| {
			if node.index() == idx {
				pinned = node.data.is_anchor;
			}
		});
		assert!(pinned);
		// Moved past the click slop, so releasing is not a click.
		assert_eq!(state.end_drag(), None);
		state.sim.visit_nodes(|node| assert!(!node.data.is_anchor));
	}

	#[test]
	fn a_stationary_press_release_reports_a_click() {
		let colors = DomainColors::default();
		let g = graph(&["a"], &[]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		let idx = state.index_of["a"];
		state.begin_drag(idx, 10.0, 10.0);
		assert_eq!(state.end_drag(), Some("a".into()));
	}

	#[test]
	fn panning_shifts_the_transform_and_drops_the_hover() {
		let colors = DomainColors::default();
		let g = graph(&["a"], &[]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		state.hover = Some(state.index_of["a"]);
		let (x0, y0) = (state.transform.x, state.transform.y);

		state.begin_pan(10.0, 10.0);
		state.pan_to(30.0, 25.0);
		assert_eq!(state.transform.x, x0 + 20.0);
		assert_eq!(state.transform.y, y0 + 15.0);
		assert_eq!(state.hover, None);
		// Moved past the click slop, so releasing is not a background click.
		assert!(!state.end_pan());
	}

	#[test]
	fn a_stationary_background_press_release_is_a_click() {
		let colors = DomainColors::default();
		let mut state = GraphCanvasState::new(&graph(&[], &[]), &colors, 800.0, 600.0);
		state.begin_pan(10.0, 10.0);
		assert!(state.end_pan());
		assert!(!state.pan.active);
	}

	#[test]
	fn zoom_is_clamped_to_the_configured_range() {
		let colors = DomainColors::default();
		let mut state = GraphCanvasState::new(&graph(&[], &[]), &colors, 800.0, 600.0);
		for _ in 0..200 {
			state.zoom_at(400.0, 300.0, -1.0);
		}
		assert!(state.transform.k <= MAX_ZOOM);
		for _ in 0..400 {
			state.zoom_at(400.0, 300.0, 1.0);
		}
		assert!(state.transform.k >= MIN_ZOOM);
	}

	#[test]
	fn simulation_cools_and_reheats() {
		let colors = DomainColors::default();
		let mut state = GraphCanvasState::new(&graph(&["a"], &[]), &colors, 800.0, 600.0);
		for _ in 0..2000 {
			state.tick(0.016);
		}
		assert!(state.cooled());
		state.resize(1024.0, 768.0);
		assert!(!state.cooled());
	}

	#[test]
	fn linked_nodes_settle_closer_than_unlinked_ones() {
		let colors = DomainColors::default();
		let g = graph(&["a", "b", "c"], &[("a", "b")]);
		let mut state = GraphCanvasState::new(&g, &colors, 800.0, 600.0);
		for _ in 0..600 {
			state.tick(0.016);
		}
		let pos = positions(&state);
		let dist = |p: (f32, f32), q: (f32, f32)| {
			(((p.0 - q.0).powi(2) + (p.1 - q.1).powi(2)) as f64).sqrt()
		};
		let ab = dist(pos["a"], pos["b"]);
		assert!(ab < dist(pos["a"], pos["c"]));
		assert!(ab < dist(pos["b"], pos["c"]));
	}
}
