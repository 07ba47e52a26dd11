use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{GraphCanvasState, NODE_RADIUS};

const SELECTION_COLOR: &str = "#22c55e";
// Opacity floor for nodes/edges dimmed by an active search query.
const DIM_ALPHA: f64 = 0.1;
const DIM_EDGE_ALPHA: f64 = 0.05;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &GraphCanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
	draw_tooltip(state, ctx);
}

fn draw_edges(state: &GraphCanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.5 / k, 8.0 / k);
	let t = ease_out_cubic(state.selection_t);
	let searching = state.has_query();

	state.sim.visit_edges(|n1, n2, _| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return;
		}

		// Search dims an edge unless both endpoints match; selection
		// emphasizes edges touching the selected node and dims the rest.
		let both_match = n1.data.user_data.matched && n2.data.user_data.matched;
		let adjacent = state.edge_adjacent_to_selection(n1.index(), n2.index());
		let mut alpha = if searching && !both_match {
			DIM_EDGE_ALPHA
		} else {
			0.6
		};
		let (color, width) = if adjacent {
			alpha = alpha.max(0.6 + 0.3 * t);
			(SELECTION_COLOR.to_string(), line_width * (1.0 + 0.4 * t))
		} else {
			if state.selection_active() {
				alpha *= 1.0 - 0.75 * t;
			}
			("rgb(100, 180, 255)".to_string(), line_width)
		};

		ctx.set_global_alpha(alpha);
		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(width);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * NODE_RADIUS, y1 + uy * NODE_RADIUS);
		ctx.line_to(
			x2 - ux * (NODE_RADIUS + arrow_size),
			y2 - uy * (NODE_RADIUS + arrow_size),
		);
		ctx.stroke();

		// Direction matters: a link and its reverse are different edges.
		ctx.set_fill_style_str(&color);
		let (tip_x, tip_y) = (x2 - ux * NODE_RADIUS, y2 - uy * NODE_RADIUS);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
		ctx.set_global_alpha(1.0);
	});
}

fn draw_nodes(state: &GraphCanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let t = ease_out_cubic(state.selection_t);
	let selecting = state.selection_active();
	let searching = state.has_query();

	state.sim.visit_nodes(|node| {
		let idx = node.index();
		let (x, y) = (node.x() as f64, node.y() as f64);
		let is_selected = state.selection.idx == Some(idx);
		let is_emphasized = state.is_emphasized(idx);

		let mut alpha = if searching && !node.data.user_data.matched {
			DIM_ALPHA
		} else {
			1.0
		};
		if selecting && !is_emphasized {
			alpha *= 1.0 - 0.7 * t;
		}
		let radius = if is_selected {
			NODE_RADIUS * (1.0 + 0.5 * t)
		} else if is_emphasized {
			NODE_RADIUS * (1.0 + 0.2 * t)
		} else {
			NODE_RADIUS
		};

		if is_selected && t > 0.01 {
			let glow_radius = NODE_RADIUS * (1.8 + 1.2 * t);
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius)
			{
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", 0.35 * t));
				let _ =
					gradient.add_color_stop(0.6, &format!("rgba(200, 255, 220, {})", 0.1 * t));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.data.user_data.color);
		ctx.fill();

		if is_selected && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.8));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&node.data.user_data.label, x + radius + 3.0, y + 3.0);
		ctx.set_global_alpha(1.0);
	});
}

fn draw_tooltip(state: &GraphCanvasState, ctx: &CanvasRenderingContext2d) {
	if state.drag.active {
		return;
	}
	let Some(visual) = state.hover.and_then(|idx| state.node_visual(idx)) else {
		return;
	};
	let (px, py) = state.pointer;
	let (x, y) = (px + 14.0, py - 30.0);
	let width = 12.0 + 7.0 * visual.label.chars().count().max(visual.domain.chars().count()) as f64;

	ctx.set_fill_style_str("rgba(15, 15, 30, 0.9)");
	ctx.fill_rect(x, y, width, 36.0);
	ctx.set_stroke_style_str("rgba(100, 180, 255, 0.5)");
	ctx.set_line_width(1.0);
	ctx.stroke_rect(x, y, width, 36.0);

	ctx.set_fill_style_str("white");
	ctx.set_font("bold 11px sans-serif");
	let _ = ctx.fill_text(&visual.label, x + 6.0, y + 14.0);
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.6)");
	ctx.set_font("10px sans-serif");
	let _ = ctx.fill_text(&visual.domain, x + 6.0, y + 28.0);
}
