use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::GraphCanvasState;
use crate::config::DomainColors;
use crate::graph::ConceptGraph;

/// Interactive force-directed canvas over the visible concept graph.
///
/// The simulation warm-restarts on every `view` change (surviving nodes keep
/// their positions), `search` only dims, and `selected` round-trips: clicks
/// write it, the panel around the canvas reads it.
#[component]
pub fn GraphCanvas(
	#[prop(into)] view: Signal<ConceptGraph>,
	#[prop(into)] colors: Signal<DomainColors>,
	#[prop(into)] search: Signal<String>,
	selected: RwSignal<Option<String>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<GraphCanvasState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	// Cleared on teardown so the frame loop stops re-scheduling itself.
	let alive: Rc<Cell<bool>> = Rc::new(Cell::new(true));
	// Last frame requested; cancelled on teardown so the queued callback never
	// fires against a dropped closure.
	let raf_id: Rc<Cell<i32>> = Rc::new(Cell::new(0));

	let measure = move |canvas: &HtmlCanvasElement| {
		let (w, h) = (
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.unwrap_or(800.0),
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.unwrap_or(600.0),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		(w, h)
	};

	let (state_init, animate_init, resize_cb_init, alive_init, raf_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		alive.clone(),
		raf_id.clone(),
	);
	Effect::new(move |_| {
		let graph = view.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();

		if let Some(ref mut s) = *state_init.borrow_mut() {
			// Graph mutation after init: warm restart, keep the transform.
			s.rebuild(&graph, &colors.get_untracked());
			return;
		}

		let window: Window = web_sys::window().unwrap();
		let (w, h) = measure(&canvas);
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*state_init.borrow_mut() = Some(GraphCanvasState::new(
			&graph,
			&colors.get_untracked(),
			w,
			h,
		));

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = (
				canvas_resize
					.parent_element()
					.map(|p| p.client_width() as f64)
					.unwrap_or(800.0),
				canvas_resize
					.parent_element()
					.map(|p| p.client_height() as f64)
					.unwrap_or(600.0),
			);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, alive_anim, raf_anim) = (
			state_init.clone(),
			animate_init.clone(),
			alive_init.clone(),
			raf_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if !alive_anim.get() {
				return;
			}
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Ok(id) = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref())
				{
					raf_anim.set(id);
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				raf_init.set(id);
			}
		}
	});

	let state_search = state.clone();
	Effect::new(move |_| {
		let query = search.get();
		if let Some(ref mut s) = *state_search.borrow_mut() {
			s.set_search(&query);
		}
	});

	let state_sel = state.clone();
	Effect::new(move |_| {
		let id = selected.get();
		if let Some(ref mut s) = *state_sel.borrow_mut() {
			s.set_selected(id.as_deref());
		}
	});

	let state_colors = state.clone();
	Effect::new(move |_| {
		let palette = colors.get();
		if let Some(ref mut s) = *state_colors.borrow_mut() {
			s.recolor(&palette);
		}
	});

	// `on_cleanup` demands `Send + Sync`; these `Rc`s never leave the main
	// thread in CSR, so a `SendWrapper` satisfies the bound without sharing.
	let cleanup_captures = send_wrapper::SendWrapper::new((
		alive.clone(),
		resize_cb.clone(),
		animate.clone(),
		raf_id,
	));
	on_cleanup(move || {
		let (alive_drop, resize_cb_drop, animate_drop, raf_drop) = cleanup_captures.take();
		alive_drop.set(false);
		if let Some(window) = web_sys::window() {
			// The tick always leaves one frame queued; cancel it before the
			// closure backing it is dropped.
			let _ = window.cancel_animation_frame(raf_drop.get());
			if let Some(ref cb) = *resize_cb_drop.borrow() {
				let _ = window
					.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		animate_drop.borrow_mut().take();
	});

	let cursor_pos = move |ev: &MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		(
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		)
	};

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let (x, y) = cursor_pos(&ev);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.begin_drag(idx, x, y);
			} else {
				s.begin_pan(x, y);
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let (x, y) = cursor_pos(&ev);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer = (x, y);
			if s.drag.active {
				s.drag_to(x, y);
			} else if s.pan.active {
				s.pan_to(x, y);
			} else {
				s.hover = s.node_at_position(x, y);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			if s.drag.active {
				if let Some(id) = s.end_drag() {
					// Press and release without movement: a click selects.
					selected.set(Some(id));
				}
			} else if s.pan.active && s.end_pan() {
				selected.set(None);
			}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			let _ = s.end_drag();
			s.end_pan();
			s.hover = None;
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let (x, y) = cursor_pos(&ev);
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom_at(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab; width: 100%; height: 100%;"
		/>
	}
}
