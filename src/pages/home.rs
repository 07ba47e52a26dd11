use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, FileReader, HtmlInputElement};

use crate::components::graph_canvas::GraphCanvas;
use crate::config::{DomainColors, Settings};
use crate::graph::{self, ConceptGraph, ConceptLink, ConceptNode, DEFAULT_OVERLAP, DEFAULT_WINDOW};
use crate::providers::{self, Provider};

/// A resolved semantic-search result ready for display.
#[derive(Clone, Debug, PartialEq)]
struct AskOutcome {
	answer: String,
	nodes: Vec<ConceptNode>,
	links: Vec<ConceptLink>,
}

/// The whole app surface: upload, filters, the canvas and semantic search.
#[component]
pub fn Home() -> impl IntoView {
	let graph = RwSignal::new(ConceptGraph::default());
	let loading = RwSignal::new(false);
	let status = RwSignal::new(String::from("Upload a document to get started."));
	let error = RwSignal::new(Option::<String>::None);

	let threshold = RwSignal::new(0.0f64);
	let search = RwSignal::new(String::new());
	let selected = RwSignal::new(Option::<String>::None);
	let show_settings = RwSignal::new(false);

	let settings = RwSignal::new(Settings::load());
	let domain_colors = RwSignal::new(DomainColors::load());

	// Write-on-change persistence for the two pieces of cross-session state.
	Effect::new(move |_| settings.get().save());
	Effect::new(move |_| domain_colors.get().save());

	// Assign palette colors to domains the first time they appear. Entries
	// are never removed, even after the graph is cleared.
	Effect::new(move |_| {
		let domains: Vec<String> =
			graph.with(|g| g.domains().into_iter().map(str::to_owned).collect());
		if domain_colors.with_untracked(|c| c.missing_any(domains.iter().map(String::as_str))) {
			domain_colors.update(|c| c.observe(domains.iter().map(String::as_str)));
		}
	});

	let view_graph = Signal::derive(move || graph.get().filtered(threshold.get()));
	// Colors as the canvas and legend see them: the persisted map plus
	// assignments for domains the observe effect has not written back yet.
	// Assignment is deterministic, so this snapshot equals what the effect
	// persists a beat later and nothing re-tints on the first frame.
	let palette = Signal::derive(move || {
		let mut colors = domain_colors.get();
		graph.with(|g| colors.observe(g.domains()));
		colors
	});
	let selected_node = Signal::derive(move || {
		selected
			.get()
			.and_then(|id| graph.with(|g| g.node(&id).cloned()))
	});
	let stats = Signal::derive(move || {
		graph.with(|g| (g.nodes.len(), g.links.len(), g.domains().len()))
	});
	let legend = Signal::derive(move || {
		let colors = palette.get();
		graph.with(|g| {
			g.domains()
				.into_iter()
				.map(|d| (d.to_string(), colors.color_of(d).to_string()))
				.collect::<Vec<_>>()
		})
	});

	let on_file_upload = move |ev: Event| {
		let Some(input) = ev
			.target()
			.and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
		else {
			return;
		};
		let Some(file) = input.files().and_then(|files| files.get(0)) else {
			return;
		};
		let reader = FileReader::new().unwrap();
		let reader_onload = reader.clone();
		let onload = Closure::wrap(Box::new(move |_: Event| {
			if let Ok(result) = reader_onload.result() {
				if let Some(text) = result.as_string() {
					start_ingest(
						text,
						settings.get_untracked(),
						graph,
						loading,
						status,
						error,
						selected,
					);
				}
			}
		}) as Box<dyn Fn(Event)>);
		reader.set_onload(Some(onload.as_ref().unchecked_ref()));
		onload.forget();
		let _ = reader.read_as_text(&file);
	};

	let clear_graph = move |_| {
		graph.set(ConceptGraph::default());
		selected.set(None);
		search.set(String::new());
		threshold.set(0.0);
		error.set(None);
		status.set("Graph cleared. Upload a new document to begin.".into());
	};

	view! {
		<div class="app">
			<header class="app-header">
				<h1>"Concept Graph Canvas"</h1>
				<button on:click=move |_| show_settings.update(|s| *s = !*s)>
					{move || format!("Provider: {}", settings.get().provider.display_name())}
				</button>
			</header>

			<Show when=move || show_settings.get()>
				<ProviderSettings settings=settings />
			</Show>

			<section class="upload">
				<label class="upload-label">
					"Upload document"
					<input
						type="file"
						accept=".txt,.md,text/plain"
						on:change=on_file_upload
						prop:disabled=move || loading.get()
					/>
				</label>
				<p class="status">{move || status.get()}</p>
				{move || {
					error
						.get()
						.map(|message| view! { <p class="error">{message}</p> })
				}}
				<p class="stats">
					{move || {
						let (concepts, relationships, domains) = stats.get();
						format!(
							"{concepts} concepts, {relationships} relationships, {domains} domains"
						)
					}}
				</p>
			</section>

			<section class="graph-panel">
				<div class="graph-controls">
					<label>
						"Min confidence: "
						{move || format!("{:.2}", threshold.get())}
						<input
							type="range"
							min="0"
							max="1"
							step="0.05"
							prop:value=move || threshold.get().to_string()
							on:input=move |ev| {
								if let Ok(value) = event_target_value(&ev).parse::<f64>() {
									threshold.set(value);
								}
							}
						/>
					</label>
					<input
						type="search"
						placeholder="Highlight concepts..."
						prop:value=move || search.get()
						on:input=move |ev| search.set(event_target_value(&ev))
					/>
					<button on:click=clear_graph>"Clear graph"</button>
				</div>

				<div class="graph-area">
					<Show
						when=move || !view_graph.with(ConceptGraph::is_empty)
						fallback=move || {
							view! {
								<div class="empty-state">
									{move || {
										if graph.with(ConceptGraph::is_empty) {
											"Graph is empty. Upload a document to build it."
										} else {
											"No nodes match the current filters."
										}
									}}
								</div>
							}
						}
					>
						<GraphCanvas
							view=view_graph
							colors=palette
							search=search
							selected=selected
						/>
					</Show>
					{move || {
						selected_node
							.get()
							.map(|node| view! { <NodeDetails node=node selected=selected /> })
					}}
				</div>

				<div class="legend">
					<For
						each=move || legend.get()
						key=|(domain, color)| format!("{domain}:{color}")
						children=move |(domain, color)| {
							let name = domain.clone();
							view! {
								<label class="legend-entry">
									<input
										type="color"
										prop:value=color
										on:input=move |ev| {
											domain_colors
												.update(|c| c.set(&name, &event_target_value(&ev)));
										}
									/>
									{domain}
								</label>
							}
						}
					/>
				</div>
			</section>

			<AskPanel graph=graph settings=settings />
		</div>
	}
}

/// Sequentially extract and merge every chunk of an uploaded document. The
/// next chunk is only requested once the previous response has been merged;
/// the first fatal error aborts the rest but keeps what already merged.
fn start_ingest(
	text: String,
	settings: Settings,
	graph: RwSignal<ConceptGraph>,
	loading: RwSignal<bool>,
	status: RwSignal<String>,
	error: RwSignal<Option<String>>,
	selected: RwSignal<Option<String>>,
) {
	spawn_local(async move {
		loading.set(true);
		error.set(None);
		selected.set(None);
		graph.set(ConceptGraph::default());
		status.set("Reading and preparing document...".into());

		let fail = move |message: String| {
			error.set(Some(format!("Failed to extract knowledge graph. {message}")));
			status.set("An error occurred during processing.".into());
			loading.set(false);
		};

		let windows = match graph::chunks(&text, DEFAULT_WINDOW, DEFAULT_OVERLAP) {
			Ok(windows) => windows,
			Err(e) => return fail(e.to_string()),
		};
		let total = windows.len();
		let provider = settings.provider.display_name();
		status.set(format!(
			"Document split into {total} parts. Starting analysis with {provider}..."
		));

		for (index, chunk) in windows.enumerate() {
			status.set(format!(
				"Processing chunk {} of {total} with {provider}...",
				index + 1
			));
			let raw = match providers::extract(&settings, chunk).await {
				Ok(raw) => raw,
				Err(e) => return fail(e.to_string()),
			};
			match graph.try_update(|g| g.merge(raw)) {
				Some(Ok(outcome)) => {
					if outcome.dangling_links > 0 {
						warn!(
							"chunk {}: dropped {} dangling link(s)",
							index + 1,
							outcome.dangling_links
						);
					}
				},
				Some(Err(e)) => return fail(e.to_string()),
				// The owning view is gone; nothing left to update.
				None => return,
			}
		}

		status.set("Graph successfully built.".into());
		loading.set(false);
	});
}

#[component]
fn ProviderSettings(settings: RwSignal<Settings>) -> impl IntoView {
	view! {
		<section class="provider-settings">
			<label>
				"Provider"
				<select on:change=move |ev| {
					settings
						.update(|s| s.provider = Provider::from_key(&event_target_value(&ev)));
				}>
					<For
						each=|| Provider::ALL
						key=|p| p.key()
						children=move |p| {
							view! {
								<option
									value=p.key()
									prop:selected=move || settings.get().provider == p
								>
									{p.display_name()}
								</option>
							}
						}
					/>
				</select>
			</label>

			<Show when=move || settings.get().provider == Provider::Gemini>
				<label>
					"Gemini API key"
					<input
						type="password"
						prop:value=move || settings.get().gemini_api_key
						on:input=move |ev| {
							settings.update(|s| s.gemini_api_key = event_target_value(&ev));
						}
					/>
				</label>
			</Show>

			<Show when=move || settings.get().provider == Provider::Ollama>
				<label>
					"Ollama model"
					<input
						type="text"
						prop:value=move || settings.get().ollama_model
						on:input=move |ev| {
							settings.update(|s| s.ollama_model = event_target_value(&ev));
						}
					/>
				</label>
			</Show>

			<Show when=move || settings.get().provider == Provider::OpenRouter>
				<label>
					"OpenRouter API key"
					<input
						type="password"
						prop:value=move || settings.get().openrouter_api_key
						on:input=move |ev| {
							settings.update(|s| s.openrouter_api_key = event_target_value(&ev));
						}
					/>
				</label>
				<label>
					"OpenRouter model"
					<input
						type="text"
						prop:value=move || settings.get().openrouter_model
						on:input=move |ev| {
							settings.update(|s| s.openrouter_model = event_target_value(&ev));
						}
					/>
				</label>
			</Show>
		</section>
	}
}

#[component]
fn NodeDetails(node: ConceptNode, selected: RwSignal<Option<String>>) -> impl IntoView {
	let title = node.display_label().to_string();
	view! {
		<aside class="node-details">
			<button class="close" on:click=move |_| selected.set(None)>
				"×"
			</button>
			<h2>{title}</h2>
			<p class="domain">{if node.domain.is_empty() { "Unknown".into() } else { node.domain }}</p>
			<Show when={
				let has = !node.definition.is_empty();
				move || has
			}>
				<h3>"Definition"</h3>
				<p>{node.definition.clone()}</p>
			</Show>
			<Show when={
				let has = !node.source_text.is_empty();
				move || has
			}>
				<h3>"Source excerpt"</h3>
				<blockquote>{node.source_text.clone()}</blockquote>
			</Show>
		</aside>
	}
}

#[component]
fn AskPanel(graph: RwSignal<ConceptGraph>, settings: RwSignal<Settings>) -> impl IntoView {
	let question = RwSignal::new(String::new());
	let asking = RwSignal::new(false);
	let ask_error = RwSignal::new(Option::<String>::None);
	let outcome = RwSignal::new(Option::<AskOutcome>::None);

	let run_ask = move |_| {
		let query = question.get_untracked();
		if query.trim().is_empty() {
			return;
		}
		let snapshot = graph.get_untracked();
		if snapshot.is_empty() {
			ask_error.set(Some(
				"Cannot search an empty graph. Please upload a document first.".into(),
			));
			return;
		}
		let config = settings.get_untracked();
		asking.set(true);
		ask_error.set(None);
		outcome.set(None);
		spawn_local(async move {
			match providers::ask(&config, &query, &snapshot).await {
				Ok(raw) => {
					// Resolve returned ids/keys against the graph the
					// question was asked about; stale ones drop out.
					let (nodes, links) = snapshot.resolve(&raw.relevant_nodes, &raw.relevant_links);
					outcome.set(Some(AskOutcome {
						answer: raw.answer,
						nodes,
						links,
					}));
				},
				Err(e) => ask_error.set(Some(e.to_string())),
			}
			asking.set(false);
		});
	};

	view! {
		<section class="ask-panel">
			<h2>"Semantic search"</h2>
			<div class="ask-controls">
				<input
					type="text"
					placeholder="Ask a question about your graph..."
					prop:value=move || question.get()
					on:input=move |ev| question.set(event_target_value(&ev))
				/>
				<button on:click=run_ask prop:disabled=move || asking.get()>
					{move || if asking.get() { "Thinking..." } else { "Ask" }}
				</button>
			</div>
			{move || {
				ask_error
					.get()
					.map(|message| view! { <p class="error">{message}</p> })
			}}
			{move || {
				outcome
					.get()
					.map(|result| {
						view! {
							<div class="ask-result">
								<p>{result.answer}</p>
								<ul class="relevant-nodes">
									{result
										.nodes
										.into_iter()
										.map(|n| view! { <li>{n.label}</li> })
										.collect_view()}
								</ul>
								<ul class="relevant-links">
									{result
										.links
										.into_iter()
										.map(|l| {
											view! {
												<li>
													{format!("{} -[{}]-> {}", l.source, l.label, l.target)}
												</li>
											}
										})
										.collect_view()}
								</ul>
							</div>
						}
					})
			}}
		</section>
	}
}
