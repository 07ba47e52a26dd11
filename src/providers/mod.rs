//! Extraction and search gateways over the three supported backends.
//!
//! Each adapter turns a text chunk into an unvalidated `{nodes, links}`
//! candidate set, or a natural-language question into an answer with graph
//! references. Adapters only do structural parsing of the wire payload;
//! identity and referential-integrity filtering belongs to the merge engine.

mod gemini;
mod ollama;
mod openrouter;
mod payload;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::graph::{ConceptGraph, RawExtraction};

pub use payload::RawAnswer;

/// How a backend call failed. Any variant aborts the remaining chunks of the
/// current upload; the graph accumulated so far is kept.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
	/// The backend could not be reached or answered with a failure status.
	#[error("{0}")]
	Unavailable(String),
	/// The credential is missing or was rejected.
	#[error("{0}")]
	Auth(String),
	/// The response could not be parsed into the expected shape.
	#[error("{0}")]
	Format(String),
}

/// Closed set of backend adapters, selected by configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
	/// Google Gemini's `generateContent` API.
	#[default]
	Gemini,
	/// A local Ollama instance.
	Ollama,
	/// OpenRouter chat completions.
	OpenRouter,
}

impl Provider {
	/// Name shown in status and error messages.
	pub fn display_name(self) -> &'static str {
		match self {
			Provider::Gemini => "Google Gemini",
			Provider::Ollama => "Ollama",
			Provider::OpenRouter => "OpenRouter",
		}
	}

	/// Stable key used for the settings UI.
	pub fn key(self) -> &'static str {
		match self {
			Provider::Gemini => "google-gemini",
			Provider::Ollama => "ollama",
			Provider::OpenRouter => "openrouter",
		}
	}

	/// Inverse of [`Provider::key`]; unknown keys fall back to the default.
	pub fn from_key(key: &str) -> Provider {
		match key {
			"ollama" => Provider::Ollama,
			"openrouter" => Provider::OpenRouter,
			_ => Provider::Gemini,
		}
	}

	/// All selectable providers, for the settings UI.
	pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::Ollama, Provider::OpenRouter];
}

/// Extract a candidate concept graph from one chunk of text.
pub async fn extract(settings: &Settings, chunk: &str) -> Result<RawExtraction, ProviderError> {
	match settings.provider {
		Provider::Gemini => gemini::extract(chunk, &settings.gemini_api_key).await,
		Provider::Ollama => ollama::extract(chunk, &settings.ollama_model).await,
		Provider::OpenRouter => {
			openrouter::extract(chunk, &settings.openrouter_model, &settings.openrouter_api_key)
				.await
		},
	}
}

/// Answer a question against the current graph, returning node ids and link
/// keys for the caller to resolve.
pub async fn ask(
	settings: &Settings,
	query: &str,
	graph: &ConceptGraph,
) -> Result<RawAnswer, ProviderError> {
	match settings.provider {
		Provider::Gemini => gemini::ask(query, graph, &settings.gemini_api_key).await,
		Provider::Ollama => ollama::ask(query, graph, &settings.ollama_model).await,
		Provider::OpenRouter => {
			openrouter::ask(
				query,
				graph,
				&settings.openrouter_model,
				&settings.openrouter_api_key,
			)
			.await
		},
	}
}
