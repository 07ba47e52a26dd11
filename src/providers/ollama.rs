use gloo_net::http::Request;
use serde_json::{Value, json};

use super::ProviderError;
use super::payload;
use crate::graph::{ConceptGraph, RawExtraction};

const ENDPOINT: &str = "http://localhost:11434/api/generate";

pub async fn extract(chunk: &str, model: &str) -> Result<RawExtraction, ProviderError> {
	let text = generate(&payload::extraction_prompt(chunk), model).await?;
	payload::parse_extraction(&text, "Ollama")
}

pub async fn ask(
	query: &str,
	graph: &ConceptGraph,
	model: &str,
) -> Result<payload::RawAnswer, ProviderError> {
	let text = generate(&payload::ask_prompt(query, graph), model).await?;
	payload::parse_answer(&text, "Ollama")
}

async fn generate(prompt: &str, model: &str) -> Result<String, ProviderError> {
	let body = json!({
		"model": model,
		"prompt": prompt,
		"format": "json",
		"stream": false,
	});
	let response = Request::post(ENDPOINT)
		.header("Content-Type", "application/json")
		.json(&body)
		.map_err(|e| ProviderError::Format(format!("Could not encode Ollama request: {e}")))?
		.send()
		.await
		.map_err(|_| {
			ProviderError::Unavailable(
				"Could not connect to Ollama at http://localhost:11434. \
				 Please ensure Ollama is running."
					.into(),
			)
		})?;

	if !response.ok() {
		return Err(ProviderError::Unavailable(format!(
			"Ollama API request failed with status {}",
			response.status()
		)));
	}

	let value: Value = response
		.json()
		.await
		.map_err(|e| ProviderError::Format(format!("Ollama returned a non-JSON response: {e}")))?;
	match value.get("response").and_then(Value::as_str) {
		Some(text) if !text.is_empty() => Ok(text.to_owned()),
		_ => Err(ProviderError::Format(
			"Ollama returned an empty response".into(),
		)),
	}
}
