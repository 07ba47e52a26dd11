use gloo_net::http::Request;
use serde_json::{Value, json};

use super::ProviderError;
use super::payload;
use crate::graph::{ConceptGraph, RawExtraction};

const ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub async fn extract(
	chunk: &str,
	model: &str,
	api_key: &str,
) -> Result<RawExtraction, ProviderError> {
	let text = complete(&payload::extraction_prompt(chunk), model, api_key).await?;
	payload::parse_extraction(&text, "OpenRouter")
}

pub async fn ask(
	query: &str,
	graph: &ConceptGraph,
	model: &str,
	api_key: &str,
) -> Result<payload::RawAnswer, ProviderError> {
	let text = complete(&payload::ask_prompt(query, graph), model, api_key).await?;
	payload::parse_answer(&text, "OpenRouter")
}

async fn complete(prompt: &str, model: &str, api_key: &str) -> Result<String, ProviderError> {
	if api_key.is_empty() {
		return Err(ProviderError::Auth(
			"OpenRouter API key is required. Add it in the provider settings.".into(),
		));
	}
	let body = json!({
		"model": model,
		"messages": [{ "role": "user", "content": prompt }],
		"response_format": { "type": "json_object" },
		"stream": false,
	});
	let response = Request::post(ENDPOINT)
		.header("Content-Type", "application/json")
		.header("Authorization", &format!("Bearer {api_key}"))
		.header("X-Title", "Concept Graph Canvas")
		.json(&body)
		.map_err(|e| ProviderError::Format(format!("Could not encode OpenRouter request: {e}")))?
		.send()
		.await
		.map_err(|e| {
			ProviderError::Unavailable(format!(
				"Could not connect to the OpenRouter API. Check your internet connection. ({e})"
			))
		})?;

	if response.status() == 401 {
		return Err(ProviderError::Auth(
			"Authentication error: invalid OpenRouter API key.".into(),
		));
	}
	if !response.ok() {
		// OpenRouter carries a message inside the error body when it can.
		let status = response.status();
		let detail = response
			.json::<Value>()
			.await
			.ok()
			.and_then(|v| {
				v.pointer("/error/message")
					.and_then(Value::as_str)
					.map(str::to_owned)
			})
			.unwrap_or_else(|| format!("API request failed with status {status}"));
		return Err(ProviderError::Unavailable(detail));
	}

	let value: Value = response.json().await.map_err(|e| {
		ProviderError::Format(format!("OpenRouter returned a non-JSON response: {e}"))
	})?;
	value
		.pointer("/choices/0/message/content")
		.and_then(Value::as_str)
		.filter(|text| !text.is_empty())
		.map(str::to_owned)
		.ok_or_else(|| {
			ProviderError::Format(
				"OpenRouter response is missing the expected content field".into(),
			)
		})
}
