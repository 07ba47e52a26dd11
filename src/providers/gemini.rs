use gloo_net::http::Request;
use serde_json::{Value, json};

use super::ProviderError;
use super::payload;
use crate::graph::{ConceptGraph, RawExtraction};

const ENDPOINT: &str =
	"https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

pub async fn extract(chunk: &str, api_key: &str) -> Result<RawExtraction, ProviderError> {
	let text = generate(&payload::extraction_prompt(chunk), api_key).await?;
	payload::parse_extraction(&text, "Gemini")
}

pub async fn ask(
	query: &str,
	graph: &ConceptGraph,
	api_key: &str,
) -> Result<payload::RawAnswer, ProviderError> {
	let text = generate(&payload::ask_prompt(query, graph), api_key).await?;
	payload::parse_answer(&text, "Gemini")
}

async fn generate(prompt: &str, api_key: &str) -> Result<String, ProviderError> {
	if api_key.is_empty() {
		return Err(ProviderError::Auth(
			"Google Gemini API key is required. Add it in the provider settings.".into(),
		));
	}
	let body = json!({
		"contents": [{ "parts": [{ "text": prompt }] }],
		"generationConfig": { "responseMimeType": "application/json" },
	});
	let response = Request::post(&format!("{ENDPOINT}?key={api_key}"))
		.header("Content-Type", "application/json")
		.json(&body)
		.map_err(|e| ProviderError::Format(format!("Could not encode Gemini request: {e}")))?
		.send()
		.await
		.map_err(|e| ProviderError::Unavailable(format!("Could not reach the Gemini API: {e}")))?;

	match response.status() {
		400 | 401 | 403 => {
			return Err(ProviderError::Auth(
				"Gemini rejected the API key. Check it in the provider settings.".into(),
			));
		},
		status if !response.ok() => {
			return Err(ProviderError::Unavailable(format!(
				"Gemini API request failed with status {status}"
			)));
		},
		_ => {},
	}

	let value: Value = response
		.json()
		.await
		.map_err(|e| ProviderError::Format(format!("Gemini returned a non-JSON response: {e}")))?;
	value
		.pointer("/candidates/0/content/parts/0/text")
		.and_then(Value::as_str)
		.map(str::to_owned)
		.ok_or_else(|| {
			ProviderError::Format("Gemini response is missing the expected content field".into())
		})
}
