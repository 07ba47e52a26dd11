//! Prompts and wire payload parsing shared by the backend adapters.

use serde::Deserialize;
use serde_json::Value;

use super::ProviderError;
use crate::graph::{ConceptGraph, LinkRef, RawExtraction};

/// Structured response of the ask capability: an answer plus references into
/// the graph the question was asked against.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAnswer {
	/// Natural-language answer.
	#[serde(default)]
	pub answer: String,
	/// Ids of the nodes the backend considered relevant.
	#[serde(default)]
	pub relevant_nodes: Vec<String>,
	/// Ordered link keys the backend considered relevant.
	#[serde(default)]
	pub relevant_links: Vec<LinkRef>,
}

/// Prompt asking a model to extract a concept graph from one text chunk.
pub fn extraction_prompt(chunk: &str) -> String {
	format!(
		r#"Analyze the following text and extract key concepts, entities, and their relationships to build a semantic knowledge graph.
Identify the main topics and the connections between them. For each concept, provide a domain, a brief definition, and a snippet from the source text.
For each relationship, provide a descriptive label and a confidence score (from 0.0 to 1.0).

Your response MUST be a single, valid JSON object that adheres to the following structure. Do not include any text, explanations, or markdown formatting outside of the main JSON object.
{{
  "nodes": [
    {{
      "id": "unique_node_identifier",
      "label": "Display Name",
      "domain": "Subject Area",
      "definition": "A brief definition.",
      "sourceText": "A relevant quote from the source text."
    }}
  ],
  "links": [
    {{
      "source": "source_node_id",
      "target": "target_node_id",
      "label": "Relationship description",
      "confidence": 0.9
    }}
  ]
}}

Ensure that the 'source' and 'target' fields in the links correctly reference the 'id' fields of the nodes.
Do not create links to or from non-existent node IDs.

Text to analyze:
---
{chunk}
---
"#
	)
}

/// Prompt asking a model to answer a question using only the given graph.
pub fn ask_prompt(query: &str, graph: &ConceptGraph) -> String {
	let context = serde_json::to_string_pretty(graph).unwrap_or_default();
	format!(
		r#"You are an intelligent assistant for a knowledge graph application. Your task is to answer questions based *only* on the provided knowledge graph data.
Your response MUST be a single, valid JSON object with no other text, explanations, or markdown.

The required JSON structure is:
{{
  "answer": "A concise, natural language answer to the user's question.",
  "relevant_nodes": ["node_id_1", "node_id_2"],
  "relevant_links": [
    {{ "source": "source_node_id_1", "target": "target_node_id_1" }}
  ]
}}

Here is the knowledge graph data, in JSON format:
---
{context}
---

Here is the user's question:
---
{query}
---

Analyze the question, find the answer in the graph, and return the response in the specified JSON format.
"#
	)
}

/// Models sometimes wrap their JSON in a markdown fence; cut it out.
fn strip_fences(text: &str) -> &str {
	if let Some(start) = text.find("```") {
		let body = &text[start + 3..];
		let body = body.strip_prefix("json").unwrap_or(body);
		if let Some(end) = body.find("```") {
			return body[..end].trim();
		}
	}
	text.trim()
}

/// Parse a model's extraction output into a raw candidate set.
///
/// The `{nodes, links}` object may arrive at the top level or nested one
/// level under an arbitrary key (seen from OpenRouter-served models). No
/// semantic validation happens here.
pub fn parse_extraction(text: &str, provider: &str) -> Result<RawExtraction, ProviderError> {
	let value: Value = serde_json::from_str(strip_fences(text))
		.map_err(|e| ProviderError::Format(format!("{provider} returned invalid JSON: {e}")))?;
	let graph_value = if value.get("nodes").is_some() || value.get("links").is_some() {
		value
	} else {
		value
			.as_object()
			.and_then(|map| {
				map.values()
					.find(|v| v.get("nodes").is_some() && v.get("links").is_some())
					.cloned()
			})
			.ok_or_else(|| {
				ProviderError::Format(format!(
					"{provider} response JSON is missing 'nodes' or 'links'"
				))
			})?
	};
	serde_json::from_value(graph_value)
		.map_err(|e| ProviderError::Format(format!("{provider} returned an unexpected shape: {e}")))
}

/// Parse a model's ask output.
pub fn parse_answer(text: &str, provider: &str) -> Result<RawAnswer, ProviderError> {
	let mut answer: RawAnswer = serde_json::from_str(strip_fences(text))
		.map_err(|e| ProviderError::Format(format!("{provider} returned invalid JSON: {e}")))?;
	if answer.answer.is_empty() {
		answer.answer = "The model did not provide an answer.".into();
	}
	Ok(answer)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_plain_extraction() {
		let raw = parse_extraction(
			r#"{"nodes": [{"id": "x", "label": "X"}], "links": []}"#,
			"Test",
		)
		.unwrap();
		assert_eq!(raw.nodes.unwrap()[0].id, "x");
		assert!(raw.links.unwrap().is_empty());
	}

	#[test]
	fn a_missing_container_stays_visible_to_the_merge_engine() {
		let raw = parse_extraction(r#"{"nodes": []}"#, "Test").unwrap();
		assert!(raw.nodes.is_some());
		assert!(raw.links.is_none());
	}

	#[test]
	fn unwraps_markdown_fences() {
		let text = "Here you go:\n```json\n{\"nodes\": [], \"links\": []}\n```\n";
		assert!(parse_extraction(text, "Test").is_ok());
	}

	#[test]
	fn finds_a_graph_nested_one_level_down() {
		let raw = parse_extraction(
			r#"{"knowledge_graph": {"nodes": [{"id": "a"}], "links": []}}"#,
			"Test",
		)
		.unwrap();
		assert_eq!(raw.nodes.unwrap().len(), 1);
	}

	#[test]
	fn rejects_non_graph_json() {
		assert!(matches!(
			parse_extraction(r#"{"hello": "world"}"#, "Test"),
			Err(ProviderError::Format(_))
		));
		assert!(matches!(
			parse_extraction("not json", "Test"),
			Err(ProviderError::Format(_))
		));
	}

	#[test]
	fn parses_an_answer_and_fills_the_fallback_text() {
		let answer = parse_answer(
			r#"{"answer": "", "relevant_nodes": ["a"], "relevant_links": [{"source": "a", "target": "b"}]}"#,
			"Test",
		)
		.unwrap();
		assert_eq!(answer.answer, "The model did not provide an answer.");
		assert_eq!(answer.relevant_nodes, ["a"]);
		assert_eq!(answer.relevant_links[0].target, "b");
	}
}
