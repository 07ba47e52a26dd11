//! Persisted, process-wide configuration: provider settings and the
//! domain color map. Loaded once at startup, written on change; the graph
//! pipeline only ever sees these as passed-in snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::providers::Provider;

const SETTINGS_KEY: &str = "providerSettings";
const COLORS_KEY: &str = "domainColors";

/// Fallback palette assigned to domains in observation order.
pub const PALETTE: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Extraction/search backend selection and credentials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Active backend.
	pub provider: Provider,
	/// API key for the Gemini backend.
	pub gemini_api_key: String,
	/// Model served by the local Ollama instance.
	pub ollama_model: String,
	/// Model slug requested from OpenRouter.
	pub openrouter_model: String,
	/// API key for the OpenRouter backend.
	pub openrouter_api_key: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			provider: Provider::Gemini,
			gemini_api_key: String::new(),
			ollama_model: "llama3".into(),
			openrouter_model: "google/gemma-2-9b-it:free".into(),
			openrouter_api_key: String::new(),
		}
	}
}

impl Settings {
	/// Load from localStorage, falling back to defaults.
	pub fn load() -> Self {
		read_json(SETTINGS_KEY).unwrap_or_default()
	}

	/// Persist to localStorage.
	pub fn save(&self) {
		write_json(SETTINGS_KEY, self);
	}
}

/// Domain name to color value map. Grows monotonically: a domain keeps its
/// color even after its nodes are cleared, so re-uploads stay visually
/// consistent across sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainColors {
	colors: BTreeMap<String, String>,
}

impl DomainColors {
	/// Load from localStorage, falling back to an empty map.
	pub fn load() -> Self {
		read_json(COLORS_KEY).unwrap_or_default()
	}

	/// Persist to localStorage.
	pub fn save(&self) {
		write_json(COLORS_KEY, self);
	}

	/// Color for a domain, assigned or not. Callers that may see a domain
	/// before [`DomainColors::observe`] ran get the palette head.
	pub fn color_of(&self, domain: &str) -> &str {
		self.colors.get(domain).map(String::as_str).unwrap_or(PALETTE[0])
	}

	/// True if any of `domains` has no color yet.
	pub fn missing_any<'a>(&self, domains: impl IntoIterator<Item = &'a str>) -> bool {
		domains.into_iter().any(|d| !self.colors.contains_key(d))
	}

	/// Assign the next palette color to every not-yet-seen domain, in the
	/// order given. Existing entries are never touched or removed.
	pub fn observe<'a>(&mut self, domains: impl IntoIterator<Item = &'a str>) {
		for domain in domains {
			if !self.colors.contains_key(domain) {
				let color = PALETTE[self.colors.len() % PALETTE.len()];
				self.colors.insert(domain.to_string(), color.to_string());
			}
		}
	}

	/// User override for one domain.
	pub fn set(&mut self, domain: &str, color: &str) {
		self.colors.insert(domain.to_string(), color.to_string());
	}

	/// Iterate `(domain, color)` entries in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.colors.iter().map(|(d, c)| (d.as_str(), c.as_str()))
	}
}

fn storage() -> Option<web_sys::Storage> {
	web_sys::window()?.local_storage().ok().flatten()
}

fn read_json<T: DeserializeOwned>(key: &str) -> Option<T> {
	let raw = storage()?.get_item(key).ok().flatten()?;
	serde_json::from_str(&raw).ok()
}

fn write_json<T: Serialize>(key: &str, value: &T) {
	if let (Some(store), Ok(raw)) = (storage(), serde_json::to_string(value)) {
		let _ = store.set_item(key, &raw);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn palette_assignment_is_deterministic_in_observation_order() {
		let mut a = DomainColors::default();
		a.observe(["Physics", "Biology"]);
		a.observe(["Chemistry"]);

		let mut b = DomainColors::default();
		b.observe(["Physics"]);
		b.observe(["Biology", "Chemistry"]);

		assert_eq!(a, b);
		assert_eq!(a.color_of("Physics"), PALETTE[0]);
		assert_eq!(a.color_of("Biology"), PALETTE[1]);
		assert_eq!(a.color_of("Chemistry"), PALETTE[2]);
	}

	#[test]
	fn observe_never_reassigns_or_removes() {
		let mut colors = DomainColors::default();
		colors.observe(["Physics"]);
		colors.set("Physics", "#123456");
		colors.observe(["Physics", "Math"]);
		assert_eq!(colors.color_of("Physics"), "#123456");
		assert!(!colors.missing_any(["Physics", "Math"]));
	}

	#[test]
	fn palette_wraps_past_its_length() {
		let mut colors = DomainColors::default();
		let names: Vec<String> = (0..PALETTE.len() + 1).map(|i| format!("d{i}")).collect();
		colors.observe(names.iter().map(String::as_str));
		assert_eq!(colors.color_of("d0"), colors.color_of(&names[PALETTE.len()]));
	}

	#[test]
	fn snapshot_observation_matches_the_later_persisted_assignment() {
		// A view-side clone that observes new domains must land on the same
		// colors the persisted map assigns afterwards, and must give each
		// domain its own color rather than the shared palette head.
		let persisted = DomainColors::default();
		let mut snapshot = persisted.clone();
		snapshot.observe(["Physics", "Biology", "Chemistry"]);
		assert_ne!(snapshot.color_of("Physics"), snapshot.color_of("Biology"));
		assert_ne!(snapshot.color_of("Biology"), snapshot.color_of("Chemistry"));

		let mut persisted = persisted;
		persisted.observe(["Physics", "Biology", "Chemistry"]);
		assert_eq!(snapshot, persisted);
	}

	#[test]
	fn settings_defaults_match_the_shipped_models() {
		let s = Settings::default();
		assert_eq!(s.ollama_model, "llama3");
		assert_eq!(s.openrouter_model, "google/gemma-2-9b-it:free");
	}
}
