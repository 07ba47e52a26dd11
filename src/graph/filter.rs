use std::collections::HashSet;

use super::model::ConceptGraph;

impl ConceptGraph {
	/// Derive the visible subgraph for a confidence threshold.
	///
	/// A threshold of exactly zero is an explicit bypass returning the whole
	/// graph. Otherwise only links at or above the threshold survive, and
	/// only nodes that are an endpoint of a surviving link stay visible;
	/// nodes whose every link fell below the threshold disappear from the
	/// view. The source graph is never mutated.
	pub fn filtered(&self, min_confidence: f64) -> ConceptGraph {
		if min_confidence == 0.0 {
			return self.clone();
		}
		let links: Vec<_> = self
			.links
			.iter()
			.filter(|l| l.effective_confidence() >= min_confidence)
			.cloned()
			.collect();
		let visible: HashSet<&str> = links
			.iter()
			.flat_map(|l| [l.source.as_str(), l.target.as_str()])
			.collect();
		let nodes = self
			.nodes
			.iter()
			.filter(|n| visible.contains(n.id.as_str()))
			.cloned()
			.collect();
		ConceptGraph { nodes, links }
	}
}

/// Case-insensitive label match used for search dimming. An empty query
/// matches everything; search never removes anything from the view.
pub fn matches_query(label: &str, lowercase_query: &str) -> bool {
	lowercase_query.is_empty() || label.to_lowercase().contains(lowercase_query)
}

#[cfg(test)]
mod tests {
	use super::super::model::{ConceptLink, ConceptNode};
	use super::*;

	fn sample() -> ConceptGraph {
		ConceptGraph {
			nodes: ["a", "b", "c"]
				.map(|id| ConceptNode {
					id: id.into(),
					label: id.to_uppercase(),
					..Default::default()
				})
				.into(),
			links: vec![
				ConceptLink {
					source: "a".into(),
					target: "b".into(),
					confidence: Some(0.9),
					..Default::default()
				},
				ConceptLink {
					source: "b".into(),
					target: "c".into(),
					confidence: Some(0.3),
					..Default::default()
				},
			],
		}
	}

	#[test]
	fn zero_threshold_is_a_bypass() {
		let graph = sample();
		assert_eq!(graph.filtered(0.0), graph);
	}

	#[test]
	fn threshold_hides_weak_links_and_their_orphans() {
		let view = sample().filtered(0.5);
		let ids: Vec<&str> = view.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["a", "b"]);
		assert_eq!(view.links.len(), 1);
		assert_eq!(view.links[0].key(), ("a", "b"));
	}

	#[test]
	fn raising_the_threshold_is_monotone() {
		let graph = sample();
		let mut prev = graph.filtered(0.1);
		for step in [0.3, 0.5, 0.9, 1.0] {
			let view = graph.filtered(step);
			assert!(view.nodes.len() <= prev.nodes.len());
			assert!(view.links.len() <= prev.links.len());
			prev = view;
		}
	}

	#[test]
	fn absent_confidence_survives_any_threshold() {
		let mut graph = sample();
		graph.links[1].confidence = None;
		let view = graph.filtered(1.0);
		assert_eq!(view.links.len(), 1);
		assert_eq!(view.links[0].key(), ("b", "c"));
	}

	#[test]
	fn query_matching_is_case_insensitive_and_cosmetic() {
		assert!(matches_query("Quantum Mechanics", "quantum"));
		assert!(!matches_query("Relativity", "quantum"));
		assert!(matches_query("anything", ""));
	}
}
