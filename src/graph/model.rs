use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Failures in the graph pipeline itself (as opposed to provider failures).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	/// The chunk window must be strictly larger than the overlap, or the
	/// chunker would never advance.
	#[error("chunk window ({window}) must be larger than the overlap ({overlap})")]
	InvalidStride {
		/// Requested window size in characters.
		window: usize,
		/// Requested overlap in characters.
		overlap: usize,
	},
	/// The extraction payload is missing its `nodes` or `links` container.
	#[error("extraction result is missing its 'nodes' or 'links' container")]
	MalformedExtraction,
}

/// A concept extracted from the source document. Absent optional fields are
/// stored as empty strings; simulation coordinates live in the layout engine,
/// never here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
	/// Stable identity key, unique within a graph.
	pub id: String,
	/// Display name; falls back to `id` when the backend omits it.
	#[serde(default)]
	pub label: String,
	/// Subject area the concept belongs to.
	#[serde(default)]
	pub domain: String,
	/// Short definition derived from the text.
	#[serde(default)]
	pub definition: String,
	/// Quote from the source text where the concept was identified.
	#[serde(default, rename = "sourceText")]
	pub source_text: String,
}

impl ConceptNode {
	/// Label for display; an empty label falls back to the id. The stored
	/// attribute itself is kept exactly as the backend sent it.
	pub fn display_label(&self) -> &str {
		if self.label.is_empty() {
			&self.id
		} else {
			&self.label
		}
	}
}

/// A directed relationship between two concepts. Identity is the ordered
/// `(source, target)` pair; a link and its reverse are distinct.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptLink {
	/// Id of the source node.
	pub source: String,
	/// Id of the target node.
	pub target: String,
	/// Relationship description, e.g. "is-a" or "part-of".
	#[serde(default)]
	pub label: String,
	/// Backend confidence in [0, 1]; absent means certain.
	#[serde(default)]
	pub confidence: Option<f64>,
}

impl ConceptLink {
	/// Ordered identity key.
	pub fn key(&self) -> (&str, &str) {
		(&self.source, &self.target)
	}

	/// Confidence with the absent-means-certain rule applied.
	pub fn effective_confidence(&self) -> f64 {
		self.confidence.unwrap_or(1.0)
	}
}

/// An ordered `(source, target)` reference returned by the ask capability.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LinkRef {
	/// Id of the source node.
	pub source: String,
	/// Id of the target node.
	pub target: String,
}

/// The canonical node/link collection, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGraph {
	/// Nodes in first-seen order.
	pub nodes: Vec<ConceptNode>,
	/// Links in first-seen order.
	pub links: Vec<ConceptLink>,
}

impl ConceptGraph {
	/// True when no nodes have been merged yet.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Look a node up by id.
	pub fn node(&self, id: &str) -> Option<&ConceptNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Sorted set of distinct domains present in the graph. Nodes without a
	/// domain are grouped under "Unknown".
	pub fn domains(&self) -> BTreeSet<&str> {
		self.nodes
			.iter()
			.map(|n| {
				if n.domain.is_empty() {
					"Unknown"
				} else {
					n.domain.as_str()
				}
			})
			.collect()
	}

	/// Ids of every node directly linked to `id`, in either direction.
	pub fn neighbors(&self, id: &str) -> HashSet<&str> {
		let mut out = HashSet::new();
		for link in &self.links {
			if link.source == id {
				out.insert(link.target.as_str());
			} else if link.target == id {
				out.insert(link.source.as_str());
			}
		}
		out
	}

	/// Resolve ids and link keys returned by the ask capability back to live
	/// objects, dropping any that no longer exist in this graph.
	pub fn resolve(
		&self,
		node_ids: &[String],
		link_refs: &[LinkRef],
	) -> (Vec<ConceptNode>, Vec<ConceptLink>) {
		let nodes = node_ids
			.iter()
			.filter_map(|id| self.node(id).cloned())
			.collect();
		let links = link_refs
			.iter()
			.filter_map(|r| {
				self.links
					.iter()
					.find(|l| l.key() == (r.source.as_str(), r.target.as_str()))
					.cloned()
			})
			.collect();
		(nodes, links)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: &str) -> ConceptNode {
		ConceptNode {
			id: id.into(),
			label: id.to_uppercase(),
			..Default::default()
		}
	}

	fn link(source: &str, target: &str) -> ConceptLink {
		ConceptLink {
			source: source.into(),
			target: target.into(),
			..Default::default()
		}
	}

	#[test]
	fn neighbors_cover_both_directions() {
		let graph = ConceptGraph {
			nodes: vec![node("a"), node("b"), node("c")],
			links: vec![link("a", "b"), link("b", "c")],
		};
		let around_b = graph.neighbors("b");
		assert_eq!(around_b, HashSet::from(["a", "c"]));
		assert_eq!(graph.neighbors("a"), HashSet::from(["b"]));
	}

	#[test]
	fn resolve_drops_stale_references() {
		let graph = ConceptGraph {
			nodes: vec![node("a"), node("b")],
			links: vec![link("a", "b")],
		};
		let (nodes, links) = graph.resolve(
			&["a".into(), "ghost".into()],
			&[
				LinkRef {
					source: "a".into(),
					target: "b".into(),
				},
				LinkRef {
					source: "b".into(),
					target: "a".into(),
				},
			],
		);
		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].id, "a");
		// The reverse pair is a different identity and was never stored.
		assert_eq!(links.len(), 1);
		assert_eq!(links[0].key(), ("a", "b"));
	}

	#[test]
	fn absent_confidence_means_certain() {
		assert_eq!(link("a", "b").effective_confidence(), 1.0);
	}
}
