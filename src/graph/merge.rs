use std::collections::HashSet;

use log::debug;
use serde::Deserialize;

use super::model::{ConceptGraph, ConceptLink, ConceptNode, GraphError};

/// Unvalidated candidate set returned by an extraction backend. The optional
/// containers let a structurally incomplete payload be rejected here rather
/// than silently treated as empty.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawExtraction {
	/// Candidate nodes, if the payload carried the container at all.
	#[serde(default)]
	pub nodes: Option<Vec<ConceptNode>>,
	/// Candidate links, if the payload carried the container at all.
	#[serde(default)]
	pub links: Option<Vec<ConceptLink>>,
}

/// What a single merge accepted and dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
	/// Nodes appended to the graph.
	pub added_nodes: usize,
	/// Links appended to the graph.
	pub added_links: usize,
	/// Links discarded for referencing an unknown node id.
	pub dangling_links: usize,
}

impl ConceptGraph {
	/// Fold one chunk's extraction result into the graph.
	///
	/// Node identity is the id: the first chunk to introduce an id wins and
	/// later occurrences are discarded whole, so chunk arrival order decides
	/// attribute content but not set membership. Accepted attributes are
	/// stored exactly as received; display-level softening such as the
	/// empty-label fallback lives in [`ConceptNode::display_label`]. Links
	/// must reference ids known after this batch's nodes were accepted;
	/// dangling ones are dropped (counted, logged, never stored), as are
	/// duplicates of an ordered `(source, target)` key already present.
	/// Merging the same batch twice is a no-op the second time.
	///
	/// A payload missing either container fails with
	/// [`GraphError::MalformedExtraction`] before any mutation.
	pub fn merge(&mut self, incoming: RawExtraction) -> Result<MergeOutcome, GraphError> {
		let (Some(nodes), Some(links)) = (incoming.nodes, incoming.links) else {
			return Err(GraphError::MalformedExtraction);
		};

		let mut outcome = MergeOutcome::default();
		let mut known: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
		for node in nodes {
			if node.id.is_empty() || !known.insert(node.id.clone()) {
				continue;
			}
			self.nodes.push(node);
			outcome.added_nodes += 1;
		}

		let mut keys: HashSet<(String, String)> = self
			.links
			.iter()
			.map(|l| (l.source.clone(), l.target.clone()))
			.collect();
		for link in links {
			if !known.contains(&link.source) || !known.contains(&link.target) {
				debug!(
					"dropping link {} -> {}: unknown endpoint",
					link.source, link.target
				);
				outcome.dangling_links += 1;
				continue;
			}
			if keys.insert((link.source.clone(), link.target.clone())) {
				self.links.push(link);
				outcome.added_links += 1;
			}
		}
		Ok(outcome)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(nodes: &[(&str, &str)], links: &[(&str, &str)]) -> RawExtraction {
		RawExtraction {
			nodes: Some(
				nodes
					.iter()
					.map(|(id, label)| ConceptNode {
						id: (*id).into(),
						label: (*label).into(),
						..Default::default()
					})
					.collect(),
			),
			links: Some(
				links
					.iter()
					.map(|(s, t)| ConceptLink {
						source: (*s).into(),
						target: (*t).into(),
						..Default::default()
					})
					.collect(),
			),
		}
	}

	#[test]
	fn merge_is_idempotent() {
		let batch = raw(&[("a", "A"), ("b", "B")], &[("a", "b")]);
		let mut graph = ConceptGraph::default();
		graph.merge(batch.clone()).unwrap();
		let once = graph.clone();
		let second = graph.merge(batch).unwrap();
		assert_eq!(graph, once);
		assert_eq!(second, MergeOutcome::default());
	}

	#[test]
	fn first_seen_node_wins() {
		let mut graph = ConceptGraph::default();
		graph.merge(raw(&[("a", "X")], &[])).unwrap();
		graph.merge(raw(&[("a", "Y"), ("b", "B")], &[])).unwrap();
		assert_eq!(graph.node("a").unwrap().label, "X");
		assert_eq!(graph.nodes.len(), 2);
	}

	#[test]
	fn dangling_links_are_dropped() {
		let mut graph = ConceptGraph::default();
		let outcome = graph.merge(raw(&[("x", "X")], &[("x", "y")])).unwrap();
		assert_eq!(graph.nodes.len(), 1);
		assert!(graph.links.is_empty());
		assert_eq!(outcome.dangling_links, 1);
	}

	#[test]
	fn links_may_span_chunks() {
		// A later chunk may connect to nodes from an earlier one.
		let mut graph = ConceptGraph::default();
		graph.merge(raw(&[("a", "A")], &[])).unwrap();
		graph.merge(raw(&[("b", "B")], &[("b", "a")])).unwrap();
		assert_eq!(graph.links.len(), 1);
	}

	#[test]
	fn reverse_links_are_distinct() {
		let mut graph = ConceptGraph::default();
		graph
			.merge(raw(&[("a", "A"), ("b", "B")], &[("a", "b"), ("b", "a")]))
			.unwrap();
		assert_eq!(graph.links.len(), 2);
	}

	#[test]
	fn every_stored_link_references_known_nodes() {
		let mut graph = ConceptGraph::default();
		graph
			.merge(raw(
				&[("a", "A"), ("b", "B")],
				&[("a", "b"), ("a", "ghost"), ("ghost", "b")],
			))
			.unwrap();
		for link in &graph.links {
			assert!(graph.node(&link.source).is_some());
			assert!(graph.node(&link.target).is_some());
		}
	}

	#[test]
	fn missing_container_is_rejected_without_mutation() {
		let mut graph = ConceptGraph::default();
		graph.merge(raw(&[("a", "A")], &[])).unwrap();
		let before = graph.clone();
		let bad = RawExtraction {
			nodes: Some(vec![ConceptNode {
				id: "b".into(),
				..Default::default()
			}]),
			links: None,
		};
		assert_eq!(graph.merge(bad), Err(GraphError::MalformedExtraction));
		assert_eq!(graph, before);
	}

	#[test]
	fn empty_labels_are_stored_verbatim_and_fall_back_only_on_display() {
		let mut graph = ConceptGraph::default();
		let bare = RawExtraction {
			nodes: Some(vec![ConceptNode {
				id: "x".into(),
				..Default::default()
			}]),
			links: Some(vec![]),
		};
		graph.merge(bare).unwrap();
		let node = graph.node("x").unwrap();
		assert_eq!(node.label, "");
		assert_eq!(node.display_label(), "x");
	}
}
