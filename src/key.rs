//! Structural fingerprints that identify "the same" node across two independently rendered trees.

use crate::dom::Dom;
use core::fmt::{self, Display, Formatter};

/// A node's position below its application root, plus its id or classes.
///
/// Rendered as dot-separated child indices from the root down, followed by `#id` or `.class.class`, e.g. `0.2#name-field`.
/// Indices count siblings of every node type, so text and comment nodes shift them too.
///
/// Keys of nodes in structurally diverging trees may collide. That's accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(String);
impl NodeKey {
	#[must_use]
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for NodeKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl From<String> for NodeKey {
	fn from(key: String) -> Self {
		Self(key)
	}
}
impl From<&str> for NodeKey {
	fn from(key: &str) -> Self {
		Self(key.to_owned())
	}
}

/// Derives `node`'s key relative to `root`.
///
/// Returns [`None`] iff either is absent, in which case no positional match should be attempted.
/// If `root` isn't an ancestor of `node`, the path runs up to the top of `node`'s tree instead.
#[must_use]
pub fn derive_key<D: Dom>(dom: &D, root: Option<&D::Node>, node: Option<&D::Node>) -> Option<NodeKey> {
	let (root, node) = (root?, node?);

	let mut indices = Vec::new();
	let mut current = node.clone();
	while current != *root {
		let parent = match dom.parent_node(&current) {
			Some(parent) => parent,
			None => break,
		};
		match dom.child_nodes(&parent).iter().position(|sibling| *sibling == current) {
			Some(index) => indices.push(index),
			None => break,
		}
		current = parent;
	}

	let mut key = indices.iter().rev().map(ToString::to_string).collect::<Vec<_>>().join(".");
	if let Some(id) = dom.id(node) {
		key.push('#');
		key.push_str(&id);
	} else {
		let mut classes = dom.class_list(node);
		classes.sort_unstable();
		for class in classes {
			key.push('.');
			key.push_str(&class);
		}
	}
	Some(NodeKey(key))
}
