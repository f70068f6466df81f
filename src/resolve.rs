//! Finds the client-side counterpart of a server-side node.
//!
//! The approach:
//!
//! 1. take the tag name of the server node (e.g. `INPUT`),
//! 2. add either its id (`INPUT#name`) or its classes minus ignored ones (`INPUT.a.b`),
//! 3. select all matching client nodes with that (falling back to the bare tag name if there are none),
//! 4. derive each candidate's key against the client root,
//! 5. and take the first whose key equals the server node's.
//!
//! This only works while the client view is nearly identical in structure to the server view.

use crate::{
	buffer::AppRoot,
	dom::Dom,
	error::ResolveError,
	key::{derive_key, NodeKey},
};
use hashbrown::HashMap;
use tracing::{debug, instrument, trace, warn};

/// Resolves server nodes of one application, pinning each key to the first client node found for it.
///
/// `ignored_classes` are left out of the selector only. Keys always cover the full class list.
///
/// Scoped to one replay pass: the cache is never invalidated, since the client tree is assumed stable once replay begins.
pub struct Resolver<D: Dom> {
	cache: HashMap<NodeKey, D::Node>,
	ignored_classes: Vec<String>,
}
impl<D: Dom> Default for Resolver<D> {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}
impl<D: Dom> core::fmt::Debug for Resolver<D> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Resolver").field("cache", &self.cache).field("ignored_classes", &self.ignored_classes).finish()
	}
}
impl<D: Dom> Resolver<D> {
	#[must_use]
	pub fn new(ignored_classes: Vec<String>) -> Self {
		Self {
			cache: HashMap::new(),
			ignored_classes,
		}
	}

	/// Finds the client node corresponding to `server_node` below `root`'s client root.
	///
	/// `node_key` is used as-is if present, otherwise it's derived against the server root.
	///
	/// # Errors
	///
	/// See [`ResolveError`]. Ambiguous candidates are never guessed between.
	#[instrument(skip(self, dom, root, server_node), fields(selector = root.client_selector()))]
	pub fn resolve(&mut self, dom: &D, root: &AppRoot<D>, server_node: &D::Node, node_key: Option<&NodeKey>) -> Result<D::Node, ResolveError> {
		let (server_root, client_root) = match (&root.server_node, &root.client_node) {
			(Some(server_root), Some(client_root)) => (server_root, client_root),
			_ => return Err(ResolveError::MissingRoot),
		};

		let key = match node_key {
			Some(key) => key.clone(),
			None => derive_key(dom, Some(server_root), Some(server_node)).ok_or(ResolveError::MissingKey)?,
		};

		if let Some(cached) = self.cache.get(&key) {
			trace!("Cache hit for {}.", key);
			return Ok(cached.clone());
		}

		let tag_name = match dom.tag_name(server_node) {
			Some(tag_name) => tag_name,
			None => return Err(ResolveError::NotAnElement { key }),
		};
		let classes: Vec<String> = dom.class_list(server_node).into_iter().filter(|class| !self.ignored_classes.contains(class)).collect();
		let selector = build_selector(&tag_name, dom.id(server_node).as_deref(), &classes);

		let mut candidates = query(dom, client_root, &selector);
		if candidates.is_empty() && selector != tag_name {
			debug!("Nothing found for {} so using {}.", selector, tag_name);
			candidates = query(dom, client_root, &tag_name);
		}

		for candidate in &candidates {
			if derive_key(dom, Some(client_root), Some(candidate)).as_ref() == Some(&key) {
				trace!("Exact match for {}.", key);
				self.cache.insert(key, candidate.clone());
				return Ok(candidate.clone());
			}
		}

		if let [only] = candidates.as_slice() {
			debug!("No exact match for {}. Falling back to the only candidate.", key);
			self.cache.insert(key, only.clone());
			return Ok(only.clone());
		}

		let error = ResolveError::NoMatch {
			key,
			selector,
			candidates: candidates.len(),
		};
		debug!("{}", error);
		Err(error)
	}

	/// Number of pinned resolutions.
	#[must_use]
	pub fn len(&self) -> usize {
		self.cache.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	pub fn clear(&mut self) {
		self.cache.clear()
	}
}

fn query<D: Dom>(dom: &D, root: &D::Node, selector: &str) -> Vec<D::Node> {
	dom.query_selector_all(root, selector).unwrap_or_else(|error| {
		warn!("Could not query client nodes with {:?}: {:?}", selector, error);
		Vec::new()
	})
}

/// Builds `tag#id`, or `tag.class.class` if there's no id, or just `tag`.
#[must_use]
pub fn build_selector(tag_name: &str, id: Option<&str>, classes: &[String]) -> String {
	let mut selector = tag_name.to_owned();
	match id {
		Some(id) if !id.is_empty() => {
			selector.push('#');
			selector.push_str(&escape_css_identifier(id));
		}
		_ => {
			for class in classes.iter().filter(|class| !class.is_empty()) {
				selector.push('.');
				selector.push_str(&escape_css_identifier(class));
			}
		}
	}
	selector
}

/// Serializes `identifier` so it can be used in a selector verbatim,
/// following [***CSS.escape()***](https://drafts.csswg.org/cssom/#serialize-an-identifier).
#[must_use]
pub fn escape_css_identifier(identifier: &str) -> String {
	let mut escaped = String::with_capacity(identifier.len());
	let starts_with_hyphen = identifier.starts_with('-');
	for (i, c) in identifier.chars().enumerate() {
		match c {
			'\0' => escaped.push('\u{FFFD}'),
			'\u{1}'..='\u{1F}' | '\u{7F}' => escaped.push_str(&format!("\\{:x} ", c as u32)),
			'0'..='9' if i == 0 || (i == 1 && starts_with_hyphen) => escaped.push_str(&format!("\\{:x} ", c as u32)),
			'-' if i == 0 && identifier.len() == 1 => escaped.push_str("\\-"),
			c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => escaped.push(c),
			c => {
				escaped.push('\\');
				escaped.push(c);
			}
		}
	}
	escaped
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selector_prefers_id() {
		assert_eq!(build_selector("INPUT", Some("name"), &["a".to_owned()]), "INPUT#name");
		assert_eq!(build_selector("DIV", None, &["a".to_owned(), "b".to_owned()]), "DIV.a.b");
		assert_eq!(build_selector("SPAN", None, &[]), "SPAN");
	}

	#[test]
	fn escapes() {
		assert_eq!(escape_css_identifier("name-field"), "name-field");
		assert_eq!(escape_css_identifier("a:b"), "a\\:b");
		assert_eq!(escape_css_identifier("1st"), "\\31 st");
		assert_eq!(escape_css_identifier("-2"), "-\\32 ");
		assert_eq!(escape_css_identifier("-"), "\\-");
		assert_eq!(escape_css_identifier("größe"), "größe");
	}
}
