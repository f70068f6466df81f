//! The document-tree capability the replay engine runs against.
//!
//! Everything in this crate that touches a document goes through [`Dom`], so the reconciliation logic is the same
//! whether it's driving a browser through [`web_sys`] ([`crate::web::WebDom`]) or an in-memory tree ([`crate::mem::MemoryDocument`]).

use crate::buffer::SelectionRange;
use core::fmt::Debug;

/// A handle to one document (or page), able to query and mutate its nodes.
///
/// All methods take `&self`: document trees are shared, interior-mutable structures on every platform this is implemented for.
pub trait Dom {
	/// A node of any kind (element, text, comment…). Equality is identity.
	type Node: Clone + PartialEq + Debug;
	/// A platform event that can be dispatched on any compatible [`Dom::Node`].
	type Event: Debug;
	/// A listener registration made by the recorder, detached once replay completes.
	type Listener: Debug;
	/// Whatever the platform reports when one of the mutating operations fails.
	type Error: Debug;

	/// Finds the first node in the whole document matching `selector`.
	///
	/// # Errors
	///
	/// Iff the selector can't be evaluated.
	fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>, Self::Error>;

	/// Finds all descendants of `root` matching `selector`, in document order. `root` itself is never included.
	///
	/// # Errors
	///
	/// Iff the selector can't be evaluated or `root` can't be queried.
	fn query_selector_all(&self, root: &Self::Node, selector: &str) -> Result<Vec<Self::Node>, Self::Error>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

	/// All child nodes of `node`, of every node type.
	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

	/// The DOM ***nodeName***, i.e. the upper-case tag name for HTML elements and `"#text"` etc. otherwise.
	fn node_name(&self, node: &Self::Node) -> String;

	/// [`None`] for anything that isn't an element.
	fn tag_name(&self, node: &Self::Node) -> Option<String>;

	/// The `id` attribute, if present and non-empty.
	fn id(&self, node: &Self::Node) -> Option<String>;

	/// The `class` attribute, split on whitespace. Empty for non-elements.
	fn class_list(&self, node: &Self::Node) -> Vec<String>;

	/// Current value of a form control, or [`None`] if `node` doesn't carry one.
	fn value(&self, node: &Self::Node) -> Option<String>;
	fn checked(&self, node: &Self::Node) -> bool;
	fn selected(&self, node: &Self::Node) -> bool;

	/// Sets the value of a form control. [`None`] means the recorded node carried no value at all.
	///
	/// Nodes without a value property are left unchanged.
	fn set_value(&self, node: &Self::Node, value: Option<&str>);
	/// Has no effect on nodes that can't be checked.
	fn set_checked(&self, node: &Self::Node, checked: bool);
	/// Has no effect on nodes that can't be selected.
	fn set_selected(&self, node: &Self::Node, selected: bool);

	/// Dispatches `event` on `node`, running the listeners registered there.
	///
	/// # Errors
	///
	/// Iff the platform rejects the dispatch, or a listener failure propagates out of it.
	fn dispatch_event(&self, node: &Self::Node, event: &Self::Event) -> Result<(), Self::Error>;

	/// The resolved ***display*** style of `node`. An empty string means the platform didn't report one.
	///
	/// # Errors
	///
	/// Iff the computed style can't be read at all.
	fn computed_display(&self, node: &Self::Node) -> Result<String, Self::Error>;

	/// Sets the inline ***display*** style of `node`.
	///
	/// # Errors
	///
	/// Iff `node` has no inline style to set.
	fn set_display(&self, node: &Self::Node, display: &str) -> Result<(), Self::Error>;

	/// Whether [`Dom::remove`] can be used on `node`. If not, callers hide the node instead.
	fn supports_removal(&self, node: &Self::Node) -> bool;

	/// Detaches `node` from its parent.
	///
	/// # Errors
	///
	/// Iff the platform fails to remove the node.
	fn remove(&self, node: &Self::Node) -> Result<(), Self::Error>;

	/// # Errors
	///
	/// Iff `node` can't receive focus.
	fn focus(&self, node: &Self::Node) -> Result<(), Self::Error>;

	/// Whether [`Dom::set_selection_range`] is available for `node`.
	fn supports_selection(&self, node: &Self::Node) -> bool;

	/// # Errors
	///
	/// Iff the platform rejects the range, for example because the control's type doesn't allow selection.
	fn set_selection_range(&self, node: &Self::Node, selection: &SelectionRange) -> Result<(), Self::Error>;

	/// Detaches a recorder listener. Detaching an already detached listener is harmless.
	///
	/// # Errors
	///
	/// Iff the platform rejects the removal.
	fn remove_listener(&self, listener: &Self::Listener) -> Result<(), Self::Error>;

	/// Runs `task` on the next scheduler tick, after the current synchronous work has been applied.
	fn defer(&self, task: Box<dyn FnOnce()>);

	/// Whether `node` is the document body, which is never swapped out.
	fn is_body(&self, node: &Self::Node) -> bool {
		self.node_name(node).eq_ignore_ascii_case("BODY")
	}

	/// A short human-readable description of `node` for diagnostics, like `<input#name-field.a.b>`.
	///
	/// With the `"dangerous-logging"` feature, the current form state is appended, which may contain personal data.
	fn describe(&self, node: &Self::Node) -> String {
		let mut description = match self.tag_name(node) {
			Some(tag_name) => {
				let mut description = format!("<{}", tag_name.to_ascii_lowercase());
				if let Some(id) = self.id(node) {
					description.push('#');
					description.push_str(&id);
				}
				for class in self.class_list(node) {
					description.push('.');
					description.push_str(&class);
				}
				description.push('>');
				description
			}
			None => self.node_name(node),
		};
		if cfg!(feature = "dangerous-logging") {
			description.push_str(&format!(" value={:?} checked={} selected={}", self.value(node), self.checked(node), self.selected(node)));
		}
		description
	}
}
