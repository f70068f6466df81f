//! What the recorder hands over: one [`ReplayBuffer`] per page, consumed exactly once by [`crate::replay::EventReplayer`].

use crate::{dom::Dom, error::ConfigError, key::NodeKey};
use core::{fmt, str::FromStr};

/// Everything recorded on one page before the client view took over.
#[derive(Debug)]
pub struct ReplayBuffer<D: Dom> {
	/// Replayed in this order.
	pub apps: Vec<AppDescriptor<D>>,
	/// Listener registrations not owned by any one application. Detached at cleanup along with the per-application ones.
	pub listeners: Vec<D::Listener>,
}
impl<D: Dom> Default for ReplayBuffer<D> {
	fn default() -> Self {
		Self::new()
	}
}
impl<D: Dom> ReplayBuffer<D> {
	#[must_use]
	pub fn new() -> Self {
		Self { apps: Vec::new(), listeners: Vec::new() }
	}

	#[must_use]
	pub fn with_app(mut self, app: AppDescriptor<D>) -> Self {
		self.apps.push(app);
		self
	}

	/// Total number of recorded events across all applications.
	#[must_use]
	pub fn event_count(&self) -> usize {
		self.apps.iter().map(|app| app.events.len()).sum()
	}
}

/// One independently server-rendered application on the page.
#[derive(Debug)]
pub struct AppDescriptor<D: Dom> {
	pub root: AppRoot<D>,
	/// In capture order.
	pub events: Vec<RecordedEvent<D>>,
	/// The node that had focus when the client view took over, if it was inside this application.
	pub active_node: Option<ActiveNode<D>>,
	pub listeners: Vec<D::Listener>,
}
impl<D: Dom> AppDescriptor<D> {
	#[must_use]
	pub fn new(root: AppRoot<D>) -> Self {
		Self {
			root,
			events: Vec::new(),
			active_node: None,
			listeners: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_event(mut self, event: RecordedEvent<D>) -> Self {
		self.events.push(event);
		self
	}

	#[must_use]
	pub fn with_active_node(mut self, active_node: ActiveNode<D>) -> Self {
		self.active_node = Some(active_node);
		self
	}

	#[must_use]
	pub fn with_listener(mut self, listener: D::Listener) -> Self {
		self.listeners.push(listener);
		self
	}
}

/// The server-rendered and client-rendered root of one application.
pub struct AppRoot<D: Dom> {
	pub server_node: Option<D::Node>,
	/// Unresolved until replay re-queries [`AppRoot::client_selector`].
	pub client_node: Option<D::Node>,
	client_selector: String,
}
impl<D: Dom> AppRoot<D> {
	/// # Errors
	///
	/// Iff `client_selector` is empty or only whitespace, since the client view could never be found.
	pub fn new(server_node: Option<D::Node>, client_selector: impl Into<String>) -> Result<Self, ConfigError> {
		let client_selector = client_selector.into();
		if client_selector.trim().is_empty() {
			return Err(ConfigError::MissingRootSelector);
		}
		Ok(Self {
			server_node,
			client_node: None,
			client_selector,
		})
	}

	#[must_use]
	pub fn client_selector(&self) -> &str {
		&self.client_selector
	}
}
impl<D: Dom> Clone for AppRoot<D> {
	fn clone(&self) -> Self {
		Self {
			server_node: self.server_node.clone(),
			client_node: self.client_node.clone(),
			client_selector: self.client_selector.clone(),
		}
	}
}
impl<D: Dom> fmt::Debug for AppRoot<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AppRoot")
			.field("server_node", &self.server_node)
			.field("client_node", &self.client_node)
			.field("client_selector", &self.client_selector)
			.finish()
	}
}

/// One captured interaction.
pub struct RecordedEvent<D: Dom> {
	pub event: D::Event,
	/// The server-side target.
	pub node: D::Node,
	/// Recomputed against the server root when absent.
	pub node_key: Option<NodeKey>,
	/// Transient state of [`RecordedEvent::node`] at capture time.
	pub state: NodeState,
}
impl<D: Dom> RecordedEvent<D> {
	#[must_use]
	pub fn new(event: D::Event, node: D::Node, state: NodeState) -> Self {
		Self { event, node, node_key: None, state }
	}

	/// Captures `node`'s current state from `dom`.
	#[must_use]
	pub fn capture(dom: &D, event: D::Event, node: D::Node) -> Self {
		let state = NodeState::capture(dom, &node);
		Self::new(event, node, state)
	}

	#[must_use]
	pub fn with_node_key(mut self, node_key: NodeKey) -> Self {
		self.node_key = Some(node_key);
		self
	}
}
impl<D: Dom> fmt::Debug for RecordedEvent<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordedEvent")
			.field("event", &self.event)
			.field("node", &self.node)
			.field("node_key", &self.node_key)
			.field("state", &self.state)
			.finish()
	}
}

/// Form state carried over from a server node to its client counterpart.
///
/// `checked` and `selected` are always transferred, so that a `false` here clears a client-side default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
	/// [`None`] if the node has no value property at all.
	pub value: Option<String>,
	pub checked: bool,
	pub selected: bool,
}
impl NodeState {
	#[must_use]
	pub fn capture<D: Dom>(dom: &D, node: &D::Node) -> Self {
		Self {
			value: dom.value(node),
			checked: dom.checked(node),
			selected: dom.selected(node),
		}
	}

	#[must_use]
	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	#[must_use]
	pub fn with_checked(mut self, checked: bool) -> Self {
		self.checked = checked;
		self
	}

	#[must_use]
	pub fn with_selected(mut self, selected: bool) -> Self {
		self.selected = selected;
		self
	}
}

/// The node that held focus, and its text selection if there was one.
pub struct ActiveNode<D: Dom> {
	pub node: D::Node,
	pub node_key: Option<NodeKey>,
	pub selection: Option<SelectionRange>,
}
impl<D: Dom> ActiveNode<D> {
	#[must_use]
	pub fn new(node: D::Node) -> Self {
		Self {
			node,
			node_key: None,
			selection: None,
		}
	}

	#[must_use]
	pub fn with_node_key(mut self, node_key: NodeKey) -> Self {
		self.node_key = Some(node_key);
		self
	}

	#[must_use]
	pub fn with_selection(mut self, selection: SelectionRange) -> Self {
		self.selection = Some(selection);
		self
	}
}
impl<D: Dom> fmt::Debug for ActiveNode<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActiveNode")
			.field("node", &self.node)
			.field("node_key", &self.node_key)
			.field("selection", &self.selection)
			.finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
	pub start: u32,
	pub end: u32,
	pub direction: SelectionDirection,
}

/// See [***selectionDirection***](https://developer.mozilla.org/en-US/docs/Web/API/HTMLInputElement/selectionDirection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDirection {
	Forward,
	Backward,
	None,
}
impl Default for SelectionDirection {
	fn default() -> Self {
		Self::None
	}
}
impl SelectionDirection {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			SelectionDirection::Forward => "forward",
			SelectionDirection::Backward => "backward",
			SelectionDirection::None => "none",
		}
	}
}
impl FromStr for SelectionDirection {
	type Err = core::convert::Infallible;

	/// Browsers treat anything unrecognised as `"none"`, and so does this.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"forward" => SelectionDirection::Forward,
			"backward" => SelectionDirection::Backward,
			_ => SelectionDirection::None,
		})
	}
}
