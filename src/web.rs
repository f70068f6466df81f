//! [`Dom`] on top of [`web_sys`], and loading of the recorder's page-global buffer.
//!
//! The recorder is expected to leave an object like this on `window[ReplayOptions::buffer_global]`:
//!
//! ```js
//! {
//!   apps: [{
//!     root: { serverNode, clientSelector },
//!     events: [{ event, node, nodeKey }],          // `nodeKey` is optional.
//!     activeNode: { node, nodeKey, selection: { start, end, direction } }, // Optional, as are `nodeKey` and `selection`.
//!     listeners: [{ node, eventName, handler }],
//!   }],
//!   listeners: [{ node, eventName, handler }],   // Optional. Page-level registrations.
//! }
//! ```

use crate::{
	buffer::{ActiveNode, AppDescriptor, AppRoot, RecordedEvent, ReplayBuffer, SelectionDirection, SelectionRange},
	dom::Dom,
	error::ConfigError,
	key::NodeKey,
	options::ReplayOptions,
	replay::EventReplayer,
};
use core::{
	cell::Cell,
	convert::TryFrom,
	fmt::{self, Display, Formatter},
};
use js_sys::{Array, Function, Reflect};
use tracing::{debug, error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, Element, EventTarget, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlOptionElement, HtmlSelectElement, HtmlTextAreaElement, Node, Window};

/// A browser window's document.
#[derive(Debug, Clone)]
pub struct WebDom {
	window: Window,
	document: Document,
}
impl WebDom {
	/// # Errors
	///
	/// Iff `window` has no document.
	pub fn new(window: Window) -> Result<Self, LoadError> {
		let document = window.document().ok_or(LoadError::NoDocument)?;
		Ok(Self { window, document })
	}

	/// Uses the global `window`.
	///
	/// # Errors
	///
	/// Iff there's no global `window` or it has no document.
	pub fn from_global() -> Result<Self, LoadError> {
		Self::new(web_sys::window().ok_or(LoadError::NoWindow)?)
	}

	#[must_use]
	pub fn window(&self) -> &Window {
		&self.window
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

/// An `addEventListener` registration made by the recorder.
#[derive(Debug, Clone)]
pub struct WebListener {
	pub target: EventTarget,
	pub event_name: String,
	pub handler: Function,
}

fn not_an(expected: &str) -> JsValue {
	JsValue::from_str(&format!("hydration-replay: Expected {}.", expected))
}

impl Dom for WebDom {
	type Node = Node;
	type Event = web_sys::Event;
	type Listener = WebListener;
	type Error = JsValue;

	fn query_selector(&self, selector: &str) -> Result<Option<Node>, JsValue> {
		Ok(self.document.query_selector(selector)?.map(Into::into))
	}

	fn query_selector_all(&self, root: &Node, selector: &str) -> Result<Vec<Node>, JsValue> {
		let node_list = if let Some(element) = root.dyn_ref::<Element>() {
			element.query_selector_all(selector)?
		} else if let Some(document) = root.dyn_ref::<Document>() {
			document.query_selector_all(selector)?
		} else {
			return Err(not_an("an Element or Document to query"));
		};
		Ok((0..node_list.length()).filter_map(|i| node_list.get(i)).collect())
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.get(i)).collect()
	}

	fn node_name(&self, node: &Node) -> String {
		node.node_name()
	}

	fn tag_name(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>().map(Element::tag_name)
	}

	fn id(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>().map(Element::id).filter(|id| !id.is_empty())
	}

	fn class_list(&self, node: &Node) -> Vec<String> {
		// Not `className`, which is an `SVGAnimatedString` on SVG elements.
		node.dyn_ref::<Element>()
			.and_then(|element| element.get_attribute("class"))
			.map_or_else(Vec::new, |classes| classes.split_whitespace().map(ToOwned::to_owned).collect())
	}

	fn value(&self, node: &Node) -> Option<String> {
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			Some(input.value())
		} else if let Some(text_area) = node.dyn_ref::<HtmlTextAreaElement>() {
			Some(text_area.value())
		} else if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
			Some(select.value())
		} else if let Some(option) = node.dyn_ref::<HtmlOptionElement>() {
			Some(option.value())
		} else {
			node.dyn_ref::<HtmlButtonElement>().map(HtmlButtonElement::value)
		}
	}

	fn checked(&self, node: &Node) -> bool {
		node.dyn_ref::<HtmlInputElement>().map_or(false, HtmlInputElement::checked)
	}

	fn selected(&self, node: &Node) -> bool {
		node.dyn_ref::<HtmlOptionElement>().map_or(false, HtmlOptionElement::selected)
	}

	fn set_value(&self, node: &Node, value: Option<&str>) {
		let value = match value {
			Some(value) => value,
			None => return,
		};
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			input.set_value(value)
		} else if let Some(text_area) = node.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value)
		} else if let Some(select) = node.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value)
		} else if let Some(option) = node.dyn_ref::<HtmlOptionElement>() {
			option.set_value(value)
		} else if let Some(button) = node.dyn_ref::<HtmlButtonElement>() {
			button.set_value(value)
		}
	}

	fn set_checked(&self, node: &Node, checked: bool) {
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			input.set_checked(checked)
		}
	}

	fn set_selected(&self, node: &Node, selected: bool) {
		if let Some(option) = node.dyn_ref::<HtmlOptionElement>() {
			option.set_selected(selected)
		}
	}

	fn dispatch_event(&self, node: &Node, event: &web_sys::Event) -> Result<(), JsValue> {
		node.dispatch_event(event).map(drop)
	}

	fn computed_display(&self, node: &Node) -> Result<String, JsValue> {
		let element = node.dyn_ref::<Element>().ok_or_else(|| not_an("Element"))?;
		match self.window.get_computed_style(element)? {
			Some(style) => style.get_property_value("display"),
			None => Ok(String::new()),
		}
	}

	fn set_display(&self, node: &Node, display: &str) -> Result<(), JsValue> {
		node.dyn_ref::<HtmlElement>().ok_or_else(|| not_an("HtmlElement"))?.style().set_property("display", display)
	}

	fn supports_removal(&self, node: &Node) -> bool {
		Reflect::has(node, &JsValue::from_str("remove")).unwrap_or(false)
	}

	fn remove(&self, node: &Node) -> Result<(), JsValue> {
		match node.dyn_ref::<Element>() {
			Some(element) => {
				element.remove();
				Ok(())
			}
			None => match node.parent_node() {
				Some(parent) => parent.remove_child(node).map(drop),
				None => Err(not_an("attached node")),
			},
		}
	}

	fn focus(&self, node: &Node) -> Result<(), JsValue> {
		node.dyn_ref::<HtmlElement>().ok_or_else(|| not_an("HtmlElement"))?.focus()
	}

	fn supports_selection(&self, node: &Node) -> bool {
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			// `selectionStart` is `null` for input types without text selection.
			matches!(input.selection_start(), Ok(Some(_)))
		} else {
			node.dyn_ref::<HtmlTextAreaElement>().is_some()
		}
	}

	fn set_selection_range(&self, node: &Node, selection: &SelectionRange) -> Result<(), JsValue> {
		let &SelectionRange { start, end, direction } = selection;
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			input.set_selection_range_with_direction(start, end, direction.as_str())
		} else if let Some(text_area) = node.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_selection_range_with_direction(start, end, direction.as_str())
		} else {
			Err(not_an("HtmlInputElement or HtmlTextAreaElement"))
		}
	}

	fn remove_listener(&self, listener: &WebListener) -> Result<(), JsValue> {
		listener.target.remove_event_listener_with_callback(&listener.event_name, &listener.handler)
	}

	fn defer(&self, task: Box<dyn FnOnce()>) {
		let callback = Closure::once_into_js(move || task());
		if let Err(error) = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0) {
			error!("Could not schedule deferred task: {:?}", error);
		}
	}
}

/// Why the recorder buffer couldn't be turned into a [`ReplayBuffer`].
#[derive(Debug)]
pub enum LoadError {
	NoWindow,
	NoDocument,
	/// `window[buffer_global]` is missing.
	MissingBuffer { global: String },
	Malformed { path: String, expected: &'static str },
	Config { path: String, error: ConfigError },
}
impl Display for LoadError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			LoadError::NoWindow => write!(f, "no global window"),
			LoadError::NoDocument => write!(f, "window has no document"),
			LoadError::MissingBuffer { global } => write!(f, "no replay buffer at window.{}", global),
			LoadError::Malformed { path, expected } => write!(f, "malformed replay buffer: expected {} at {}", expected, path),
			LoadError::Config { path, error } => write!(f, "{} ({})", error, path),
		}
	}
}
impl std::error::Error for LoadError {}

fn get(object: &JsValue, key: &str) -> Option<JsValue> {
	Reflect::get(object, &JsValue::from_str(key)).ok().filter(|value| !value.is_undefined() && !value.is_null())
}

fn get_as<T: JsCast>(object: &JsValue, key: &str, path: &str, expected: &'static str) -> Result<T, LoadError> {
	get(object, key).and_then(|value| value.dyn_into::<T>().ok()).ok_or_else(|| LoadError::Malformed {
		path: format!("{}.{}", path, key),
		expected,
	})
}

/// Missing arrays are treated as empty.
fn get_array(object: &JsValue, key: &str, path: &str) -> Result<Vec<JsValue>, LoadError> {
	match get(object, key) {
		None => Ok(Vec::new()),
		Some(value) if Array::is_array(&value) => Ok(value.unchecked_into::<Array>().iter().collect()),
		Some(_) => Err(LoadError::Malformed {
			path: format!("{}.{}", path, key),
			expected: "an array",
		}),
	}
}

fn get_node_key(object: &JsValue, key: &str) -> Option<NodeKey> {
	get(object, key).and_then(|value| value.as_string()).filter(|key| !key.is_empty()).map(NodeKey::from)
}

/// Reads the recorder's buffer from `window[options.buffer_global]`.
///
/// Form state of each recorded target is read from the server node now, which is what it looked like when the client view took over.
///
/// # Errors
///
/// Iff the buffer is missing or doesn't have the expected shape, or an application lacks its root selector.
#[instrument(skip(dom))]
pub fn load_buffer(dom: &WebDom, options: &ReplayOptions) -> Result<ReplayBuffer<WebDom>, LoadError> {
	let global = options.buffer_global.as_str();
	let data = get(&dom.window, global).ok_or_else(|| LoadError::MissingBuffer { global: global.to_owned() })?;

	let mut buffer = ReplayBuffer::new();
	for (i, app) in get_array(&data, "apps", global)?.iter().enumerate() {
		let path = format!("{}.apps[{}]", global, i);
		buffer.apps.push(load_app(dom, app, &path)?);
	}
	buffer.listeners = load_listeners(&data, global)?;
	debug!("Loaded {} application(s) with {} event(s) in total.", buffer.apps.len(), buffer.event_count());
	Ok(buffer)
}

fn load_app(dom: &WebDom, app: &JsValue, path: &str) -> Result<AppDescriptor<WebDom>, LoadError> {
	let root_path = format!("{}.root", path);
	let root = get(app, "root").ok_or_else(|| LoadError::Malformed {
		path: root_path.clone(),
		expected: "an object",
	})?;
	let server_node = get(&root, "serverNode").and_then(|node| node.dyn_into::<Node>().ok());
	let client_selector = get(&root, "clientSelector").and_then(|selector| selector.as_string()).unwrap_or_default();
	let root = AppRoot::new(server_node, client_selector).map_err(|error| LoadError::Config { path: root_path, error })?;

	let mut descriptor = AppDescriptor::new(root);
	for (i, event) in get_array(app, "events", path)?.iter().enumerate() {
		let event_path = format!("{}.events[{}]", path, i);
		let node: Node = get_as(event, "node", &event_path, "a Node")?;
		let recorded = RecordedEvent::capture(dom, get_as(event, "event", &event_path, "an Event")?, node);
		descriptor.events.push(match get_node_key(event, "nodeKey") {
			Some(node_key) => recorded.with_node_key(node_key),
			None => recorded,
		});
	}

	if let Some(active_node) = get(app, "activeNode") {
		let active_path = format!("{}.activeNode", path);
		let mut active = ActiveNode::new(get_as(&active_node, "node", &active_path, "a Node")?);
		active.node_key = get_node_key(&active_node, "nodeKey");
		active.selection = get(&active_node, "selection").and_then(|selection| load_selection(&selection));
		descriptor.active_node = Some(active);
	}

	descriptor.listeners = load_listeners(app, path)?;
	Ok(descriptor)
}

fn load_selection(selection: &JsValue) -> Option<SelectionRange> {
	let offset = |key| get(selection, key).and_then(|value| value.as_f64()).filter(|offset| offset.is_finite() && *offset >= 0.0).and_then(|offset| u32::try_from(offset as u64).ok());
	Some(SelectionRange {
		start: offset("start")?,
		end: offset("end")?,
		direction: get(selection, "direction")
			.and_then(|direction| direction.as_string())
			.and_then(|direction| direction.parse().ok())
			.unwrap_or(SelectionDirection::None),
	})
}

fn load_listeners(object: &JsValue, path: &str) -> Result<Vec<WebListener>, LoadError> {
	get_array(object, "listeners", path)?
		.iter()
		.enumerate()
		.map(|(i, listener)| -> Result<WebListener, LoadError> {
			let listener_path = format!("{}.listeners[{}]", path, i);
			Ok(WebListener {
				target: get_as(listener, "node", &listener_path, "an EventTarget")?,
				event_name: get(listener, "eventName").and_then(|name| name.as_string()).ok_or_else(|| LoadError::Malformed {
					path: format!("{}.eventName", listener_path),
					expected: "a string",
				})?,
				handler: get_as(listener, "handler", &listener_path, "a Function")?,
			})
		})
		.collect()
}

thread_local! {
	static REPLAY_STARTED: Cell<bool> = Cell::new(false);
}

/// Loads the recorder buffer from the global `window`, clears it there and replays it.
///
/// Meant to be called once the client view has rendered. Only the first call on a page does anything,
/// so it's fine to call this from several initialization paths.
///
/// # Errors
///
/// Iff the buffer can't be loaded. Nothing has been replayed in that case.
#[instrument]
pub fn replay_now(options: ReplayOptions) -> Result<(), LoadError> {
	if REPLAY_STARTED.with(|started| started.replace(true)) {
		trace!("Replay already started.");
		return Ok(());
	}

	let dom = WebDom::from_global()?;
	let buffer = load_buffer(&dom, &options)?;
	if let Err(error) = Reflect::set(&dom.window, &JsValue::from_str(&options.buffer_global), &JsValue::UNDEFINED) {
		error!("Could not clear the replay buffer global: {:?}", error);
	}

	EventReplayer::new(dom, buffer, options).replay_all();
	Ok(())
}
