//! An in-memory document tree implementing [`Dom`].
//!
//! Useful for running replay outside a browser (for example against a server-side document) and for tests.
//! Supports the selector subset replay itself produces: compound selectors of a tag name, `#id` and `.class` parts, optionally grouped with `,`.

use crate::{buffer::SelectionRange, dom::Dom};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Display, Formatter},
};
use std::{collections::VecDeque, rc::Rc};

/// Handle to a node of a [`MemoryDocument`]. Only meaningful together with the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemNode(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemEvent {
	event_type: String,
}
impl MemEvent {
	#[must_use]
	pub fn new(event_type: impl Into<String>) -> Self {
		Self { event_type: event_type.into() }
	}

	#[must_use]
	pub fn event_type(&self) -> &str {
		&self.event_type
	}
}

/// A listener registration, as returned by [`MemoryDocument::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemListener {
	node: MemNode,
	id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
	UnsupportedSelector(String),
	NotAnElement(MemNode),
	NotFocusable(MemNode),
	SelectionUnsupported(MemNode),
	NoParent(MemNode),
	/// A listener failed while an event was being dispatched.
	Listener { event_type: String, message: String },
}
impl Display for MemError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			MemError::UnsupportedSelector(selector) => write!(f, "unsupported selector: {:?}", selector),
			MemError::NotAnElement(node) => write!(f, "{:?} is not an element", node),
			MemError::NotFocusable(node) => write!(f, "{:?} can't be focused", node),
			MemError::SelectionUnsupported(node) => write!(f, "{:?} has no text selection", node),
			MemError::NoParent(node) => write!(f, "{:?} has no parent", node),
			MemError::Listener { event_type, message } => write!(f, "{} listener failed: {}", event_type, message),
		}
	}
}
impl std::error::Error for MemError {}

type Handler = Rc<dyn Fn(&MemEvent) -> Result<(), String>>;

#[derive(Debug)]
enum Kind {
	Document,
	Element(ElementData),
	Text(String),
	Comment(String),
}

#[derive(Debug, Default)]
struct ElementData {
	tag_name: String,
	attributes: Vec<(String, String)>,
	value: Option<String>,
	checked: bool,
	selected: bool,
	display: Option<String>,
	selection: Option<SelectionRange>,
}
impl ElementData {
	fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	fn is(&self, tag_name: &str) -> bool {
		self.tag_name.eq_ignore_ascii_case(tag_name)
	}

	fn has_value(&self) -> bool {
		["input", "textarea", "select", "option", "button"].iter().any(|tag_name| self.is(tag_name))
	}

	fn is_checkable(&self) -> bool {
		self.is("input")
	}

	fn has_selection(&self) -> bool {
		self.is("textarea")
			|| self.is("input") && !matches!(self.attribute("type").map(str::to_ascii_lowercase).as_deref(), Some("checkbox" | "radio" | "button" | "submit" | "hidden"))
	}

	fn default_display(&self) -> &'static str {
		const BLOCK: &[&str] = &[
			"address", "article", "aside", "body", "div", "fieldset", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "html", "main", "nav", "ol", "p", "section", "ul",
		];
		const INLINE_BLOCK: &[&str] = &["button", "input", "select", "textarea"];
		if BLOCK.iter().any(|tag_name| self.is(tag_name)) {
			"block"
		} else if INLINE_BLOCK.iter().any(|tag_name| self.is(tag_name)) {
			"inline-block"
		} else if self.is("li") {
			"list-item"
		} else {
			"inline"
		}
	}
}

#[derive(Debug)]
struct NodeData {
	parent: Option<MemNode>,
	children: Vec<MemNode>,
	kind: Kind,
}

struct Listener {
	id: usize,
	node: MemNode,
	event_type: String,
	handler: Handler,
}

struct Inner {
	nodes: Vec<NodeData>,
	body: MemNode,
	listeners: Vec<Listener>,
	next_listener_id: usize,
	active_element: Option<MemNode>,
	deferred: VecDeque<Box<dyn FnOnce()>>,
	dispatched: Vec<(MemNode, String)>,
	removal_supported: bool,
}

/// A shared, mutable document. Clones refer to the same document.
#[derive(Clone)]
pub struct MemoryDocument(Rc<RefCell<Inner>>);
impl Debug for MemoryDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let inner = self.0.borrow();
		f.debug_struct("MemoryDocument")
			.field("nodes", &inner.nodes.len())
			.field("listeners", &inner.listeners.len())
			.field("deferred", &inner.deferred.len())
			.finish()
	}
}
impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}
impl MemoryDocument {
	/// Creates a document with an `<html>` element containing an empty `<body>`.
	#[must_use]
	pub fn new() -> Self {
		let document = Self(Rc::new(RefCell::new(Inner {
			nodes: vec![NodeData {
				parent: None,
				children: Vec::new(),
				kind: Kind::Document,
			}],
			body: MemNode(0),
			listeners: Vec::new(),
			next_listener_id: 0,
			active_element: None,
			deferred: VecDeque::new(),
			dispatched: Vec::new(),
			removal_supported: true,
		})));
		let html = document.create_element(&document.document(), "html");
		let body = document.create_element(&html, "body");
		document.0.borrow_mut().body = body;
		document
	}

	#[must_use]
	pub fn document(&self) -> MemNode {
		MemNode(0)
	}

	#[must_use]
	pub fn body(&self) -> MemNode {
		self.0.borrow().body
	}

	/// Appends a new element to `parent`. The tag name is stored as given and compared case-insensitively.
	pub fn create_element(&self, parent: &MemNode, tag_name: &str) -> MemNode {
		self.append(
			parent,
			Kind::Element(ElementData {
				tag_name: tag_name.to_owned(),
				..ElementData::default()
			}),
		)
	}

	pub fn append_text(&self, parent: &MemNode, text: &str) -> MemNode {
		self.append(parent, Kind::Text(text.to_owned()))
	}

	pub fn append_comment(&self, parent: &MemNode, comment: &str) -> MemNode {
		self.append(parent, Kind::Comment(comment.to_owned()))
	}

	fn append(&self, parent: &MemNode, kind: Kind) -> MemNode {
		let mut inner = self.0.borrow_mut();
		let node = MemNode(inner.nodes.len());
		inner.nodes.push(NodeData {
			parent: Some(*parent),
			children: Vec::new(),
			kind,
		});
		inner.nodes[parent.0].children.push(node);
		node
	}

	/// Sets an attribute. `value` also sets the initial value of form controls, `checked` and `selected` their flags.
	pub fn set_attribute(&self, node: &MemNode, name: &str, value: &str) {
		self.with_element_mut(node, |element| {
			match name {
				"value" if element.has_value() => element.value = Some(value.to_owned()),
				"checked" if element.is_checkable() => element.checked = true,
				"selected" if element.is("option") => element.selected = true,
				_ => (),
			}
			match element.attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => *existing = value.to_owned(),
				None => element.attributes.push((name.to_owned(), value.to_owned())),
			}
		});
	}

	#[must_use]
	pub fn attribute(&self, node: &MemNode, name: &str) -> Option<String> {
		self.with_element(node, |element| element.attribute(name).map(ToOwned::to_owned)).flatten()
	}

	/// The inline ***display*** style, as opposed to [`Dom::computed_display`].
	#[must_use]
	pub fn inline_display(&self, node: &MemNode) -> Option<String> {
		self.with_element(node, |element| element.display.clone()).flatten()
	}

	/// Text content of a text or comment node.
	#[must_use]
	pub fn text(&self, node: &MemNode) -> Option<String> {
		match &self.0.borrow().nodes[node.0].kind {
			Kind::Text(text) | Kind::Comment(text) => Some(text.clone()),
			Kind::Document | Kind::Element(_) => None,
		}
	}

	/// Whether `node` is (still) connected to the document.
	#[must_use]
	pub fn is_attached(&self, node: &MemNode) -> bool {
		let inner = self.0.borrow();
		let mut current = *node;
		loop {
			if current == MemNode(0) {
				return true;
			}
			match inner.nodes[current.0].parent {
				Some(parent) => current = parent,
				None => return false,
			}
		}
	}

	/// Makes [`Dom::supports_removal`] report `supported`, to emulate platforms without ***ChildNode.remove()***.
	pub fn set_removal_supported(&self, supported: bool) {
		self.0.borrow_mut().removal_supported = supported;
	}

	/// Registers `handler` for `event_type` on `node`. Listeners on ancestors see events dispatched on descendants.
	///
	/// A handler returning [`Err`] fails the dispatch, after which further listeners don't run.
	pub fn add_event_listener(&self, node: &MemNode, event_type: &str, handler: impl Fn(&MemEvent) -> Result<(), String> + 'static) -> MemListener {
		let mut inner = self.0.borrow_mut();
		let id = inner.next_listener_id;
		inner.next_listener_id += 1;
		inner.listeners.push(Listener {
			id,
			node: *node,
			event_type: event_type.to_owned(),
			handler: Rc::new(handler),
		});
		MemListener { node: *node, id }
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.0.borrow().listeners.len()
	}

	/// Every dispatch so far, as target and event type, in order.
	#[must_use]
	pub fn dispatched(&self) -> Vec<(MemNode, String)> {
		self.0.borrow().dispatched.clone()
	}

	#[must_use]
	pub fn active_element(&self) -> Option<MemNode> {
		self.0.borrow().active_element
	}

	#[must_use]
	pub fn selection(&self, node: &MemNode) -> Option<SelectionRange> {
		self.with_element(node, |element| element.selection).flatten()
	}

	#[must_use]
	pub fn pending_deferred(&self) -> usize {
		self.0.borrow().deferred.len()
	}

	/// Runs deferred tasks until none are left, including ones deferred while doing so. Returns how many ran.
	pub fn run_deferred(&self) -> usize {
		let mut count = 0;
		loop {
			let task = self.0.borrow_mut().deferred.pop_front();
			match task {
				Some(task) => {
					task();
					count += 1;
				}
				None => return count,
			}
		}
	}

	fn with_element<T>(&self, node: &MemNode, f: impl FnOnce(&ElementData) -> T) -> Option<T> {
		match &self.0.borrow().nodes[node.0].kind {
			Kind::Element(element) => Some(f(element)),
			_ => None,
		}
	}

	fn with_element_mut<T>(&self, node: &MemNode, f: impl FnOnce(&mut ElementData) -> T) -> Option<T> {
		match &mut self.0.borrow_mut().nodes[node.0].kind {
			Kind::Element(element) => Some(f(element)),
			_ => None,
		}
	}

	fn descendants(&self, root: &MemNode) -> Vec<MemNode> {
		let inner = self.0.borrow();
		let mut descendants = Vec::new();
		let mut stack: Vec<MemNode> = inner.nodes[root.0].children.iter().rev().copied().collect();
		while let Some(node) = stack.pop() {
			descendants.push(node);
			stack.extend(inner.nodes[node.0].children.iter().rev().copied());
		}
		descendants
	}

	fn matches(&self, node: &MemNode, groups: &[Vec<SimpleSelector>]) -> bool {
		self.with_element(node, |element| {
			groups.iter().any(|compound| {
				compound.iter().all(|simple| match simple {
					SimpleSelector::Universal => true,
					SimpleSelector::Tag(tag_name) => element.is(tag_name),
					SimpleSelector::Id(id) => element.attribute("id") == Some(id.as_str()),
					SimpleSelector::Class(class) => element.attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class)),
				})
			})
		})
		.unwrap_or(false)
	}
}

impl Dom for MemoryDocument {
	type Node = MemNode;
	type Event = MemEvent;
	type Listener = MemListener;
	type Error = MemError;

	fn query_selector(&self, selector: &str) -> Result<Option<MemNode>, MemError> {
		Ok(self.query_selector_all(&self.document(), selector)?.into_iter().next())
	}

	fn query_selector_all(&self, root: &MemNode, selector: &str) -> Result<Vec<MemNode>, MemError> {
		let groups = parse_selector(selector)?;
		Ok(self.descendants(root).into_iter().filter(|node| self.matches(node, &groups)).collect())
	}

	fn parent_node(&self, node: &MemNode) -> Option<MemNode> {
		self.0.borrow().nodes[node.0].parent
	}

	fn child_nodes(&self, node: &MemNode) -> Vec<MemNode> {
		self.0.borrow().nodes[node.0].children.clone()
	}

	fn node_name(&self, node: &MemNode) -> String {
		match &self.0.borrow().nodes[node.0].kind {
			Kind::Document => "#document".to_owned(),
			Kind::Element(element) => element.tag_name.to_ascii_uppercase(),
			Kind::Text(_) => "#text".to_owned(),
			Kind::Comment(_) => "#comment".to_owned(),
		}
	}

	fn tag_name(&self, node: &MemNode) -> Option<String> {
		self.with_element(node, |element| element.tag_name.to_ascii_uppercase())
	}

	fn id(&self, node: &MemNode) -> Option<String> {
		self.attribute(node, "id").filter(|id| !id.is_empty())
	}

	fn class_list(&self, node: &MemNode) -> Vec<String> {
		self.attribute(node, "class").map_or_else(Vec::new, |classes| classes.split_whitespace().map(ToOwned::to_owned).collect())
	}

	fn value(&self, node: &MemNode) -> Option<String> {
		self.with_element(node, |element| if element.has_value() { Some(element.value.clone().unwrap_or_default()) } else { None }).flatten()
	}

	fn checked(&self, node: &MemNode) -> bool {
		self.with_element(node, |element| element.checked).unwrap_or(false)
	}

	fn selected(&self, node: &MemNode) -> bool {
		self.with_element(node, |element| element.selected).unwrap_or(false)
	}

	fn set_value(&self, node: &MemNode, value: Option<&str>) {
		if let Some(value) = value {
			self.with_element_mut(node, |element| {
				if element.has_value() {
					element.value = Some(value.to_owned())
				}
			});
		}
	}

	fn set_checked(&self, node: &MemNode, checked: bool) {
		self.with_element_mut(node, |element| {
			if element.is_checkable() {
				element.checked = checked
			}
		});
	}

	fn set_selected(&self, node: &MemNode, selected: bool) {
		self.with_element_mut(node, |element| {
			if element.is("option") {
				element.selected = selected
			}
		});
	}

	fn dispatch_event(&self, node: &MemNode, event: &MemEvent) -> Result<(), MemError> {
		let handlers: Vec<Handler> = {
			let mut inner = self.0.borrow_mut();
			inner.dispatched.push((*node, event.event_type.clone()));

			let mut path = vec![*node];
			let mut current = *node;
			while let Some(parent) = inner.nodes[current.0].parent {
				path.push(parent);
				current = parent;
			}
			path.iter()
				.flat_map(|target| {
					inner
						.listeners
						.iter()
						.filter(move |listener| listener.node == *target && listener.event_type == event.event_type)
						.map(|listener| listener.handler.clone())
				})
				.collect()
		};

		for handler in handlers {
			handler(event).map_err(|message| MemError::Listener {
				event_type: event.event_type.clone(),
				message,
			})?;
		}
		Ok(())
	}

	fn computed_display(&self, node: &MemNode) -> Result<String, MemError> {
		self.with_element(node, |element| element.display.clone().unwrap_or_else(|| element.default_display().to_owned()))
			.ok_or(MemError::NotAnElement(*node))
	}

	fn set_display(&self, node: &MemNode, display: &str) -> Result<(), MemError> {
		self.with_element_mut(node, |element| element.display = Some(display.to_owned())).ok_or(MemError::NotAnElement(*node))
	}

	fn supports_removal(&self, _node: &MemNode) -> bool {
		self.0.borrow().removal_supported
	}

	fn remove(&self, node: &MemNode) -> Result<(), MemError> {
		let mut inner = self.0.borrow_mut();
		let parent = inner.nodes[node.0].parent.take().ok_or(MemError::NoParent(*node))?;
		inner.nodes[parent.0].children.retain(|child| child != node);
		Ok(())
	}

	fn focus(&self, node: &MemNode) -> Result<(), MemError> {
		if self.tag_name(node).is_none() || !self.is_attached(node) {
			return Err(MemError::NotFocusable(*node));
		}
		self.0.borrow_mut().active_element = Some(*node);
		Ok(())
	}

	fn supports_selection(&self, node: &MemNode) -> bool {
		self.with_element(node, ElementData::has_selection).unwrap_or(false)
	}

	fn set_selection_range(&self, node: &MemNode, selection: &SelectionRange) -> Result<(), MemError> {
		self.with_element_mut(node, |element| {
			if element.has_selection() {
				element.selection = Some(*selection);
				Ok(())
			} else {
				Err(MemError::SelectionUnsupported(*node))
			}
		})
		.unwrap_or(Err(MemError::SelectionUnsupported(*node)))
	}

	fn remove_listener(&self, listener: &MemListener) -> Result<(), MemError> {
		self.0.borrow_mut().listeners.retain(|registered| !(registered.id == listener.id && registered.node == listener.node));
		Ok(())
	}

	fn defer(&self, task: Box<dyn FnOnce()>) {
		self.0.borrow_mut().deferred.push_back(task)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
	Universal,
	Tag(String),
	Id(String),
	Class(String),
}

/// Parses `,`-separated compound selectors, unescaping CSS escapes in names.
fn parse_selector(selector: &str) -> Result<Vec<Vec<SimpleSelector>>, MemError> {
	let unsupported = || MemError::UnsupportedSelector(selector.to_owned());

	let mut groups = Vec::new();
	let mut chars = selector.trim().chars().peekable();
	loop {
		while chars.peek().map_or(false, |c| c.is_whitespace()) {
			chars.next();
		}

		let mut compound = Vec::new();
		loop {
			match chars.peek().copied() {
				None | Some(',') => break,
				Some('*') => {
					chars.next();
					compound.push(SimpleSelector::Universal)
				}
				Some('#') => {
					chars.next();
					compound.push(SimpleSelector::Id(parse_name(&mut chars).ok_or_else(unsupported)?))
				}
				Some('.') => {
					chars.next();
					compound.push(SimpleSelector::Class(parse_name(&mut chars).ok_or_else(unsupported)?))
				}
				Some(c) if compound.is_empty() && (c.is_alphabetic() || c == '_' || c == '-' || c == '\\') => {
					compound.push(SimpleSelector::Tag(parse_name(&mut chars).ok_or_else(unsupported)?))
				}
				Some(c) if c.is_whitespace() => {
					while chars.peek().map_or(false, |c| c.is_whitespace()) {
						chars.next();
					}
					// Only trailing whitespace before a `,` or the end is fine. Combinators aren't supported.
					if !matches!(chars.peek(), None | Some(',')) {
						return Err(unsupported());
					}
				}
				Some(_) => return Err(unsupported()),
			}
		}
		if compound.is_empty() {
			return Err(unsupported());
		}
		groups.push(compound);

		match chars.next() {
			Some(',') => continue,
			_ => return Ok(groups),
		}
	}
}

fn parse_name(chars: &mut core::iter::Peekable<core::str::Chars<'_>>) -> Option<String> {
	let mut name = String::new();
	while let Some(&c) = chars.peek() {
		match c {
			'\\' => {
				chars.next();
				let mut hex = String::new();
				while hex.len() < 6 && chars.peek().map_or(false, char::is_ascii_hexdigit) {
					hex.extend(chars.next());
				}
				if hex.is_empty() {
					name.push(chars.next()?);
				} else {
					name.push(u32::from_str_radix(&hex, 16).ok().and_then(core::char::from_u32).unwrap_or('\u{FFFD}'));
					if chars.peek().map_or(false, |c| c.is_whitespace()) {
						chars.next();
					}
				}
			}
			c if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => {
				name.push(c);
				chars.next();
			}
			_ => break,
		}
	}
	if name.is_empty() {
		None
	} else {
		Some(name)
	}
}
