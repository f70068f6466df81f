use hydration_replay::{
	error::ConfigError,
	mem::{MemEvent, MemNode, MemoryDocument},
	replay::ReplayReport,
	switch::{SkipReason, Switched},
	ActiveNode, AppDescriptor, AppRoot, Dom, EventReplayer, NodeKey, NodeState, RecordedEvent, ReplayBuffer, ReplayOptions, SelectionDirection, SelectionRange,
};

use fixture_::{page, render_view, Page};

fn app(page: &Page) -> AppDescriptor<MemoryDocument> {
	AppDescriptor::new(AppRoot::new(Some(page.server.root), "#app-root").unwrap())
}

fn input(node: MemNode, value: &str) -> RecordedEvent<MemoryDocument> {
	RecordedEvent::new(MemEvent::new("input"), node, NodeState::default().with_value(value))
}

fn replay(page: &Page, buffer: ReplayBuffer<MemoryDocument>) -> ReplayReport {
	let mut replayer = EventReplayer::new(page.document.clone(), buffer, ReplayOptions::default());
	replayer.replay_all();
	replayer.report().clone()
}

#[test]
fn end_to_end() {
	let page = page();
	let buffer = ReplayBuffer::new().with_app(app(&page).with_event(input(page.server.name, "abc").with_node_key(NodeKey::from("0.2#name-field"))));

	let report = replay(&page, buffer);

	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("abc"));
	assert_eq!(page.document.dispatched(), vec![(page.client.name, "input".to_owned())]);
	assert!(!page.document.is_attached(&page.server.root));
	assert_eq!(page.document.inline_display(&page.client.root).as_deref(), Some("block"));

	assert_eq!(report.apps.len(), 1);
	let app = &report.apps[0];
	assert_eq!(app.client_selector, "#app-root");
	assert!(app.client_root_found);
	assert_eq!(app.replayed, 1);
	assert_eq!(app.unresolved, 0);
	assert!(!app.dispatch_failed);
	assert_eq!(app.switched, Some(Switched::Removed));
}

#[test]
fn only_the_first_call_replays() {
	let page = page();
	let buffer = ReplayBuffer::new().with_app(app(&page).with_event(input(page.server.name, "abc")));

	let mut replayer = EventReplayer::new(page.document.clone(), buffer, ReplayOptions::default());
	assert!(!replayer.has_replayed());
	replayer.replay_all();
	assert!(replayer.has_replayed());
	let report = replayer.report().clone();

	page.document.set_value(&page.client.name, Some("edited afterwards"));
	replayer.replay_all();

	assert_eq!(page.document.dispatched().len(), 1);
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("edited afterwards"));
	assert_eq!(replayer.report(), &report);
}

#[test]
fn events_keep_their_order() {
	let page = page();
	let buffer = ReplayBuffer::new().with_app(
		app(&page)
			.with_event(input(page.server.name, "a"))
			.with_event(input(page.server.notes, "b"))
			.with_event(RecordedEvent::new(MemEvent::new("click"), page.server.save, NodeState::default()))
			.with_event(input(page.server.name, "ab")),
	);

	replay(&page, buffer);

	assert_eq!(
		page.document.dispatched(),
		vec![
			(page.client.name, "input".to_owned()),
			(page.client.notes, "input".to_owned()),
			(page.client.save, "click".to_owned()),
			(page.client.name, "input".to_owned()),
		]
	);
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("ab"));
}

#[test]
fn unresolved_events_are_skipped() {
	let page = page();
	let server_only = page.document.create_element(&page.server.root, "em");
	let buffer = ReplayBuffer::new().with_app(
		app(&page)
			.with_event(RecordedEvent::new(MemEvent::new("click"), server_only, NodeState::default()))
			.with_event(input(page.server.name, "abc")),
	);

	let report = replay(&page, buffer);

	assert_eq!(page.document.dispatched(), vec![(page.client.name, "input".to_owned())]);
	assert_eq!((report.apps[0].replayed, report.apps[0].unresolved), (1, 1));
	assert_eq!(report.apps[0].switched, Some(Switched::Removed));
}

#[test]
fn failed_dispatch_is_contained_to_its_application() {
	let page = page();
	let body = page.document.body();
	let second_server = render_view(&page.document, &body, None);
	let second_client = render_view(&page.document, &body, Some("second-root"));

	page.document.add_event_listener(&page.client.root, "input", |_| Err("listener failed".to_owned()));

	let buffer = ReplayBuffer::new()
		.with_app(app(&page).with_event(input(page.server.name, "first")).with_event(input(page.server.notes, "never")))
		.with_app(AppDescriptor::new(AppRoot::new(Some(second_server.root), "#second-root").unwrap()).with_event(input(second_server.name, "second")));

	let report = replay(&page, buffer);

	assert_eq!(
		page.document.dispatched(),
		vec![(page.client.name, "input".to_owned()), (second_client.name, "input".to_owned())]
	);
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("first"));
	assert_eq!(page.document.value(&page.client.notes).as_deref(), Some(""));
	assert_eq!(page.document.value(&second_client.name).as_deref(), Some("second"));

	let (first, second) = (&report.apps[0], &report.apps[1]);
	assert!(first.dispatch_failed);
	assert_eq!(first.replayed, 0);
	assert_eq!(first.switched, Some(Switched::Removed));
	assert!(!second.dispatch_failed);
	assert_eq!(second.replayed, 1);
	assert_eq!(second.switched, Some(Switched::Removed));

	assert!(!page.document.is_attached(&page.server.root));
	assert!(!page.document.is_attached(&second_server.root));
}

#[test]
fn client_root_is_looked_up_again() {
	let page = page();
	let mut stale = app(&page).with_event(input(page.server.name, "abc"));
	stale.root.client_node = Some(page.server.root);

	let report = replay(&page, ReplayBuffer::new().with_app(stale));

	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("abc"));
	assert_eq!(report.apps[0].switched, Some(Switched::Removed));
	assert!(page.document.is_attached(&page.client.root));
}

#[test]
fn missing_client_root() {
	let page = page();
	let buffer = ReplayBuffer::new().with_app(
		AppDescriptor::new(AppRoot::new(Some(page.server.root), "#nowhere").unwrap())
			.with_event(input(page.server.name, "abc"))
			.with_event(input(page.server.notes, "def")),
	);

	let report = replay(&page, buffer);

	let app = &report.apps[0];
	assert!(!app.client_root_found);
	assert_eq!((app.replayed, app.unresolved), (0, 2));
	assert_eq!(app.switched, Some(Switched::Skipped(SkipReason::MissingRoot)));
	assert!(page.document.dispatched().is_empty());
	assert!(page.document.is_attached(&page.server.root));
}

#[test]
fn focus_and_selection_are_restored_on_the_next_tick() {
	let page = page();
	let selection = SelectionRange {
		start: 1,
		end: 3,
		direction: SelectionDirection::Backward,
	};
	let buffer = ReplayBuffer::new().with_app(
		app(&page)
			.with_event(input(page.server.name, "abcd"))
			.with_active_node(ActiveNode::new(page.server.name).with_selection(selection)),
	);

	replay(&page, buffer);

	assert_eq!(page.document.pending_deferred(), 1);
	assert_eq!(page.document.active_element(), None);

	assert_eq!(page.document.run_deferred(), 1);
	assert_eq!(page.document.active_element(), Some(page.client.name));
	assert_eq!(page.document.selection(&page.client.name), Some(selection));
}

#[test]
fn selection_is_skipped_where_unsupported() {
	let page = page();
	let buffer = ReplayBuffer::new().with_app(app(&page).with_active_node(
		ActiveNode::new(page.server.agree).with_selection(SelectionRange {
			start: 0,
			end: 0,
			direction: SelectionDirection::None,
		}),
	));

	replay(&page, buffer);
	page.document.run_deferred();

	assert_eq!(page.document.active_element(), Some(page.client.agree));
	assert_eq!(page.document.selection(&page.client.agree), None);
}

#[test]
fn nothing_is_deferred_without_an_active_node() {
	let page = page();
	replay(&page, ReplayBuffer::new().with_app(app(&page).with_event(input(page.server.name, "abc"))));
	assert_eq!(page.document.pending_deferred(), 0);
}

#[test]
fn listeners_are_detached() {
	let page = page();
	let app_listener = page.document.add_event_listener(&page.server.name, "input", |_| Ok(()));
	let page_listener = page.document.add_event_listener(&page.document.body(), "keydown", |_| Ok(()));
	let unrelated = page.document.add_event_listener(&page.client.save, "click", |_| Ok(()));
	assert_eq!(page.document.listener_count(), 3);

	let mut buffer = ReplayBuffer::new().with_app(app(&page).with_listener(app_listener));
	buffer.listeners.push(page_listener);

	let report = replay(&page, buffer);

	assert_eq!(report.listeners_detached, 2);
	assert_eq!(page.document.listener_count(), 1);
	page.document.remove_listener(&unrelated).unwrap();
	assert_eq!(page.document.listener_count(), 0);
}

#[test]
fn overlay_is_hidden() {
	let page = page();
	let overlay = page.document.create_element(&page.document.body(), "div");
	page.document.set_attribute(&overlay, "id", "hydration-overlay");

	let report = replay(&page, ReplayBuffer::new().with_app(app(&page)));

	assert!(report.overlay_hidden);
	assert_eq!(page.document.inline_display(&overlay).as_deref(), Some("none"));
}

#[test]
fn overlay_is_optional() {
	let page = page();
	assert!(!replay(&page, ReplayBuffer::new().with_app(app(&page))).overlay_hidden);

	let page = fixture_::page();
	let overlay = page.document.create_element(&page.document.body(), "div");
	page.document.set_attribute(&overlay, "id", "hydration-overlay");

	let mut replayer = EventReplayer::new(page.document.clone(), ReplayBuffer::new(), ReplayOptions::new().with_overlay_selector(None));
	replayer.replay_all();
	assert!(!replayer.report().overlay_hidden);
	assert_eq!(page.document.inline_display(&overlay), None);
}

#[test]
fn framework_marker_classes_are_ignored_by_default() {
	let recorded = |page: &Page| {
		ReplayBuffer::new().with_app(app(page).with_event(RecordedEvent::new(
			MemEvent::new("change"),
			page.server.agree,
			NodeState::default().with_checked(true),
		)))
	};

	let page = page();
	page.document.set_attribute(&page.server.agree, "class", "toggle agree ng-binding");
	let report = replay(&page, recorded(&page));
	assert!(page.document.checked(&page.client.agree));
	assert_eq!(report.apps[0].replayed, 1);

	let page = fixture_::page();
	page.document.set_attribute(&page.server.agree, "class", "toggle agree ng-binding");
	let mut replayer = EventReplayer::new(page.document.clone(), recorded(&page), ReplayOptions::new().with_ignored_classes(Vec::new()));
	replayer.replay_all();
	assert!(!page.document.checked(&page.client.agree));
	assert_eq!(replayer.report().apps[0].unresolved, 1);
}

#[test]
fn failed_focus_restoration_is_swallowed() {
	let page = page();
	let server_only = page.document.create_element(&page.server.root, "em");
	let body = page.document.body();
	let second_server = render_view(&page.document, &body, None);
	let second_client = render_view(&page.document, &body, Some("second-root"));
	let overlay = page.document.create_element(&body, "div");
	page.document.set_attribute(&overlay, "id", "hydration-overlay");
	let listener = page.document.add_event_listener(&page.server.name, "input", |_| Ok(()));

	let buffer = ReplayBuffer::new()
		.with_app(app(&page).with_active_node(ActiveNode::new(server_only)).with_listener(listener))
		.with_app(AppDescriptor::new(AppRoot::new(Some(second_server.root), "#second-root").unwrap()).with_active_node(ActiveNode::new(second_server.notes)));

	let report = replay(&page, buffer);

	assert_eq!(report.listeners_detached, 1);
	assert_eq!(page.document.listener_count(), 0);
	assert!(report.overlay_hidden);
	assert_eq!(page.document.inline_display(&overlay).as_deref(), Some("none"));

	assert_eq!(page.document.active_element(), None);
	assert_eq!(page.document.run_deferred(), 1);
	// The unresolvable first node doesn't keep the second application from getting its focus back.
	assert_eq!(page.document.active_element(), Some(second_client.notes));
	assert_eq!(page.document.pending_deferred(), 0);
}

#[test]
fn blank_root_selectors_are_rejected() {
	assert_eq!(AppRoot::<MemoryDocument>::new(None, "").unwrap_err(), ConfigError::MissingRootSelector);
	assert_eq!(AppRoot::<MemoryDocument>::new(None, "  ").unwrap_err(), ConfigError::MissingRootSelector);
	assert!(AppRoot::<MemoryDocument>::new(None, "#app-root").is_ok());
}
