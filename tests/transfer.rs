use hydration_replay::{
	error::{ReplayError, ResolveError},
	mem::{MemError, MemEvent, MemNode, MemoryDocument},
	resolve::Resolver,
	transfer::{replay_event, transfer_state},
	AppRoot, Dom, NodeState, RecordedEvent,
};

use fixture_::page;

fn resolved_root(server: MemNode, client: MemNode) -> AppRoot<MemoryDocument> {
	let mut root = AppRoot::new(Some(server), "#app-root").unwrap();
	root.client_node = Some(client);
	root
}

#[test]
fn checked_is_carried_over_before_dispatch() {
	let page = page();
	let root = resolved_root(page.server.root, page.client.root);

	let document = page.document.clone();
	let client_agree = page.client.agree;
	page.document.add_event_listener(&page.client.agree, "change", move |_| {
		if document.checked(&client_agree) {
			Ok(())
		} else {
			Err("dispatched before the state transfer".to_owned())
		}
	});

	let recorded = RecordedEvent::new(MemEvent::new("change"), page.server.agree, NodeState::default().with_checked(true));
	assert_eq!(replay_event(&page.document, &mut Resolver::default(), &root, &recorded).unwrap(), page.client.agree);
	assert!(page.document.checked(&page.client.agree));
	assert_eq!(page.document.dispatched(), vec![(page.client.agree, "change".to_owned())]);
}

#[test]
fn client_defaults_are_cleared() {
	let page = page();
	let root = resolved_root(page.server.root, page.client.root);
	let mut resolver = Resolver::default();

	page.document.set_attribute(&page.client.agree, "checked", "");
	page.document.set_attribute(&page.client.option_a, "selected", "");
	assert!(page.document.checked(&page.client.agree));
	assert!(page.document.selected(&page.client.option_a));

	for server in [page.server.agree, page.server.option_a].iter() {
		let recorded = RecordedEvent::capture(&page.document, MemEvent::new("change"), *server);
		replay_event(&page.document, &mut resolver, &root, &recorded).unwrap();
	}

	assert!(!page.document.checked(&page.client.agree));
	assert!(!page.document.selected(&page.client.option_a));
}

#[test]
fn value_is_carried_over() {
	let page = page();
	let root = resolved_root(page.server.root, page.client.root);

	page.document.set_value(&page.server.notes, Some("Dear diary"));
	let recorded = RecordedEvent::capture(&page.document, MemEvent::new("input"), page.server.notes);
	assert_eq!(recorded.state.value.as_deref(), Some("Dear diary"));

	replay_event(&page.document, &mut Resolver::default(), &root, &recorded).unwrap();
	assert_eq!(page.document.value(&page.client.notes).as_deref(), Some("Dear diary"));
}

#[test]
fn missing_value_leaves_the_client_value_alone() {
	let page = page();
	page.document.set_value(&page.client.name, Some("typed on the client"));

	transfer_state(&page.document, &page.client.name, &NodeState::default());
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("typed on the client"));

	transfer_state(&page.document, &page.client.name, &NodeState::default().with_value(""));
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some(""));
}

#[test]
fn unresolved_events_change_nothing() {
	let page = page();
	let root = AppRoot::new(Some(page.server.root), "#app-root").unwrap();

	let recorded = RecordedEvent::new(MemEvent::new("input"), page.server.name, NodeState::default().with_value("lost"));
	match replay_event(&page.document, &mut Resolver::default(), &root, &recorded) {
		Err(ReplayError::Unresolved(ResolveError::MissingRoot)) => (),
		other => panic!("{:?}", other),
	}

	assert_eq!(page.document.value(&page.client.name).as_deref(), Some(""));
	assert!(page.document.dispatched().is_empty());
}

#[test]
fn failed_dispatch_keeps_the_transferred_state() {
	let page = page();
	let root = resolved_root(page.server.root, page.client.root);
	page.document.add_event_listener(&page.client.root, "input", |_| Err("boom".to_owned()));

	let recorded = RecordedEvent::new(MemEvent::new("input"), page.server.name, NodeState::default().with_value("abc"));
	match replay_event(&page.document, &mut Resolver::default(), &root, &recorded) {
		Err(ReplayError::Dispatch(MemError::Listener { event_type, message })) => {
			assert_eq!(event_type, "input");
			assert_eq!(message, "boom");
		}
		other => panic!("{:?}", other),
	}
	assert_eq!(page.document.value(&page.client.name).as_deref(), Some("abc"));
}
