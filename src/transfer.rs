use crate::{
	buffer::{AppRoot, NodeState, RecordedEvent},
	dom::Dom,
	error::ReplayError,
	resolve::Resolver,
};
use tracing::{trace, trace_span, warn};

/// Replays one recorded event onto its client-side counterpart: transfers the recorded form state, then dispatches the original event.
///
/// Returns the client node the event was dispatched on.
///
/// # Errors
///
/// [`ReplayError::Unresolved`] if no client node was found, in which case nothing was changed and a warning has been logged.
/// The caller should continue with the next event.
///
/// [`ReplayError::Dispatch`] if the dispatch itself failed. The state transfer has already happened at that point.
pub fn replay_event<D: Dom>(dom: &D, resolver: &mut Resolver<D>, root: &AppRoot<D>, recorded: &RecordedEvent<D>) -> Result<D::Node, ReplayError<D::Error>> {
	let span = trace_span!("replay_event", event = ?&recorded.event, node_key = ?&recorded.node_key);
	let _enter = span.enter();

	let client_node = match resolver.resolve(dom, root, &recorded.node, recorded.node_key.as_ref()) {
		Ok(client_node) => client_node,
		Err(error) => {
			warn!(
				"Trying to dispatch event {:?} to node {} but could not find client node ({}). Server node is: {}",
				recorded.event,
				recorded.node_key.as_ref().map_or_else(|| "(no precomputed key)".to_owned(), ToString::to_string),
				error,
				dom.describe(&recorded.node)
			);
			return Err(ReplayError::Unresolved(error));
		}
	};

	transfer_state(dom, &client_node, &recorded.state);
	dom.dispatch_event(&client_node, &recorded.event).map_err(ReplayError::Dispatch)?;
	trace!("Dispatched on {}.", dom.describe(&client_node));
	Ok(client_node)
}

/// Overwrites `node`'s form state with `state`.
///
/// `checked` and `selected` are cleared if not set in `state`, so client-side defaults don't leak through.
pub fn transfer_state<D: Dom>(dom: &D, node: &D::Node, state: &NodeState) {
	let NodeState { value, checked, selected } = state;
	dom.set_checked(node, *checked);
	dom.set_selected(node, *selected);
	dom.set_value(node, value.as_deref());
}
