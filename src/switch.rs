use crate::{buffer::AppRoot, dom::Dom, error::SwitchError};
use tracing::{instrument, trace};

/// Outcome of a buffer switch that didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switched {
	/// The server view was removed from the document.
	Removed,
	/// The server view was hidden with `display: none`, since it couldn't be removed.
	Hidden,
	/// Deliberately left alone.
	Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	MissingRoot,
	/// Server and client view are the same subtree, so there's nothing to switch.
	SameRoot,
	/// Swapping out the whole body isn't supported.
	BodyRoot,
}

/// Shows the client view and removes (or hides) the server view, carrying over the server view's computed display mode.
///
/// `fallback_display` is used if the computed display comes back empty.
///
/// # Errors
///
/// Iff a step fails. Steps that already happened aren't rolled back, so the server view may stay visible.
#[instrument(skip(dom, root), fields(selector = root.client_selector()))]
pub fn switch_buffer<D: Dom>(dom: &D, root: &AppRoot<D>, fallback_display: &str) -> Result<Switched, SwitchError<D::Error>> {
	let (server_view, client_view) = match (&root.server_node, &root.client_node) {
		(Some(server_view), Some(client_view)) => (server_view, client_view),
		_ => return Ok(Switched::Skipped(SkipReason::MissingRoot)),
	};
	if server_view == client_view {
		return Ok(Switched::Skipped(SkipReason::SameRoot));
	}
	if dom.is_body(server_view) {
		return Ok(Switched::Skipped(SkipReason::BodyRoot));
	}

	let computed = dom.computed_display(server_view).map_err(SwitchError::ComputedStyle)?;
	let shown = if computed.is_empty() { fallback_display } else { computed.as_str() };
	trace!("Carrying over display {:?}.", shown);

	let switched = if dom.supports_removal(server_view) {
		dom.remove(server_view).map_err(SwitchError::Remove)?;
		Switched::Removed
	} else {
		dom.set_display(server_view, "none").map_err(SwitchError::Hide)?;
		Switched::Hidden
	};

	dom.set_display(client_view, shown).map_err(SwitchError::Show)?;
	Ok(switched)
}
