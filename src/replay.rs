//! Runs a whole replay pass: per application, events then buffer switch; afterwards focus restoration and cleanup.

use crate::{
	buffer::{ActiveNode, AppDescriptor, AppRoot, ReplayBuffer},
	dom::Dom,
	error::ReplayError,
	options::ReplayOptions,
	resolve::Resolver,
	switch::{switch_buffer, Switched},
	transfer::replay_event,
};
use tracing::{debug, error, info, instrument, trace, trace_span, warn};

/// Consumes a [`ReplayBuffer`] exactly once.
///
/// Replay never fails as a whole: every error is contained at the narrowest boundary that still lets the rest proceed, and logged there.
/// See [`ReplayReport`] for what happened.
#[derive(Debug)]
pub struct EventReplayer<D: Dom> {
	dom: D,
	buffer: Option<ReplayBuffer<D>>,
	options: ReplayOptions,
	report: ReplayReport,
}

/// Summary of a finished replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
	/// In replay order.
	pub apps: Vec<AppReport>,
	/// Listener handles that were detached without error.
	pub listeners_detached: usize,
	/// Whether a freeze overlay was found and hidden.
	pub overlay_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppReport {
	pub client_selector: String,
	/// Whether the client root was found again.
	pub client_root_found: bool,
	pub replayed: usize,
	pub unresolved: usize,
	/// Set if a dispatch failed, which stops the remaining events of this application.
	pub dispatch_failed: bool,
	/// [`None`] if the switch failed.
	pub switched: Option<Switched>,
}

impl<D: Dom + Clone + 'static> EventReplayer<D> {
	#[must_use]
	pub fn new(dom: D, buffer: ReplayBuffer<D>, options: ReplayOptions) -> Self {
		Self {
			dom,
			buffer: Some(buffer),
			options,
			report: ReplayReport::default(),
		}
	}

	/// Whether [`EventReplayer::replay_all`] has already run.
	#[must_use]
	pub fn has_replayed(&self) -> bool {
		self.buffer.is_none()
	}

	#[must_use]
	pub fn report(&self) -> &ReplayReport {
		&self.report
	}

	#[must_use]
	pub fn options(&self) -> &ReplayOptions {
		&self.options
	}

	/// Replays all events of all applications, switches their buffers and cleans up.
	///
	/// Focus restoration is [deferred](`Dom::defer`) to the next tick, so it runs after the buffer switch has been applied.
	///
	/// Only the first call does anything. Later calls are silent no-ops.
	#[instrument(skip(self))]
	pub fn replay_all(&mut self) {
		let mut buffer = match self.buffer.take() {
			Some(buffer) => buffer,
			None => return trace!("Replay already ran."),
		};
		debug!("Replaying {} event(s) across {} application(s).", buffer.event_count(), buffer.apps.len());

		let mut focus = Vec::new();
		for app in &mut buffer.apps {
			let report = self.replay_app(app);
			info!(
				"Replayed {}/{} event(s) for {:?} ({} unresolved).",
				report.replayed,
				app.events.len(),
				report.client_selector,
				report.unresolved
			);
			self.report.apps.push(report);

			if let Some(active_node) = app.active_node.take() {
				focus.push((app.root.clone(), active_node));
			}
		}

		self.cleanup(buffer, focus);
	}

	#[instrument(skip(self, app), fields(selector = app.root.client_selector()))]
	fn replay_app(&self, app: &mut AppDescriptor<D>) -> AppReport {
		// The client framework may have replaced the root wholesale since capture.
		app.root.client_node = match self.dom.query_selector(app.root.client_selector()) {
			Ok(client_node) => client_node,
			Err(error) => {
				error!("Could not query the client root: {:?}", error);
				None
			}
		};

		let mut report = AppReport {
			client_selector: app.root.client_selector().to_owned(),
			client_root_found: app.root.client_node.is_some(),
			replayed: 0,
			unresolved: 0,
			dispatch_failed: false,
			switched: None,
		};
		if !report.client_root_found {
			warn!("Client root {:?} not found.", app.root.client_selector());
		}

		let mut resolver = Resolver::new(self.options.ignored_classes.clone());
		if let Err(dispatch_error) = self.replay_events(&mut resolver, app, &mut report) {
			error!("Replay aborted after a failed dispatch: {:?}", dispatch_error);
			report.dispatch_failed = true;
		}

		match switch_buffer(&self.dom, &app.root, &self.options.fallback_display) {
			Ok(switched) => {
				trace!("Buffer switch: {:?}", switched);
				report.switched = Some(switched)
			}
			Err(switch_error) => error!("{}", switch_error),
		}
		report
	}

	/// Unresolved events are skipped. A failed dispatch ends the loop.
	fn replay_events(&self, resolver: &mut Resolver<D>, app: &AppDescriptor<D>, report: &mut AppReport) -> Result<(), D::Error> {
		for recorded in &app.events {
			match replay_event(&self.dom, resolver, &app.root, recorded) {
				Ok(_) => report.replayed += 1,
				Err(ReplayError::Unresolved(_)) => report.unresolved += 1,
				Err(ReplayError::Dispatch(dispatch_error)) => return Err(dispatch_error),
			}
		}
		Ok(())
	}

	#[instrument(skip(self, buffer, focus))]
	fn cleanup(&mut self, buffer: ReplayBuffer<D>, focus: Vec<(AppRoot<D>, ActiveNode<D>)>) {
		if !focus.is_empty() {
			let dom = self.dom.clone();
			let ignored_classes = self.options.ignored_classes.clone();
			self.dom.defer(Box::new(move || {
				for (root, active_node) in &focus {
					restore_focus(&dom, root, active_node, &ignored_classes)
				}
			}));
		}

		let ReplayBuffer { apps, listeners } = buffer;
		for listener in apps.iter().flat_map(|app| app.listeners.iter()).chain(listeners.iter()) {
			match self.dom.remove_listener(listener) {
				Ok(()) => self.report.listeners_detached += 1,
				Err(error) => warn!("Could not detach {:?}: {:?}", listener, error),
			}
		}

		if let Some(overlay_selector) = &self.options.overlay_selector {
			match self.dom.query_selector(overlay_selector) {
				Ok(Some(overlay)) => match self.dom.set_display(&overlay, "none") {
					Ok(()) => self.report.overlay_hidden = true,
					Err(error) => error!("Could not hide the freeze overlay: {:?}", error),
				},
				Ok(None) => (),
				Err(error) => error!("Could not query the freeze overlay: {:?}", error),
			}
		}

		// Descriptors, recorded events and their resolution caches go away here.
		drop(apps);
	}
}

/// Best-effort. Failures are only traced.
fn restore_focus<D: Dom>(dom: &D, root: &AppRoot<D>, active_node: &ActiveNode<D>, ignored_classes: &[String]) {
	let span = trace_span!("restore_focus", node_key = ?&active_node.node_key);
	let _enter = span.enter();

	let mut resolver = Resolver::new(ignored_classes.to_vec());
	let client_node = match resolver.resolve(dom, root, &active_node.node, active_node.node_key.as_ref()) {
		Ok(client_node) => client_node,
		Err(error) => return trace!("Not restoring focus: {}", error),
	};

	if let Err(error) = dom.focus(&client_node) {
		return trace!("Could not focus {}: {:?}", dom.describe(&client_node), error);
	}

	if let Some(selection) = &active_node.selection {
		if dom.supports_selection(&client_node) {
			if let Err(error) = dom.set_selection_range(&client_node, selection) {
				trace!("Could not restore selection {:?}: {:?}", selection, error);
			}
		}
	}
}
