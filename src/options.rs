/// Knobs for one [`EventReplayer`](`crate::replay::EventReplayer`) pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOptions {
	/// Freeze overlay shown while the page wasn't interactive. Hidden during cleanup if it exists.
	pub overlay_selector: Option<String>,
	/// Display given to the client view if the server view's computed display comes back empty.
	pub fallback_display: String,
	/// Marker classes that client frameworks add on their own. Left out of resolver selectors, but not of node keys.
	///
	/// Defaults to Angular's `ng-binding`.
	pub ignored_classes: Vec<String>,
	/// Name of the `window` property the recorder stores its buffer in. Only used by [`crate::web`].
	pub buffer_global: String,
}
impl Default for ReplayOptions {
	fn default() -> Self {
		Self {
			overlay_selector: Some("#hydration-overlay".to_owned()),
			fallback_display: "block".to_owned(),
			ignored_classes: vec!["ng-binding".to_owned()],
			buffer_global: "hydrationBuffer".to_owned(),
		}
	}
}
impl ReplayOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_overlay_selector(mut self, overlay_selector: Option<String>) -> Self {
		self.overlay_selector = overlay_selector;
		self
	}

	#[must_use]
	pub fn with_fallback_display(mut self, fallback_display: impl Into<String>) -> Self {
		self.fallback_display = fallback_display.into();
		self
	}

	/// Replaces the ignored classes, including the default ones.
	#[must_use]
	pub fn with_ignored_classes(mut self, classes: Vec<String>) -> Self {
		self.ignored_classes = classes;
		self
	}

	#[must_use]
	pub fn with_ignored_class(mut self, class: impl Into<String>) -> Self {
		self.ignored_classes.push(class.into());
		self
	}

	#[must_use]
	pub fn with_buffer_global(mut self, buffer_global: impl Into<String>) -> Self {
		self.buffer_global = buffer_global.into();
		self
	}
}
