use crate::key::NodeKey;
use core::fmt::{self, Debug, Display, Formatter};

/// Why a server node couldn't be matched to a client node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
	/// The server or client root isn't known (yet). Expected before the client view has mounted.
	MissingRoot,
	/// No key could be derived for the server node.
	MissingKey,
	/// The server node isn't an element, so there is nothing to build a selector from.
	NotAnElement { key: NodeKey },
	/// No candidate matched the key exactly, and there wasn't exactly one candidate to fall back to.
	NoMatch { key: NodeKey, selector: String, candidates: usize },
}
impl Display for ResolveError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ResolveError::MissingRoot => write!(f, "server or client root is not known"),
			ResolveError::MissingKey => write!(f, "no node key could be derived"),
			ResolveError::NotAnElement { key } => write!(f, "server node {} is not an element", key),
			ResolveError::NoMatch { key, selector, candidates } => write!(
				f,
				"no matching client node found for {} (selector {:?}, {} ambiguous candidate(s)). You can fix this by assigning this element a unique id attribute.",
				key, selector, candidates
			),
		}
	}
}
impl std::error::Error for ResolveError {}

/// Why one recorded event wasn't replayed.
#[derive(Debug)]
pub enum ReplayError<E> {
	/// Skipped. Replay of the remaining events continues.
	Unresolved(ResolveError),
	/// The dispatch itself failed. Contained at the application boundary.
	Dispatch(E),
}
impl<E: Debug> Display for ReplayError<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ReplayError::Unresolved(error) => write!(f, "could not resolve client node: {}", error),
			ReplayError::Dispatch(error) => write!(f, "event dispatch failed: {:?}", error),
		}
	}
}
impl<E: Debug> std::error::Error for ReplayError<E> {}

/// A failed step of the buffer switch. The server view may stay visible.
#[derive(Debug)]
pub enum SwitchError<E> {
	ComputedStyle(E),
	Remove(E),
	Hide(E),
	Show(E),
}
impl<E: Debug> Display for SwitchError<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			SwitchError::ComputedStyle(error) => write!(f, "could not read the server view's computed display: {:?}", error),
			SwitchError::Remove(error) => write!(f, "could not remove the server view: {:?}", error),
			SwitchError::Hide(error) => write!(f, "could not hide the server view: {:?}", error),
			SwitchError::Show(error) => write!(f, "could not show the client view: {:?}", error),
		}
	}
}
impl<E: Debug> std::error::Error for SwitchError<E> {}

/// Setup is unusable. Raised before any replay can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
	MissingRootSelector,
}
impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::MissingRootSelector => write!(
				f,
				"The application root selector is missing. It's needed to find the root of the client view; set it to a selector for the root element of your app."
			),
		}
	}
}
impl std::error::Error for ConfigError {}
