#![doc(html_root_url = "https://docs.rs/hydration-replay/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Replays user interactions recorded against server-rendered markup onto the client-rendered view, then swaps the two.
//!
//! Start at [`replay::EventReplayer`], which consumes a [`buffer::ReplayBuffer`] against any [`dom::Dom`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod buffer;
pub mod dom;
pub mod error;
pub mod key;
pub mod mem;
pub mod options;
pub mod replay;
pub mod resolve;
pub mod switch;
pub mod transfer;
pub mod web;

pub use buffer::{ActiveNode, AppDescriptor, AppRoot, NodeState, RecordedEvent, ReplayBuffer, SelectionDirection, SelectionRange};
pub use dom::Dom;
pub use key::{derive_key, NodeKey};
pub use options::ReplayOptions;
pub use replay::EventReplayer;
