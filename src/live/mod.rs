//! Live updates pushed by the server
//!
//! The transport turns the push channel into text messages; the listener
//! maps each message onto a cache replacement, a full reload, or a toast.
//! Reloads are never coalesced: every relevant event issues its own reload.

pub mod listener;
pub mod transport;

pub use listener::{apply_to, interpret, CacheTarget, ListenerAction, LiveUpdateListener, PushMessage};
pub use transport::{spawn_push_reader, LineSplitter};
