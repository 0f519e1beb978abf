//! Client side of the wire: transport, resilient calls, and the update
//! feed.
//!
//! Everything network-facing sits behind the [`transport::Transport`] port
//! so the feed and the call helpers are tested against scripted wire
//! bodies, not sockets.

pub mod call;
pub mod feed;
pub mod handlers;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;
