//! # Core Module
//!
//! The `core` module contains the membership engine: peer records, the two-set
//! members table, the heartbeat failure detector and its sweep, shutdown and timer
//! primitives, and the wire codec and transport collaborators that move peer lists
//! between nodes.
pub(crate) mod detection;
pub(crate) mod member;
pub(crate) mod message;
pub(crate) mod node;
pub(crate) mod peer;
pub(crate) mod queue;
mod receiver;
mod sender;
pub(crate) mod shutdown;
pub(crate) mod status;
pub(crate) mod timer;
pub(crate) mod transport;
