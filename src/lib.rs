pub mod api;

mod core;
pub use core::{
    detection::Members,
    member::{Membership, MembersTable},
    peer::{Peer, PeerHandle, PeerInfo},
    queue::TaskQueue,
    shutdown::Shutdown,
    status::{PeersStatus, Status},
    timer::{SimpleTimer, TimerAction, TimerManager},
    transport::TransportLayer,
};

pub mod error;
pub use error::{Error, Result};

pub mod pb;

#[cfg(any(test, feature = "test-util"))]
#[path = "./test-utils/mod.rs"]
#[doc(hidden)]
mod test_utils;
