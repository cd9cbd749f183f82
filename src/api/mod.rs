//! # Gossip API Module
//!
//! This module provides the primary API for running a heartbeat gossip node.
//!
//! ## Modules
//!
//! - [`config`]: Configuration structures and builders, including the environment loader.
//! - [`gossip`]: Provides the `GossipCluster` struct for binding and running a node.
//!
//! ## Tracing Initialization
//!
//! The `init_tracing` function initializes the tracing subscriber for logging purposes.

use lazy_static::lazy_static;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod gossip;

lazy_static! {
    static ref TRACING: () = {
        // A subscriber installed by the embedding binary takes precedence.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    };
}

/// Initializes the tracing subscriber once per process.
fn init_tracing() {
    lazy_static::initialize(&TRACING);
}
