//! Protobuf messages exchanged between gossip nodes.
//!
//! ```proto
//! message PeerRecord {
//!   string id = 1;
//!   string address = 2;
//!   uint64 heartbeat = 3;
//! }
//!
//! message PeerList {
//!   repeated PeerRecord peers = 1;
//! }
//! ```

#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct PeerRecord {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub heartbeat: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerList {
    #[prost(message, repeated, tag = "1")]
    pub peers: ::prost::alloc::vec::Vec<PeerRecord>,
}
