#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

//! Route Origin Validation of the global routing table, as a daily batch.
//!
//! A run takes the routes the RIPE RIS collectors saw (the RIS whois
//! dumps), the Validated ROA Payloads exported by a relying party, and the
//! IANA address space registries, and produces a snapshot in which every
//! route carries its RPKI validity, the VRPs that decided it, and the
//! Regional Internet Registry its address space belongs to.
//!
//! The heart of it is prefix matching on bit strings: every address is
//! written out as a string of `'0'` and `'1'` characters (see
//! [BitString]), so that the routes covered by a VRP are exactly the
//! routes whose bit string starts with the VRP's. An ordered index over the
//! bit strings turns that into a range scan.
//!
//! The stages of a run (see [pipeline]) share one [RecordStore] and one
//! [Coordinator] that bounds the number of work items in flight.
//!
//! [RecordStore]: store::RecordStore
//! [Coordinator]: coordinator::Coordinator

mod types;

// re-exports
pub use inetnum::addr;
pub use inetnum::asn;

pub use types::{
    parse_addr, AddressFamily, BitString, RecordId, Route, RouteFilter,
    RouteUpdate, Stored, Validity, Vrp,
};

/// Error types returned by the stages of a run
pub use types::errors;

/// Counters and reports of the stages of a run
pub use types::stats;

/// Storage of routes and VRPs, per snapshot
pub mod store;

pub mod config;
pub mod coordinator;
pub mod fetch;
pub mod ingest;
pub mod pipeline;
pub mod registry;
pub mod validate;

// Used in tests
#[doc(hidden)]
pub use types::test_types;
