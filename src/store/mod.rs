//! The record store that holds a day's routes and VRPs while the stages of a
//! run read and annotate them.
//!
//! The stages only talk to the [RecordStore] trait. The store is shared by
//! all workers of a stage at once and has to be safe for concurrent use: a
//! single update is atomic for the record it touches, nothing more is
//! promised across records.
//!
//! [MemoryStore] is the in-memory implementation used by the `rov-update`
//! binary and the tests. [export] writes a finished snapshot out as JSON
//! lines.

mod memory;
mod snapshot;

pub mod export;

pub use memory::MemoryStore;
pub use snapshot::SnapshotDate;

use crate::errors::StoreError;
use crate::types::{RecordId, Route, RouteFilter, RouteUpdate, Stored, Vrp};

//------------ RecordStore ---------------------------------------------------

pub trait RecordStore: Send + Sync {
    /// Remove a collection with all its records. Dropping a collection that
    /// doesn't exist is not an error.
    fn drop_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Index the routes of a collection on their `(binary, prefix)` pair,
    /// so that prefix searches don't scan the whole collection.
    ///
    /// VRP collections are only ever read in full, so indexing one is a
    /// no-op, as is indexing a collection that doesn't exist.
    fn ensure_index(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert a route, creating the collection if needed.
    fn insert_route(
        &self,
        collection: &str,
        route: Route,
    ) -> Result<RecordId, StoreError>;

    /// Insert a VRP, creating the collection if needed.
    fn insert_vrp(
        &self,
        collection: &str,
        vrp: Vrp,
    ) -> Result<RecordId, StoreError>;

    /// All VRPs of a collection. Reading a collection that doesn't exist
    /// yields no records, as do all the queries below.
    fn vrps(&self, collection: &str) -> Result<Vec<Stored<Vrp>>, StoreError>;

    /// All routes of a collection.
    fn routes(
        &self,
        collection: &str,
    ) -> Result<Vec<Stored<Route>>, StoreError> {
        self.find_routes(collection, &RouteFilter::All)
    }

    /// The routes selected by the filter, as they are at the moment of the
    /// query.
    fn find_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
    ) -> Result<Vec<Stored<Route>>, StoreError>;

    /// Apply an update to a single route. Fails if the collection or the
    /// record doesn't exist.
    fn update_route(
        &self,
        collection: &str,
        id: RecordId,
        update: &RouteUpdate,
    ) -> Result<(), StoreError>;

    /// Apply an update to all routes selected by the filter, and return the
    /// number of routes updated.
    fn update_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
        update: &RouteUpdate,
    ) -> Result<usize, StoreError>;
}
