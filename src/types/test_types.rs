//! Fixtures shared by the unit and integration tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use inetnum::addr::Prefix;
use inetnum::asn::Asn;

use super::bit_string::BitString;
use super::errors::{FetchError, ParseError, StoreError};
use super::record::{RecordId, Route, RouteFilter, RouteUpdate, Stored, Vrp};
use crate::fetch::{read_lines, read_table, FeedSource};
use crate::store::RecordStore;

/// A route for `prefix` originated by `asn`.
pub fn route(asn: u32, prefix: &str) -> Result<Route, ParseError> {
    let prefix = Prefix::from_str(prefix)
        .map_err(|_| ParseError::InvalidAddress(prefix.to_string()))?;
    Ok(Route::new(
        Asn::from_u32(asn),
        prefix,
        BitString::from_addr(prefix.addr()),
    ))
}

/// A VRP for `prefix`, originated by `asn`, up to `max_length`.
pub fn vrp(asn: u32, prefix: &str, max_length: u8) -> Result<Vrp, ParseError> {
    let prefix = Prefix::from_str(prefix)
        .map_err(|_| ParseError::InvalidAddress(prefix.to_string()))?;
    let binary = BitString::from_addr(prefix.addr()).truncate(prefix.len())?;
    Ok(Vrp::new(Asn::from_u32(asn), prefix, max_length, binary))
}

//------------ StaticFeeds ---------------------------------------------------

/// A [FeedSource] that serves bodies from memory, by URL.
#[derive(Clone, Debug, Default)]
pub struct StaticFeeds {
    bodies: HashMap<String, String>,
}

impl StaticFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn body(&self, url: &str) -> Result<&[u8], FetchError> {
        self.bodies
            .get(url)
            .map(|b| b.as_bytes())
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            })
    }
}

impl FeedSource for StaticFeeds {
    fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError> {
        read_lines(url, self.body(url)?)
    }

    fn fetch_table(
        &self,
        url: &str,
    ) -> Result<Vec<csv::StringRecord>, FetchError> {
        read_table(url, self.body(url)?)
    }
}

//------------ FailingStore --------------------------------------------------

/// A [RecordStore] that passes everything on to another store, except that
/// single route updates start failing after a number of them succeeded.
pub struct FailingStore<S> {
    inner: S,
    updates_left: AtomicUsize,
}

impl<S: RecordStore> FailingStore<S> {
    pub fn new(inner: S, succeeding_updates: usize) -> Self {
        Self {
            inner,
            updates_left: AtomicUsize::new(succeeding_updates),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: RecordStore> RecordStore for FailingStore<S> {
    fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.inner.drop_collection(collection)
    }

    fn ensure_index(&self, collection: &str) -> Result<(), StoreError> {
        self.inner.ensure_index(collection)
    }

    fn insert_route(
        &self,
        collection: &str,
        route: Route,
    ) -> Result<RecordId, StoreError> {
        self.inner.insert_route(collection, route)
    }

    fn insert_vrp(
        &self,
        collection: &str,
        vrp: Vrp,
    ) -> Result<RecordId, StoreError> {
        self.inner.insert_vrp(collection, vrp)
    }

    fn vrps(&self, collection: &str) -> Result<Vec<Stored<Vrp>>, StoreError> {
        self.inner.vrps(collection)
    }

    fn find_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
    ) -> Result<Vec<Stored<Route>>, StoreError> {
        self.inner.find_routes(collection, filter)
    }

    fn update_route(
        &self,
        collection: &str,
        id: RecordId,
        update: &RouteUpdate,
    ) -> Result<(), StoreError> {
        self.updates_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                n.checked_sub(1)
            })
            .map_err(|_| {
                StoreError::Backend("connection reset by peer".to_string())
            })?;
        self.inner.update_route(collection, id, update)
    }

    fn update_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
        update: &RouteUpdate,
    ) -> Result<usize, StoreError> {
        self.inner.update_routes(collection, filter, update)
    }
}
