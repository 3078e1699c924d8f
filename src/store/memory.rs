use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use crate::errors::StoreError;
use crate::types::{
    BitString, RecordId, Route, RouteFilter, RouteUpdate, Stored, Vrp,
};

use super::RecordStore;

//------------ RouteCollection -----------------------------------------------

// The index key: (binary, prefix length, id). Keys sort by family first, and
// then by the bit string, so all routes whose bit string starts with some
// prefix form one contiguous run, starting at the prefix itself.
type IndexKey = (BitString, u8, RecordId);

// The routes of one snapshot. The map lock is only taken for writing when
// records are inserted, updates take it for reading and then lock the one
// record they change. The bit string of a route never changes after insert,
// so an index, once built, only has to be extended on insert.
#[derive(Debug, Default)]
struct RouteCollection {
    docs: RwLock<BTreeMap<RecordId, Mutex<Route>>>,
    index: RwLock<Option<BTreeSet<IndexKey>>>,
}

impl RouteCollection {
    fn insert(&self, id: RecordId, route: Route) {
        let key = (route.binary.clone(), route.prefix_len(), id);
        self.docs.write().insert(id, Mutex::new(route));
        if let Some(index) = self.index.write().as_mut() {
            index.insert(key);
        }
    }

    fn build_index(&self) -> usize {
        let index: BTreeSet<IndexKey> = self
            .docs
            .read()
            .iter()
            .map(|(id, route)| {
                let route = route.lock();
                (route.binary.clone(), route.prefix_len(), *id)
            })
            .collect();
        let len = index.len();
        *self.index.write() = Some(index);
        len
    }

    // The ids of the records that may match the filter, if the index can
    // tell. `None` means a full scan is needed.
    fn indexed_ids(&self, filter: &RouteFilter) -> Option<Vec<RecordId>> {
        let RouteFilter::BinaryPrefix(bits) = filter else {
            return None;
        };
        let index = self.index.read();
        let ids = index
            .as_ref()?
            .range((bits.clone(), 0, RecordId::MIN)..)
            .take_while(|(binary, _, _)| bits.is_prefix_of(binary))
            .map(|(_, _, id)| *id)
            .collect();
        Some(ids)
    }

    fn find(&self, filter: &RouteFilter) -> Vec<Stored<Route>> {
        let ids = self.indexed_ids(filter);
        let docs = self.docs.read();
        match ids {
            Some(ids) => ids
                .into_iter()
                .filter_map(|id| {
                    docs.get(&id).map(|r| Stored::new(id, r.lock().clone()))
                })
                .filter(|s| filter.matches(&s.value))
                .collect(),
            None => docs
                .iter()
                .filter_map(|(id, r)| {
                    let route = r.lock();
                    filter
                        .matches(&route)
                        .then(|| Stored::new(*id, route.clone()))
                })
                .collect(),
        }
    }

    fn update_one(&self, id: RecordId, update: &RouteUpdate) -> bool {
        match self.docs.read().get(&id) {
            Some(route) => {
                route.lock().apply(update);
                true
            }
            None => false,
        }
    }

    fn update_many(&self, filter: &RouteFilter, update: &RouteUpdate) -> usize {
        let ids = self.indexed_ids(filter);
        let docs = self.docs.read();
        let apply = |route: &Mutex<Route>| {
            let mut route = route.lock();
            if filter.matches(&route) {
                route.apply(update);
                true
            } else {
                false
            }
        };
        match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| docs.get(id))
                .filter(|r| apply(*r))
                .count(),
            None => docs.values().filter(|r| apply(*r)).count(),
        }
    }
}

// VRP collections are replaced as a whole and only ever read in full.
type VrpCollection = RwLock<BTreeMap<RecordId, Vrp>>;

//------------ MemoryStore ---------------------------------------------------

/// A [RecordStore] that keeps all collections in memory.
///
/// Record ids are handed out from one counter for all collections, so an id
/// is unique within the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    routes: RwLock<HashMap<String, Arc<RouteCollection>>>,
    vrps: RwLock<HashMap<String, Arc<VrpCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> RecordId {
        RecordId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn route_collection(
        &self,
        name: &str,
    ) -> Result<Arc<RouteCollection>, StoreError> {
        self.routes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn route_collection_or_create(&self, name: &str) -> Arc<RouteCollection> {
        if let Some(c) = self.routes.read().get(name) {
            return c.clone();
        }
        self.routes
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("store: create route collection {}", name);
                Arc::default()
            })
            .clone()
    }

    fn vrp_collection_or_create(&self, name: &str) -> Arc<VrpCollection> {
        if let Some(c) = self.vrps.read().get(name) {
            return c.clone();
        }
        self.vrps
            .write()
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

impl RecordStore for MemoryStore {
    fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        let r = self.routes.write().remove(collection);
        let v = self.vrps.write().remove(collection);
        if r.is_some() || v.is_some() {
            debug!("store: dropped collection {}", collection);
        }
        Ok(())
    }

    fn ensure_index(&self, collection: &str) -> Result<(), StoreError> {
        if let Ok(routes) = self.route_collection(collection) {
            let len = routes.build_index();
            debug!("store: indexed {} routes in {}", len, collection);
            return Ok(());
        }
        if !self.vrps.read().contains_key(collection) {
            debug!("store: nothing to index in {}", collection);
        }
        Ok(())
    }

    fn insert_route(
        &self,
        collection: &str,
        route: Route,
    ) -> Result<RecordId, StoreError> {
        let id = self.next_id();
        trace!("store: insert route {} as {}", route, id);
        self.route_collection_or_create(collection).insert(id, route);
        Ok(id)
    }

    fn insert_vrp(
        &self,
        collection: &str,
        vrp: Vrp,
    ) -> Result<RecordId, StoreError> {
        let id = self.next_id();
        trace!("store: insert vrp {} as {}", vrp, id);
        self.vrp_collection_or_create(collection).write().insert(id, vrp);
        Ok(id)
    }

    fn vrps(&self, collection: &str) -> Result<Vec<Stored<Vrp>>, StoreError> {
        let Some(vrps) = self.vrps.read().get(collection).cloned() else {
            return Ok(vec![]);
        };
        let vrps = vrps
            .read()
            .iter()
            .map(|(id, vrp)| Stored::new(*id, vrp.clone()))
            .collect();
        Ok(vrps)
    }

    fn find_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
    ) -> Result<Vec<Stored<Route>>, StoreError> {
        match self.route_collection(collection) {
            Ok(routes) => Ok(routes.find(filter)),
            Err(_) => Ok(vec![]),
        }
    }

    fn update_route(
        &self,
        collection: &str,
        id: RecordId,
        update: &RouteUpdate,
    ) -> Result<(), StoreError> {
        if self.route_collection(collection)?.update_one(id, update) {
            Ok(())
        } else {
            Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id,
            })
        }
    }

    fn update_routes(
        &self,
        collection: &str,
        filter: &RouteFilter,
        update: &RouteUpdate,
    ) -> Result<usize, StoreError> {
        match self.route_collection(collection) {
            Ok(routes) => Ok(routes.update_many(filter, update)),
            Err(_) => Ok(0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use inetnum::addr::Prefix;
    use inetnum::asn::Asn;

    use super::*;
    use crate::types::{AddressFamily, Validity};

    fn route(asn: u32, pfx: &str) -> Route {
        let prefix = Prefix::from_str(pfx).unwrap();
        Route::new(
            Asn::from_u32(asn),
            prefix,
            BitString::from_addr(prefix.addr()),
        )
    }

    fn load(store: &MemoryStore) {
        for (asn, pfx) in [
            (1, "10.0.0.0/8"),
            (2, "10.1.0.0/16"),
            (3, "10.1.2.0/24"),
            (4, "11.0.0.0/8"),
            (5, "2001:db8::/32"),
        ] {
            store.insert_route("r", route(asn, pfx)).unwrap();
        }
    }

    #[test]
    fn indexed_and_scanned_searches_agree() {
        let store = MemoryStore::new();
        load(&store);
        let filter = RouteFilter::BinaryPrefix(
            BitString::encode_truncated("10.1.0.0", 16).unwrap(),
        );
        let scanned = store.find_routes("r", &filter).unwrap();

        store.ensure_index("r").unwrap();
        let indexed = store.find_routes("r", &filter).unwrap();

        assert_eq!(
            scanned.iter().map(|s| s.id).collect::<Vec<_>>(),
            indexed.iter().map(|s| s.id).collect::<Vec<_>>()
        );
        assert_eq!(indexed.len(), 2);
    }

    #[test]
    fn inserts_after_indexing_are_found() {
        let store = MemoryStore::new();
        load(&store);
        store.ensure_index("r").unwrap();
        store.insert_route("r", route(6, "10.1.3.0/24")).unwrap();

        let filter = RouteFilter::BinaryPrefix(
            BitString::encode_truncated("10.1.0.0", 16).unwrap(),
        );
        assert_eq!(store.find_routes("r", &filter).unwrap().len(), 3);
    }

    #[test]
    fn bulk_update_by_text() {
        let store = MemoryStore::new();
        load(&store);
        let n = store
            .update_routes(
                "r",
                &RouteFilter::PrefixText {
                    family: AddressFamily::Ipv4,
                    text: "10".into(),
                },
                &RouteUpdate::Rir("ripe".into()),
            )
            .unwrap();
        assert_eq!(n, 3);
        let rirs = store
            .routes("r")
            .unwrap()
            .into_iter()
            .filter(|r| r.value.rir.as_deref() == Some("ripe"))
            .count();
        assert_eq!(rirs, 3);
    }

    #[test]
    fn update_missing_record() {
        let store = MemoryStore::new();
        load(&store);
        let err = store
            .update_route(
                "r",
                RecordId::new(999),
                &RouteUpdate::Validation {
                    verdict: Validity::Valid,
                    vrp: RecordId::new(0),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
        assert!(matches!(
            store.update_route(
                "nope",
                RecordId::new(0),
                &RouteUpdate::ResetValidation
            ),
            Err(StoreError::CollectionNotFound(_))
        ));
        assert!(store
            .find_routes("nope", &RouteFilter::All)
            .unwrap()
            .is_empty());
        assert!(store.ensure_index("nope").is_ok());
    }

    #[test]
    fn drop_replaces_vrps() {
        let store = MemoryStore::new();
        let prefix = Prefix::from_str("10.0.0.0/8").unwrap();
        let vrp = Vrp::new(
            Asn::from_u32(1),
            prefix,
            8,
            BitString::encode_truncated("10.0.0.0", 8).unwrap(),
        );
        store.insert_vrp("v", vrp.clone()).unwrap();
        store.drop_collection("v").unwrap();
        assert!(store.vrps("v").unwrap().is_empty());
        store.insert_vrp("v", vrp).unwrap();
        assert_eq!(store.vrps("v").unwrap().len(), 1);

        // VRP collections are read in full, there is nothing to index.
        store.ensure_index("v").unwrap();
        assert_eq!(store.vrps("v").unwrap().len(), 1);
        assert!(store.routes("v").unwrap().is_empty());
    }
}
