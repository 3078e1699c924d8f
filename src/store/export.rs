//! Write a finished snapshot out as JSON lines, one route document per line.
//!
//! The documents carry the fields of the route records the way they were
//! always persisted: `asn` and `prefix` as text, the numeric `validity`
//! code, the comma-terminated `vrp` trail, `ipver` and `binary`.

use std::io::Write;

use serde_derive::Serialize;

use crate::errors::StoreError;
use crate::types::{Route, Stored};

use super::RecordStore;

#[derive(Debug, Serialize)]
pub struct RouteDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub asn: String,
    pub prefix: String,
    pub validity: i8,
    pub rir: String,
    pub vrp: String,
    pub ipver: u8,
    pub binary: String,
}

impl From<&Stored<Route>> for RouteDocument {
    fn from(stored: &Stored<Route>) -> Self {
        let route = &stored.value;
        Self {
            id: stored.id.to_string(),
            asn: u32::from_be_bytes(route.asn.to_raw()).to_string(),
            prefix: route.prefix.to_string(),
            validity: route.validity.into(),
            rir: route.rir.clone().unwrap_or_default(),
            vrp: route
                .matched_vrps
                .iter()
                .map(|id| format!("{},", id))
                .collect(),
            ipver: route.family().into(),
            binary: route.binary.to_string(),
        }
    }
}

/// Write all routes of `collection` to `out`, and return the number of
/// documents written.
pub fn write_routes<W: Write>(
    store: &dyn RecordStore,
    collection: &str,
    mut out: W,
) -> Result<usize, ExportError> {
    let routes = store.routes(collection).map_err(ExportError::Store)?;
    for route in &routes {
        serde_json::to_writer(&mut out, &RouteDocument::from(route))
            .map_err(ExportError::Json)?;
        out.write_all(b"\n").map_err(ExportError::Io)?;
    }
    out.flush().map_err(ExportError::Io)?;
    Ok(routes.len())
}

//------------ ExportError ---------------------------------------------------

#[derive(Debug)]
pub enum ExportError {
    Store(StoreError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Store(e) => Some(e),
            ExportError::Json(e) => Some(e),
            ExportError::Io(e) => Some(e),
        }
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Store(e) => write!(f, "{}", e),
            ExportError::Json(e) => {
                write!(f, "Error: Cannot serialize route: {}", e)
            }
            ExportError::Io(e) => {
                write!(f, "Error: Cannot write snapshot: {}", e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use inetnum::addr::Prefix;
    use inetnum::asn::Asn;

    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{BitString, RecordId, RouteUpdate, Validity};

    #[test]
    fn exports_route_documents() {
        let store = MemoryStore::new();
        let prefix = Prefix::from_str("193.0.0.0/21").unwrap();
        let id = store
            .insert_route(
                "r",
                Route::new(
                    Asn::from_u32(3333),
                    prefix,
                    BitString::from_addr(prefix.addr()),
                ),
            )
            .unwrap();
        store
            .update_route(
                "r",
                id,
                &RouteUpdate::Validation {
                    verdict: Validity::Valid,
                    vrp: RecordId::new(42),
                },
            )
            .unwrap();

        let mut out = vec![];
        assert_eq!(write_routes(&store, "r", &mut out).unwrap(), 1);

        let doc: serde_json::Value =
            serde_json::from_slice(out.as_slice()).unwrap();
        assert_eq!(doc["asn"], "3333");
        assert_eq!(doc["prefix"], "193.0.0.0/21");
        assert_eq!(doc["validity"], 0);
        assert_eq!(doc["vrp"], "00000000002a,");
        assert_eq!(doc["ipver"], 4);
        assert_eq!(doc["rir"], "");
    }
}
