//! Turn the lines of a route dump or a VRP export into records, and load
//! them into the store.
//!
//! Route dumps are the tab separated RIS whois dumps: `asn`, `prefix`,
//! `peer count`, with any further columns ignored. Only routes seen by at
//! least `min_peers` peers are kept. VRP exports are comma separated:
//! `ASN`, `IP Prefix`, `Max Length`, with any further columns (the trust
//! anchor, usually) ignored.
//!
//! A line that cannot be parsed is logged, counted and skipped. A store
//! error aborts the load.

use inetnum::addr::Prefix;
use inetnum::asn::Asn;
use log::{info, warn};
use rayon::prelude::*;

use crate::coordinator::Coordinator;
use crate::errors::{ParseError, StoreError};
use crate::stats::{IngestCounters, IngestReport};
use crate::store::RecordStore;
use crate::types::{parse_addr, BitString, Route, Vrp};

/// Routes seen by fewer peers than this are dropped, if not configured
/// otherwise.
pub const DEFAULT_MIN_PEERS: u32 = 5;

//------------ Parsed --------------------------------------------------------

/// What a single feed line turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parsed<T> {
    Record(T),
    /// A header, comment or empty line.
    Skipped,
    /// A route seen by too few peers.
    BelowThreshold,
}

//------------ Parsing -------------------------------------------------------

/// Parse one line of a RIS whois dump.
pub fn parse_route_line(
    line: &str,
    min_peers: u32,
) -> Result<Parsed<Route>, ParseError> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(Parsed::Skipped);
    }

    let mut fields = line.split('\t');
    let asn = fields.next().ok_or(ParseError::MissingField("asn"))?;
    let prefix = fields.next().ok_or(ParseError::MissingField("prefix"))?;
    let peers = fields
        .next()
        .ok_or(ParseError::MissingField("peer count"))?
        .trim();

    let peers = peers
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidPeerCount(peers.to_string()))?;
    if peers < min_peers {
        return Ok(Parsed::BelowThreshold);
    }

    let asn = parse_asn(asn)?;
    let (addr, len) = split_prefix(prefix)?;
    let ip = parse_addr(addr)?;
    let prefix = to_prefix(ip, len)?;

    Ok(Parsed::Record(Route::new(asn, prefix, BitString::from_addr(ip))))
}

/// Parse one line of a VRP export.
pub fn parse_vrp_line(line: &str) -> Result<Parsed<Vrp>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("ASN,IP") {
        return Ok(Parsed::Skipped);
    }

    let mut fields = line.split(',');
    let asn = fields.next().ok_or(ParseError::MissingField("asn"))?;
    let prefix = fields.next().ok_or(ParseError::MissingField("prefix"))?;
    let max_length = fields
        .next()
        .ok_or(ParseError::MissingField("max length"))?
        .trim();

    let asn = parse_asn(asn.trim().trim_start_matches("AS"))?;
    let (addr, len) = split_prefix(prefix)?;
    let ip = parse_addr(addr)?;
    let binary = BitString::from_addr(ip).truncate(len)?;
    let prefix = to_prefix(ip, len)?;

    let max_length = max_length
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidMaxLength(max_length.to_string()))?;
    if max_length < len || max_length > binary.family().bits() {
        return Err(ParseError::MaxLengthOutOfRange {
            prefix: prefix.to_string(),
            max_length,
        });
    }

    Ok(Parsed::Record(Vrp::new(asn, prefix, max_length, binary)))
}

fn parse_asn(field: &str) -> Result<Asn, ParseError> {
    let field = field.trim();
    field
        .parse::<u32>()
        .map(Asn::from_u32)
        .map_err(|_| ParseError::InvalidAsn(field.to_string()))
}

fn split_prefix(field: &str) -> Result<(&str, u8), ParseError> {
    let field = field.trim();
    let (addr, len) = field
        .split_once('/')
        .ok_or_else(|| ParseError::InvalidLength(field.to_string()))?;
    let len = len
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidLength(field.to_string()))?;
    Ok((addr, len))
}

fn to_prefix(ip: std::net::IpAddr, len: u8) -> Result<Prefix, ParseError> {
    Prefix::new_relaxed(ip, len)
        .map_err(|_| ParseError::InvalidLength(format!("{}/{}", ip, len)))
}

//------------ Loading -------------------------------------------------------

/// Load the lines of a route dump into `collection`, and index it.
///
/// Lines are parsed and inserted by the workers of the coordinator. The
/// collection is not dropped first: the IPv4 and IPv6 dumps of a day go
/// into the same collection.
pub fn load_routes(
    store: &dyn RecordStore,
    coordinator: &Coordinator,
    collection: &str,
    lines: &[String],
    min_peers: u32,
) -> Result<IngestReport, StoreError> {
    let counters = IngestCounters::default();

    coordinator.fan_out("load routes", lines.par_iter(), |line| {
        counters.lines.inc();
        match parse_route_line(line, min_peers) {
            Ok(Parsed::Record(route)) => {
                store.insert_route(collection, route)?;
                counters.inserted.inc();
            }
            Ok(Parsed::Skipped) => counters.skipped.inc(),
            Ok(Parsed::BelowThreshold) => counters.below_threshold.inc(),
            Err(err) => {
                warn!("routes: skipping line '{}': {}", line, err);
                counters.malformed.inc();
            }
        }
        Ok::<_, StoreError>(())
    })?;
    store.ensure_index(collection)?;

    let report = counters.report();
    info!(
        "loaded {} routes into {} ({} below threshold, {} malformed)",
        report.inserted, collection, report.below_threshold, report.malformed
    );
    Ok(report)
}

/// Replace the VRPs in `collection` with the ones in the lines of an
/// export, and index it.
pub fn load_vrps(
    store: &dyn RecordStore,
    coordinator: &Coordinator,
    collection: &str,
    lines: &[String],
) -> Result<IngestReport, StoreError> {
    store.drop_collection(collection)?;
    let counters = IngestCounters::default();

    coordinator.fan_out("load vrps", lines.par_iter(), |line| {
        counters.lines.inc();
        match parse_vrp_line(line) {
            Ok(Parsed::Record(vrp)) => {
                store.insert_vrp(collection, vrp)?;
                counters.inserted.inc();
            }
            Ok(Parsed::Skipped) | Ok(Parsed::BelowThreshold) => {
                counters.skipped.inc()
            }
            Err(err) => {
                warn!("vrps: skipping line '{}': {}", line, err);
                counters.malformed.inc();
            }
        }
        Ok::<_, StoreError>(())
    })?;
    store.ensure_index(collection)?;

    let report = counters.report();
    info!(
        "loaded {} vrps into {} ({} malformed)",
        report.inserted, collection, report.malformed
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::AddressFamily;

    fn route(line: &str) -> Route {
        match parse_route_line(line, DEFAULT_MIN_PEERS).unwrap() {
            Parsed::Record(route) => route,
            other => panic!("expected a route, got {:?}", other),
        }
    }

    fn vrp(line: &str) -> Vrp {
        match parse_vrp_line(line).unwrap() {
            Parsed::Record(vrp) => vrp,
            other => panic!("expected a vrp, got {:?}", other),
        }
    }

    #[test]
    fn route_line() {
        let r = route("3333\t193.0.0.0/21\t312");
        assert_eq!(r.asn, Asn::from_u32(3333));
        assert_eq!(r.prefix.to_string(), "193.0.0.0/21");
        assert_eq!(r.prefix_len(), 21);
        assert_eq!(r.binary.len(), 32);
        assert_eq!(r.family(), AddressFamily::Ipv4);
        assert!(r.matched_vrps.is_empty());
        assert!(r.rir.is_none());
    }

    #[test]
    fn route_line_v6() {
        let r = route("3333\t2001:67c:2e8::/48\t200\textra");
        assert_eq!(r.binary.len(), 128);
        assert_eq!(r.family(), AddressFamily::Ipv6);
    }

    #[test]
    fn visibility_threshold() {
        assert_eq!(
            parse_route_line("3333\t193.0.0.0/21\t4", 5).unwrap(),
            Parsed::BelowThreshold
        );
        assert!(matches!(
            parse_route_line("3333\t193.0.0.0/21\t5", 5).unwrap(),
            Parsed::Record(_)
        ));
    }

    #[test]
    fn route_comments_and_headers() {
        for line in ["% RIS whois dump", "", "\t", "ASN\tPrefix\tPeers"] {
            assert_eq!(
                parse_route_line(line, DEFAULT_MIN_PEERS).unwrap(),
                Parsed::Skipped
            );
        }
    }

    #[test]
    fn malformed_route_lines() {
        assert_eq!(
            parse_route_line("3333\t193.0.0.0/21", 5),
            Err(ParseError::MissingField("peer count"))
        );
        assert_eq!(
            parse_route_line("3333\t193.0.0.0/21\tmany", 5),
            Err(ParseError::InvalidPeerCount("many".into()))
        );
        assert!(parse_route_line("3333\t193.0.0.0/33\t10", 5).is_err());
        assert!(parse_route_line("3333\t193.0.0/21\t10", 5).is_err());
        assert!(parse_route_line("3333x\t193.0.0.0/21\t10", 5).is_err());
        assert!(parse_route_line("1\tfoo/8\t10", 5).is_err());
    }

    #[test]
    fn vrp_line() {
        let v = vrp("AS3333,193.0.0.0/21,24,ripe");
        assert_eq!(v.asn, Asn::from_u32(3333));
        assert_eq!(v.max_length, 24);
        assert_eq!(v.binary.as_str(), "110000010000000000000");

        let v = vrp("3333,2001:67c::/32,48");
        assert_eq!(v.binary.len(), 32);
        assert_eq!(v.family(), AddressFamily::Ipv6);
    }

    #[test]
    fn vrp_headers() {
        assert_eq!(
            parse_vrp_line("ASN,IP Prefix,Max Length,Trust Anchor").unwrap(),
            Parsed::Skipped
        );
        assert_eq!(parse_vrp_line("  ").unwrap(), Parsed::Skipped);
    }

    #[test]
    fn vrp_max_length_range() {
        assert!(matches!(
            parse_vrp_line("AS1,10.0.0.0/16,8"),
            Err(ParseError::MaxLengthOutOfRange { max_length: 8, .. })
        ));
        assert!(matches!(
            parse_vrp_line("AS1,10.0.0.0/16,33"),
            Err(ParseError::MaxLengthOutOfRange { max_length: 33, .. })
        ));
        assert_eq!(
            parse_vrp_line("AS1,10.0.0.0/16,x"),
            Err(ParseError::InvalidMaxLength("x".into()))
        );
        assert!(matches!(
            parse_vrp_line("AS1,10.0.0.0/16,16").unwrap(),
            Parsed::Record(_)
        ));
    }
}
