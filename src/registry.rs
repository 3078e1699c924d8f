//! Annotate routes with the Regional Internet Registry that the address
//! space was delegated to, from the IANA address space registries.
//!
//! The IANA files are CSV, one row per delegation, with the delegated range
//! in the first column and the WHOIS server of the registry in the fourth.
//! Only rows with a WHOIS server of the form `whois.<rir>.<tld>` are
//! delegations to a registry; all other rows (the header, reserved and
//! multicast space, legacy space without a registry) are skipped.
//!
//! IPv6 delegations are matched exactly: a route belongs to the delegation
//! if the delegation's network bits are a prefix of the route's bits. For
//! IPv4, the default [DecimalPrefix](Ipv4RirMatching::DecimalPrefix)
//! matching compares the text of the route prefix with the decimal first
//! octet of the `/8` block, so the block `1/8` also catches `10.0.0.0/8`
//! and `100.0.0.0/8`, and the last block applied to a route wins. The
//! [Cidr](Ipv4RirMatching::Cidr) matching does it properly.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;

use log::{info, trace, warn};
use rayon::prelude::*;
use regex::Regex;
use serde_derive::Deserialize;

use crate::coordinator::Coordinator;
use crate::errors::{ConfigError, ParseError, StoreError};
use crate::stats::{AnnotationCounters, AnnotationReport};
use crate::store::RecordStore;
use crate::types::{AddressFamily, BitString, RouteFilter, RouteUpdate};

#[allow(clippy::expect_used)]
static IPV4_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{3}/[0-9]{1,2}").expect("valid IPv4 block pattern")
});

#[allow(clippy::expect_used)]
static IPV6_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{4}[:0-9a-f]*/[0-9]{1,3}")
        .expect("valid IPv6 block pattern")
});

#[allow(clippy::expect_used)]
static WHOIS_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"whois\.[a-z]*\.[a-z]*").expect("valid whois pattern")
});

const RANGE_COLUMN: usize = 0;
const WHOIS_COLUMN: usize = 3;

//------------ Ipv4RirMatching -----------------------------------------------

/// How IPv4 routes are matched against the `/8` blocks of the IANA
/// registry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ipv4RirMatching {
    /// The textual route prefix starts with the decimal first octet of the
    /// block.
    #[default]
    #[serde(alias = "decimal")]
    DecimalPrefix,
    /// The route lies within the block.
    Cidr,
}

impl FromStr for Ipv4RirMatching {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decimal" | "decimal-prefix" => Ok(Ipv4RirMatching::DecimalPrefix),
            "cidr" => Ok(Ipv4RirMatching::Cidr),
            _ => Err(ConfigError::InvalidMatching(s.to_string())),
        }
    }
}

impl fmt::Display for Ipv4RirMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ipv4RirMatching::DecimalPrefix => write!(f, "decimal"),
            Ipv4RirMatching::Cidr => write!(f, "cidr"),
        }
    }
}

//------------ Delegation ----------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelegationRange {
    /// An IPv4 block as IANA writes it, e.g. `001/8`.
    Ipv4Block { first_octet: u8, bits: BitString },
    /// An IPv6 prefix, as its network bits.
    Prefix(BitString),
}

/// A range of address space and the registry it was delegated to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub range: DelegationRange,
    pub rir: String,
}

impl Delegation {
    /// The routes that belong to this delegation.
    pub fn filter(&self, matching: Ipv4RirMatching) -> RouteFilter {
        match (&self.range, matching) {
            (
                DelegationRange::Ipv4Block { first_octet, .. },
                Ipv4RirMatching::DecimalPrefix,
            ) => RouteFilter::PrefixText {
                family: AddressFamily::Ipv4,
                text: first_octet.to_string(),
            },
            (DelegationRange::Ipv4Block { bits, .. }, Ipv4RirMatching::Cidr)
            | (DelegationRange::Prefix(bits), _) => {
                RouteFilter::BinaryPrefix(bits.clone())
            }
        }
    }
}

/// Parse a row of an IANA registry file of the given family.
///
/// Returns `None` for rows that are not a delegation to a registry.
pub fn parse_delegation(
    row: &csv::StringRecord,
    family: AddressFamily,
) -> Result<Option<Delegation>, ParseError> {
    let Some(range) = row.get(RANGE_COLUMN).map(str::trim) else {
        return Ok(None);
    };
    let pattern = match family {
        AddressFamily::Ipv4 => &IPV4_BLOCK,
        AddressFamily::Ipv6 => &IPV6_BLOCK,
    };
    if !pattern.is_match(range) {
        return Ok(None);
    }
    let Some(rir) = row.get(WHOIS_COLUMN).and_then(rir_name) else {
        return Ok(None);
    };

    let (addr, len) = range
        .split_once('/')
        .ok_or_else(|| ParseError::InvalidLength(range.to_string()))?;
    let len = len
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidLength(range.to_string()))?;

    let range = match family {
        AddressFamily::Ipv4 => {
            let first_octet = addr
                .parse::<u8>()
                .map_err(|_| ParseError::InvalidAddress(addr.to_string()))?;
            let bits = BitString::from_addr(
                Ipv4Addr::new(first_octet, 0, 0, 0).into(),
            )
            .truncate(len)?;
            DelegationRange::Ipv4Block { first_octet, bits }
        }
        AddressFamily::Ipv6 => {
            let bits = BitString::encode_truncated(addr, len)?;
            if bits.family() != AddressFamily::Ipv6 {
                return Err(ParseError::InvalidAddress(addr.to_string()));
            }
            DelegationRange::Prefix(bits)
        }
    };

    Ok(Some(Delegation { range, rir }))
}

// The registry name is the second label of its WHOIS server.
fn rir_name(whois: &str) -> Option<String> {
    let whois = whois.trim();
    if !WHOIS_HOST.is_match(whois) {
        return None;
    }
    whois
        .split('.')
        .nth(1)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

//------------ Annotation ----------------------------------------------------

/// Set the registry of all routes of `family` in `collection` from the
/// rows of an IANA registry file.
///
/// Rows are applied concurrently, so where delegations overlap (which only
/// happens with decimal IPv4 matching) the registry a route ends up with
/// depends on the order in which the rows complete.
pub fn annotate(
    store: &dyn RecordStore,
    coordinator: &Coordinator,
    collection: &str,
    rows: &[csv::StringRecord],
    family: AddressFamily,
    matching: Ipv4RirMatching,
) -> Result<AnnotationReport, StoreError> {
    let counters = AnnotationCounters::default();

    coordinator.fan_out("annotate", rows.par_iter(), |row| {
        counters.rows.inc();
        match parse_delegation(row, family) {
            Ok(Some(delegation)) => {
                let n = store.update_routes(
                    collection,
                    &delegation.filter(matching),
                    &RouteUpdate::Rir(delegation.rir.clone()),
                )?;
                trace!(
                    "{:?} -> {}: {} routes",
                    delegation.range,
                    delegation.rir,
                    n
                );
                counters.delegations.inc();
                counters.updated.add(n);
            }
            Ok(None) => counters.skipped.inc(),
            Err(err) => {
                warn!("rirs: skipping row {:?}: {}", row, err);
                counters.skipped.inc();
            }
        }
        Ok::<_, StoreError>(())
    })?;

    let report = counters.report();
    info!(
        "applied {} {} delegations to {} routes",
        report.delegations, family, report.updated
    );
    Ok(report)
}
