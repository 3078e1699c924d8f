use std::fmt;

use inetnum::addr::Prefix;
use inetnum::asn::Asn;

use super::af::AddressFamily;
use super::bit_string::BitString;
use super::validity::Validity;

//------------ RecordId ------------------------------------------------------

/// The identifier a record store hands out for an inserted record.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub const MIN: RecordId = RecordId(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

//------------ Stored --------------------------------------------------------

/// A record as it lives in a store: the value together with its id.
#[derive(Clone, Debug)]
pub struct Stored<T> {
    pub id: RecordId,
    pub value: T,
}

impl<T> Stored<T> {
    pub fn new(id: RecordId, value: T) -> Self {
        Self { id, value }
    }
}

//------------ Route ---------------------------------------------------------

/// A BGP announcement as observed by the route collectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub asn: Asn,
    pub prefix: Prefix,
    /// All bits of the announced address, not only the network part.
    pub binary: BitString,
    pub validity: Validity,
    /// The ids of all VRPs that covered this route during validation, in
    /// the order they were applied.
    pub matched_vrps: Vec<RecordId>,
    pub rir: Option<String>,
}

impl Route {
    pub fn new(asn: Asn, prefix: Prefix, binary: BitString) -> Self {
        Self {
            asn,
            prefix,
            binary,
            validity: Validity::Unknown,
            matched_vrps: vec![],
            rir: None,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.binary.family()
    }

    /// The announced prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.prefix.len()
    }

    /// Apply a field update, as a store does when it executes an update
    /// for this record.
    pub fn apply(&mut self, update: &RouteUpdate) {
        match update {
            RouteUpdate::Validation { verdict, vrp } => {
                self.validity = self.validity.supersede(*verdict);
                self.matched_vrps.push(*vrp);
            }
            RouteUpdate::ResetValidation => {
                self.validity = Validity::Unknown;
                self.matched_vrps.clear();
            }
            RouteUpdate::Rir(rir) => {
                self.rir = Some(rir.clone());
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} rir {}",
            self.prefix,
            self.asn,
            self.validity,
            self.rir.as_deref().unwrap_or("-")
        )
    }
}

//------------ Vrp -----------------------------------------------------------

/// A Validated ROA Payload: `asn` may originate `prefix` and its more
/// specifics up to `max_length`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vrp {
    pub asn: Asn,
    pub prefix: Prefix,
    pub max_length: u8,
    /// The network bits of the prefix only.
    pub binary: BitString,
}

impl Vrp {
    pub fn new(
        asn: Asn,
        prefix: Prefix,
        max_length: u8,
        binary: BitString,
    ) -> Self {
        Self {
            asn,
            prefix,
            max_length,
            binary,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.binary.family()
    }
}

impl fmt::Display for Vrp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.asn, self.prefix, self.max_length)
    }
}

//------------ RouteUpdate ---------------------------------------------------

/// A field update for route records.
///
/// A store applies an update to one record atomically (see [Route::apply]),
/// so the read-decide-write of a validation verdict can not interleave with
/// another update of the same route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteUpdate {
    /// Merge the verdict of a VRP into the route's validity, and append the
    /// VRP to the match trail.
    Validation { verdict: Validity, vrp: RecordId },
    /// Back to `Unknown`, with an empty match trail.
    ResetValidation,
    /// Set the owning registry.
    Rir(String),
}

//------------ RouteFilter ---------------------------------------------------

/// Selects route records for queries and bulk updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteFilter {
    All,
    /// Routes whose bit string starts with these bits (and thus of the same
    /// family).
    BinaryPrefix(BitString),
    /// Routes of a family whose textual prefix starts with this text.
    PrefixText { family: AddressFamily, text: String },
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        match self {
            RouteFilter::All => true,
            RouteFilter::BinaryPrefix(bits) => bits.is_prefix_of(&route.binary),
            RouteFilter::PrefixText { family, text } => {
                route.family() == *family
                    && route.prefix.to_string().starts_with(text.as_str())
            }
        }
    }
}
