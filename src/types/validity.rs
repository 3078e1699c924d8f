use super::errors::ParseError;

//------------ Validity ------------------------------------------------------

/// The Route Origin Validation state of a route.
///
/// The states have an implicit precedence: `Valid` beats every mismatch
/// state, and every state beats `Unknown`. Among the mismatch states the
/// most recently applied one wins.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Validity {
    /// No VRP covers the route (yet).
    Unknown,
    /// A covering VRP authorizes the origin AS at this prefix length.
    Valid,
    /// The origin AS matches, but the route is more specific than a VRP
    /// without a length range (prefix length == max length) allows.
    FixedLengthExceeded,
    /// The origin AS matches, but the route is more specific than the max
    /// length of a VRP with a length range.
    RangeLengthExceeded,
    /// The prefix length is authorized, the origin AS isn't.
    AsnMismatch,
    /// Neither the origin AS nor the prefix length is authorized.
    AsnAndLengthMismatch,
}

impl Validity {
    pub const ALL: [Validity; 6] = [
        Validity::Unknown,
        Validity::Valid,
        Validity::FixedLengthExceeded,
        Validity::RangeLengthExceeded,
        Validity::AsnMismatch,
        Validity::AsnAndLengthMismatch,
    ];

    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    /// Merge a new verdict for a route into its current state, and return
    /// the resulting state.
    ///
    /// A `Valid` route stays `Valid` whatever the verdict, so that a VRP
    /// processed later can never mask an earlier `Valid` outcome. Any other
    /// state is replaced by the verdict.
    pub fn supersede(self, verdict: Validity) -> Validity {
        match (self, verdict) {
            (Validity::Valid, _) => Validity::Valid,
            (_, verdict) => verdict,
        }
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validity::Unknown => write!(f, "unknown"),
            Validity::Valid => write!(f, "valid"),
            Validity::FixedLengthExceeded => {
                write!(f, "fixed-length-exceeded")
            }
            Validity::RangeLengthExceeded => {
                write!(f, "range-length-exceeded")
            }
            Validity::AsnMismatch => write!(f, "asn-mismatch"),
            Validity::AsnAndLengthMismatch => {
                write!(f, "asn-and-length-mismatch")
            }
        }
    }
}

impl From<Validity> for i8 {
    fn from(value: Validity) -> Self {
        match value {
            Validity::Unknown => -1,
            Validity::Valid => 0,
            Validity::FixedLengthExceeded => 1,
            Validity::RangeLengthExceeded => 2,
            Validity::AsnMismatch => 3,
            Validity::AsnAndLengthMismatch => 4,
        }
    }
}

impl TryFrom<i8> for Validity {
    type Error = ParseError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Validity::Unknown),
            0 => Ok(Validity::Valid),
            1 => Ok(Validity::FixedLengthExceeded),
            2 => Ok(Validity::RangeLengthExceeded),
            3 => Ok(Validity::AsnMismatch),
            4 => Ok(Validity::AsnAndLengthMismatch),
            v => Err(ParseError::InvalidValidity(v)),
        }
    }
}
