use std::net::IpAddr;

use super::errors::ParseError;

//------------ AddressFamily -------------------------------------------------
//
/// The address family of a route, VRP or delegation.
///
/// The family decides the width of the bit string a prefix is encoded into:
/// 32 characters for IPv4, 128 characters for IPv6. It is persisted as the
/// numeric version (4 or 6), like the `ipver` field of the route documents.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Detect the family from the textual form of an address. A `.` means
    /// IPv4 (this includes IPv4-mapped IPv6 text such as `::ffff:1.2.3.4`),
    /// a `:` means IPv6.
    pub fn detect(addr: &str) -> Result<Self, ParseError> {
        if addr.contains('.') {
            Ok(AddressFamily::Ipv4)
        } else if addr.contains(':') {
            Ok(AddressFamily::Ipv6)
        } else {
            Err(ParseError::UnknownFamily(addr.to_string()))
        }
    }

    /// The number of bits in an address of this family.
    pub const fn bits(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    /// The numeric version, 4 or 6.
    pub const fn version(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 6,
        }
    }
}

impl From<IpAddr> for AddressFamily {
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

impl From<AddressFamily> for u8 {
    fn from(value: AddressFamily) -> Self {
        value.version()
    }
}

impl TryFrom<u8> for AddressFamily {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(AddressFamily::Ipv4),
            6 => Ok(AddressFamily::Ipv6),
            v => Err(ParseError::UnknownFamily(v.to_string())),
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}
