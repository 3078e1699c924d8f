use std::net::IpAddr;
use std::str::FromStr;

use super::af::AddressFamily;
use super::errors::ParseError;

//------------ BitString -----------------------------------------------------

// A bit string is the textual binary representation of an address, one
// character ('0' or '1') per bit, most significant bit first. For a route the
// string always holds all bits of the address (32 for IPv4, 128 for IPv6),
// for a VRP or a delegation it is truncated to the prefix length, so that it
// may end in the middle of an octet.
//
// The point of the representation is that prefix containment becomes a
// plain string relation: the network of `a` contains the address of `b`
// if, and only if, `a` is a prefix of `b`. Bit strings sort in address
// order within a family, which makes an ordered index over them a prefix
// range index.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BitString {
    family: AddressFamily,
    bits: String,
}

impl BitString {
    /// Encode all bits of an address.
    pub fn from_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Self {
                family: AddressFamily::Ipv4,
                bits: format!("{:032b}", u32::from(addr)),
            },
            IpAddr::V6(addr) => Self {
                family: AddressFamily::Ipv6,
                bits: format!("{:0128b}", u128::from(addr)),
            },
        }
    }

    /// Encode the textual form of an address. The family is detected from
    /// the text, see [parse_addr].
    pub fn encode(addr: &str) -> Result<Self, ParseError> {
        parse_addr(addr).map(Self::from_addr)
    }

    /// Encode the textual form of an address and keep only the first `len`
    /// bits.
    pub fn encode_truncated(addr: &str, len: u8) -> Result<Self, ParseError> {
        Self::encode(addr)?.truncate(len)
    }

    /// Keep the first `len` bits. Lengths beyond the family width, or
    /// beyond the bits present, are an error.
    pub fn truncate(mut self, len: u8) -> Result<Self, ParseError> {
        if len > self.family.bits() || len as usize > self.bits.len() {
            return Err(ParseError::InvalidLength(len.to_string()));
        }
        self.bits.truncate(len as usize);
        Ok(self)
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// The number of bits in the string.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.bits
    }

    /// Whether `self` is a prefix of `other`, i.e. the network `self`
    /// encodes contains `other`. Bit strings of different families never
    /// contain one another.
    pub fn is_prefix_of(&self, other: &BitString) -> bool {
        self.family == other.family && other.bits.starts_with(&self.bits)
    }
}

/// Parse the textual form of an address, detecting the family from the
/// text (see [AddressFamily::detect]). An IPv4-mapped IPv6 address written
/// with a dotted quad is taken as the IPv4 address it maps.
pub fn parse_addr(addr: &str) -> Result<IpAddr, ParseError> {
    let addr = addr.trim();
    let ip = IpAddr::from_str(addr)
        .map_err(|_| ParseError::InvalidAddress(addr.to_string()))?;

    match (AddressFamily::detect(addr)?, ip) {
        (AddressFamily::Ipv4, IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .ok_or_else(|| ParseError::InvalidAddress(addr.to_string())),
        (_, ip) => Ok(ip),
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bits)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn encode_ipv4() {
        let bs = BitString::encode("10.0.0.1").unwrap();
        assert_eq!(bs.family(), AddressFamily::Ipv4);
        assert_eq!(bs.as_str(), "00001010000000000000000000000001");
    }

    #[test]
    fn encode_ipv6_uses_all_bytes() {
        let bs = BitString::encode("2001:db8::1").unwrap();
        assert_eq!(bs.len(), 128);
        assert_eq!(&bs.as_str()[..16], "0010000000000001");
        assert_eq!(&bs.as_str()[16..32], "0000110110111000");
        assert!(bs.as_str().ends_with('1'));
    }

    #[test]
    fn encode_mapped_ipv4() {
        let bs = BitString::encode("::ffff:192.0.2.1").unwrap();
        assert_eq!(bs.family(), AddressFamily::Ipv4);
        assert_eq!(bs, BitString::encode("192.0.2.1").unwrap());
    }

    #[test]
    fn truncate_mid_octet() {
        let bs = BitString::encode_truncated("193.0.0.0", 11).unwrap();
        assert_eq!(bs.as_str(), "11000001000");
        assert!(BitString::encode_truncated("193.0.0.0", 33).is_err());
        assert!(BitString::encode_truncated("2001::", 129).is_err());
    }

    #[test]
    fn malformed_addresses() {
        assert_eq!(
            BitString::encode("300.1.1.1"),
            Err(ParseError::InvalidAddress("300.1.1.1".into()))
        );
        assert!(BitString::encode("2001:::1").is_err());
        assert!(BitString::encode("").is_err());
    }

    #[test]
    fn containment_is_family_bound() {
        let v6 = BitString::encode_truncated("2001::", 8).unwrap();
        let v4 = BitString::encode("32.1.2.3").unwrap();
        assert_eq!(&v4.as_str()[..8], v6.as_str());
        assert!(!v6.is_prefix_of(&v4));
    }

    proptest! {
        #[test]
        fn ipv4_width(raw in any::<u32>()) {
            let bs = BitString::from_addr(Ipv4Addr::from(raw).into());
            prop_assert_eq!(bs.len(), 32);
            prop_assert!(bs.as_str().chars().all(|c| c == '0' || c == '1'));
        }

        #[test]
        fn ipv6_width(raw in any::<u128>()) {
            let bs = BitString::from_addr(Ipv6Addr::from(raw).into());
            prop_assert_eq!(bs.len(), 128);
            prop_assert!(bs.as_str().chars().all(|c| c == '0' || c == '1'));
        }

        #[test]
        fn truncation_contains_address(raw in any::<u32>(), len in 0u8..=32) {
            let full = BitString::from_addr(Ipv4Addr::from(raw).into());
            let net = full.clone().truncate(len).unwrap();
            prop_assert_eq!(net.len(), len as usize);
            prop_assert!(net.is_prefix_of(&full));
        }
    }
}
