use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::ops::Deref;
use std::result::Result as StdResult;
use std::str::FromStr;

use {
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address([u8; 4]);

impl Address {
    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.clone_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Creates an IPv4 address from a host byte order u32.
    pub fn from_u32(addr: u32) -> Address {
        Address([
            ((addr >> 24) & 0xFF) as u8,
            ((addr >> 16) & 0xFF) as u8,
            ((addr >> 8) & 0xFF) as u8,
            (addr & 0xFF) as u8,
        ])
    }

    /// Returns the address as a host byte order u32.
    pub fn as_u32(&self) -> u32 {
        ((self.0[0] as u32) << 24) | ((self.0[1] as u32) << 16)
            | ((self.0[2] as u32) << 8) | (self.0[3] as u32)
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks if all four octets are zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// Returns the low octet, used as a host id within a /24 subnet.
    pub fn host_id(&self) -> u8 {
        self.0[3]
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses an IPv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let (bytes, unknown): (Vec<_>, Vec<_>) = addr.split(".")
            .map(|token| token.parse::<u8>())
            .partition(|byte| !byte.is_err());

        if bytes.len() != 4 || unknown.len() > 0 {
            return Err(Error::Config("malformed IPv4 address"));
        }

        let bytes: Vec<_> = bytes.into_iter().map(|byte| byte.unwrap()).collect();

        let mut ipv4: [u8; 4] = [0; 4];
        ipv4.clone_from_slice(&bytes);

        Ok(Address::new(ipv4))
    }
}

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) + CIDR prefix length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressCidr {
    address: Address,
    prefix_len: u8,
}

impl AddressCidr {
    /// Creates an address with a prefix length.
    ///
    /// # Panics
    ///
    /// Causes a panic if the prefix length exceeds 32 bits.
    pub fn new(address: Address, prefix_len: u8) -> AddressCidr {
        assert!(prefix_len <= 32);

        AddressCidr {
            address,
            prefix_len,
        }
    }

    /// Returns the subnet mask.
    pub fn netmask(&self) -> Address {
        let mask = if self.prefix_len == 0 {
            0
        } else {
            !0 << (32 - self.prefix_len)
        };
        Address::from_u32(mask)
    }

    /// Returns the network address.
    pub fn network(&self) -> Address {
        Address::from_u32(self.address.as_u32() & self.netmask().as_u32())
    }

    /// Returns the subnet broadcast address.
    pub fn broadcast(&self) -> Address {
        Address::from_u32(self.address.as_u32() | !self.netmask().as_u32())
    }

    /// Checks if an address belongs to this subnet.
    pub fn is_member(&self, address: Address) -> bool {
        (address.as_u32() & self.netmask().as_u32()) == self.network().as_u32()
    }
}

impl Deref for AddressCidr {
    type Target = Address;

    fn deref(&self) -> &Address {
        &self.address
    }
}

impl Display for AddressCidr {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr() -> AddressCidr {
        AddressCidr::new(Address::new([192, 168, 10, 2]), 24)
    }

    #[test]
    fn test_parse_and_format() {
        let addr = "192.168.10.2".parse::<Address>().unwrap();
        assert_eq!(addr, Address::new([192, 168, 10, 2]));
        assert_eq!(format!("{}", addr), "192.168.10.2");
    }

    #[test]
    fn test_parse_malformed() {
        assert_matches!("192.168.10".parse::<Address>(), Err(_));
        assert_matches!("192.168.10.256".parse::<Address>(), Err(_));
        assert_matches!("192.168.10.2.2".parse::<Address>(), Err(_));
    }

    #[test]
    fn test_netmask() {
        assert_eq!(cidr().netmask(), Address::new([255, 255, 255, 0]));
    }

    #[test]
    fn test_network() {
        assert_eq!(cidr().network(), Address::new([192, 168, 10, 0]));
    }

    #[test]
    fn test_broadcast() {
        assert_eq!(cidr().broadcast(), Address::new([192, 168, 10, 255]));
    }

    #[test]
    fn test_is_member() {
        assert!(cidr().is_member(Address::new([192, 168, 10, 254])));
        assert!(!cidr().is_member(Address::new([192, 168, 11, 2])));
        assert!(!cidr().is_member(Address::new([10, 0, 0, 2])));
    }

    #[test]
    fn test_host_id() {
        assert_eq!(Address::new([192, 168, 10, 77]).host_id(), 77);
    }
}
