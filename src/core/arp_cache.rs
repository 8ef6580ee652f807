use core::repr::EthernetAddress;

/// Number of entries in the cache, one per host id in a /24 subnet.
pub const ENTRIES: usize = 256;

/// Fixed-size table of host id -> ethernet address mappings for a /24 subnet.
///
/// The host id is the low octet of an IPv4 address inside the gateway's
/// subnet, so indices [0, 255] map 1:1 onto the fourth octet. An all-zero
/// entry means the address is unknown. Entries are only ever overwritten,
/// never expired; the caller is responsible for filtering out addresses that
/// do not belong to the subnet.
pub struct ArpCache {
    entries: [EthernetAddress; ENTRIES],
}

impl ArpCache {
    /// Creates a cache with every entry unknown.
    pub fn new() -> ArpCache {
        ArpCache {
            entries: [EthernetAddress::new([0; 6]); ENTRIES],
        }
    }

    /// Returns the ethernet address recorded for a host id, all-zero when the
    /// host has not been learned yet.
    pub fn lookup(&self, host_id: u8) -> EthernetAddress {
        self.entries[host_id as usize]
    }

    /// Creates or overwrites the ethernet address mapping for a host id.
    pub fn set(&mut self, host_id: u8, eth_addr: EthernetAddress) {
        self.entries[host_id as usize] = eth_addr;
    }
}
