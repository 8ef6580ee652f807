//! Serialization and deserialization of network frames.
//!
//! The `repr` module provides view abstractions for reading and writing
//! frames and packets at fixed offsets in byte buffers.

pub mod arp;
pub mod ethernet;
pub mod ipv4;

pub use self::arp::{
    ops as arp_ops,
    Packet as ArpPacket,
};
pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
};
pub use self::ipv4::{
    Address as Ipv4Address,
    AddressCidr as Ipv4AddressCidr,
};
