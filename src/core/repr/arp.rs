use std::io::Write;

use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use {
    Error,
    Result,
};

/// Leading bytes shared by every Ethernet/IPv4 ARP packet: hardware type 1,
/// protocol type 0x0800, hardware length 6, protocol length 4, and the high
/// byte of the opcode.
pub const PREFIX: [u8; 7] = [0, 1, 8, 0, 6, 4, 0];

/// [ARP opcodes](https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-1),
/// low byte only; the high byte is covered by the constant prefix.
pub mod ops {
    pub const REQUEST: u8 = 1;

    pub const REPLY: u8 = 2;
}

mod fields {
    use std::ops::Range;

    pub const PREFIX: Range<usize> = 0..7;

    pub const OP: usize = 7;

    pub const SOURCE_HW_ADDR: Range<usize> = 8..14;

    pub const SOURCE_PROTO_ADDR: Range<usize> = 14..18;

    pub const TARGET_HW_ADDR: Range<usize> = 18..24;

    pub const TARGET_PROTO_ADDR: Range<usize> = 24..28;
}

/// View of a byte buffer as an Ethernet/IPv4 ARP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const BUFFER_LEN: usize = 28;

    /// Tries to create an ARP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::BUFFER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Checks the fixed prefix identifying an Ethernet/IPv4 ARP packet.
    pub fn has_valid_prefix(&self) -> bool {
        self.buffer.as_ref()[fields::PREFIX] == PREFIX
    }

    pub fn op(&self) -> u8 {
        self.buffer.as_ref()[fields::OP]
    }

    pub fn source_hw_addr(&self) -> EthernetAddress {
        EthernetAddress::try_new(&self.buffer.as_ref()[fields::SOURCE_HW_ADDR]).unwrap()
    }

    pub fn source_proto_addr(&self) -> Ipv4Address {
        Ipv4Address::try_new(&self.buffer.as_ref()[fields::SOURCE_PROTO_ADDR]).unwrap()
    }

    pub fn target_hw_addr(&self) -> EthernetAddress {
        EthernetAddress::try_new(&self.buffer.as_ref()[fields::TARGET_HW_ADDR]).unwrap()
    }

    pub fn target_proto_addr(&self) -> Ipv4Address {
        Ipv4Address::try_new(&self.buffer.as_ref()[fields::TARGET_PROTO_ADDR]).unwrap()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_prefix(&mut self) {
        (&mut self.buffer.as_mut()[fields::PREFIX])
            .write(&PREFIX)
            .unwrap();
    }

    pub fn set_op(&mut self, op: u8) {
        self.buffer.as_mut()[fields::OP] = op;
    }

    pub fn set_source_hw_addr(&mut self, addr: EthernetAddress) {
        (&mut self.buffer.as_mut()[fields::SOURCE_HW_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_source_proto_addr(&mut self, addr: Ipv4Address) {
        (&mut self.buffer.as_mut()[fields::SOURCE_PROTO_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_target_hw_addr(&mut self, addr: EthernetAddress) {
        (&mut self.buffer.as_mut()[fields::TARGET_HW_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }

    pub fn set_target_proto_addr(&mut self, addr: Ipv4Address) {
        (&mut self.buffer.as_mut()[fields::TARGET_PROTO_ADDR])
            .write(addr.as_bytes())
            .unwrap();
    }
}
