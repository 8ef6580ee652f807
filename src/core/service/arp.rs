//! ARP learning, answering and solicitation for the gateway's /24.
//!
//! The engine keeps two copies of every mapping in sync: the session's own
//! cache and the hardware table the MAC uses for line-rate forwarding.
//! Outgoing ARP frames are built in the session's dedicated staging buffer,
//! never in the main transmit buffer, so control traffic cannot collide with
//! a bridged payload frame in flight.

use core::dev::Device;
use core::fifo::Window;
use core::repr::{
    arp_ops,
    eth_types,
    ArpPacket,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use core::service::Gateway;

/// Length of an Ethernet/IPv4 ARP frame before padding: a 14-byte Ethernet
/// header followed by the 28-byte packet.
const ARP_FRAME_LEN: usize = 42;

/// Records a host id -> MAC mapping gleaned from traffic.
///
/// The unspecified address, the subnet broadcast host id and any address
/// outside the gateway's subnet are ignored; everything else overwrites the
/// cache entry at index = low octet and mirrors it into the hardware table.
pub fn learn<D: Device, W: Window>(
    gateway: &mut Gateway<D, W>,
    eth_addr: EthernetAddress,
    ipv4_addr: Ipv4Address,
) {
    if ipv4_addr.is_zero() {
        return;
    }

    if ipv4_addr.host_id() == 0xFF {
        return;
    }

    if !gateway.addr.is_member(ipv4_addr) {
        debug!("Ignoring ARP mapping for {} outside the subnet.", ipv4_addr);
        return;
    }

    debug!("Adding ARP mapping from {} to {}.", ipv4_addr, eth_addr);
    gateway.arp_cache.set(ipv4_addr.host_id(), eth_addr);
    gateway.fifo.write_arp_entry(ipv4_addr.host_id(), eth_addr);
}

/// Processes the ARP frame staged in the receive buffer.
///
/// Replies teach the engine their sender; requests additionally trigger a
/// reply when they ask for the gateway's own address. A corrupted prefix or
/// an unknown opcode drops the frame.
pub fn process<D: Device, W: Window>(gateway: &mut Gateway<D, W>) {
    let (op, source_hw_addr, source_proto_addr, wants_us) = {
        let eth_frame = match EthernetFrame::try_new(gateway.rx.frame()) {
            Ok(eth_frame) => eth_frame,
            Err(_) => {
                warn!("Unknown or malformed arp packet.");
                return;
            }
        };

        let packet = match ArpPacket::try_new(eth_frame.payload()) {
            Ok(packet) => packet,
            Err(_) => {
                warn!("Unknown or malformed arp packet.");
                return;
            }
        };

        if !packet.has_valid_prefix() {
            warn!("Unknown or malformed arp packet.");
            return;
        }

        (
            packet.op(),
            packet.source_hw_addr(),
            packet.source_proto_addr(),
            packet.target_proto_addr() == *gateway.addr,
        )
    };

    match op {
        arp_ops::REPLY => {
            learn(gateway, source_hw_addr, source_proto_addr);
        }
        arp_ops::REQUEST => {
            learn(gateway, source_hw_addr, source_proto_addr);
            if wants_us {
                debug!("Sending arp reply to {}/{}.", source_proto_addr, source_hw_addr);
                send_arp(
                    gateway,
                    arp_ops::REPLY,
                    source_hw_addr,
                    source_hw_addr,
                    source_proto_addr,
                );
            }
        }
        op => {
            warn!("Unhandled arp message {:#x}.", op);
        }
    }
}

/// Broadcasts a gratuitous reply for the gateway's own address.
///
/// Sent once at session startup to prime the caches of every peer on the
/// subnet.
pub fn announce<D: Device, W: Window>(gateway: &mut Gateway<D, W>) {
    debug!("Sending arp announce for {}.", *gateway.addr);
    let subnet_broadcast = gateway.addr.broadcast();
    send_arp(
        gateway,
        arp_ops::REPLY,
        EthernetAddress::BROADCAST,
        EthernetAddress::BROADCAST,
        subnet_broadcast,
    );
}

/// Broadcasts a request for one host inside the subnet, a no-op for the
/// gateway's own host id.
pub fn request_for_host<D: Device, W: Window>(gateway: &mut Gateway<D, W>, host_id: u8) {
    if host_id == gateway.addr.host_id() {
        return;
    }

    let network = gateway.addr.network();
    let bytes = network.as_bytes();
    let target = Ipv4Address::new([bytes[0], bytes[1], bytes[2], host_id]);

    debug!("Sending arp request for {}.", target);
    send_arp(
        gateway,
        arp_ops::REQUEST,
        EthernetAddress::BROADCAST,
        EthernetAddress::BROADCAST,
        target,
    );
}

/// Builds an ARP frame in the staging buffer and hands it to the hardware.
fn send_arp<D: Device, W: Window>(
    gateway: &mut Gateway<D, W>,
    op: u8,
    dst_addr: EthernetAddress,
    target_hw_addr: EthernetAddress,
    target_proto_addr: Ipv4Address,
) {
    let mac = gateway.mac;
    let addr = *gateway.addr;

    {
        let mut eth_frame = EthernetFrame::try_new(&mut gateway.arp_buffer[..]).unwrap();
        eth_frame.set_dst_addr(dst_addr);
        eth_frame.set_src_addr(mac);
        eth_frame.set_payload_type(eth_types::ARP);

        let mut packet = ArpPacket::try_new(eth_frame.payload_mut()).unwrap();
        packet.set_prefix();
        packet.set_op(op);
        packet.set_source_hw_addr(mac);
        packet.set_source_proto_addr(addr);
        packet.set_target_hw_addr(target_hw_addr);
        packet.set_target_proto_addr(target_proto_addr);
    }

    let Gateway {
        ref mut fifo,
        ref arp_buffer,
        ..
    } = *gateway;

    if let Err(err) = fifo.write_frame(&arp_buffer[..ARP_FRAME_LEN]) {
        debug!("ARP transmit failed with {:?}.", err);
    }
}
