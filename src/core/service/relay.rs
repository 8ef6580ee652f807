//! Frame relaying between the kernel tap descriptor and the hardware FIFOs.
//!
//! Each direction owns a single staging buffer; a frame stays in its buffer
//! until the far side accepts it or the relay decides to drop it. Partial
//! frames are never held for resumption, retrying from the middle would
//! corrupt the bridged payload.

use std::io;

use core::dev::Device;
use core::fifo::Window;
use core::repr::{
    EthernetFrame,
    Ipv4Address,
};
use core::service::Gateway;
use {
    Error,
    Result,
};

/// Smallest read from the tap worth bridging; anything shorter cannot even
/// hold an IPv4 header.
const RUNT_LENGTH: usize = 20;

/// Offset reserved in the transmit buffer for the Ethernet header the relay
/// rebuilds before a hardware transmit.
const HEADER_LEN: usize = 14;

/// Drains at most one frame from the tap descriptor into the transmit
/// buffer.
///
/// Returns `Ok(true)` when a frame was staged past the reserved header
/// offset, `Ok(false)` when the buffer is still in use, nothing was
/// available, or the frame was a runt. An end of file or any unexpected read
/// failure is fatal to the session's data path.
pub fn receive_from_kernel<D: Device, W: Window>(gateway: &mut Gateway<D, W>) -> Result<bool> {
    if gateway.tx.is_occupied() {
        warn!(
            "Transmit buffer on device {} still in use.",
            gateway.tap_name
        );
        return Ok(false);
    }

    let result = {
        let Gateway {
            ref mut dev,
            ref mut tx,
            ..
        } = *gateway;
        dev.recv(&mut tx.as_mut()[HEADER_LEN..])
    };

    let read = match result {
        Ok(read) => read,
        Err(Error::Nothing) => return Ok(false),
        Err(err) => {
            error!(
                "Read from tap device {} failed with {:?}.",
                gateway.tap_name, err
            );
            return Err(err);
        }
    };

    if read < RUNT_LENGTH {
        warn!("Read runt packet from tap device {}.", gateway.tap_name);
        return Ok(false);
    }

    gateway.tx.set_len(HEADER_LEN + read);

    Ok(true)
}

/// Writes the header-stripped payload of the receive buffer to the tap
/// descriptor.
///
/// Returns `Ok(true)` when the payload was delivered and the buffer
/// released, `Ok(false)` when there was no payload or the descriptor cannot
/// accept the write yet; in the latter case the frame is kept for one more
/// try. Any other failure, including a short write, drops the frame.
pub fn transmit_to_kernel<D: Device, W: Window>(gateway: &mut Gateway<D, W>) -> Result<bool> {
    if gateway.rx.len() <= HEADER_LEN {
        // header only, no payload to hand to the kernel
        gateway.rx.clear();
        return Ok(false);
    }

    let result = {
        let Gateway {
            ref mut dev,
            ref rx,
            ..
        } = *gateway;
        dev.send(&rx.frame()[HEADER_LEN..])
    };

    match result {
        Ok(wrote) => {
            if wrote + HEADER_LEN < gateway.rx.len() {
                warn!(
                    "Incomplete packet transmission to {}: {} + {} < {}.",
                    gateway.tap_name,
                    HEADER_LEN,
                    wrote,
                    gateway.rx.len()
                );
                gateway.rx.clear();
                return Err(Error::IO(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "short write to tap device",
                )));
            }

            gateway.rx.clear();
            Ok(true)
        }
        Err(Error::Busy) => Ok(false),
        Err(err) => {
            warn!(
                "Write to tap device {} failed with {:?}.",
                gateway.tap_name, err
            );
            // drops the packet on the floor, better than spamming logs
            gateway.rx.clear();
            Err(err)
        }
    }
}

/// Resolves the staged kernel frame's destination MAC and hands the frame to
/// the hardware.
///
/// The destination is looked up by the low octet of the destination IP; an
/// unresolved (all-zero) entry is used as-is. The buffer is released whether
/// or not the hardware accepted the frame, the next frame simply retries.
pub fn transmit_to_hardware<D: Device, W: Window>(gateway: &mut Gateway<D, W>) -> Result<()> {
    let dst_addr = {
        let eth_frame = EthernetFrame::try_new(gateway.tx.frame()).unwrap();
        let dst_ip = Ipv4Address::try_new(&eth_frame.payload()[16..20]).unwrap();
        gateway.arp_cache.lookup(dst_ip.host_id())
    };

    {
        let mut eth_frame = EthernetFrame::try_new(gateway.tx.as_mut()).unwrap();
        eth_frame.set_dst_addr(dst_addr);
    }

    let result = {
        let Gateway {
            ref mut fifo,
            ref tx,
            ..
        } = *gateway;
        fifo.write_frame(tx.frame())
    };
    gateway.tx.clear();

    match result {
        // drops are logged by the driver, the next frame retries
        Err(Error::Busy) | Err(Error::Exhausted) => Ok(()),
        result => result,
    }
}
