use std::os::unix::io::RawFd;

use core::repr::Ipv4Address;
use Result;

/// A non-blocking interface to the kernel side of the gateway, usually a TAP
/// device.
///
/// Implementations must never block: `recv` reports an empty descriptor as
/// `Error::Nothing` and `send` reports a descriptor that cannot accept the
/// write yet as `Error::Busy`. An unexpected end of file or any other failure
/// is reported as `Error::IO` and is fatal to the session's data path.
pub trait Device {
    /// Writes a buffer to the device, returning the number of bytes written.
    fn send(&mut self, buffer: &[u8]) -> Result<usize>;

    /// Reads a frame from the device into a buffer and returns its size.
    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Returns the underlying descriptor for event loop registration.
    fn raw_fd(&self) -> RawFd;

    /// Assigns an IP address and netmask to the device and brings it up.
    fn configure(&mut self, addr: Ipv4Address, netmask: Ipv4Address) -> Result<()>;
}
