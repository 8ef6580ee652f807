//! Facilities the host process provides to a gateway session.
//!
//! The host owns the event loop and the mapped device window; a session only
//! ever sees them through these traits. Readiness and timer expiry are
//! delivered by the host calling back into the session, so all gateway logic
//! runs cooperatively on the host's single thread.

use std::os::unix::io::RawFd;
use std::time::Duration;

use core::fifo::Window;
use Result;

/// Identifies a registration with the host event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token(pub usize);

/// Host event loop registration.
pub trait Reactor {
    /// Starts watching a descriptor for read readiness.
    fn register_read(&mut self, fd: RawFd) -> Result<Token>;

    /// Stops watching a previously registered descriptor.
    fn unregister(&mut self, token: Token) -> Result<()>;

    /// Schedules a callback at a fixed interval.
    fn register_timer(&mut self, interval: Duration) -> Result<Token>;

    /// Cancels a previously scheduled timer.
    fn cancel_timer(&mut self, token: Token) -> Result<()>;
}

/// Named lookup of memory-mapped device register blocks.
pub trait RegisterMap {
    type Window: Window;

    /// Claims exclusive ownership of the named register block, or fails with
    /// `Error::NotFound`.
    fn claim(&mut self, name: &str) -> Result<Self::Window>;
}
