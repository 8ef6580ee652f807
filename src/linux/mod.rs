//! Linux TAP devices and the platform start path for gateway sessions.

pub mod dev;
pub mod libc;

use core::platform::{
    Reactor,
    RegisterMap,
};
use core::service::{
    Config,
    Gateway,
};
use Result;

/// Starts a gateway session on a Linux TAP device.
///
/// Claims the named register window, opens the tap device and hands both to
/// the session. A missing MAC address is filled in with a generated
/// fallback. Fails with `Error::NotFound` when the register cannot be
/// resolved, `Error::IO` when the tap cannot be created, and
/// `Error::Config`/`Error::IO` when the session cannot be configured; every
/// failure unwinds the resources acquired before it.
pub fn start<M, R>(
    mut config: Config,
    registers: &mut M,
    reactor: &mut R,
) -> Result<Gateway<dev::Tap, M::Window>>
where
    M: RegisterMap,
    R: Reactor,
{
    if config.mac.is_none() {
        config.mac = Some(dev::fallback_ethernet_addr(0));
    }

    let window = registers.claim(&config.register_name)?;
    let tap = dev::Tap::open(&config.tap_name)?;

    Gateway::new(config, window, tap, reactor)
}
