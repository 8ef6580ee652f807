//! Frame processing services composing one gateway session.
//!
//! The `service` module owns the long-lived state of a gateway and the two
//! entry points the host event loop drives: the fixed-interval hardware poll
//! and the tap descriptor readiness callback.

pub mod arp;
pub mod relay;

use std::time::Duration;

use core::arp_cache::ArpCache;
use core::dev::Device;
use core::fifo::{
    BusyPolicy,
    Fifo,
    Window,
    MAX_FRAME,
};
use core::platform::{
    Reactor,
    Token,
};
use core::repr::{
    eth_types,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4AddressCidr,
};
use core::storage::FrameBuffer;
use {
    Error,
    Result,
};

/// Microseconds between two polls of the hardware receive FIFO.
pub const POLL_INTERVAL_US: u64 = 1000;

/// Default fabric port of the hardware endpoint.
pub const DEFAULT_PORT: u16 = 7148;

/// Timer ticks between two probes of the background ARP sweep.
const ARP_PERIOD: u64 = 101;

/// Capacity of the staging area for outgoing ARP frames.
const ARP_BUFFER: usize = 64;

/// Parameters for starting a gateway session.
///
/// A missing MAC address is filled in with a generated fallback by the
/// platform start path before the session is created.
pub struct Config {
    pub tap_name: String,
    pub register_name: String,
    pub addr: Ipv4Address,
    pub port: u16,
    pub mac: Option<EthernetAddress>,
    pub busy_policy: BusyPolicy,
}

impl Config {
    pub fn new(tap_name: &str, register_name: &str, addr: Ipv4Address) -> Config {
        Config {
            tap_name: tap_name.to_string(),
            register_name: register_name.to_string(),
            addr,
            port: DEFAULT_PORT,
            mac: None,
            busy_policy: BusyPolicy::Enforce,
        }
    }
}

/// A long-lived session bridging one kernel tap interface to one hardware
/// MAC/FIFO instance.
///
/// All logic runs inside callbacks invoked by the host's event loop, never
/// concurrently: the hardware is polled from [on_timer](#method.on_timer)
/// and the tap descriptor drained from [on_readable](#method.on_readable).
/// Each direction stages at most one frame at a time; an undrained frame is
/// explicit backpressure on that direction.
pub struct Gateway<D: Device, W: Window> {
    /// Driver for the mapped hardware registers.
    pub fifo: Fifo<W>,
    /// Kernel side of the bridge.
    pub dev: D,
    /// Local copy of the host id -> MAC table mirrored into the hardware.
    pub arp_cache: ArpCache,
    pub(crate) tap_name: String,
    pub(crate) addr: Ipv4AddressCidr,
    pub(crate) mac: EthernetAddress,
    port: u16,
    pub(crate) rx: FrameBuffer,
    pub(crate) tx: FrameBuffer,
    pub(crate) arp_buffer: [u8; ARP_BUFFER],
    tap_token: Option<Token>,
    timer_token: Option<Token>,
    ticks: u64,
    sweep_host: u8,
}

impl<D: Device, W: Window> Gateway<D, W> {
    /// Creates a gateway session and hooks it into the host event loop.
    ///
    /// Registers the tap descriptor and the poll timer, assigns the tap's
    /// address, programs the hardware endpoint and announces the gateway on
    /// the subnet. Any failing step unwinds all previously registered
    /// resources and fails creation as a whole.
    pub fn new<R: Reactor>(config: Config, window: W, dev: D, reactor: &mut R) -> Result<Gateway<D, W>> {
        let mac = match config.mac {
            Some(mac) => mac,
            None => return Err(Error::Config("no MAC address supplied")),
        };

        info!(
            "Setting up tap device {} with {}/{}.",
            config.tap_name, config.addr, mac
        );

        let mut gateway = Gateway {
            fifo: Fifo::new(window, config.busy_policy),
            dev,
            arp_cache: ArpCache::new(),
            tap_name: config.tap_name,
            addr: Ipv4AddressCidr::new(config.addr, 24),
            mac,
            port: config.port,
            rx: FrameBuffer::new(MAX_FRAME),
            tx: FrameBuffer::new(MAX_FRAME),
            arp_buffer: [0; ARP_BUFFER],
            tap_token: None,
            timer_token: None,
            ticks: 0,
            sweep_host: 0,
        };

        gateway.tap_token = Some(reactor.register_read(gateway.dev.raw_fd())?);

        match reactor.register_timer(Duration::from_micros(POLL_INTERVAL_US)) {
            Ok(token) => gateway.timer_token = Some(token),
            Err(err) => {
                gateway.unhook(reactor);
                return Err(err);
            }
        }

        let addr = *gateway.addr;
        let netmask = gateway.addr.netmask();
        if let Err(err) = gateway.dev.configure(addr, netmask) {
            error!("Unable to configure tap device {}.", gateway.tap_name);
            gateway.unhook(reactor);
            return Err(err);
        }

        gateway.fifo.configure(gateway.mac, addr, gateway.port);

        // Prime the transmit header template; the relay only rewrites the
        // destination before each hardware transmit.
        {
            let mut eth_frame = EthernetFrame::try_new(gateway.tx.as_mut()).unwrap();
            eth_frame.set_src_addr(mac);
            eth_frame.set_payload_type(eth_types::IPV4);
        }

        arp::announce(&mut gateway);

        Ok(gateway)
    }

    /// Tears the session down, unregistering both event loop hookups.
    ///
    /// Any staged frame is discarded. Consuming the session closes the tap
    /// descriptor and releases the register window.
    pub fn stop<R: Reactor>(mut self, reactor: &mut R) {
        self.unhook(reactor);
        info!("Stopped gateway on tap device {}.", self.tap_name);
    }

    /// Returns the name of the bridged tap interface.
    pub fn tap_name(&self) -> &str {
        &self.tap_name
    }

    /// Returns the informational fabric port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handles one fixed-interval timer tick.
    ///
    /// Polls the hardware FIFO and relays at most one received frame: IPv4
    /// goes to the kernel, ARP to the protocol engine, anything else is
    /// logged and discarded. A frame still staged for the kernel from an
    /// earlier tick is retried first and blocks this tick's poll.
    pub fn on_timer(&mut self) -> Result<()> {
        self.ticks += 1;
        if self.ticks % ARP_PERIOD == 0 {
            let host_id = self.next_sweep_host();
            arp::request_for_host(self, host_id);
        }

        if self.rx.is_occupied() {
            relay::transmit_to_kernel(self)?;
            return Ok(());
        }

        match self.fifo.receive_frame(&mut self.rx) {
            Ok(_) => self.dispatch(),
            Err(Error::Nothing) => Ok(()),
            // size problems are logged by the driver, the frame stays with
            // the hardware
            Err(_) => Ok(()),
        }
    }

    /// Handles read readiness on the tap descriptor.
    ///
    /// Drains at most one frame from the kernel, resolves its destination
    /// MAC through the ARP cache and hands it to the hardware.
    pub fn on_readable(&mut self) -> Result<()> {
        if relay::receive_from_kernel(self)? {
            relay::transmit_to_hardware(self)?;
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Result<()> {
        let payload_type = EthernetFrame::try_new(self.rx.frame()).unwrap().payload_type();

        match payload_type {
            eth_types::IPV4 => {
                relay::transmit_to_kernel(self)?;
                Ok(())
            }
            eth_types::ARP => {
                arp::process(self);
                self.rx.clear();
                Ok(())
            }
            payload_type => {
                warn!(
                    "Discarding frame of unknown type {:#06x} and length {}.",
                    payload_type,
                    self.rx.len()
                );
                self.rx.clear();
                Ok(())
            }
        }
    }

    /// Advances the background ARP sweep, skipping the gateway's own host id
    /// and the subnet edges.
    fn next_sweep_host(&mut self) -> u8 {
        loop {
            self.sweep_host = match self.sweep_host {
                254 => 1,
                host_id => host_id + 1,
            };
            if self.sweep_host != self.addr.host_id() {
                return self.sweep_host;
            }
        }
    }

    fn unhook<R: Reactor>(&mut self, reactor: &mut R) {
        if let Some(token) = self.tap_token.take() {
            if let Err(err) = reactor.unregister(token) {
                warn!("Unregistering tap callback failed with {:?}.", err);
            }
        }
        if let Some(token) = self.timer_token.take() {
            if let Err(err) = reactor.cancel_timer(token) {
                warn!("Cancelling poll timer failed with {:?}.", err);
            }
        }
    }
}
