//! Shared harness for driving a gateway against mock collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use tapgate::core::fifo::{
    regs,
    BusyPolicy,
    MemWindow,
    Window,
};
use tapgate::core::dev::Device;
use tapgate::core::platform::{
    Reactor,
    RegisterMap,
    Token,
};
use tapgate::core::repr::{
    eth_types,
    ArpPacket,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use tapgate::core::service::{
    Config,
    Gateway,
};
use tapgate::{
    Error,
    Result,
};

/// Extent of one mapped MAC instance: both FIFOs plus the ARP table.
pub const WINDOW_EXTENT: usize = 0x3800;

lazy_static! {
    /// Address the gateway binds, host id 1 in its /24.
    pub static ref GATEWAY_ADDR: Ipv4Address = Ipv4Address::new([192, 168, 10, 1]);

    /// MAC the gateway is started with.
    pub static ref GATEWAY_MAC: EthernetAddress =
        EthernetAddress::new([0x02, 0x40, 0, 0, 0, 0x01]);

    /// MAC of a peer host on the subnet.
    pub static ref PEER_MAC: EthernetAddress =
        EthernetAddress::new([0xAA, 0xBB, 0, 0, 0, 0x05]);
}

pub fn init() {
    let _ = ::env_logger::try_init();
}

/// How the mock tap treats the next writes from the gateway.
#[derive(Clone, Copy, Debug)]
pub enum SendMode {
    Accept,
    WouldBlock,
    Short(usize),
    Fail,
}

pub struct TapState {
    pub reads: VecDeque<Vec<u8>>,
    pub eof: bool,
    pub sent: Vec<Vec<u8>>,
    pub send_mode: SendMode,
    pub configured: Option<(Ipv4Address, Ipv4Address)>,
    pub configure_fails: bool,
}

/// A scripted stand-in for the kernel tap device.
///
/// Clones share state so a test can keep a handle after the gateway takes
/// ownership of the device.
#[derive(Clone)]
pub struct TestTap {
    state: Rc<RefCell<TapState>>,
}

impl TestTap {
    pub fn new() -> TestTap {
        TestTap {
            state: Rc::new(RefCell::new(TapState {
                reads: VecDeque::new(),
                eof: false,
                sent: Vec::new(),
                send_mode: SendMode::Accept,
                configured: None,
                configure_fails: false,
            })),
        }
    }

    pub fn state(&self) -> ::std::cell::RefMut<TapState> {
        self.state.borrow_mut()
    }

    /// Queues a packet for the gateway to read from the kernel.
    pub fn push_read(&self, packet: &[u8]) {
        self.state.borrow_mut().reads.push_back(packet.to_vec());
    }
}

impl Device for TestTap {
    fn send(&mut self, buffer: &[u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        match state.send_mode {
            SendMode::Accept => {
                state.sent.push(buffer.to_vec());
                Ok(buffer.len())
            }
            SendMode::WouldBlock => Err(Error::Busy),
            SendMode::Short(wrote) => {
                state.sent.push(buffer[..wrote].to_vec());
                Ok(wrote)
            }
            SendMode::Fail => Err(Error::IO(::std::io::Error::new(
                ::std::io::ErrorKind::Other,
                "injected write failure",
            ))),
        }
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        match state.reads.pop_front() {
            Some(packet) => {
                buffer[..packet.len()].clone_from_slice(&packet);
                Ok(packet.len())
            }
            None if state.eof => Err(Error::IO(::std::io::Error::new(
                ::std::io::ErrorKind::UnexpectedEof,
                "end of file from tap device",
            ))),
            None => Err(Error::Nothing),
        }
    }

    fn raw_fd(&self) -> RawFd {
        3
    }

    fn configure(&mut self, addr: Ipv4Address, netmask: Ipv4Address) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.configure_fails {
            return Err(Error::Config("injected configuration failure"));
        }
        state.configured = Some((addr, netmask));
        Ok(())
    }
}

/// An event loop that only records registrations.
pub struct TestReactor {
    next_token: usize,
    pub fds: Vec<(Token, RawFd)>,
    pub timers: Vec<(Token, Duration)>,
}

impl TestReactor {
    pub fn new() -> TestReactor {
        TestReactor {
            next_token: 0,
            fds: Vec::new(),
            timers: Vec::new(),
        }
    }

    fn token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }
}

impl Reactor for TestReactor {
    fn register_read(&mut self, fd: RawFd) -> Result<Token> {
        let token = self.token();
        self.fds.push((token, fd));
        Ok(token)
    }

    fn unregister(&mut self, token: Token) -> Result<()> {
        match self.fds.iter().position(|&(t, _)| t == token) {
            Some(i) => {
                self.fds.remove(i);
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    fn register_timer(&mut self, interval: Duration) -> Result<Token> {
        let token = self.token();
        self.timers.push((token, interval));
        Ok(token)
    }

    fn cancel_timer(&mut self, token: Token) -> Result<()> {
        match self.timers.iter().position(|&(t, _)| t == token) {
            Some(i) => {
                self.timers.remove(i);
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }
}

/// A register map with a single claimable MAC instance.
pub struct TestRegisterMap {
    window: Option<MemWindow>,
}

impl TestRegisterMap {
    pub fn new() -> TestRegisterMap {
        TestRegisterMap {
            window: Some(MemWindow::new(WINDOW_EXTENT)),
        }
    }
}

impl RegisterMap for TestRegisterMap {
    type Window = MemWindow;

    fn claim(&mut self, name: &str) -> Result<MemWindow> {
        if name != "gateway" {
            return Err(Error::NotFound);
        }
        self.window.take().ok_or(Error::NotFound)
    }
}

pub fn config() -> Config {
    let mut config = Config::new("tap0", "gateway", *GATEWAY_ADDR);
    config.mac = Some(*GATEWAY_MAC);
    // simulation windows keep stale transmit counts, do not trust them
    config.busy_policy = BusyPolicy::Ignore;
    config
}

pub fn gateway(
    config: Config,
    tap: TestTap,
    reactor: &mut TestReactor,
) -> Gateway<TestTap, MemWindow> {
    Gateway::new(config, MemWindow::new(WINDOW_EXTENT), tap, reactor).unwrap()
}

/// Places a frame in the hardware receive FIFO, as the MAC would.
///
/// The status register counts 8-byte words, so the frame must be padded to a
/// word multiple.
pub fn push_hw_frame(gateway: &mut Gateway<TestTap, MemWindow>, frame: &[u8]) {
    assert_eq!(frame.len() % 8, 0);

    let window = gateway.fifo.window_mut();
    window.write(regs::RXBUFFER, frame);

    // only the receive half of the status word changes hands
    let transmit_half = window.read_u32(regs::BUFFER_SIZES) & 0xFFFF_0000;
    window.write_u32(regs::BUFFER_SIZES, transmit_half | (frame.len() / 8) as u32);
}

/// Returns a copy of the hardware transmit FIFO contents and the word count
/// last written to the status register.
pub fn hw_transmit(gateway: &Gateway<TestTap, MemWindow>) -> (Vec<u8>, u32) {
    let window = gateway.fifo.window();
    let words = window.read_u32(regs::BUFFER_SIZES) >> 16;
    let mut frame = vec![0; words as usize * 8];
    window.read(regs::TXBUFFER, &mut frame);
    (frame, words)
}

/// Builds a word-aligned Ethernet/IPv4 ARP frame.
pub fn arp_frame(
    op: u8,
    source_hw_addr: EthernetAddress,
    source_proto_addr: Ipv4Address,
    target_proto_addr: Ipv4Address,
) -> Vec<u8> {
    let mut frame = vec![0; 48];

    {
        let mut eth_frame = EthernetFrame::try_new(&mut frame[..]).unwrap();
        eth_frame.set_dst_addr(EthernetAddress::BROADCAST);
        eth_frame.set_src_addr(source_hw_addr);
        eth_frame.set_payload_type(eth_types::ARP);

        let mut packet = ArpPacket::try_new(eth_frame.payload_mut()).unwrap();
        packet.set_prefix();
        packet.set_op(op);
        packet.set_source_hw_addr(source_hw_addr);
        packet.set_source_proto_addr(source_proto_addr);
        packet.set_target_hw_addr(EthernetAddress::new([0; 6]));
        packet.set_target_proto_addr(target_proto_addr);
    }

    frame
}

/// Builds a word-aligned IPv4 frame of `len` bytes destined to `dst_ip`,
/// with a randomized payload.
pub fn ipv4_frame(dst_ip: Ipv4Address, len: usize) -> Vec<u8> {
    use rand::Rng;

    assert!(len >= 34 && len % 8 == 0);

    let mut rng = ::rand::thread_rng();
    let mut frame: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

    {
        let mut eth_frame = EthernetFrame::try_new(&mut frame[..]).unwrap();
        eth_frame.set_dst_addr(*GATEWAY_MAC);
        eth_frame.set_src_addr(*PEER_MAC);
        eth_frame.set_payload_type(eth_types::IPV4);
        eth_frame.payload_mut()[16..20].clone_from_slice(dst_ip.as_bytes());
    }

    frame
}

/// Builds an IP packet as read from the tap device, destination address at
/// the usual header offset.
pub fn ip_packet(dst_ip: Ipv4Address, len: usize) -> Vec<u8> {
    use rand::Rng;

    assert!(len >= 20);

    let mut rng = ::rand::thread_rng();
    let mut packet: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    packet[16..20].clone_from_slice(dst_ip.as_bytes());

    packet
}
