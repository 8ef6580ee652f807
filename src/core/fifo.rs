//! Driver for the memory-mapped transmit/receive FIFOs of the hardware MAC.
//!
//! The hardware exposes no interrupt path to user space, so the driver is
//! strictly polled: a status word advertises received data and outstanding
//! transmissions, and frame payloads live at fixed offsets inside the mapped
//! register window.

use std::ptr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::repr::{
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use core::storage::FrameBuffer;
use {
    Error,
    Result,
};

/// Register offsets within the mapped window of one MAC instance.
pub mod regs {
    /// MAC address of the hardware endpoint, 2 + 4 bytes over two words.
    pub const MAC: usize = 0x00;

    /// IPv4 address of the hardware endpoint.
    pub const ADDRESS: usize = 0x10;

    /// Combined status word: upper 16 bits hold the outstanding transmit
    /// word count (the busy indicator), lower 16 bits the received word
    /// count.
    pub const BUFFER_SIZES: usize = 0x18;

    /// Fabric port and enable flag.
    pub const EN_RST_PORT: usize = 0x20;

    /// Transmit frame area.
    pub const TXBUFFER: usize = 0x1000;

    /// Receive frame area.
    pub const RXBUFFER: usize = 0x2000;

    /// Base of the hardware ARP table.
    pub const ARPTABLE: usize = 0x3000;

    /// Stride of one hardware ARP table entry.
    pub const ARP_ENTRY_STRIDE: usize = 8;
}

/// Smallest frame the hardware will transmit; shorter frames are zero-padded.
pub const MIN_FRAME: usize = 64;

/// Capacity of the transmit and receive FIFOs.
pub const MAX_FRAME: usize = 4096;

/// Enable flag in the `EN_RST_PORT` register.
const PORT_ENABLE: u32 = 1 << 24;

/// Size of one FIFO word; the status register counts in these units.
const WORD: usize = 8;

const ZEROS: [u8; MIN_FRAME] = [0; MIN_FRAME];

/// Bounded access into an exclusively owned mapped register window.
///
/// The raw mapped address never leaves the implementation; all register and
/// buffer traffic goes through offsets relative to the window base.
pub trait Window {
    fn read_u32(&self, offset: usize) -> u32;

    fn write_u32(&mut self, offset: usize, value: u32);

    fn read(&self, offset: usize, buffer: &mut [u8]);

    fn write(&mut self, offset: usize, buffer: &[u8]);
}

/// A window over live device registers mapped into the process.
pub struct RawWindow {
    base: *mut u8,
    extent: usize,
}

impl RawWindow {
    /// Creates a window over `extent` bytes of mapped device memory.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapping of at least `extent` bytes which stays
    /// valid for the lifetime of the window, and no other handle may access
    /// the same registers.
    pub unsafe fn from_raw_parts(base: *mut u8, extent: usize) -> RawWindow {
        RawWindow { base, extent }
    }

    fn check(&self, offset: usize, len: usize) {
        assert!(offset + len <= self.extent);
    }
}

impl Window for RawWindow {
    fn read_u32(&self, offset: usize) -> u32 {
        self.check(offset, 4);
        unsafe { ptr::read_volatile(self.base.offset(offset as isize) as *const u32) }
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.check(offset, 4);
        unsafe { ptr::write_volatile(self.base.offset(offset as isize) as *mut u32, value) }
    }

    fn read(&self, offset: usize, buffer: &mut [u8]) {
        self.check(offset, buffer.len());
        unsafe {
            ptr::copy_nonoverlapping(
                self.base.offset(offset as isize),
                buffer.as_mut_ptr(),
                buffer.len(),
            );
        }
    }

    fn write(&mut self, offset: usize, buffer: &[u8]) {
        self.check(offset, buffer.len());
        unsafe {
            ptr::copy_nonoverlapping(
                buffer.as_ptr(),
                self.base.offset(offset as isize),
                buffer.len(),
            );
        }
    }
}

/// A memory-backed window for simulation targets and tests.
///
/// Words are kept in network byte order so byte-level expectations match the
/// big-endian device.
pub struct MemWindow {
    memory: Vec<u8>,
}

impl MemWindow {
    /// Creates a zeroed window of `extent` bytes.
    pub fn new(extent: usize) -> MemWindow {
        MemWindow {
            memory: vec![0; extent],
        }
    }
}

impl Window for MemWindow {
    fn read_u32(&self, offset: usize) -> u32 {
        NetworkEndian::read_u32(&self.memory[offset..offset + 4])
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        NetworkEndian::write_u32(&mut self.memory[offset..offset + 4], value);
    }

    fn read(&self, offset: usize, buffer: &mut [u8]) {
        let len = buffer.len();
        buffer.clone_from_slice(&self.memory[offset..offset + len]);
    }

    fn write(&mut self, offset: usize, buffer: &[u8]) {
        self.memory[offset..offset + buffer.len()].clone_from_slice(buffer);
    }
}

impl AsRef<[u8]> for MemWindow {
    fn as_ref(&self) -> &[u8] {
        self.memory.as_ref()
    }
}

impl AsMut<[u8]> for MemWindow {
    fn as_mut(&mut self) -> &mut [u8] {
        self.memory.as_mut()
    }
}

/// How to treat the hardware's busy indicator before a transmit.
///
/// Production devices report outstanding transmissions reliably; simulation
/// targets leave stale counts in the status word, so there the indicator is
/// logged and overridden instead of trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusyPolicy {
    /// A nonzero busy count fails the transmit.
    Enforce,
    /// A nonzero busy count is logged and ignored.
    Ignore,
}

/// Driver for one hardware MAC/FIFO instance.
pub struct Fifo<W: Window> {
    window: W,
    busy_policy: BusyPolicy,
}

impl<W: Window> Fifo<W> {
    pub fn new(window: W, busy_policy: BusyPolicy) -> Fifo<W> {
        Fifo {
            window,
            busy_policy,
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Programs the hardware endpoint's own MAC, IPv4 address and fabric
    /// port.
    pub fn configure(&mut self, mac: EthernetAddress, addr: Ipv4Address, port: u16) {
        self.write_mac(regs::MAC, mac);
        self.window.write_u32(regs::ADDRESS, addr.as_u32());
        self.window
            .write_u32(regs::EN_RST_PORT, PORT_ENABLE | port as u32);
    }

    /// Copies a frame into the transmit FIFO and triggers transmission.
    ///
    /// An empty frame is a no-op. Frames shorter than [MIN_FRAME](constant.MIN_FRAME.html)
    /// are zero-padded up to it; frames beyond the FIFO capacity fail with
    /// `Error::Exhausted` and are discarded. A nonzero busy indicator is
    /// handled according to the [BusyPolicy](enum.BusyPolicy.html).
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() == 0 {
            return Ok(());
        }

        let actual = if frame.len() < MIN_FRAME {
            MIN_FRAME
        } else {
            frame.len()
        };

        if actual > MAX_FRAME {
            warn!("Frame request {} exceeds limit {}.", actual, MAX_FRAME);
            return Err(Error::Exhausted);
        }

        let outstanding = (self.window.read_u32(regs::BUFFER_SIZES) & 0xFFFF_0000) >> 16;
        if outstanding > 0 {
            match self.busy_policy {
                BusyPolicy::Enforce => {
                    warn!("Transmit FIFO still busy ({} words).", outstanding);
                    return Err(Error::Busy);
                }
                BusyPolicy::Ignore => {
                    warn!(
                        "Ignoring {} words previously queued in the transmit FIFO.",
                        outstanding
                    );
                }
            }
        }

        self.window.write(regs::TXBUFFER, frame);
        if frame.len() < actual {
            self.window
                .write(regs::TXBUFFER + frame.len(), &ZEROS[..actual - frame.len()]);
        }

        let words = ((actual + WORD - 1) / WORD) as u32;
        self.window.write_u32(regs::BUFFER_SIZES, words << 16);

        debug!("Sent {} words to the transmit FIFO.", words);

        Ok(())
    }

    /// Mirrors an ARP cache entry into the hardware table.
    pub fn write_arp_entry(&mut self, host_id: u8, mac: EthernetAddress) {
        debug!("Writing ARP entry {} as {}.", host_id, mac);
        self.write_mac(
            regs::ARPTABLE + regs::ARP_ENTRY_STRIDE * host_id as usize,
            mac,
        );
    }

    /// Drains at most one frame from the receive FIFO into `buffer`.
    ///
    /// Fails with `Error::Busy` while `buffer` still holds an undrained
    /// frame and with `Error::Nothing` when the hardware has no data. A size
    /// outside the valid frame bounds is reported as `Error::Malformed`
    /// without touching the buffer. On success the received length is
    /// recorded in `buffer` and the hardware size field is cleared to
    /// acknowledge consumption.
    pub fn receive_frame(&mut self, buffer: &mut FrameBuffer) -> Result<usize> {
        if buffer.is_occupied() {
            warn!("Receive buffer ({} bytes) not yet cleared.", buffer.len());
            return Err(Error::Busy);
        }

        let buffer_sizes = self.window.read_u32(regs::BUFFER_SIZES);
        let len = (buffer_sizes & 0xFFFF) as usize * WORD;
        if len == 0 {
            return Err(Error::Nothing);
        }

        if len <= EthernetFrame::<&[u8]>::HEADER_LEN || len > MAX_FRAME {
            warn!("Saw runt or oversized frame, len={} bytes.", len);
            return Err(Error::Malformed);
        }

        self.window.read(regs::RXBUFFER, &mut buffer.as_mut()[..len]);
        buffer.set_len(len);

        self.window
            .write_u32(regs::BUFFER_SIZES, buffer_sizes & 0xFFFF_0000);

        Ok(len)
    }

    fn write_mac(&mut self, offset: usize, mac: EthernetAddress) {
        let m = mac.as_bytes();

        let value = ((m[0] as u32) << 8) | (m[1] as u32);
        self.window.write_u32(offset, value);

        let value = ((m[2] as u32) << 24) | ((m[3] as u32) << 16) | ((m[4] as u32) << 8)
            | (m[5] as u32);
        self.window.write_u32(offset + 4, value);
    }
}
