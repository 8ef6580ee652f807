use std;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;

use libc;

use core::dev::Device;
use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use linux::libc as _libc;
use {
    Error,
    Result,
};

/// [TAP interface](https://www.kernel.org/doc/Documentation/networking/tuntap.txt)
/// for sending and receiving raw ethernet frames.
pub struct Tap {
    tapfd: libc::c_int,
    ifr_name: String,
}

impl Tap {
    /// Creates or binds to an existing TAP interface with the specified name.
    ///
    /// The descriptor is opened non-blocking; all further access goes
    /// through the [Device](../../core/dev/trait.Device.html) methods.
    pub fn open(ifr_name: &str) -> Result<Tap> {
        unsafe {
            let tapfd = libc::open(
                "/dev/net/tun\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_NONBLOCK,
            );

            if tapfd < 0 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            let mut ifreq = _libc::c_ifreq::with_name(ifr_name);
            ifreq.ifr_ifru.ifr_flags = _libc::IFF_TAP | _libc::IFF_NO_PI;

            if libc::ioctl(tapfd, _libc::TUNSETIFF, &mut ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(tapfd);
                return Err(Error::IO(err));
            }

            Ok(Tap {
                tapfd,
                ifr_name: ifr_name.to_string(),
            })
        }
    }
}

impl Device for Tap {
    fn send(&mut self, buffer: &[u8]) -> Result<usize> {
        unsafe {
            let wrote = libc::write(
                self.tapfd,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
            );

            if wrote < 0 {
                match _libc::errno() {
                    libc::EAGAIN | libc::EINTR => Err(Error::Busy),
                    _ => Err(Error::IO(std::io::Error::last_os_error())),
                }
            } else {
                Ok(wrote as usize)
            }
        }
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        unsafe {
            let read = libc::read(
                self.tapfd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            );

            if read < 0 {
                match _libc::errno() {
                    libc::EAGAIN | libc::EINTR => Err(Error::Nothing),
                    _ => Err(Error::IO(std::io::Error::last_os_error())),
                }
            } else if read == 0 {
                warn!("Unexpected end of file from tap device {}.", self.ifr_name);
                Err(Error::IO(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "end of file from tap device",
                )))
            } else {
                Ok(read as usize)
            }
        }
    }

    fn raw_fd(&self) -> RawFd {
        self.tapfd
    }

    fn configure(&mut self, addr: Ipv4Address, netmask: Ipv4Address) -> Result<()> {
        unsafe {
            let sockfd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
            if sockfd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            let result = self.configure_with(sockfd, addr, netmask);
            libc::close(sockfd);
            result
        }
    }
}

impl Tap {
    unsafe fn configure_with(
        &mut self,
        sockfd: libc::c_int,
        addr: Ipv4Address,
        netmask: Ipv4Address,
    ) -> Result<()> {
        let mut ifreq = ifreq_with_addr(&self.ifr_name, addr);
        if libc::ioctl(sockfd, _libc::SIOCSIFADDR, &mut ifreq as *mut _libc::c_ifreq) == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        let mut ifreq = ifreq_with_addr(&self.ifr_name, netmask);
        if libc::ioctl(sockfd, _libc::SIOCSIFNETMASK, &mut ifreq as *mut _libc::c_ifreq) == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        let mut ifreq = _libc::c_ifreq::with_name(&self.ifr_name);
        if libc::ioctl(sockfd, _libc::SIOCGIFFLAGS, &mut ifreq as *mut _libc::c_ifreq) == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        ifreq.ifr_ifru.ifr_flags |= _libc::IFF_UP | _libc::IFF_RUNNING;
        if libc::ioctl(sockfd, _libc::SIOCSIFFLAGS, &mut ifreq as *mut _libc::c_ifreq) == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        Ok(())
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.tapfd);
        }
    }
}

fn ifreq_with_addr(ifr_name: &str, addr: Ipv4Address) -> _libc::c_ifreq {
    let mut ifreq = _libc::c_ifreq::with_name(ifr_name);

    let sin = libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: 0,
        sin_addr: libc::in_addr {
            s_addr: addr.as_u32().to_be(),
        },
        sin_zero: [0; 8],
    };

    unsafe {
        ptr::write(
            &mut ifreq.ifr_ifru.ifr_addr as *mut libc::sockaddr as *mut libc::sockaddr_in,
            sin,
        );
    }

    ifreq
}

/// Generates a best-effort unique MAC address for a gateway with no
/// configured one.
///
/// The first byte carries the locally administered bit, the second is
/// derived from the instance index, and the remainder comes from the
/// machine's node name, or the process id when no node name is available.
pub fn fallback_ethernet_addr(instance: u8) -> EthernetAddress {
    let mut mac: [u8; 6] = [0; 6];
    mac[0] = 0x02;
    mac[1] = 0x40u8.wrapping_sub(instance);

    unsafe {
        let mut utsname: libc::utsname = mem::zeroed();
        if libc::uname(&mut utsname) >= 0 {
            for (i, c) in utsname.nodename.iter().take(4).enumerate() {
                mac[2 + i] = *c as u8;
            }
        } else {
            let pid = libc::getpid() as u32;
            mac[2] = (pid >> 24) as u8;
            mac[3] = (pid >> 16) as u8;
            mac[4] = (pid >> 8) as u8;
            mac[5] = pid as u8;
        }
    }

    EthernetAddress::new(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_addr_is_local() {
        let addr = fallback_ethernet_addr(0);
        assert!(addr.is_local());
        assert_eq!(addr.as_bytes()[1], 0x40);
    }

    #[test]
    fn test_fallback_addr_varies_with_instance() {
        let first = fallback_ethernet_addr(1);
        let second = fallback_ethernet_addr(2);
        assert_eq!(first.as_bytes()[1], 0x3F);
        assert_eq!(second.as_bytes()[1], 0x3E);
        assert_eq!(first.as_bytes()[2..], second.as_bytes()[2..]);
    }
}
