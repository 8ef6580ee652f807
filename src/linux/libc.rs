use libc;

pub const IFF_TAP: libc::c_short = 0x0002;

pub const IFF_NO_PI: libc::c_short = 0x1000;

pub const IFF_UP: libc::c_short = 0x0001;

pub const IFF_RUNNING: libc::c_short = 0x0040;

pub const TUNSETIFF: libc::c_ulong = 0x400454CA;

pub const SIOCGIFFLAGS: libc::c_ulong = 0x8913;

pub const SIOCSIFFLAGS: libc::c_ulong = 0x8914;

pub const SIOCSIFADDR: libc::c_ulong = 0x8916;

pub const SIOCSIFNETMASK: libc::c_ulong = 0x891C;

#[repr(C)]
#[derive(Clone, Copy)]
pub union c_ifru {
    pub ifr_addr: libc::sockaddr,
    pub ifr_flags: libc::c_short,
    pub ifr_mtu: libc::c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
/// [https://linux.die.net/man/7/netdevice](https://linux.die.net/man/7/netdevice)
pub struct c_ifreq {
    pub ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    pub ifr_ifru: c_ifru,
}

impl c_ifreq {
    pub fn with_name(ifr_name: &str) -> c_ifreq {
        assert!(ifr_name.len() <= libc::IF_NAMESIZE);

        let mut ifreq = c_ifreq {
            ifr_name: [0; libc::IF_NAMESIZE],
            ifr_ifru: c_ifru { ifr_mtu: 0 },
        };

        for (i, c) in ifr_name.as_bytes().iter().enumerate() {
            ifreq.ifr_name[i] = *c as libc::c_char;
        }

        ifreq
    }
}

pub fn errno() -> libc::c_int {
    unsafe { *libc::__errno_location() }
}
