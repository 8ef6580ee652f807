#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
extern crate libc;
#[macro_use]
extern crate log;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

#[derive(Debug)]
pub enum Error {
    /// Indicates an error where a named resource could not be resolved.
    NotFound,
    /// Indicates an error in the supplied configuration with a reason.
    Config(&'static str),
    /// Indicates an error where a frame or packet is malformed.
    Malformed,
    /// Indicates an error where a device or buffer is still in use.
    Busy,
    /// Indicates a situation where no data is available yet.
    Nothing,
    /// Indicates an error where a frame exceeds the hardware limits.
    Exhausted,
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
