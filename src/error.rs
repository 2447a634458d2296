#[cfg(feature = "std")]
use std::{io, process::ExitStatus};

/// Fatal conditions surfaced by the collector.
///
/// Corrupt frames and unpaired fields are part of normal device noise and
/// never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device reports a serial other than the supported plain-frame revision.
    #[error("unsupported hardware revision (serial {0:?}), only 2.00 devices are supported")]
    UnsupportedHardware(UnsupportedSerial),

    /// No device with the expected vendor/product id is attached.
    #[error("no CO2 monitor found (04d9:a052)")]
    DeviceNotFound,

    /// The device did not accept the enable-transmission feature report.
    #[error("device didn't accept the feature report")]
    Handshake,

    /// No frame arrived within the read timeout.
    #[error("timed out waiting for a frame")]
    ReadTimeout,

    /// The device read failed or the device went away.
    #[error("device read error")]
    ReadFailure,

    /// An argument is out of its valid range.
    #[error("invalid argument")]
    InvalidArg,

    /// The HID layer failed to open the device.
    #[cfg(feature = "std")]
    #[error("failed to open device: {0}")]
    Open(String),

    /// The command line could not be parsed.
    #[cfg(feature = "std")]
    #[error("{0}")]
    Usage(String),

    /// Spawning or reading from the helper process failed.
    #[cfg(feature = "std")]
    #[error("helper process: {0}")]
    Helper(#[source] io::Error),

    /// The helper process ended with a failure status.
    #[cfg(feature = "std")]
    #[error("helper process exited with {0}")]
    HelperExited(ExitStatus),

    /// Writing to the sink failed.
    #[cfg(feature = "std")]
    #[error("sink: {0}")]
    Sink(#[from] io::Error),
}

/// Serial string of a refused device, truncated to fit without allocation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedSerial {
    buf: [u8; 16],
    len: usize,
}

impl UnsupportedSerial {
    pub fn new(serial: &str) -> Self {
        let mut buf = [0u8; 16];
        let mut len = serial.len().min(buf.len());
        while !serial.is_char_boundary(len) {
            len -= 1;
        }
        buf[..len].copy_from_slice(&serial.as_bytes()[..len]);
        Self { buf, len }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl core::fmt::Debug for UnsupportedSerial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self.as_str(), f)
    }
}
