//! Decoder and collector for USB CO2 monitors built on the ZyAura ZG01 module
//! (Holtek `04d9:a052`, sold as "USB-zyTemp", TFA AirControl Mini, ...).
//!
//! The device reports one field per 5-byte frame. [`Co2Mon`] performs the
//! enable-transmission handshake, validates and decodes frames, and
//! [`SampleStream`] pairs temperature and CO2 fields into [`Sample`]s.
//!
//! The protocol core is `no_std` and works on any transport implementing
//! `embedded_io_async::{Read, Write}` where one `read` returns one report.
//! The `host` feature adds the `co2mond` helper feed, sinks, cancellation and
//! the collector loop; the `hid` feature adds the hidapi transport.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

use embedded_io_async::{Error as _, ErrorKind, Read, Write};
use log::debug;

mod constants;
pub use constants::*;

mod error;
pub use error::*;

pub mod assembler;
pub use assembler::{Assembler, Field, Sample};

pub mod frame;
pub use frame::{FieldKind, MeasurementField, RawFrame};

pub mod source;
pub use source::{FieldSource, SampleStream};

pub mod co2mond;

pub mod delivery;
pub use delivery::Downsample;

#[cfg(feature = "std")]
mod config;
#[cfg(feature = "std")]
pub use config::*;

#[cfg(feature = "host")]
pub mod adapters;

#[cfg(feature = "host")]
pub mod cancel;

#[cfg(feature = "host")]
pub mod runner;

/// Refuses every hardware revision but the one sending plain frames.
///
/// # Returns
///
/// * `Ok(())` for the `"2.00"` serial.
/// * `Err(Error::UnsupportedHardware)` otherwise.
pub fn check_revision(serial: &str) -> Result<(), Error> {
    if serial == SUPPORTED_SERIAL {
        Ok(())
    } else {
        log::error!(
            "Device serial {:?} is not supported, payload would be obfuscated",
            serial
        );
        Err(Error::UnsupportedHardware(UnsupportedSerial::new(serial)))
    }
}

/// Decides whether the attached monitors include a supported one.
///
/// # Arguments
///
/// * `serials` - Serial strings of every attached device with the monitor's USB ids.
///
/// # Returns
///
/// * `Ok(())` if one of them is the supported revision.
/// * `Err(Error::DeviceNotFound)` if none is attached.
/// * `Err(Error::UnsupportedHardware)` naming the first serial otherwise.
pub fn select_revision<'a, I>(serials: I) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut first = None;
    for serial in serials {
        if serial == SUPPORTED_SERIAL {
            return Ok(());
        }
        if first.is_none() {
            first = Some(serial);
        }
    }
    match first {
        Some(serial) => check_revision(serial),
        None => {
            log::error!("No device {:04x}:{:04x} attached", VENDOR_ID, PRODUCT_ID);
            Err(Error::DeviceNotFound)
        }
    }
}

/// A CO2 monitor session.
///
/// # Type Parameters
///
/// * `Device`: The transport to the monitor. One `read` must return exactly one
///   report and `write` must deliver its buffer as a feature report.
pub struct Co2Mon<Device> {
    device: Device,
}

impl<D> Co2Mon<D>
where
    D: Read + Write,
{
    /// Wraps an open transport. Call [`Co2Mon::init`] before reading.
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Wraps an open transport and enables transmission.
    pub async fn open(device: D) -> Result<Self, Error> {
        let mut mon = Self::new(device);
        mon.init().await?;
        Ok(mon)
    }

    /// Sends the all-zero feature report that starts continuous transmission.
    ///
    /// A rejected report is fatal, the device is presumed absent.
    pub async fn init(&mut self) -> Result<(), Error> {
        debug!("Sending handshake {:02X?}", HANDSHAKE);
        self.device.write_all(&HANDSHAKE).await.map_err(|e| {
            log::error!("Device rejected the handshake: {:?}", e);
            Error::Handshake
        })?;
        self.device.flush().await.map_err(|e| {
            log::error!("Failed to flush the handshake: {:?}", e);
            Error::Handshake
        })?;
        debug!("Handshake accepted");
        Ok(())
    }

    /// Reads one report.
    ///
    /// Returns `Ok(None)` for a short report, which carries no field.
    pub async fn read_frame(&mut self) -> Result<Option<RawFrame>, Error> {
        let mut frame: RawFrame = [0u8; FRAME_LEN];
        let bytes_read = self.device.read(&mut frame).await.map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                log::error!("No frame within {} ms", READ_TIMEOUT_MS);
                Error::ReadTimeout
            } else {
                log::error!("Device read error: {:?}", e);
                Error::ReadFailure
            }
        })?;

        match bytes_read {
            0 => {
                log::error!("Device returned no data, assuming it is gone");
                Err(Error::ReadFailure)
            }
            FRAME_LEN => Ok(Some(frame)),
            n => {
                debug!("Short report ({} bytes): {:02X?}", n, &frame[..n]);
                Ok(None)
            }
        }
    }

    /// Reads until a valid frame with a known field arrives.
    ///
    /// Corrupt frames and unknown items are skipped.
    pub async fn read_field(&mut self) -> Result<MeasurementField, Error> {
        loop {
            let Some(frame) = self.read_frame().await? else {
                continue;
            };
            if !frame::validate(&frame) {
                debug!("Invalid frame: {:02X?}", frame);
                continue;
            }
            match frame::decode(&frame) {
                Some(field) => {
                    debug!("Frame {:02X?} -> {:?}", frame, field);
                    return Ok(field);
                }
                None => debug!("Ignoring item {:02X}", frame[0]),
            }
        }
    }

    /// Gives the transport back, ending the session.
    pub fn release(self) -> D {
        self.device
    }
}

impl<D> FieldSource for Co2Mon<D>
where
    D: Read + Write,
{
    async fn next_field(&mut self) -> Result<Option<Field>, Error> {
        Ok(Some(self.read_field().await?.to_field()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode;
    use embedded_io_async::ErrorType;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct MockError(ErrorKind);

    impl embedded_io_async::Error for MockError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Replays scripted reports and records feature reports.
    #[derive(Default)]
    struct ScriptedDevice {
        reads: VecDeque<Result<Vec<u8>, MockError>>,
        written: Vec<u8>,
        reject_writes: bool,
    }

    impl ScriptedDevice {
        fn with_frames(frames: &[RawFrame]) -> Self {
            Self {
                reads: frames.iter().map(|f| Ok(f.to_vec())).collect(),
                ..Default::default()
            }
        }
    }

    impl ErrorType for ScriptedDevice {
        type Error = MockError;
    }

    impl Read for ScriptedDevice {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            match self.reads.pop_front() {
                Some(Ok(report)) => {
                    let n = report.len().min(buf.len());
                    buf[..n].copy_from_slice(&report[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(MockError(ErrorKind::TimedOut)),
            }
        }
    }

    impl Write for ScriptedDevice {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.reject_writes {
                return Err(MockError(ErrorKind::Other));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[test]
    fn only_revision_two_is_supported() {
        assert!(check_revision("2.00").is_ok());
        assert!(matches!(
            check_revision("1.40"),
            Err(Error::UnsupportedHardware(s)) if s.as_str() == "1.40"
        ));
        assert!(check_revision("").is_err());
    }

    #[test]
    fn revision_selection() {
        assert!(matches!(select_revision(Vec::<&str>::new()), Err(Error::DeviceNotFound)));
        assert!(matches!(
            select_revision(["1.40"]),
            Err(Error::UnsupportedHardware(s)) if s.as_str() == "1.40"
        ));
        assert!(select_revision(["1.40", "2.00"]).is_ok());
        assert!(select_revision(["2.00"]).is_ok());
        assert!(matches!(
            select_revision([""]),
            Err(Error::UnsupportedHardware(s)) if s.as_str().is_empty()
        ));
    }

    #[tokio::test]
    async fn open_sends_zero_feature_report() {
        let mon = Co2Mon::open(ScriptedDevice::default()).await.unwrap();
        assert_eq!(mon.release().written, vec![0u8; 8]);
    }

    #[tokio::test]
    async fn rejected_handshake_is_fatal() {
        let device = ScriptedDevice {
            reject_writes: true,
            ..Default::default()
        };
        assert!(matches!(Co2Mon::open(device).await, Err(Error::Handshake)));
    }

    #[tokio::test]
    async fn corrupt_frame_between_a_pair_is_skipped() {
        let mut corrupt = encode(CO2_ID, 999);
        corrupt[3] = corrupt[3].wrapping_add(1);
        let device = ScriptedDevice::with_frames(&[
            encode(TEMPERATURE_ID, 0x12a0),
            corrupt,
            encode(CO2_ID, 612),
        ]);
        let mut stream = SampleStream::new(Co2Mon::open(device).await.unwrap());

        let sample = stream.next().await.unwrap().unwrap();
        assert_eq!(sample.co2_ppm, 612);
        assert!((sample.temperature_celsius - 24.85).abs() < 1e-9);

        // script exhausted, the mock times out
        assert!(matches!(stream.next().await, Err(Error::ReadTimeout)));
    }

    #[tokio::test]
    async fn noise_is_skipped() {
        let mut bad_end = encode(TEMPERATURE_ID, 0x1200);
        bad_end[4] = 0x0a;
        let mut device = ScriptedDevice::with_frames(&[
            encode(0x6e, 0x1234),
            bad_end,
            encode(TEMPERATURE_ID, 0x12a0),
        ]);
        device.reads.push_front(Ok(vec![0x42, 0x12]));
        let mut mon = Co2Mon::new(device);

        let field = mon.read_field().await.unwrap();
        assert_eq!(field.kind, FieldKind::Temperature);
        assert_eq!(field.raw_value, 0x12a0);
    }

    #[tokio::test]
    async fn read_errors_are_fatal() {
        let mut device = ScriptedDevice::with_frames(&[encode(TEMPERATURE_ID, 0x12a0)]);
        device.reads.push_back(Err(MockError(ErrorKind::Other)));
        let mut stream = SampleStream::new(Co2Mon::new(device));
        assert!(matches!(stream.next().await, Err(Error::ReadFailure)));
    }

    #[tokio::test]
    async fn empty_report_means_device_is_gone() {
        let mut device = ScriptedDevice::default();
        device.reads.push_back(Ok(Vec::new()));
        let mut mon = Co2Mon::new(device);
        assert!(matches!(mon.read_frame().await, Err(Error::ReadFailure)));
    }
}
