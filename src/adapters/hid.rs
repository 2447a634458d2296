//! USB HID transport for the monitor, built on hidapi.
//!
//! hidapi calls block, so every read runs on tokio's blocking pool. The
//! device moves into the blocking task for the duration of the read; if the
//! caller stops waiting (cancellation), the task still finishes within the
//! read timeout and closes the device when it drops it.

use std::fmt;

use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use hidapi::{HidApi, HidDevice};
use log::{debug, info};

use crate::constants::{PRODUCT_ID, READ_TIMEOUT_MS, SUPPORTED_SERIAL, VENDOR_ID};
use crate::error::Error;
use crate::{select_revision, Co2Mon};

/// Transport errors, classified for the driver.
#[derive(Debug)]
pub enum HidError {
    /// No report within the read timeout.
    Timeout,
    /// The device was lost by an abandoned read.
    Closed,
    /// hidapi reported an error.
    Hid(hidapi::HidError),
    /// The blocking task panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl fmt::Display for HidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HidError::Timeout => write!(f, "read timed out"),
            HidError::Closed => write!(f, "device closed"),
            HidError::Hid(e) => write!(f, "{}", e),
            HidError::Join(e) => write!(f, "{}", e),
        }
    }
}

impl embedded_io_async::Error for HidError {
    fn kind(&self) -> ErrorKind {
        match self {
            HidError::Timeout => ErrorKind::TimedOut,
            HidError::Closed => ErrorKind::NotConnected,
            HidError::Hid(_) | HidError::Join(_) => ErrorKind::Other,
        }
    }
}

/// An open monitor, released when dropped.
pub struct Co2MonHid {
    device: Option<HidDevice>,
}

impl Co2MonHid {
    /// Opens the supported monitor revision.
    ///
    /// # Returns
    ///
    /// * `Err(Error::DeviceNotFound)` if no monitor is attached.
    /// * `Err(Error::UnsupportedHardware)` if only other revisions are attached.
    /// * `Err(Error::Open)` if hidapi can't open the device.
    pub fn open() -> Result<Self, Error> {
        let api = HidApi::new().map_err(|e| Error::Open(e.to_string()))?;

        let serials: Vec<String> = api
            .device_list()
            .filter(|d| d.vendor_id() == VENDOR_ID && d.product_id() == PRODUCT_ID)
            .map(|d| d.serial_number().unwrap_or_default().to_string())
            .collect();
        debug!("Monitors found: {:?}", serials);
        select_revision(serials.iter().map(String::as_str))?;

        let device = api
            .open_serial(VENDOR_ID, PRODUCT_ID, SUPPORTED_SERIAL)
            .map_err(|e| {
                log::error!("Failed to open monitor: {}", e);
                Error::Open(e.to_string())
            })?;
        info!(
            "Opened {:04x}:{:04x} serial {}",
            VENDOR_ID, PRODUCT_ID, SUPPORTED_SERIAL
        );
        Ok(Self {
            device: Some(device),
        })
    }

    /// Opens the monitor and enables transmission.
    pub async fn session() -> Result<Co2Mon<Self>, Error> {
        Co2Mon::open(Self::open()?).await
    }
}

impl Drop for Co2MonHid {
    fn drop(&mut self) {
        if self.device.take().is_some() {
            debug!("Closing monitor");
        }
    }
}

impl ErrorType for Co2MonHid {
    type Error = HidError;
}

impl Read for Co2MonHid {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let device = self.device.take().ok_or(HidError::Closed)?;
        let mut report = vec![0u8; buf.len()];
        let (device, report, result) = tokio::task::spawn_blocking(move || {
            let result = device.read_timeout(&mut report, READ_TIMEOUT_MS);
            (device, report, result)
        })
        .await
        .map_err(HidError::Join)?;
        self.device = Some(device);

        match result {
            Ok(0) => Err(HidError::Timeout),
            Ok(n) => {
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            Err(e) => Err(HidError::Hid(e)),
        }
    }
}

impl Write for Co2MonHid {
    /// Sends `buf` as a feature report, its first byte being the report id.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let device = self.device.as_ref().ok_or(HidError::Closed)?;
        device.send_feature_report(buf).map_err(HidError::Hid)?;
        Ok(buf.len())
    }
}
