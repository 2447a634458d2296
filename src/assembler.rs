//! Pairing of temperature and CO2 fields into samples.
//!
//! The device sends a temperature and a CO2 field per superframe, but nothing
//! on the wire ties the two together. A sample is formed from a temperature
//! followed by a CO2 field before any other temperature arrives. Anything
//! else is dropped without complaint.

use log::debug;

/// A field converted to its physical unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    /// Ambient temperature in degrees Celsius.
    Temperature(f64),
    /// CO2 concentration in ppm.
    Co2(u16),
}

/// One paired reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// CO2 concentration in ppm.
    pub co2_ppm: u16,
    /// Ambient temperature in degrees Celsius.
    pub temperature_celsius: f64,
}

/// Two-slot state machine holding at most one pending temperature.
#[derive(Debug, Default, Clone)]
pub struct Assembler {
    pending: Option<f64>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The temperature waiting for its CO2 partner, if any.
    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    /// Feeds one field in device order, returning a sample once a pair completes.
    pub fn feed(&mut self, field: Field) -> Option<Sample> {
        match field {
            Field::Temperature(celsius) => {
                if let Some(previous) = self.pending.replace(celsius) {
                    debug!("Temperature {} overwritten by {}", previous, celsius);
                }
                None
            }
            Field::Co2(co2_ppm) => match self.pending.take() {
                Some(temperature_celsius) => Some(Sample {
                    co2_ppm,
                    temperature_celsius,
                }),
                None => {
                    debug!("Dropping CO2 {} ppm without a pending temperature", co2_ppm);
                    None
                }
            },
        }
    }

    /// Forgets the pending temperature.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}
