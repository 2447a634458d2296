//! Sample sinks.
//!
//! [`CsvSink`] prints `epoch_seconds,co2_ppm,temperature_celsius` lines.
//! [`RecordSink`] turns samples into device-tagged records and hands them to
//! a [`RecordStore`], committing each one or rolling it back on dry runs.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::assembler::Sample;
use crate::error::Error;

/// Consumer of delivered samples.
pub trait Sink {
    /// Delivers one sample taken at `at`.
    fn deliver(&mut self, sample: &Sample, at: DateTime<Utc>) -> Result<(), Error>;
}

/// Writes one CSV line per sample.
pub struct CsvSink<W> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for CsvSink<W> {
    fn deliver(&mut self, sample: &Sample, at: DateTime<Utc>) -> Result<(), Error> {
        writeln!(
            self.out,
            "{},{},{}",
            at.timestamp(),
            sample.co2_ppm,
            sample.temperature_celsius
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Measured values of a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Payload {
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    pub co2_ppm: u16,
}

/// One stored measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub device_id: String,
    pub pl: Payload,
}

/// Transactional destination for records.
pub trait RecordStore {
    /// Stages a record in the current transaction.
    fn insert(&mut self, record: &Record) -> io::Result<()>;
    /// Makes staged records durable.
    fn commit(&mut self) -> io::Result<()>;
    /// Drops staged records.
    fn rollback(&mut self) -> io::Result<()>;
}

/// Builds records and commits them one at a time.
pub struct RecordSink<S> {
    store: S,
    device_id: String,
    dry: bool,
}

impl<S: RecordStore> RecordSink<S> {
    /// # Arguments
    ///
    /// * `store` - Where records go.
    /// * `device_id` - Tag stored with every record.
    /// * `dry` - Roll back every record instead of committing it.
    pub fn new(store: S, device_id: impl Into<String>, dry: bool) -> Self {
        Self {
            store,
            device_id: device_id.into(),
            dry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RecordStore> Sink for RecordSink<S> {
    fn deliver(&mut self, sample: &Sample, at: DateTime<Utc>) -> Result<(), Error> {
        debug!(
            "{} {} {}",
            at.timestamp(),
            sample.co2_ppm,
            sample.temperature_celsius
        );
        let record = Record {
            time: at,
            device_id: self.device_id.clone(),
            pl: Payload {
                temp_c: sample.temperature_celsius,
                co2_ppm: sample.co2_ppm,
            },
        };
        if let Err(e) = self.store.insert(&record) {
            self.store.rollback()?;
            return Err(e.into());
        }
        if self.dry {
            self.store.rollback()?;
        } else {
            self.store.commit()?;
        }
        Ok(())
    }
}

/// Record store writing committed records as JSON lines.
pub struct JsonLinesStore<W> {
    out: W,
    staged: Vec<String>,
}

impl<W: Write> JsonLinesStore<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            staged: Vec::new(),
        }
    }

    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordStore for JsonLinesStore<W> {
    fn insert(&mut self, record: &Record) -> io::Result<()> {
        self.staged.push(serde_json::to_string(record)?);
        Ok(())
    }

    fn commit(&mut self) -> io::Result<()> {
        for line in self.staged.drain(..) {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }

    fn rollback(&mut self) -> io::Result<()> {
        debug!("Discarding {} staged record(s)", self.staged.len());
        self.staged.clear();
        Ok(())
    }
}
