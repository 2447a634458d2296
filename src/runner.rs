use chrono::Utc;
use log::{debug, info};

use crate::adapters::sink::Sink;
use crate::cancel::{race_with_cancellation, CancelToken};
use crate::delivery::Downsample;
use crate::error::Error;
use crate::source::{FieldSource, SampleStream};

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Cancellation was requested.
    Cancelled,
    /// The source ended.
    Exhausted,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub stop: Stop,
    /// Samples produced by the stream.
    pub received: u64,
    /// Samples handed to the sink.
    pub delivered: u64,
}

/// Pulls samples until cancelled, delivering one out of `every` to `sink`.
///
/// The source is dropped before returning, on every path, releasing the
/// device or helper process.
///
/// # Returns
///
/// * `Ok(Summary)` on cancellation or when the source ends.
/// * `Err(Error)` for fatal device, helper and sink errors.
pub async fn run<S, K>(
    stream: SampleStream<S>,
    sink: &mut K,
    every: u32,
    cancel: &mut CancelToken,
) -> Result<Summary, Error>
where
    S: FieldSource,
    K: Sink,
{
    let mut stream = stream;
    let mut filter = Downsample::new(every)?;
    let mut received = 0u64;
    let mut delivered = 0u64;

    let stop = loop {
        let sample = match race_with_cancellation(stream.next(), cancel).await {
            None => break Stop::Cancelled,
            Some(Ok(Some(sample))) => sample,
            Some(Ok(None)) => break Stop::Exhausted,
            Some(Err(e)) if cancel.is_cancelled() => {
                debug!("Ignoring {} after cancellation", e);
                break Stop::Cancelled;
            }
            Some(Err(e)) => return Err(e),
        };
        received += 1;
        if !filter.admit() {
            debug!("Skipping sample {:?}", sample);
            continue;
        }
        sink.deliver(&sample, Utc::now())?;
        delivered += 1;
    };

    drop(stream);
    info!(
        "Stopped ({:?}) after {} sample(s), {} delivered",
        stop, received, delivered
    );
    Ok(Summary {
        stop,
        received,
        delivered,
    })
}
