//! Field sources and the sample stream built on top of them.

use crate::assembler::{Assembler, Field, Sample};
use crate::error::Error;

/// Anything producing converted fields in emission order.
///
/// Implemented by the USB driver ([`crate::Co2Mon`]) and by the helper line
/// feed used for older hardware revisions.
#[allow(async_fn_in_trait)]
pub trait FieldSource {
    /// Waits for the next field.
    ///
    /// Returns `Ok(None)` once the source has ended for good.
    async fn next_field(&mut self) -> Result<Option<Field>, Error>;
}

/// Lazy, single-pass sequence of samples pulled from a [`FieldSource`].
pub struct SampleStream<S> {
    source: S,
    assembler: Assembler,
}

impl<S: FieldSource> SampleStream<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            assembler: Assembler::new(),
        }
    }

    /// Waits for the next complete sample.
    ///
    /// A temperature still pending when the source ends is discarded.
    pub async fn next(&mut self) -> Result<Option<Sample>, Error> {
        loop {
            match self.source.next_field().await? {
                Some(field) => {
                    if let Some(sample) = self.assembler.feed(field) {
                        return Ok(Some(sample));
                    }
                }
                None => {
                    self.assembler.reset();
                    return Ok(None);
                }
            }
        }
    }
}
