use crate::error::Error;

/// Keeps every Nth sample, counting from one and restarting after each kept sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downsample {
    every: u32,
    seen: u32,
}

impl Downsample {
    /// Creates a filter keeping one sample out of `every`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::InvalidArg)` if `every` is zero.
    pub fn new(every: u32) -> Result<Self, Error> {
        if every == 0 {
            log::error!("Downsampling factor must be at least 1");
            return Err(Error::InvalidArg);
        }
        Ok(Self { every, seen: 0 })
    }

    /// Counts one incoming sample and tells whether it should be delivered.
    pub fn admit(&mut self) -> bool {
        self.seen += 1;
        if self.seen < self.every {
            return false;
        }
        self.seen = 0;
        true
    }
}
