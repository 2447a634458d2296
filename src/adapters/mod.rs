//! Host-side adapters: the USB transport and the sample sinks.

#[cfg(feature = "hid")]
pub mod hid;

pub mod sink;
