//! Field feed from the `co2mond` helper daemon.
//!
//! Older hardware revisions are read by `co2mond`, which prints one
//! `KEY VALUE` line per field on its standard output, already descrambled and
//! converted. Only `Tamb` (Celsius) and `CntR` (ppm) are of interest here.

use crate::assembler::Field;

/// Parses one helper output line.
///
/// Returns `None` for short lines, other keys, and values that don't parse.
pub fn parse_line(line: &str) -> Option<Field> {
    let mut tokens = line.split_whitespace();
    let key = tokens.next()?;
    let value = tokens.next()?;
    let field = match key {
        "Tamb" => value.parse::<f64>().ok().map(Field::Temperature),
        "CntR" => value.parse::<u16>().ok().map(Field::Co2),
        _ => return None,
    };
    if field.is_none() {
        log::warn!("Ignoring unparsable helper line: {:?}", line);
    }
    field
}

#[cfg(feature = "host")]
pub use self::host::{Co2mondSource, Variant};

#[cfg(feature = "host")]
mod host {
    use std::process::{ExitStatus, Stdio};

    use log::{debug, info, warn};
    use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
    use tokio::process::{Child, ChildStdout, Command};

    use super::parse_line;
    use crate::assembler::Field;
    use crate::constants::HELPER_BIN;
    use crate::error::Error;
    use crate::source::FieldSource;

    /// Output framing the helper should expect from the device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Variant {
        /// Obfuscated payload of the 1.40 revision.
        Old,
        /// Plain payload, selected with `-n`.
        New,
    }

    impl Variant {
        pub fn args(self) -> &'static [&'static str] {
            match self {
                Variant::Old => &[],
                Variant::New => &["-n"],
            }
        }
    }

    /// Reads fields from helper output lines.
    ///
    /// When created with [`Co2mondSource::spawn`] the source owns the child
    /// process, which is killed if the source is dropped before it exits.
    pub struct Co2mondSource<R> {
        lines: Lines<R>,
        child: Option<Child>,
    }

    impl Co2mondSource<BufReader<ChildStdout>> {
        /// Starts `co2mond` and attaches to its standard output.
        pub fn spawn(variant: Variant) -> Result<Self, Error> {
            Self::spawn_program(HELPER_BIN, variant.args())
        }

        pub(crate) fn spawn_program(program: &str, args: &[&str]) -> Result<Self, Error> {
            info!("Starting {} {}", program, args.join(" "));
            let mut child = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    log::error!("Failed to start {}: {}", program, e);
                    Error::Helper(e)
                })?;
            let stdout = child.stdout.take().ok_or_else(|| {
                Error::Helper(std::io::Error::other("helper stdout not captured"))
            })?;
            Ok(Self {
                lines: BufReader::new(stdout).lines(),
                child: Some(child),
            })
        }
    }

    impl<R: AsyncBufRead + Unpin> Co2mondSource<R> {
        /// Reads from an already open line stream.
        pub fn from_reader(reader: R) -> Self {
            Self {
                lines: reader.lines(),
                child: None,
            }
        }

        async fn finish(&mut self) -> Result<Option<Field>, Error> {
            let Some(mut child) = self.child.take() else {
                return Ok(None);
            };
            let status = child.wait().await.map_err(Error::Helper)?;
            if status.success() {
                warn!("Helper output ended");
                Ok(None)
            } else if stopped_by_signal(&status) {
                info!("Helper stopped by {}", status);
                Ok(None)
            } else {
                log::error!("Helper exited with {}", status);
                Err(Error::HelperExited(status))
            }
        }
    }

    // SIGINT and SIGTERM, sent to the whole process group on shutdown
    #[cfg(unix)]
    fn stopped_by_signal(status: &ExitStatus) -> bool {
        use std::os::unix::process::ExitStatusExt;
        matches!(status.signal(), Some(2) | Some(15))
    }

    #[cfg(not(unix))]
    fn stopped_by_signal(_status: &ExitStatus) -> bool {
        false
    }

    impl<R: AsyncBufRead + Unpin> FieldSource for Co2mondSource<R> {
        async fn next_field(&mut self) -> Result<Option<Field>, Error> {
            loop {
                let line = self.lines.next_line().await.map_err(Error::Helper)?;
                let Some(line) = line else {
                    return self.finish().await;
                };
                if let Some(field) = parse_line(&line) {
                    return Ok(Some(field));
                }
                debug!("Skipping helper line {:?}", line);
            }
        }
    }
}
