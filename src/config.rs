use crate::error::Error;

/// Where fields come from.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum SourceMode {
    /// Read the USB device directly (revision 2.00 only).
    Device,
    /// Read through the `co2mond` helper, for older revisions.
    Co2mond {
        /// Pass the old framing to the helper instead of `-n`.
        old: bool,
    },
}

/// Where delivered samples go.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum OutputMode {
    /// `epoch,co2_ppm,temperature` lines on stdout.
    Csv,
    /// Device-tagged JSON records, committed one by one.
    Records,
}

/// Settings of the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Source of the fields.
    pub source: SourceMode,
    /// Sink for the samples.
    pub output: OutputMode,
    /// Identifier stored with every record.
    pub device_id: String,
    /// Deliver one out of this many samples. The device produces one every 5 seconds.
    pub every: u32,
    /// Roll back every record instead of committing it.
    pub dry: bool,
    /// Verbose logging.
    pub debug: bool,
}

pub const USAGE: &str = "\
Usage: co2mon [OPTIONS]

Stream CO2 monitor readings as records or CSV.

Options:
  --csv            just stream sensor data as csv to stdout
  --co2mond        read through co2mond (e.g. when using an old hardware revision)
  --old            old style device framing (use in combination with --co2mond)
  --device <ID>    sensor device id stored with each record (default: co2mon)
  --dry            don't actually commit any records
  --every <N>      deliver every nth sample, base rate is 1 per 5 seconds (default: 12)
  --debug          enable verbose output
  -h, --help       print this help";

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `source` - The `SourceMode` to read from.
    /// * `output` - The `OutputMode` to deliver to.
    pub fn new(source: SourceMode, output: OutputMode) -> Config {
        Config {
            source,
            output,
            ..Config::default()
        }
    }

    /// Sets the device id stored with each record.
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Enables or disables dry runs.
    pub fn dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    /// Checks settings that can't be expressed in the types.
    ///
    /// # Returns
    ///
    /// * `Err(Error::Usage)` if `every` is zero or the device id is empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.every == 0 {
            return Err(Error::Usage("--every must be at least 1".to_string()));
        }
        if self.device_id.is_empty() {
            return Err(Error::Usage("--device must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parses command line arguments, without the program name.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` if help was requested.
    /// * `Ok(Some(Config))` on success.
    /// * `Err(Error::Usage)` for unknown flags, missing or invalid values.
    pub fn from_args<I>(args: I) -> Result<Option<Config>, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut config = Config::default();
        let mut co2mond = false;
        let mut old = false;
        let mut csv = false;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--csv" => csv = true,
                "--co2mond" => co2mond = true,
                "--old" => old = true,
                "--dry" => config.dry = true,
                "--debug" => config.debug = true,
                "--device" => config.device_id = value(&arg, args.next())?,
                "--every" => {
                    let raw = value(&arg, args.next())?;
                    config.every = raw.parse().map_err(|_| {
                        Error::Usage(format!("--every expects a positive integer, got {:?}", raw))
                    })?;
                }
                "-h" | "--help" => return Ok(None),
                other => return Err(Error::Usage(format!("unknown argument {:?}", other))),
            }
        }

        if old && !co2mond {
            log::warn!("--old has no effect without --co2mond");
        }
        config.source = if co2mond {
            SourceMode::Co2mond { old }
        } else {
            SourceMode::Device
        };
        config.output = if csv {
            OutputMode::Csv
        } else {
            OutputMode::Records
        };
        config.validate()?;
        Ok(Some(config))
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String, Error> {
    next.ok_or_else(|| Error::Usage(format!("{} expects a value", flag)))
}

/// Reads the device directly into records, keeping one sample per minute.
impl Default for Config {
    fn default() -> Config {
        Config {
            source: SourceMode::Device,
            output: OutputMode::Records,
            device_id: "co2mon".to_string(),
            every: 12,
            dry: false,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Config>, Error> {
        Config::from_args(args.iter().copied())
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).unwrap().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.every, 12);
        assert_eq!(config.device_id, "co2mon");
    }

    #[test]
    fn helper_csv_mode() {
        let config = parse(&["--co2mond", "--old", "--csv", "--every", "1"])
            .unwrap()
            .unwrap();
        assert_eq!(config.source, SourceMode::Co2mond { old: true });
        assert_eq!(config.output, OutputMode::Csv);
        assert_eq!(config.every, 1);
    }

    #[test]
    fn record_options() {
        let config = parse(&["--device", "office", "--dry", "--debug"])
            .unwrap()
            .unwrap();
        let mut expected = Config::new(SourceMode::Device, OutputMode::Records)
            .device_id("office")
            .dry(true);
        expected.debug = true;
        assert_eq!(config, expected);
    }

    #[test]
    fn help() {
        assert_eq!(parse(&["--help"]).unwrap(), None);
        assert_eq!(parse(&["--csv", "-h"]).unwrap(), None);
    }

    #[test]
    fn bad_arguments() {
        assert!(matches!(parse(&["--every", "0"]), Err(Error::Usage(_))));
        assert!(matches!(parse(&["--every", "-3"]), Err(Error::Usage(_))));
        assert!(matches!(parse(&["--every"]), Err(Error::Usage(_))));
        assert!(matches!(parse(&["--device", ""]), Err(Error::Usage(_))));
        assert!(matches!(parse(&["--verbose"]), Err(Error::Usage(_))));
    }
}
