//! CO2 monitor collector.
//!
//! Streams paired CO2/temperature samples from a USB monitor, either read
//! directly (revision 2.00, needs the `hid` feature) or through `co2mond`,
//! to stdout as CSV lines or as device-tagged JSON records.
//!
//! ## Usage
//!
//! ```bash
//! # one CSV line per sample
//! co2mon --csv --every 1
//!
//! # old hardware revision through co2mond, one record per minute
//! co2mon --co2mond --old --device office
//!
//! # check record output without committing anything
//! co2mon --dry --debug
//! ```
//!
//! SIGINT and SIGTERM stop the collector cleanly with exit status 0; device,
//! helper and sink errors exit with status 1.

use std::io;
use std::process::ExitCode;

use log::{error, info, LevelFilter};

use co2mon::adapters::sink::{CsvSink, JsonLinesStore, RecordSink, Sink};
use co2mon::cancel::{cancellation, CancelHandle, CancelToken};
use co2mon::co2mond::{Co2mondSource, Variant};
use co2mon::runner::{self, Summary};
use co2mon::{Config, Error, FieldSource, OutputMode, SampleStream, SourceMode, USAGE};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(if config.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let (handle, mut token) = cancellation();
    tokio::spawn(cancel_on_signal(handle));

    match collect(&config, &mut token).await {
        Ok(summary) => {
            info!("Done: {:?}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cancel_on_signal(handle: CancelHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                    _ = term.recv() => info!("Terminated"),
                }
            }
            Err(e) => {
                log::warn!("Can't listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Interrupted");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupted");
    }
    handle.cancel();
}

async fn collect(config: &Config, token: &mut CancelToken) -> Result<Summary, Error> {
    match config.source {
        SourceMode::Co2mond { old } => {
            let variant = if old { Variant::Old } else { Variant::New };
            deliver(config, Co2mondSource::spawn(variant)?, token).await
        }
        SourceMode::Device => open_device(config, token).await,
    }
}

#[cfg(feature = "hid")]
async fn open_device(config: &Config, token: &mut CancelToken) -> Result<Summary, Error> {
    use co2mon::adapters::hid::Co2MonHid;

    let session = co2mon::cancel::race_with_cancellation(Co2MonHid::session(), token).await;
    match session {
        Some(session) => deliver(config, session?, token).await,
        None => Ok(Summary {
            stop: runner::Stop::Cancelled,
            received: 0,
            delivered: 0,
        }),
    }
}

#[cfg(not(feature = "hid"))]
async fn open_device(_config: &Config, _token: &mut CancelToken) -> Result<Summary, Error> {
    Err(Error::Open(
        "built without the `hid` feature, use --co2mond or rebuild with --features hid"
            .to_string(),
    ))
}

async fn deliver<S: FieldSource>(
    config: &Config,
    source: S,
    token: &mut CancelToken,
) -> Result<Summary, Error> {
    let stream = SampleStream::new(source);
    match config.output {
        OutputMode::Csv => {
            let mut sink = CsvSink::new(io::stdout());
            drive(stream, &mut sink, config, token).await
        }
        OutputMode::Records => {
            let store = JsonLinesStore::new(io::stdout());
            let mut sink = RecordSink::new(store, config.device_id.as_str(), config.dry);
            drive(stream, &mut sink, config, token).await
        }
    }
}

async fn drive<S: FieldSource, K: Sink>(
    stream: SampleStream<S>,
    sink: &mut K,
    config: &Config,
    token: &mut CancelToken,
) -> Result<Summary, Error> {
    info!(
        "Collecting from {:?}, delivering 1 out of {} sample(s)",
        config.source, config.every
    );
    runner::run(stream, sink, config.every, token).await
}
