//! tagwatch: print the identifiers of tags presented to an NFC reader.
//!
//! Opens the configured reader, polls it on an interval and writes one line
//! per detected tag to stdout. Logs go to stderr. When the reader cannot be
//! opened and a reset pin is configured, the reader module is pulsed through
//! its reset line before exiting.

mod args;
mod mock_feed;
mod output;
mod settings;

use anyhow::Result;
use clap::Parser;
use tagwatch_hardware::devices::{AnyNfcDriver, AnyResetLine};
use tagwatch_hardware::gpio::SysfsResetLine;
use tagwatch_hardware::mock::{MockNfcDriver, MockNfcHandle};
use tagwatch_reader::{ListenerHandle, ReaderSession, TagId, pulse_reset};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Args, Backend};
use crate::settings::{ResetSettings, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_args(&args);
    let config = settings.reader_config()?;

    let (driver, mock_handle) = build_driver(settings.backend)?;
    info!("Using {} backend", settings.backend);

    let session = match ReaderSession::connect(&driver, config).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open reader: {}", e);
            if let Some(pin) = settings.reset.pin {
                reset_reader(&settings.reset, pin).await;
            }
            return Err(e.into());
        }
    };

    if let Some(handle) = mock_handle {
        tokio::spawn(async move {
            if let Err(e) = mock_feed::feed_stdin(handle).await {
                warn!("Mock input failed: {:#}", e);
            }
        });
    }

    let format = args.format;
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
        }
        info!("Interrupted, shutting down");
    };
    run_listener(session.listen(), interrupted, |id| output::print(format, id)).await
}

/// Hand identifiers to `emit` until `stop` resolves, polling stops or `emit`
/// fails, then shut the listener down.
///
/// Shutdown failures are logged; an `emit` failure is returned after the
/// session has been closed.
async fn run_listener<S, F>(mut listener: ListenerHandle, stop: S, mut emit: F) -> Result<()>
where
    S: Future<Output = ()>,
    F: FnMut(&TagId) -> Result<()>,
{
    tokio::pin!(stop);

    let outcome = loop {
        tokio::select! {
            () = &mut stop => break Ok(()),
            id = listener.recv() => match id {
                Some(id) => {
                    if let Err(e) = emit(&id) {
                        break Err(e.context("Failed to write tag identifier"));
                    }
                }
                None => {
                    warn!("Polling stopped");
                    break Ok(());
                }
            },
        }
    };

    if let Err(e) = listener.shutdown().await {
        error!("Reader shutdown failed: {}", e);
    }
    outcome
}

fn build_driver(backend: Backend) -> Result<(AnyNfcDriver, Option<MockNfcHandle>)> {
    match backend {
        Backend::Mock => {
            let (driver, handle) = MockNfcDriver::with_name("stdin mock reader");
            Ok((AnyNfcDriver::Mock(driver), Some(handle)))
        }
        #[cfg(feature = "pcsc")]
        Backend::Pcsc => Ok((
            AnyNfcDriver::Pcsc(tagwatch_hardware::pcsc::PcscDriver::new()),
            None,
        )),
        #[cfg(not(feature = "pcsc"))]
        Backend::Pcsc => {
            anyhow::bail!("tagwatch was built without PC/SC support (enable the `pcsc` feature)")
        }
    }
}

async fn reset_reader(reset: &ResetSettings, pin: u32) {
    let line = match SysfsResetLine::open_at(&reset.gpio_root, pin).await {
        Ok(line) => line,
        Err(e) => {
            error!("Cannot access reset line: {}", e);
            return;
        }
    };

    let mut line = AnyResetLine::Sysfs(line);
    if let Err(e) = pulse_reset(&mut line, &reset.timings()).await {
        error!("Reader reset failed: {}", e);
    }
}
