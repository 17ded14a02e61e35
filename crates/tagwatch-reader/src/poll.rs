//! A single bounded poll of the reader field.

use std::time::Duration;

use tagwatch_hardware::{HardwareError, NfcDevice, PollResponse, RawTarget};
use tracing::{debug, trace};

use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};

/// Extra time a device gets past its poll timeout before the poll is
/// abandoned.
pub const POLL_WATCHDOG_GRACE: Duration = Duration::from_secs(1);

/// Outcome of a successful poll.
///
/// Hardware failures are reported through the `Err` arm of the surrounding
/// [`Result`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// The field was empty.
    NoTarget,

    /// At least one target answered; this is the first.
    Detected(RawTarget),
}

impl PollResult {
    /// Interpret a hardware response. Targets past the first are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_hardware::PollResponse;
    /// use tagwatch_reader::PollResult;
    ///
    /// assert_eq!(PollResult::from_response(PollResponse::none()), PollResult::NoTarget);
    /// ```
    pub fn from_response(response: PollResponse) -> Self {
        match response.target {
            Some(target) if response.count > 0 => Self::Detected(target),
            _ => Self::NoTarget,
        }
    }

    /// Whether a target was detected.
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }
}

/// Poll `device` once across the configured catalog.
///
/// The device is trusted to honour `poll_timeout`; a device that overruns it
/// by more than [`POLL_WATCHDOG_GRACE`] is abandoned and reported as timed
/// out. Devices keep working after an abandoned poll (see
/// [`NfcDevice::poll_target`]).
pub(crate) async fn poll_device<D: NfcDevice>(
    device: &mut D,
    config: &ReaderConfig,
) -> Result<PollResult> {
    let poll = device.poll_target(
        config.catalog.as_slice(),
        config.target_count,
        config.poll_timeout,
    );

    let watchdog = config.poll_timeout + POLL_WATCHDOG_GRACE;
    let response = match tokio::time::timeout(watchdog, poll).await {
        Ok(response) => response.map_err(ReaderError::Poll)?,
        Err(_elapsed) => {
            let duration_ms =
                u64::try_from(config.poll_timeout.as_millis()).unwrap_or(u64::MAX);
            return Err(ReaderError::Poll(HardwareError::timeout(duration_ms)));
        }
    };

    let result = PollResult::from_response(response);
    match &result {
        PollResult::Detected(target) => debug!("Detected {}", target),
        PollResult::NoTarget => trace!("No target in field"),
    }
    Ok(result)
}
