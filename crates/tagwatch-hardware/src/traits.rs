//! Hardware device trait definitions.
//!
//! These traits establish the contract between the tag reader core and the
//! hardware it drives: an NFC driver that opens devices, the opened device
//! itself, and the digital line used to reset the reader module.
//!
//! Methods are declared as `fn ... -> impl Future<Output = _> + Send` rather
//! than `async fn` so that generic callers can move devices into spawned
//! Tokio tasks. Implementations are still free to write `async fn`.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::types::{DeviceInfo, Modulation, PollResponse};

/// Opens NFC devices.
///
/// A driver stands for a transport (PC/SC, a mock, ...). Opening yields an
/// exclusively owned [`NfcDevice`]; a physical device can be held by only one
/// open handle at a time.
///
/// # Examples
///
/// ```no_run
/// use tagwatch_hardware::traits::{NfcDevice, NfcDriver};
/// use tagwatch_hardware::error::Result;
///
/// async fn open_first<D: NfcDriver>(driver: &D) -> Result<D::Device> {
///     // An empty connection string lets the driver pick the first reader.
///     let mut device = driver.open("").await?;
///     device.initiator_init().await?;
///     Ok(device)
/// }
/// ```
pub trait NfcDriver: Send + Sync {
    /// Device type produced by this driver.
    type Device: NfcDevice + 'static;

    /// Open the device at `connstring`.
    ///
    /// An empty connection string selects the first available device.
    ///
    /// # Errors
    ///
    /// Returns an error if no matching device exists, the device is held by
    /// another session, or the transport cannot be established.
    fn open(&self, connstring: &str) -> impl Future<Output = Result<Self::Device>> + Send;
}

/// An open NFC device acting as initiator.
pub trait NfcDevice: Send {
    /// Put the device in initiator (reader) mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the configuration.
    fn initiator_init(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Probe for targets using `modulations`, in order.
    ///
    /// Waits at most `timeout` and reports up to `target_count` targets.
    /// Returns a response with `count == 0` when nothing answered.
    ///
    /// The returned future must be cancel safe: a caller may drop it
    /// mid-poll and the device must still answer the next call.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed reader reply.
    fn poll_target(
        &mut self,
        modulations: &[Modulation],
        target_count: u8,
        timeout: Duration,
    ) -> impl Future<Output = Result<PollResponse>> + Send;

    /// Release the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport reports a failure while closing.
    /// The device must not be used afterwards either way.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Reader information.
    fn info(&self) -> DeviceInfo;
}

/// A digital output line wired to the reader's reset input.
pub trait ResetLine: Send {
    /// Drive the line high.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::LineAccess`](crate::HardwareError::LineAccess)
    /// if the line cannot be written.
    fn set_high(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Drive the line low.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::LineAccess`](crate::HardwareError::LineAccess)
    /// if the line cannot be written.
    fn set_low(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Line label used in logs.
    fn label(&self) -> &str;
}
