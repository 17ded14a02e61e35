//! Mock NFC reader implementation for testing and development.
//!
//! This module provides a simulated NFC driver and device that can be
//! controlled programmatically for testing without requiring physical
//! hardware. Targets presented through the handle are reported verbatim by
//! the next poll, whatever modulation they answer at.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::{
    HardwareError, Result,
    traits::{NfcDevice, NfcDriver},
    types::{DeviceInfo, Modulation, PollResponse, RawTarget},
};

/// Parameters of the last poll the mock device received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Modulations requested, in probe order.
    pub modulations: Vec<Modulation>,

    /// Maximum number of targets requested.
    pub target_count: u8,

    /// Poll timeout.
    pub timeout: Duration,
}

/// Internal event type for the mock reader.
#[derive(Debug)]
enum MockEvent {
    Targets(Vec<RawTarget>),
    Fault(HardwareError),
    Stall(Duration),
}

/// State shared between the driver, the device and the handle.
#[derive(Debug, Default)]
struct MockState {
    events: Mutex<Option<mpsc::Receiver<MockEvent>>>,
    poll_calls: AtomicUsize,
    open: AtomicBool,
    last_request: Mutex<Option<PollRequest>>,
    last_connstring: Mutex<Option<String>>,
    open_failure: Mutex<Option<String>>,
    init_failure: Mutex<Option<String>>,
    close_failure: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock NFC driver for testing and development.
///
/// The driver hands out a single [`MockNfcDevice`] at a time; opening again
/// while a device is held fails with [`HardwareError::DeviceBusy`].
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::mock::MockNfcDriver;
/// use tagwatch_hardware::traits::{NfcDevice, NfcDriver};
/// use tagwatch_hardware::types::RawTarget;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> tagwatch_hardware::Result<()> {
///     let (driver, handle) = MockNfcDriver::new();
///
///     let mut device = driver.open("").await?;
///     device.initiator_init().await?;
///
///     handle
///         .present_target(RawTarget::iso14443a([0x00, 0x44], 0x00, &[0x04, 0xAB, 0xCD, 0xEF])?)
///         .await?;
///
///     let response = device.poll_target(&[], 1, Duration::from_millis(300)).await?;
///     assert_eq!(response.count, 1);
///
///     device.close().await
/// }
/// ```
#[derive(Debug)]
pub struct MockNfcDriver {
    name: String,
    state: Arc<MockState>,
}

impl MockNfcDriver {
    /// Create a new mock driver with the default name.
    ///
    /// Returns a tuple of (MockNfcDriver, MockNfcHandle) where the handle
    /// can be used to simulate tags and faults.
    pub fn new() -> (Self, MockNfcHandle) {
        Self::with_name("Mock NFC Reader")
    }

    /// Create a new mock driver with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockNfcHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let state = Arc::new(MockState {
            events: Mutex::new(Some(event_rx)),
            ..MockState::default()
        });

        let driver = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        let handle = MockNfcHandle { event_tx, state };

        (driver, handle)
    }
}

impl NfcDriver for MockNfcDriver {
    type Device = MockNfcDevice;

    async fn open(&self, connstring: &str) -> Result<MockNfcDevice> {
        *lock(&self.state.last_connstring) = Some(connstring.to_string());

        if let Some(message) = lock(&self.state.open_failure).clone() {
            return Err(HardwareError::communication(message));
        }

        let event_rx = lock(&self.state.events)
            .take()
            .ok_or_else(|| HardwareError::device_busy(self.name.clone()))?;

        self.state.open.store(true, Ordering::SeqCst);

        Ok(MockNfcDevice {
            name: self.name.clone(),
            connstring: connstring.to_string(),
            event_rx: Some(event_rx),
            initialized: false,
            state: Arc::clone(&self.state),
        })
    }
}

/// Device produced by [`MockNfcDriver`].
#[derive(Debug)]
pub struct MockNfcDevice {
    name: String,
    connstring: String,
    event_rx: Option<mpsc::Receiver<MockEvent>>,
    initialized: bool,
    state: Arc<MockState>,
}

impl MockNfcDevice {
    /// Give the event channel back to the driver so it can be opened again.
    fn release(&mut self) {
        if let Some(event_rx) = self.event_rx.take() {
            *lock(&self.state.events) = Some(event_rx);
            self.state.open.store(false, Ordering::SeqCst);
        }
    }
}

impl NfcDevice for MockNfcDevice {
    async fn initiator_init(&mut self) -> Result<()> {
        if let Some(message) = lock(&self.state.init_failure).clone() {
            return Err(HardwareError::initialization_failed(message));
        }
        self.initialized = true;
        Ok(())
    }

    async fn poll_target(
        &mut self,
        modulations: &[Modulation],
        target_count: u8,
        timeout: Duration,
    ) -> Result<PollResponse> {
        self.state.poll_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state.last_request) = Some(PollRequest {
            modulations: modulations.to_vec(),
            target_count,
            timeout,
        });

        if !self.initialized {
            return Err(HardwareError::communication("Initiator mode not initialized"));
        }

        let event_rx = self
            .event_rx
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(self.name.clone()))?;

        match tokio::time::timeout(timeout, event_rx.recv()).await {
            Err(_elapsed) => Ok(PollResponse::none()),
            Ok(None) => Err(HardwareError::disconnected(self.name.clone())),
            Ok(Some(MockEvent::Fault(error))) => Err(error),
            Ok(Some(MockEvent::Stall(duration))) => {
                tokio::time::sleep(duration).await;
                Ok(PollResponse::none())
            }
            Ok(Some(MockEvent::Targets(targets))) => {
                let count = targets.len().min(usize::from(target_count));
                Ok(PollResponse {
                    count,
                    target: targets.into_iter().next().filter(|_| count > 0),
                })
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        self.initialized = false;

        match lock(&self.state.close_failure).clone() {
            Some(message) => Err(HardwareError::communication(message)),
            None => Ok(()),
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), self.connstring.clone())
            .with_firmware_version("mock")
    }
}

impl Drop for MockNfcDevice {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle for controlling a mock NFC reader.
///
/// This handle presents targets to the reader field, injects transport
/// faults, and exposes what the device has been asked to do.
#[derive(Debug, Clone)]
pub struct MockNfcHandle {
    event_tx: mpsc::Sender<MockEvent>,
    state: Arc<MockState>,
}

impl MockNfcHandle {
    /// Present a single target to the next poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has been dropped.
    pub async fn present_target(&self, target: RawTarget) -> Result<()> {
        self.send(MockEvent::Targets(vec![target])).await
    }

    /// Present several simultaneous targets to the next poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has been dropped.
    pub async fn present_targets(&self, targets: Vec<RawTarget>) -> Result<()> {
        self.send(MockEvent::Targets(targets)).await
    }

    /// Make the next poll fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has been dropped.
    pub async fn inject_fault(&self, error: HardwareError) -> Result<()> {
        self.send(MockEvent::Fault(error)).await
    }

    /// Make the next poll hang for `duration`, ignoring its own timeout,
    /// before reporting an empty field.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has been dropped.
    pub async fn stall_next_poll(&self, duration: Duration) -> Result<()> {
        self.send(MockEvent::Stall(duration)).await
    }

    async fn send(&self, event: MockEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("NFC event channel closed"))
    }

    /// Make every subsequent open fail.
    pub fn fail_open(&self, message: impl Into<String>) {
        *lock(&self.state.open_failure) = Some(message.into());
    }

    /// Make every subsequent initiator initialization fail.
    pub fn fail_init(&self, message: impl Into<String>) {
        *lock(&self.state.init_failure) = Some(message.into());
    }

    /// Make every subsequent close report a failure.
    pub fn fail_close(&self, message: impl Into<String>) {
        *lock(&self.state.close_failure) = Some(message.into());
    }

    /// Clear all scripted failures.
    pub fn clear_failures(&self) {
        *lock(&self.state.open_failure) = None;
        *lock(&self.state.init_failure) = None;
        *lock(&self.state.close_failure) = None;
    }

    /// Number of polls the device has received.
    pub fn poll_count(&self) -> usize {
        self.state.poll_calls.load(Ordering::SeqCst)
    }

    /// Whether a device is currently open.
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent poll.
    pub fn last_request(&self) -> Option<PollRequest> {
        lock(&self.state.last_request).clone()
    }

    /// Connection string of the most recent open attempt.
    pub fn last_connstring(&self) -> Option<String> {
        lock(&self.state.last_connstring).clone()
    }
}
