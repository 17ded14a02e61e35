//! Reader session lifecycle.
//!
//! A session goes `Uninitialized -> Open -> Closed` and never back. Polling
//! is only possible while it is open; in any other state the call fails with
//! [`ReaderError::InvalidState`] before the hardware is touched.

use std::fmt;

use serde::{Deserialize, Serialize};
use tagwatch_hardware::{NfcDevice, NfcDriver};
use tracing::{debug, error, info, trace, warn};

use crate::catalog::ModulationCatalog;
use crate::config::ReaderConfig;
use crate::decoder::{TagId, decode_target};
use crate::error::{ReaderError, Result};
use crate::listener::{ListenerHandle, TagListener};
use crate::poll::{PollResult, poll_device};

/// Lifecycle state of a [`ReaderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, device not yet opened.
    Uninitialized,

    /// Device open and in initiator mode.
    Open,

    /// Device released. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Exclusive owner of one NFC device.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::mock::MockNfcDriver;
/// use tagwatch_reader::{ReaderConfig, ReaderSession, SessionState};
///
/// #[tokio::main]
/// async fn main() -> tagwatch_reader::Result<()> {
///     let (driver, _handle) = MockNfcDriver::new();
///
///     let mut session = ReaderSession::connect(&driver, ReaderConfig::default()).await?;
///     assert_eq!(session.state(), SessionState::Open);
///
///     session.close().await?;
///     assert_eq!(session.state(), SessionState::Closed);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ReaderSession<D: NfcDevice> {
    config: ReaderConfig,
    state: SessionState,
    device: Option<D>,
}

impl<D: NfcDevice> ReaderSession<D> {
    /// Create an uninitialized session.
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            device: None,
        }
    }

    /// Create a session and open it on `driver`.
    ///
    /// # Errors
    ///
    /// See [`ReaderSession::open`].
    pub async fn connect<Drv>(driver: &Drv, config: ReaderConfig) -> Result<Self>
    where
        Drv: NfcDriver<Device = D>,
    {
        let mut session = Self::new(config);
        session.open(driver).await?;
        Ok(session)
    }

    /// Open the configured device and put it into initiator mode.
    ///
    /// On failure the session stays `Uninitialized`; a device that opened
    /// but could not be initialized is closed again first.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::InvalidState`] if the session is not `Uninitialized`
    /// - [`ReaderError::InvalidConfig`] if the configuration does not validate
    /// - [`ReaderError::Initialization`] if the device cannot be opened or
    ///   initialized
    pub async fn open<Drv>(&mut self, driver: &Drv) -> Result<()>
    where
        Drv: NfcDriver<Device = D>,
    {
        if self.state != SessionState::Uninitialized {
            return Err(invalid_state("open", self.state));
        }
        self.config.validate()?;

        let mut device = driver
            .open(&self.config.connstring)
            .await
            .map_err(ReaderError::Initialization)?;

        if let Err(e) = device.initiator_init().await {
            if let Err(close_err) = device.close().await {
                warn!("Failed to release reader after init failure: {}", close_err);
            }
            return Err(ReaderError::Initialization(e));
        }

        let info = device.info();
        info!(
            "Opened reader {} ({})",
            info.name,
            info.firmware_version.as_deref().unwrap_or("unknown firmware")
        );

        self.device = Some(device);
        self.state = SessionState::Open;
        Ok(())
    }

    /// Poll the field once.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::InvalidState`] if the session is not open
    /// - [`ReaderError::Poll`] if the hardware poll fails
    pub async fn poll_once(&mut self) -> Result<PollResult> {
        let (device, config) = self.open_device("poll")?;
        poll_device(device, config).await
    }

    /// Poll once and decode whatever answered.
    ///
    /// Returns `Ok(None)` when the field is empty.
    ///
    /// # Errors
    ///
    /// Everything [`ReaderSession::poll_once`] returns, plus
    /// [`ReaderError::UnrecognizedScheme`] for targets the decoder cannot
    /// identify.
    pub async fn cycle(&mut self) -> Result<Option<TagId>> {
        match self.poll_once().await? {
            PollResult::NoTarget => Ok(None),
            PollResult::Detected(target) => {
                let id = decode_target(&target, &self.config.catalog)?;
                trace!("Decoded {} as {}", target, id);
                Ok(Some(id))
            }
        }
    }

    /// Release the device. The session ends `Closed` even if releasing fails.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::InvalidState`] if the session is not open
    /// - [`ReaderError::Close`] if the device reports a failure
    pub async fn close(&mut self) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(invalid_state("close", self.state));
        }
        self.state = SessionState::Closed;

        let Some(mut device) = self.device.take() else {
            return Ok(());
        };
        let name = device.info().name;
        device.close().await.map_err(ReaderError::Close)?;

        info!("Closed reader {}", name);
        Ok(())
    }

    /// Start polling on a background task. See [`TagListener`].
    pub fn listen(self) -> ListenerHandle
    where
        D: 'static,
    {
        TagListener::start(self)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Modulations probed on every poll.
    pub fn catalog(&self) -> &ModulationCatalog {
        &self.config.catalog
    }

    fn open_device(&mut self, operation: &'static str) -> Result<(&mut D, &ReaderConfig)> {
        match (self.state, self.device.as_mut()) {
            (SessionState::Open, Some(device)) => Ok((device, &self.config)),
            (state, _) => Err(invalid_state(operation, state)),
        }
    }
}

impl<D: NfcDevice> Drop for ReaderSession<D> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            debug!("Reader session dropped while open; device released without close");
        }
    }
}

fn invalid_state(operation: &'static str, state: SessionState) -> ReaderError {
    error!("Cannot {} a reader session in state {}", operation, state);
    ReaderError::InvalidState { operation, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tagwatch_hardware::mock::{MockNfcDevice, MockNfcDriver};
    use tagwatch_hardware::{HardwareError, RawTarget};

    fn fast_config() -> ReaderConfig {
        ReaderConfig::default().with_poll_timeout(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_session_starts_uninitialized() {
        let session: ReaderSession<MockNfcDevice> =
            ReaderSession::new(ReaderConfig::default());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.catalog().len(), 6);
    }

    #[tokio::test]
    async fn test_session_open_uses_connstring() {
        let (driver, handle) = MockNfcDriver::new();

        let session = ReaderSession::connect(&driver, fast_config().with_connstring("mock:1"))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(handle.last_connstring().as_deref(), Some("mock:1"));
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn test_session_open_failure_stays_uninitialized() {
        let (driver, handle) = MockNfcDriver::new();
        handle.fail_open("no reader attached");

        let mut session = ReaderSession::new(fast_config());
        let result = session.open(&driver).await;

        assert!(matches!(result, Err(ReaderError::Initialization(_))));
        assert_eq!(session.state(), SessionState::Uninitialized);

        handle.clear_failures();
        session.open(&driver).await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_session_init_failure_releases_device() {
        let (driver, handle) = MockNfcDriver::new();
        handle.fail_init("firmware did not answer");

        let result = ReaderSession::connect(&driver, fast_config()).await;

        assert!(matches!(result, Err(ReaderError::Initialization(_))));
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_session_open_rejects_invalid_config() {
        let (driver, handle) = MockNfcDriver::new();

        let result = ReaderSession::connect(&driver, fast_config().with_target_count(0)).await;

        assert!(matches!(result, Err(ReaderError::InvalidConfig(_))));
        assert!(handle.last_connstring().is_none());
    }

    #[tokio::test]
    async fn test_session_open_twice() {
        let (driver, _handle) = MockNfcDriver::new();
        let mut session = ReaderSession::connect(&driver, fast_config()).await.unwrap();

        let result = session.open(&driver).await;
        assert!(matches!(
            result,
            Err(ReaderError::InvalidState {
                operation: "open",
                state: SessionState::Open
            })
        ));
    }

    #[tokio::test]
    async fn test_session_poll_requires_open() {
        let (_driver, handle) = MockNfcDriver::new();
        let mut session: ReaderSession<MockNfcDevice> = ReaderSession::new(fast_config());

        let result = session.poll_once().await;
        assert!(matches!(
            result,
            Err(ReaderError::InvalidState {
                operation: "poll",
                state: SessionState::Uninitialized
            })
        ));
        assert_eq!(handle.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_session_cycle_decodes_target() {
        let (driver, handle) = MockNfcDriver::new();
        let mut session = ReaderSession::connect(&driver, fast_config()).await.unwrap();

        handle
            .present_target(
                RawTarget::iso14443a([0x00, 0x04], 0x08, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap(),
            )
            .await
            .unwrap();

        let id = session.cycle().await.unwrap();
        assert_eq!(id.map(TagId::into_string).as_deref(), Some("deadbeef"));

        assert_eq!(session.cycle().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_close_is_terminal() {
        let (driver, handle) = MockNfcDriver::new();
        let mut session = ReaderSession::connect(&driver, fast_config()).await.unwrap();

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!handle.is_open());

        let polls_before = handle.poll_count();
        assert!(matches!(
            session.cycle().await,
            Err(ReaderError::InvalidState { state: SessionState::Closed, .. })
        ));
        assert_eq!(handle.poll_count(), polls_before);

        assert!(matches!(
            session.close().await,
            Err(ReaderError::InvalidState { operation: "close", .. })
        ));
        assert!(matches!(session.open(&driver).await, Err(ReaderError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_session_close_failure_still_closes() {
        let (driver, handle) = MockNfcDriver::new();
        let mut session = ReaderSession::connect(&driver, fast_config()).await.unwrap();
        handle.fail_close("USB stall");

        let result = session.close().await;

        assert!(matches!(
            result,
            Err(ReaderError::Close(HardwareError::CommunicationError { .. }))
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_session_close_uninitialized() {
        let mut session: ReaderSession<MockNfcDevice> =
            ReaderSession::new(fast_config());

        assert!(matches!(
            session.close().await,
            Err(ReaderError::InvalidState {
                operation: "close",
                state: SessionState::Uninitialized
            })
        ));
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(SessionState::Open.to_string(), "open");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }
}
