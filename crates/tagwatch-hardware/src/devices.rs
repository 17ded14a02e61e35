//! Enum wrappers for hardware dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the drivers, devices
//! and reset lines a binary picks at runtime are wrapped in enums instead of
//! `Box<dyn Trait>`. Hardware backends behind feature flags get their own
//! conditionally compiled variant.
//!
//! # Examples
//!
//! ```
//! use tagwatch_hardware::devices::AnyNfcDriver;
//! use tagwatch_hardware::mock::MockNfcDriver;
//! use tagwatch_hardware::traits::{NfcDevice, NfcDriver};
//!
//! #[tokio::main]
//! async fn main() -> tagwatch_hardware::Result<()> {
//!     let (driver, _handle) = MockNfcDriver::new();
//!     let driver = AnyNfcDriver::Mock(driver);
//!
//!     let device = driver.open("").await?;
//!     println!("Reader: {}", device.info().name);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use crate::Result;
use crate::gpio::SysfsResetLine;
use crate::mock::{MockNfcDevice, MockNfcDriver, MockResetLine};
#[cfg(feature = "hardware-pcsc")]
use crate::pcsc::{PcscDevice, PcscDriver};
use crate::traits::{NfcDevice, NfcDriver, ResetLine};
use crate::types::{DeviceInfo, Modulation, PollResponse};

/// Enum wrapper for NFC driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNfcDriver {
    /// Mock driver for development and testing.
    Mock(MockNfcDriver),

    /// PN53x readers over PC/SC.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscDriver),
}

impl NfcDriver for AnyNfcDriver {
    type Device = AnyNfcDevice;

    async fn open(&self, connstring: &str) -> Result<AnyNfcDevice> {
        match self {
            Self::Mock(driver) => driver.open(connstring).await.map(AnyNfcDevice::Mock),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(driver) => driver.open(connstring).await.map(AnyNfcDevice::Pcsc),
        }
    }
}

/// Enum wrapper for open NFC devices.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNfcDevice {
    /// Mock device for development and testing.
    Mock(MockNfcDevice),

    /// PN53x reader over PC/SC.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscDevice),
}

impl NfcDevice for AnyNfcDevice {
    async fn initiator_init(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.initiator_init().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.initiator_init().await,
        }
    }

    async fn poll_target(
        &mut self,
        modulations: &[Modulation],
        target_count: u8,
        timeout: Duration,
    ) -> Result<PollResponse> {
        match self {
            Self::Mock(device) => device.poll_target(modulations, target_count, timeout).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.poll_target(modulations, target_count, timeout).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.close().await,
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.info(),
        }
    }
}

/// Enum wrapper for reset line dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyResetLine {
    /// Mock line that records writes.
    Mock(MockResetLine),

    /// Linux sysfs GPIO line.
    Sysfs(SysfsResetLine),
}

impl ResetLine for AnyResetLine {
    async fn set_high(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_high().await,
            Self::Sysfs(line) => line.set_high().await,
        }
    }

    async fn set_low(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_low().await,
            Self::Sysfs(line) => line.set_low().await,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Mock(line) => line.label(),
            Self::Sysfs(line) => line.label(),
        }
    }
}
