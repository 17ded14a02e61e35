//! Hardware abstraction layer for the tagwatch NFC tag poller.
//!
//! This crate defines the contract between the reader core and the hardware
//! it drives, along with the data a reader reports:
//!
//! - [`NfcDriver`] opens a reader by connection string and yields an
//!   [`NfcDevice`], which is put into initiator mode and polled for targets.
//! - [`ResetLine`] is the digital output wired to the reader module's reset
//!   pin.
//! - [`RawTarget`] carries the per-family fields a reader returns for a
//!   detected target.
//!
//! # Backends
//!
//! - [`mock`]: scriptable driver and reset line for tests and development.
//! - [`gpio`]: reset line over the Linux sysfs GPIO interface.
//! - `pcsc` (feature `hardware-pcsc`): PN53x readers such as the ACR122U,
//!   reached through the PC/SC stack.
//!
//! [`devices`] wraps them in enums so a binary can choose at runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tagwatch_hardware::traits::{NfcDevice, NfcDriver};
//! use tagwatch_hardware::types::{BaudRate, Modulation, ModulationType};
//! use tagwatch_hardware::Result;
//!
//! async fn poll_once<D: NfcDriver>(driver: &D) -> Result<usize> {
//!     let mut device = driver.open("").await?;
//!     device.initiator_init().await?;
//!
//!     let modulations = [Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106)];
//!     let response = device
//!         .poll_target(&modulations, 1, Duration::from_millis(300))
//!         .await?;
//!
//!     device.close().await?;
//!     Ok(response.count)
//! }
//! ```

#[cfg(any(feature = "hardware-pcsc", test))]
mod blocking;
pub mod devices;
pub mod error;
pub mod gpio;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use traits::{NfcDevice, NfcDriver, ResetLine};
pub use types::{
    BaudRate, DeviceInfo, LineLevel, Modulation, ModulationType, PollResponse, RawTarget,
    UidBuffer,
};
