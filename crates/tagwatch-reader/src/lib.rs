//! Tag detection on top of the tagwatch hardware layer.
//!
//! A [`ReaderSession`] owns one NFC device. Each poll probes the field with
//! every modulation of the session's [`ModulationCatalog`], and whatever
//! answers first is decoded into a [`TagId`], the lowercase hex form of the
//! family's identifier field. A [`TagListener`] runs that cycle on an
//! interval and streams identifiers to a channel.
//!
//! When a session cannot be opened, [`pulse_reset`] drives the reader
//! module's reset line.
//!
//! # Example
//!
//! ```no_run
//! use tagwatch_hardware::mock::MockNfcDriver;
//! use tagwatch_reader::{ReaderConfig, ReaderSession};
//!
//! #[tokio::main]
//! async fn main() -> tagwatch_reader::Result<()> {
//!     let (driver, _handle) = MockNfcDriver::new();
//!     let mut session = ReaderSession::connect(&driver, ReaderConfig::default()).await?;
//!
//!     if let Some(id) = session.cycle().await? {
//!         println!("Tag ID: {id}");
//!     }
//!
//!     session.close().await
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod listener;
pub mod poll;
pub mod recovery;
pub mod session;

pub use catalog::ModulationCatalog;
pub use config::{ReaderConfig, ResetTimings};
pub use decoder::{TagId, decode_target};
pub use error::{ReaderError, Result};
pub use listener::{ListenerHandle, ListenerStats, TagListener};
pub use poll::PollResult;
pub use recovery::pulse_reset;
pub use session::{ReaderSession, SessionState};
