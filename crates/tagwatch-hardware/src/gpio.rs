//! Reset line driven through the Linux sysfs GPIO interface.
//!
//! The line is exported on open if needed and configured as an output that
//! starts low. Writes go to `gpioN/value`.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::{HardwareError, Result, traits::ResetLine, types::LineLevel};

/// Default sysfs GPIO class directory.
pub const DEFAULT_SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// GPIO output line exposed through sysfs.
#[derive(Debug)]
pub struct SysfsResetLine {
    label: String,
    value_path: PathBuf,
}

impl SysfsResetLine {
    /// Open `pin` under [`DEFAULT_SYSFS_GPIO_ROOT`].
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::LineAccess`] if the pin cannot be exported
    /// or configured as an output.
    pub async fn open(pin: u32) -> Result<Self> {
        Self::open_at(DEFAULT_SYSFS_GPIO_ROOT, pin).await
    }

    /// Open `pin` under a custom sysfs root.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::LineAccess`] if the pin cannot be exported
    /// or configured as an output.
    pub async fn open_at(root: impl AsRef<Path>, pin: u32) -> Result<Self> {
        let root = root.as_ref();
        let label = format!("gpio{pin}");
        let line_dir = root.join(&label);

        let exported = fs::try_exists(&line_dir)
            .await
            .map_err(|e| HardwareError::line_access(&label, e.to_string()))?;

        if !exported {
            debug!("Exporting {} through {}", label, root.display());
            fs::write(root.join("export"), pin.to_string())
                .await
                .map_err(|e| HardwareError::line_access(&label, format!("export failed: {e}")))?;
        }

        // "low" configures the direction and the initial level in one write
        fs::write(line_dir.join("direction"), "low")
            .await
            .map_err(|e| {
                HardwareError::line_access(&label, format!("cannot configure output: {e}"))
            })?;

        Ok(Self {
            value_path: line_dir.join("value"),
            label,
        })
    }

    async fn write_level(&mut self, level: LineLevel) -> Result<()> {
        let value = match level {
            LineLevel::High => "1",
            LineLevel::Low => "0",
        };
        fs::write(&self.value_path, value)
            .await
            .map_err(|e| {
                HardwareError::line_access(&self.label, format!("cannot set {level}: {e}"))
            })
    }
}

impl ResetLine for SysfsResetLine {
    async fn set_high(&mut self) -> Result<()> {
        self.write_level(LineLevel::High).await
    }

    async fn set_low(&mut self) -> Result<()> {
        self.write_level(LineLevel::Low).await
    }

    fn label(&self) -> &str {
        &self.label
    }
}
