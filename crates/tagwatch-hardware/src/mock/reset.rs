//! Mock reset line that records every write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::{HardwareError, Result, traits::ResetLine, types::LineLevel};

/// One recorded line write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrite {
    /// Level the line was driven to.
    pub level: LineLevel,

    /// Tokio instant of the write (follows the paused clock in tests).
    pub at: Instant,
}

#[derive(Debug, Default)]
struct LineState {
    writes: Vec<LineWrite>,
    fail_after: Option<usize>,
}

fn lock(state: &Mutex<LineState>) -> MutexGuard<'_, LineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock reset line for testing the recovery procedure.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::mock::MockResetLine;
/// use tagwatch_hardware::traits::ResetLine;
/// use tagwatch_hardware::types::LineLevel;
///
/// #[tokio::main]
/// async fn main() -> tagwatch_hardware::Result<()> {
///     let (mut line, handle) = MockResetLine::new();
///
///     line.set_low().await?;
///     assert_eq!(handle.levels(), vec![LineLevel::Low]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockResetLine {
    label: String,
    state: Arc<Mutex<LineState>>,
}

impl MockResetLine {
    /// Create a new mock line with its inspection handle.
    pub fn new() -> (Self, MockResetLineHandle) {
        let state = Arc::new(Mutex::new(LineState::default()));
        let line = Self {
            label: "mock-reset".to_string(),
            state: Arc::clone(&state),
        };
        (line, MockResetLineHandle { state })
    }

    fn write(&mut self, level: LineLevel) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_after.is_some_and(|limit| state.writes.len() >= limit) {
            return Err(HardwareError::line_access(
                self.label.clone(),
                "line request rejected",
            ));
        }
        state.writes.push(LineWrite {
            level,
            at: Instant::now(),
        });
        Ok(())
    }
}

impl ResetLine for MockResetLine {
    async fn set_high(&mut self) -> Result<()> {
        self.write(LineLevel::High)
    }

    async fn set_low(&mut self) -> Result<()> {
        self.write(LineLevel::Low)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Handle for inspecting and scripting a [`MockResetLine`].
#[derive(Debug, Clone)]
pub struct MockResetLineHandle {
    state: Arc<Mutex<LineState>>,
}

impl MockResetLineHandle {
    /// All writes so far, oldest first.
    pub fn writes(&self) -> Vec<LineWrite> {
        lock(&self.state).writes.clone()
    }

    /// Levels written so far, oldest first.
    pub fn levels(&self) -> Vec<LineLevel> {
        lock(&self.state).writes.iter().map(|w| w.level).collect()
    }

    /// Let the first `writes` writes succeed and reject the rest.
    pub fn fail_after(&self, writes: usize) {
        lock(&self.state).fail_after = Some(writes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reset_line_records_writes() {
        let (mut line, handle) = MockResetLine::new();

        line.set_high().await.unwrap();
        line.set_low().await.unwrap();

        assert_eq!(handle.levels(), vec![LineLevel::High, LineLevel::Low]);
        assert_eq!(handle.writes().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_reset_line_scripted_failure() {
        let (mut line, handle) = MockResetLine::new();
        handle.fail_after(1);

        line.set_high().await.unwrap();
        let result = line.set_low().await;

        assert!(matches!(result, Err(HardwareError::LineAccess { .. })));
        assert_eq!(handle.levels(), vec![LineLevel::High]);
    }
}
