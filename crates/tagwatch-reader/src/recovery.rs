//! Hardware reset of the reader module.
//!
//! Used when a session cannot be established. The pulse is high, low, high
//! with a hold after each write; it does not reopen the session.

use tagwatch_hardware::{LineLevel, ResetLine};
use tokio::time::sleep;
use tracing::{error, info};

use crate::config::ResetTimings;
use crate::error::{ReaderError, Result};

/// Pulse `line` to reset the reader module.
///
/// # Errors
///
/// Returns [`ReaderError::LineAccess`] on the first write that fails. The
/// pulse is not retried.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::LineLevel;
/// use tagwatch_hardware::mock::MockResetLine;
/// use tagwatch_reader::{ResetTimings, pulse_reset};
///
/// #[tokio::main]
/// async fn main() -> tagwatch_reader::Result<()> {
///     let (mut line, handle) = MockResetLine::new();
///
///     pulse_reset(&mut line, &ResetTimings::default()).await?;
///     assert_eq!(handle.levels(), vec![LineLevel::High, LineLevel::Low, LineLevel::High]);
///     Ok(())
/// }
/// ```
pub async fn pulse_reset<L: ResetLine>(line: &mut L, timings: &ResetTimings) -> Result<()> {
    info!("Resetting reader through {}", line.label());

    drive(line, LineLevel::High).await?;
    sleep(timings.high_hold).await;

    drive(line, LineLevel::Low).await?;
    sleep(timings.low_hold).await;

    drive(line, LineLevel::High).await?;
    sleep(timings.settle).await;

    info!("Reader reset complete");
    Ok(())
}

async fn drive<L: ResetLine>(line: &mut L, level: LineLevel) -> Result<()> {
    let result = match level {
        LineLevel::High => line.set_high().await,
        LineLevel::Low => line.set_low().await,
    };

    result.map_err(|e| {
        error!("Failed to drive {} {}: {}", line.label(), level, e);
        ReaderError::LineAccess(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tagwatch_hardware::mock::MockResetLine;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_pulse_reset_sequence_and_holds() {
        let (mut line, handle) = MockResetLine::new();
        let start = Instant::now();

        pulse_reset(&mut line, &ResetTimings::default()).await.unwrap();

        let writes = handle.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(
            writes.iter().map(|w| w.level).collect::<Vec<_>>(),
            vec![LineLevel::High, LineLevel::Low, LineLevel::High]
        );

        assert!(writes[1].at - writes[0].at >= Duration::from_millis(400));
        assert!(writes[2].at - writes[1].at >= Duration::from_millis(400));
        assert!(Instant::now() - writes[2].at >= Duration::from_millis(100));
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_reset_custom_timings() {
        let (mut line, handle) = MockResetLine::new();
        let timings = ResetTimings {
            high_hold: Duration::from_millis(50),
            low_hold: Duration::from_millis(20),
            settle: Duration::from_millis(10),
        };

        let start = Instant::now();
        pulse_reset(&mut line, &timings).await.unwrap();

        let writes = handle.writes();
        assert!(writes[1].at - writes[0].at >= Duration::from_millis(50));
        assert!(writes[2].at - writes[1].at >= Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_reset_line_failure() {
        let (mut line, handle) = MockResetLine::new();
        handle.fail_after(1);

        let result = pulse_reset(&mut line, &ResetTimings::default()).await;

        assert!(matches!(result, Err(ReaderError::LineAccess(_))));
        assert_eq!(handle.levels(), vec![LineLevel::High]);
    }
}
