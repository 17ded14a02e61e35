//! Feeds the mock reader from stdin.
//!
//! Each non-empty line is a hex UID, presented to the reader as an
//! ISO14443A target. Separators `:` and spaces are ignored.

use anyhow::{Context, Result};
use tagwatch_hardware::RawTarget;
use tagwatch_hardware::mock::MockNfcHandle;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// ATQA reported for fed targets.
const FED_ATQA: [u8; 2] = [0x00, 0x44];

/// Parse one input line into a target. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<RawTarget>> {
    let hex_uid: String = line
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if hex_uid.is_empty() {
        return Ok(None);
    }

    let uid = hex::decode(&hex_uid).with_context(|| format!("not a hex UID: {line:?}"))?;
    let target = RawTarget::iso14443a(FED_ATQA, 0x00, &uid)?;
    Ok(Some(target))
}

/// Present every UID read from `input` until it ends.
pub async fn feed<R>(input: R, handle: MockNfcHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(Some(target)) => {
                debug!("Presenting {}", target);
                handle.present_target(target).await?;
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring input line: {:#}", e),
        }
    }
    debug!("Mock input closed");
    Ok(())
}

/// Feed the mock reader from the process's stdin.
pub async fn feed_stdin(handle: MockNfcHandle) -> Result<()> {
    feed(BufReader::new(tokio::io::stdin()), handle).await
}
