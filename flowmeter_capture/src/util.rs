use std::time::{Duration, Instant};

use crate::error::{CaptureError, Result};

/// Poll `is_ready` until it returns true or `timeout` expires.
/// Sleeps `poll_interval` between polls to avoid CPU spinning.
pub fn wait_until_ready_with_timeout(
    mut is_ready: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_ready() {
        if Instant::now() >= deadline {
            return Err(CaptureError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
