//! Sleep-and-poll loops for waiting on external systems.
//!
//! Every "wait for X" in pitcrew (server answering HTTP, token appearing in
//! container logs, agents connecting) is the same loop: probe, sleep a fixed
//! interval, give up after a fixed overall timeout.

use anyhow::Result;
use std::time::{Duration, Instant};

/// Result of a polling loop
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe reported the condition as met
    Satisfied,
    /// The overall timeout expired first
    TimedOut,
}

/// Poll `probe` every `interval` until it returns `true` or `timeout`
/// expires.
///
/// The probe runs once immediately, so an already-met condition never
/// sleeps. Probe errors propagate and abort the loop; a probe that cannot
/// be evaluated (connection refused while a container boots) should return
/// `Ok(false)` instead of an error.
pub fn poll_until<F>(timeout: Duration, interval: Duration, mut probe: F) -> Result<PollOutcome>
where
    F: FnMut() -> Result<bool>,
{
    let start = Instant::now();

    loop {
        if probe()? {
            return Ok(PollOutcome::Satisfied);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(PollOutcome::TimedOut);
        }

        // Sleep for the poll interval or remaining time, whichever is shorter
        let remaining = timeout - elapsed;
        std::thread::sleep(std::cmp::min(interval, remaining));
    }
}
