//! Command-timeout supervision.
//!
//! The supervisor polls the time since the last actuation and forces the
//! motors to stop once it exceeds the configured timeout. There is no stored
//! state: each poll derives [`SafetyState`] from the motor timestamp.
//!
//! A forced stop is itself an actuation and refreshes the timestamp, so a
//! stale car trips at most once per timeout period instead of on every poll.

use embassy_time::Duration;

use super::motor::{Clock, DutyOutput, MotorDriver};

/// Outcome of one supervisor poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyState {
    /// A command arrived within the timeout.
    Armed,
    /// The timeout was exceeded and a stop was issued.
    Tripped,
}

#[derive(Debug, Clone, Copy)]
pub struct SafetySupervisor {
    timeout: Duration,
}

impl SafetySupervisor {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// True while the last actuation is no older than the timeout.
    pub fn is_within_safety_window<P, C>(
        &self,
        motors: &MotorDriver<P, C>,
    ) -> bool
    where
        P: DutyOutput,
        C: Clock,
    {
        motors.elapsed_since_command() <= self.timeout
    }

    /// Check the timeout once and stop the motors if it was exceeded.
    ///
    /// A failed stop is logged and otherwise ignored; the timestamp is left
    /// untouched so the next poll tries again.
    pub fn poll<P, C>(
        &self,
        motors: &mut MotorDriver<P, C>,
    ) -> SafetyState
    where
        P: DutyOutput,
        C: Clock,
    {
        let elapsed = motors.elapsed_since_command();
        if elapsed <= self.timeout {
            return SafetyState::Armed;
        }

        tracing::warn!(
            elapsed_ms = elapsed.as_millis(),
            timeout_ms = self.timeout.as_millis(),
            "command timeout, stopping motors"
        );
        if let Err(error) = motors.stop() {
            tracing::error!(?error, "safety stop failed");
        }
        SafetyState::Tripped
    }
}
