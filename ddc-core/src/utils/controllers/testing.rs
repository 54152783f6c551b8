//! Test doubles for the PWM peripheral and the tick clock.

extern crate alloc;

use alloc::vec::Vec;
use core::cell::Cell;

use embassy_time::Instant;

use super::motor::{Clock, DutyOutput, PwmChannel};

/// Clock that only moves when told to.
pub(crate) struct ManualClock {
    millis: Cell<u64>,
}

impl ManualClock {
    pub(crate) fn new(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub(crate) fn advance(
        &self,
        millis: u64,
    ) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InjectedFault;

/// PWM backend that records staged/committed duties and every commit.
#[derive(Default)]
pub(crate) struct RecordingPwm {
    staged: [u8; 4],
    applied: [u8; 4],
    commits: Vec<PwmChannel>,
    fail_commits: bool,
}

impl RecordingPwm {
    pub(crate) fn applied(
        &self,
        channel: PwmChannel,
    ) -> u8 {
        self.applied[channel.index()]
    }

    pub(crate) fn commit_log(&self) -> &[PwmChannel] {
        &self.commits
    }

    pub(crate) fn commit_count(&self) -> usize {
        self.commits.len()
    }

    pub(crate) fn fail_commits(
        &mut self,
        fail: bool,
    ) {
        self.fail_commits = fail;
    }
}

impl DutyOutput for RecordingPwm {
    type Error = InjectedFault;

    fn set_duty(
        &mut self,
        channel: PwmChannel,
        duty: u8,
    ) -> Result<(), Self::Error> {
        self.staged[channel.index()] = duty;
        Ok(())
    }

    fn commit(
        &mut self,
        channel: PwmChannel,
    ) -> Result<(), Self::Error> {
        if self.fail_commits {
            return Err(InjectedFault);
        }
        self.applied[channel.index()] = self.staged[channel.index()];
        self.commits.push(channel);
        Ok(())
    }
}
