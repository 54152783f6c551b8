//! H-bridge motor driver for the two drive sides.
//!
//! Each side is wired to a pair of PWM channels (forward and backward). A
//! signed speed is split into a duty value on exactly one of the pair, staged
//! on the PWM peripheral through [`DutyOutput`] and then committed. Every
//! successful actuation records the current tick so the safety supervisor can
//! tell how long the car has gone without a command.

use embassy_time::{Duration, Instant};

use crate::utils::math::speed::clamp_speed;

/// Drive side of the differential-drive base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The `(forward, backward)` channel pair wired to this side.
    pub const fn channels(self) -> (PwmChannel, PwmChannel) {
        match self {
            Side::Left => (PwmChannel::LeftForward, PwmChannel::LeftBackward),
            Side::Right => (PwmChannel::RightForward, PwmChannel::RightBackward),
        }
    }
}

/// PWM output channels of the H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmChannel {
    LeftForward = 0,
    LeftBackward = 1,
    RightForward = 2,
    RightBackward = 3,
}

impl PwmChannel {
    pub const ALL: [PwmChannel; 4] = [
        PwmChannel::LeftForward,
        PwmChannel::LeftBackward,
        PwmChannel::RightForward,
        PwmChannel::RightBackward,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A single side's speed request, built per actuation and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub side: Side,
    pub speed: i32,
}

impl ActuatorCommand {
    /// Duty values for this side's channel pair.
    ///
    /// The channel that ends up at zero comes first, so committing in this
    /// order never leaves both channels of a side energised.
    pub fn duties(self) -> [(PwmChannel, u8); 2] {
        let (forward, backward) = self.side.channels();
        let speed = clamp_speed(self.speed);
        let magnitude = speed.unsigned_abs() as u8;

        if speed < 0 {
            [(forward, 0), (backward, magnitude)]
        } else {
            [(backward, 0), (forward, magnitude)]
        }
    }
}

/// PWM peripheral accepting a staged duty per channel and a per-channel commit.
pub trait DutyOutput {
    type Error: core::fmt::Debug;

    /// Stage a new duty value (0..=255) for `channel`.
    fn set_duty(
        &mut self,
        channel: PwmChannel,
        duty: u8,
    ) -> Result<(), Self::Error>;

    /// Apply the staged duty of `channel` to the output.
    fn commit(
        &mut self,
        channel: PwmChannel,
    ) -> Result<(), Self::Error>;
}

/// Monotonic tick source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Errors raised while pushing duty values to the PWM peripheral.
#[derive(Debug)]
pub enum DriveError<E: core::fmt::Debug> {
    /// Staging or committing a duty value failed on `channel`.
    PeripheralFault { channel: PwmChannel, source: E },
}

/// Last commanded speeds and the tick of the last successful actuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    pub left_speed: i32,
    pub right_speed: i32,
    pub last_command_time: Instant,
}

impl MotorState {
    /// The `(forward, backward)` duty pair currently applied to `side`.
    pub fn duties(
        &self,
        side: Side,
    ) -> (u8, u8) {
        let speed = match side {
            Side::Left => self.left_speed,
            Side::Right => self.right_speed,
        };
        let magnitude = speed.unsigned_abs() as u8;
        if speed < 0 {
            (0, magnitude)
        } else {
            (magnitude, 0)
        }
    }
}

/// Owner of the PWM outputs and of [`MotorState`].
pub struct MotorDriver<P, C> {
    pwm: P,
    clock: C,
    state: MotorState,
}

impl<P, C> MotorDriver<P, C>
where
    P: DutyOutput,
    C: Clock,
{
    /// Create a driver at rest, stamped with the current tick.
    ///
    /// No duty is written here; call [`MotorDriver::stop`] to force the
    /// outputs to zero.
    pub fn new(
        pwm: P,
        clock: C,
    ) -> Self {
        let now = clock.now();
        Self {
            pwm,
            clock,
            state: MotorState {
                left_speed: 0,
                right_speed: 0,
                last_command_time: now,
            },
        }
    }

    /// Drive both sides with signed speeds, clamped to the PWM range.
    ///
    /// All four duties are staged, then committed. The state and timestamp
    /// only change once every commit succeeded.
    pub fn drive(
        &mut self,
        left_speed: i32,
        right_speed: i32,
    ) -> Result<(), DriveError<P::Error>> {
        let left = ActuatorCommand {
            side: Side::Left,
            speed: clamp_speed(left_speed),
        };
        let right = ActuatorCommand {
            side: Side::Right,
            speed: clamp_speed(right_speed),
        };

        let [l0, l1] = left.duties();
        let [r0, r1] = right.duties();
        let plan = [l0, l1, r0, r1];

        for &(channel, duty) in &plan {
            self.pwm
                .set_duty(channel, duty)
                .map_err(|source| DriveError::PeripheralFault { channel, source })?;
        }
        for &(channel, _) in &plan {
            self.pwm
                .commit(channel)
                .map_err(|source| DriveError::PeripheralFault { channel, source })?;
        }

        self.state.left_speed = left.speed;
        self.state.right_speed = right.speed;
        self.state.last_command_time = self.state.last_command_time.max(self.clock.now());

        tracing::info!(left = left.speed, right = right.speed, "motors driven");
        Ok(())
    }

    /// Zero duty on all four channels. Same as `drive(0, 0)`.
    pub fn stop(&mut self) -> Result<(), DriveError<P::Error>> {
        self.drive(0, 0)
    }

    /// Time since the last successful actuation.
    pub fn elapsed_since_command(&self) -> Duration {
        self.clock
            .now()
            .saturating_duration_since(self.state.last_command_time)
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    #[cfg(test)]
    pub(crate) fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::controllers::testing::{ManualClock, RecordingPwm};

    fn assert_exclusive_pairs(pwm: &RecordingPwm) {
        for side in [Side::Left, Side::Right] {
            let (fwd, bwd) = side.channels();
            assert!(
                pwm.applied(fwd) == 0 || pwm.applied(bwd) == 0,
                "{:?} has both channels live",
                side
            );
        }
    }

    #[test]
    fn test_drive_splits_sign_onto_channel_pair() {
        let clock = ManualClock::new(0);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);

        for (l, r) in [(255, -255), (-17, 0), (0, 120), (0, 0), (-255, 255)] {
            motors.drive(l, r).unwrap();
            let pwm = motors.pwm();
            assert_eq!(pwm.applied(PwmChannel::LeftForward), l.max(0) as u8);
            assert_eq!(pwm.applied(PwmChannel::LeftBackward), (-l).max(0) as u8);
            assert_eq!(pwm.applied(PwmChannel::RightForward), r.max(0) as u8);
            assert_eq!(pwm.applied(PwmChannel::RightBackward), (-r).max(0) as u8);
            assert_exclusive_pairs(pwm);
            assert_eq!(motors.state().duties(Side::Left), (l.max(0) as u8, (-l).max(0) as u8));
        }
    }

    #[test]
    fn test_drive_clamps_out_of_range_speeds() {
        let clock = ManualClock::new(0);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);

        motors.drive(1000, -1000).unwrap();

        let state = motors.state();
        assert_eq!((state.left_speed, state.right_speed), (255, -255));
        assert_eq!(motors.pwm().applied(PwmChannel::LeftForward), 255);
        assert_eq!(motors.pwm().applied(PwmChannel::RightBackward), 255);
    }

    #[test]
    fn test_zeroed_channel_commits_before_energised_one() {
        let clock = ManualClock::new(0);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);

        motors.drive(-50, 50).unwrap();

        assert_eq!(
            motors.pwm().commit_log(),
            &[
                PwmChannel::LeftForward,
                PwmChannel::LeftBackward,
                PwmChannel::RightBackward,
                PwmChannel::RightForward,
            ]
        );
    }

    #[test]
    fn test_drive_stamps_last_command_time() {
        let clock = ManualClock::new(500);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);
        assert_eq!(motors.state().last_command_time, Instant::from_millis(500));

        clock.advance(2_000);
        assert_eq!(motors.elapsed_since_command(), Duration::from_millis(2_000));

        motors.drive(10, 10).unwrap();
        assert_eq!(motors.state().last_command_time, Instant::from_millis(2_500));
        assert_eq!(motors.elapsed_since_command(), Duration::from_millis(0));
    }

    #[test]
    fn test_forward_then_stop_rests_at_zero() {
        let clock = ManualClock::new(0);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);

        for speed in [1, 99, 255, 4_000] {
            motors.drive(speed, speed).unwrap();
            motors.stop().unwrap();
            let state = motors.state();
            assert_eq!((state.left_speed, state.right_speed), (0, 0));
            for channel in PwmChannel::ALL {
                assert_eq!(motors.pwm().applied(channel), 0);
            }
        }
    }

    #[test]
    fn test_commit_fault_propagates_and_keeps_state() {
        let clock = ManualClock::new(0);
        let mut motors = MotorDriver::new(RecordingPwm::default(), &clock);
        motors.drive(80, 80).unwrap();

        clock.advance(3_000);
        motors.pwm_mut().fail_commits(true);
        let err = motors.drive(-80, -80).unwrap_err();

        assert!(matches!(
            err,
            DriveError::PeripheralFault {
                channel: PwmChannel::LeftForward,
                ..
            }
        ));
        let state = motors.state();
        assert_eq!((state.left_speed, state.right_speed), (80, 80));
        assert_eq!(state.last_command_time, Instant::from_millis(0));
    }
}
