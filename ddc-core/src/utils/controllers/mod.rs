//! Module Exports
//!
//! This file exports the command-to-actuation pipeline of the car.
//!
//! - `motor`: H-bridge motor driver and the PWM/clock seams it drives.
//! - `command`: steering commands and the command interpreter.
//! - `safety`: command-timeout supervisor and safety window check.
//! - `pca9685`: PWM backend for an I2C PCA9685 expander.

pub mod command;
pub mod motor;
pub mod pca9685;
pub mod safety;
#[cfg(test)]
pub(crate) mod testing;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::{Duration, Timer};

pub use command::{interpret, parse_speed, CommandError, SteeringCommand};
pub use motor::{
    Clock, DriveError, DutyOutput, MotorDriver, MotorState, PwmChannel, Side, SystemClock,
};
pub use safety::{SafetyState, SafetySupervisor};

/// Timing and speed parameters of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionConfig {
    /// Longest gap between commands before the motors are stopped.
    pub timeout: Duration,
    /// Period of the safety supervisor.
    pub poll_interval: Duration,
    /// Speed used when a request omits one or sends one out of range.
    pub default_speed: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(1_000),
            default_speed: 200,
        }
    }
}

impl MotionConfig {
    pub fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(
        mut self,
        poll_interval: Duration,
    ) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_default_speed(
        mut self,
        default_speed: u8,
    ) -> Self {
        self.default_speed = default_speed;
        self
    }
}

/// Shared owner of the motor driver.
///
/// The HTTP handlers and the supervisor task both go through the mutex, one
/// interpret or poll per lock.
pub struct MotionSystem<P, C> {
    motors: Mutex<CriticalSectionRawMutex, MotorDriver<P, C>>,
    supervisor: SafetySupervisor,
    config: MotionConfig,
}

impl<P, C> MotionSystem<P, C>
where
    P: DutyOutput,
    C: Clock,
{
    pub fn new(
        pwm: P,
        clock: C,
        config: Option<MotionConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();

        MotionSystem {
            motors: Mutex::new(MotorDriver::new(pwm, clock)),
            supervisor: SafetySupervisor::new(config.timeout),
            config,
        }
    }

    /// Handle a `/control` request.
    ///
    /// `cmd` is required. `speed` is optional and read with [`parse_speed`], so
    /// text without leading digits commands zero speed.
    pub async fn control(
        &self,
        cmd: Option<&str>,
        speed: Option<&str>,
    ) -> Result<&'static str, CommandError> {
        let Some(cmd) = cmd.filter(|c| !c.is_empty()) else {
            tracing::warn!("control request without cmd");
            return Err(CommandError::MalformedRequest);
        };
        let requested = speed.map(parse_speed);

        let mut motors = self.motors.lock().await;
        interpret(&mut *motors, cmd, requested, self.config.default_speed)
    }

    /// Whether the last command is still within the safety window.
    pub async fn is_within_safety_window(&self) -> bool {
        let motors = self.motors.lock().await;
        self.supervisor.is_within_safety_window(&*motors)
    }

    /// Force the outputs to zero duty.
    pub async fn stop(&self) -> Result<(), DriveError<P::Error>> {
        self.motors.lock().await.stop()
    }

    pub async fn state(&self) -> MotorState {
        self.motors.lock().await.state()
    }

    /// One supervisor cycle.
    pub async fn poll_safety(&self) -> SafetyState {
        let mut motors = self.motors.lock().await;
        self.supervisor.poll(&mut *motors)
    }

    /// Run the safety supervisor forever at the configured poll interval.
    pub async fn supervise(&self) -> ! {
        tracing::info!(
            timeout_ms = self.config.timeout.as_millis(),
            poll_ms = self.config.poll_interval.as_millis(),
            "safety supervisor started"
        );
        loop {
            self.poll_safety().await;
            Timer::after(self.config.poll_interval).await;
        }
    }
}
