//! Steering commands received over HTTP.
//!
//! A command name plus an optional speed is resolved to a `(left, right)`
//! speed pair through a fixed steering table and handed to the motor driver
//! exactly once. Speed text is read like C `atoi`: leading digits count and
//! anything else reads as zero. Out-of-range speeds are not rejected; they
//! fall back to the configured default speed.

use core::{fmt, str::FromStr};

use super::motor::{Clock, DriveError, DutyOutput, MotorDriver};
use crate::utils::math::speed::MAX_SPEED;

/// Directional commands understood by the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl SteeringCommand {
    /// `(left, right)` speeds for a resolved speed `s`.
    ///
    /// Turns run the inner side backward at half speed (truncated toward zero).
    pub const fn wheel_speeds(
        self,
        s: i32,
    ) -> (i32, i32) {
        match self {
            SteeringCommand::Forward => (s, s),
            SteeringCommand::Backward => (-s, -s),
            SteeringCommand::Left => (-s / 2, s),
            SteeringCommand::Right => (s, -s / 2),
            SteeringCommand::Stop => (0, 0),
        }
    }

    /// Status phrase returned to the client after the command ran.
    pub const fn action(self) -> &'static str {
        match self {
            SteeringCommand::Forward => "moving forward",
            SteeringCommand::Backward => "moving backward",
            SteeringCommand::Left => "turning left",
            SteeringCommand::Right => "turning right",
            SteeringCommand::Stop => "stopped",
        }
    }
}

impl FromStr for SteeringCommand {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "forward" => Ok(SteeringCommand::Forward),
            "backward" => Ok(SteeringCommand::Backward),
            "left" => Ok(SteeringCommand::Left),
            "right" => Ok(SteeringCommand::Right),
            "stop" => Ok(SteeringCommand::Stop),
            _ => Err(CommandError::UnrecognizedCommand),
        }
    }
}

/// Failures surfaced to the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Query string missing, unparseable, or without `cmd`.
    MalformedRequest,
    /// `cmd` is not one of the steering commands.
    UnrecognizedCommand,
    /// The PWM peripheral rejected the duty update.
    PeripheralFault,
}

impl CommandError {
    pub const fn message(self) -> &'static str {
        match self {
            CommandError::MalformedRequest => "cmd parameter required",
            CommandError::UnrecognizedCommand => "unrecognized command",
            CommandError::PeripheralFault => "motor output fault",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl<E: fmt::Debug> From<DriveError<E>> for CommandError {
    fn from(_: DriveError<E>) -> Self {
        CommandError::PeripheralFault
    }
}

/// Read a wire speed the way `atoi` does.
///
/// Leading whitespace and one sign are accepted, then digits up to the first
/// non-digit. No digits reads as 0; overflow saturates.
pub fn parse_speed(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(i32::from(digit - b'0'))
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Pick the speed to use for a request.
///
/// Anything absent or outside `[0, MAX_SPEED]` becomes `default_speed`.
pub fn resolve_speed(
    requested: Option<i32>,
    default_speed: u8,
) -> i32 {
    match requested {
        Some(speed) if (0..=MAX_SPEED).contains(&speed) => speed,
        _ => i32::from(default_speed),
    }
}

/// Parse `command_name`, steer, and actuate the motors once.
///
/// Unknown commands return an error without touching the motors.
pub fn interpret<P, C>(
    motors: &mut MotorDriver<P, C>,
    command_name: &str,
    requested_speed: Option<i32>,
    default_speed: u8,
) -> Result<&'static str, CommandError>
where
    P: DutyOutput,
    C: Clock,
{
    let command: SteeringCommand = command_name.parse().map_err(|error| {
        tracing::warn!(command_name, "unrecognized command");
        error
    })?;
    let speed = resolve_speed(requested_speed, default_speed);
    let (left, right) = command.wheel_speeds(speed);

    motors.drive(left, right).map_err(|error| {
        tracing::error!(?error, ?command, "failed to apply command");
        CommandError::from(error)
    })?;

    Ok(command.action())
}
