//! PCA9685 backend for the H-bridge PWM outputs.
//!
//! The four drive channels sit on an I2C-attached PCA9685. Duty values are
//! staged in memory and written to the chip on commit, scaled from the
//! 8-bit speed range to the chip's 12-bit counter. Zero and full duty use the
//! chip's full-off and full-on bits so the output never glitches.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::motor::{DutyOutput, PwmChannel};

/// Default I2C address of the PWM expander.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Prescale for ~1 kHz output from the 25 MHz internal oscillator.
pub const PRESCALE_1KHZ: u8 = 5;

/// Full-scale value of the PCA9685 counter.
const MAX_COUNT: u16 = 4095;

/// Errors that can occur when talking to the PWM expander.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
}

/// Scale an 8-bit duty to the 12-bit PCA9685 off-count.
pub const fn duty_to_count(duty: u8) -> u16 {
    (duty as u32 * MAX_COUNT as u32 / u8::MAX as u32) as u16
}

/// H-bridge outputs driven through a PCA9685 on a shared I2C bus.
pub struct Pca9685Pwm<'a, I2C: 'static> {
    pwm: Pca9685<RefCellDevice<'a, I2C>>,
    channels: [Channel; 4],
    staged: [u8; 4],
}

impl<'a, I2C, E> Pca9685Pwm<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Attach to the expander at `address`, mapping the drive channels to C0..C3.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        address: u8,
    ) -> Result<Self, DeviceError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))
            .map_err(DeviceError::PwmError)?;

        Ok(Self {
            pwm,
            channels: [Channel::C0, Channel::C1, Channel::C2, Channel::C3],
            staged: [0; 4],
        })
    }

    /// Enable the oscillator and set the output frequency to ~1 kHz.
    pub fn configure(&mut self) -> Result<(), DeviceError<E>> {
        self.pwm.enable().map_err(DeviceError::PwmError)?;
        tracing::info!("PWM enabled");
        self.pwm
            .set_prescale(PRESCALE_1KHZ)
            .map_err(DeviceError::PwmError)?;
        tracing::info!(prescale = PRESCALE_1KHZ, "PWM prescale set to 1kHz");
        Ok(())
    }
}

impl<'a, I2C, E> DutyOutput for Pca9685Pwm<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

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
        let output = self.channels[channel.index()];
        let written = match self.staged[channel.index()] {
            0 => self.pwm.set_channel_full_off(output),
            u8::MAX => {
                // full-off wins over full-on, so clear it after setting full-on
                self.pwm
                    .set_channel_full_on(output, 0)
                    .and_then(|()| self.pwm.set_channel_off(output, 0))
            }
            duty => self.pwm.set_channel_on_off(output, 0, duty_to_count(duty)),
        };
        written.map_err(DeviceError::PwmError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_scaling_endpoints() {
        assert_eq!(duty_to_count(0), 0);
        assert_eq!(duty_to_count(255), 4095);
        assert_eq!(duty_to_count(200), 3211);
    }

    #[test]
    fn test_duty_scaling_is_monotonic() {
        let mut last = 0;
        for duty in 0..=u8::MAX {
            let count = duty_to_count(duty);
            assert!(count >= last);
            assert!(count <= MAX_COUNT);
            last = count;
        }
    }
}
