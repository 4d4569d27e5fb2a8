// High-level drive interface for the rover base.
//
// Wraps the register-level MotorModule with wheel-oriented commands:
// Motor::A is the left wheel, Motor::B the right. Dropping the driver stops
// every output and releases the bus (via the module's own teardown).

use tracing::{debug, info};

use super::bus::{I2cTransport, Result, SharedBus};
use super::mixer::{mix, WheelSpeeds};
use super::pca9635::{Motor, MotorModule, Servo};

pub struct MotorDriver<T: I2cTransport> {
    module: MotorModule<T>,
}

impl<T: I2cTransport> MotorDriver<T> {
    /// Connect to the motor module at its default address.
    pub fn new(bus: SharedBus<T>) -> Result<Self> {
        info!("Initializing motor driver");
        Ok(Self {
            module: MotorModule::new(bus)?,
        })
    }

    /// Connect at a custom chip address.
    pub fn with_address(bus: SharedBus<T>, address: u8) -> Result<Self> {
        info!("Initializing motor driver at 0x{:02X}", address);
        Ok(Self {
            module: MotorModule::with_address(bus, address)?,
        })
    }

    /// Apply per-wheel signed percent commands.
    pub fn drive(&self, wheels: WheelSpeeds) -> Result<()> {
        debug!("drive: left={}, right={}", wheels.left, wheels.right);
        self.module.set_speed(Motor::A, wheels.left)?;
        self.module.set_speed(Motor::B, wheels.right)
    }

    /// Apply a normalized body command through the arcade mixer.
    pub fn drive_mixed(&self, linear: f32, angular: f32) -> Result<()> {
        self.drive(mix(linear, angular))
    }

    /// Let both wheels coast to a halt.
    pub fn coast_all(&self) -> Result<()> {
        self.module.coast(Motor::A)?;
        self.module.coast(Motor::B)
    }

    /// Actively brake both wheels.
    pub fn brake_all(&self) -> Result<()> {
        self.module.brake(Motor::A)?;
        self.module.brake(Motor::B)
    }

    pub fn servo_angle(&self, servo: Servo, angle: f32) -> Result<()> {
        self.module.servo_angle(servo, angle)
    }

    pub fn servo_stop(&self, servo: Servo) -> Result<()> {
        self.module.servo_stop(servo)
    }

    /// Cap on how long each operation waits for exclusive bus access.
    pub fn set_acquire_timeout(&mut self, timeout: std::time::Duration) {
        self.module.set_acquire_timeout(timeout);
    }

    /// Zero every output on the chip (wheels and servos).
    pub fn stop(&self) -> Result<()> {
        info!("Stopping all outputs");
        self.module.stop()
    }

    /// Tear down: optionally stop, then release the bus transport.
    pub fn shutdown(self, run_stop: bool) -> Result<()> {
        self.module.deinit(run_stop)
    }

    /// The underlying register-level module.
    pub fn module(&self) -> &MotorModule<T> {
        &self.module
    }
}
