// PCA9635-family register protocol for the dual H-bridge motor module.
//
// Logical operations (coast, brake, signed speed, servo angle) translate into
// masked read-modify-write cycles against the OUTS register and the
// per-channel PWM registers. Every composite operation holds the bus for its
// whole register sequence so another bus client never observes a torn update.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::bus::{BusGuard, I2cTransport, Result, SharedBus, DEFAULT_ACQUIRE_TIMEOUT};

/// Motor module i2c address
pub const MOTOR_MODULE_ADDR: u8 = 0x0F;

// Register addresses
const REG_MODE1: u8 = 0x00;
const REG_MODE2: u8 = 0x01;
const REG_PWM: [u8; 4] = [0x02, 0x03, 0x04, 0x05];
const REG_OUTS: u8 = 0x14;
const REG_SERVO_ATTACHED: [u8; 2] = [0x1C, 0x1D];
const REG_SERVO_ANGLE: [u8; 2] = [0x1E, 0x1F];

// MODE1: disable response to the all-call address, enable the oscillator.
const MODE1_INIT: u8 = 0b0000_0001;
// MODE2: push-pull outputs, high-z while disabled via the /OE pin.
const MODE2_INIT: u8 = 0b0000_0101;

const OUTPUT_OFF: u8 = 0b0000_0000;
const FULL_MASK: u8 = 0xFF;

/// Bitfield of one output channel inside OUTS: drive high, drive PWM, and the
/// two-bit field both live in.
#[derive(Debug, Clone, Copy)]
struct Channel {
    on: u8,
    pwm: u8,
    mask: u8,
}

const fn channel(index: u8) -> Channel {
    Channel {
        on: 0b01 << (index * 2),
        pwm: 0b10 << (index * 2),
        mask: 0b11 << (index * 2),
    }
}

// The four output channels. Their masks partition all eight OUTS bits.
const CHANNELS: [Channel; 4] = [channel(0), channel(1), channel(2), channel(3)];

/// DC motor outputs. `A` owns channels {0,1}, `B` owns channels {2,3}; the
/// sign of the commanded speed picks which channel of the pair is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motor {
    A,
    B,
}

impl Motor {
    fn base_channel(self) -> usize {
        match self {
            Motor::A => 0,
            Motor::B => 2,
        }
    }
}

/// Servo outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Servo {
    S1,
    S2,
}

impl Servo {
    fn index(self) -> usize {
        match self {
            Servo::S1 => 0,
            Servo::S2 => 1,
        }
    }
}

/// Scale a signed percentage to an 8-bit duty cycle, rounding to nearest.
fn duty_from_percent(speed: i8) -> u8 {
    let magnitude = u32::from(speed.unsigned_abs().min(100));
    ((magnitude * 255 + 50) / 100) as u8
}

/// Register-level client for one motor module chip.
///
/// Stateless apart from the device address: all state of interest lives in
/// the chip registers. Dropping the module stops every output and closes the
/// bus; use [`MotorModule::deinit`] when the teardown result matters.
pub struct MotorModule<T: I2cTransport> {
    bus: SharedBus<T>,
    address: u8,
    acquire_timeout: Duration,
    released: bool,
}

impl<T: I2cTransport> MotorModule<T> {
    /// Connect to the module at the default address and configure it.
    pub fn new(bus: SharedBus<T>) -> Result<Self> {
        Self::with_address(bus, MOTOR_MODULE_ADDR)
    }

    /// Connect at a custom address.
    ///
    /// Writes MODE1 (oscillator on, no all-call) and MODE2 (push-pull
    /// outputs) under one bus acquisition. Any failed write fails the whole
    /// construction; the chip may be left partially configured.
    pub fn with_address(bus: SharedBus<T>, address: u8) -> Result<Self> {
        {
            let mut guard = bus.acquire(DEFAULT_ACQUIRE_TIMEOUT)?;
            guard.write(address, &[REG_MODE1, MODE1_INIT])?;
            guard.write(address, &[REG_MODE2, MODE2_INIT])?;
        }
        info!("motor module at 0x{:02X} configured", address);
        Ok(Self {
            bus,
            address,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            released: false,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Cap on how long each operation waits for exclusive bus access.
    pub fn set_acquire_timeout(&mut self, timeout: Duration) {
        self.acquire_timeout = timeout;
    }

    fn acquire(&self) -> Result<BusGuard<'_, T>> {
        self.bus.acquire(self.acquire_timeout)
    }

    /// Masked register write. A full mask is a plain write; otherwise a
    /// read-modify-write that leaves bits outside `mask` untouched.
    ///
    /// Never acquires the bus itself: the caller holds the guard so several
    /// masked writes can share one exclusive scope.
    fn register_set(&self, guard: &mut BusGuard<'_, T>, reg: u8, value: u8, mask: u8) -> Result<()> {
        let value = if mask == FULL_MASK {
            value
        } else {
            self.register_get(guard, reg, !mask)? | (value & mask)
        };
        debug!("reg 0x{:02X} <- 0x{:02X}", reg, value);
        guard.write(self.address, &[reg, value])
    }

    /// Read one register byte and keep only the bits selected by `mask`.
    fn register_get(&self, guard: &mut BusGuard<'_, T>, reg: u8, mask: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        guard.write_read(self.address, &[reg], &mut buf)?;
        Ok(buf[0] & mask)
    }

    /// Let a motor coast: both bridge legs off, winding left floating.
    pub fn coast(&self, motor: Motor) -> Result<()> {
        let base = motor.base_channel();
        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_OUTS, OUTPUT_OFF, CHANNELS[base].mask)?;
        self.register_set(&mut guard, REG_OUTS, OUTPUT_OFF, CHANNELS[base + 1].mask)
    }

    /// Actively brake a motor: both bridge legs driven, shorting the winding.
    pub fn brake(&self, motor: Motor) -> Result<()> {
        let base = motor.base_channel();
        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_OUTS, CHANNELS[base].on, CHANNELS[base].mask)?;
        self.register_set(
            &mut guard,
            REG_OUTS,
            CHANNELS[base + 1].on,
            CHANNELS[base + 1].mask,
        )
    }

    /// Drive a motor at a signed percentage of full speed, in [-100, 100].
    ///
    /// The sign picks which channel of the pair is driven; the other is
    /// forced off. A duty of 255 latches the ON bit instead of running PWM at
    /// full duty.
    pub fn set_speed(&self, motor: Motor, speed: i8) -> Result<()> {
        let duty = duty_from_percent(speed);
        let base = motor.base_channel();
        let (drive, off) = if speed < 0 { (base + 1, base) } else { (base, base + 1) };

        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_OUTS, OUTPUT_OFF, CHANNELS[off].mask)?;
        if duty == u8::MAX {
            self.register_set(&mut guard, REG_OUTS, CHANNELS[drive].on, CHANNELS[drive].mask)
        } else {
            self.register_set(&mut guard, REG_OUTS, CHANNELS[drive].pwm, CHANNELS[drive].mask)?;
            self.register_set(&mut guard, REG_PWM[drive], duty, FULL_MASK)
        }
    }

    /// Point a servo at an angle in degrees, clamped to [0, 180] and
    /// truncated to a whole degree.
    pub fn servo_angle(&self, servo: Servo, angle: f32) -> Result<()> {
        let angle = angle.clamp(0.0, 180.0) as u8;
        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_SERVO_ANGLE[servo.index()], angle, FULL_MASK)
    }

    /// Detach a servo so the chip stops driving its signal line.
    pub fn servo_stop(&self, servo: Servo) -> Result<()> {
        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_SERVO_ATTACHED[servo.index()], 0, FULL_MASK)
    }

    /// Turn everything off: all four output channels and both servos.
    pub fn stop(&self) -> Result<()> {
        let mut guard = self.acquire()?;
        self.register_set(&mut guard, REG_OUTS, 0, FULL_MASK)?;
        self.register_set(&mut guard, REG_SERVO_ATTACHED[0], 0, FULL_MASK)?;
        self.register_set(&mut guard, REG_SERVO_ATTACHED[1], 0, FULL_MASK)
    }

    /// Shut down and release the underlying bus transport. With `run_stop`,
    /// all outputs are zeroed first.
    pub fn deinit(mut self, run_stop: bool) -> Result<()> {
        self.released = true;
        let result = if run_stop { self.stop() } else { Ok(()) };
        self.bus.close();
        result
    }
}

impl<T: I2cTransport> Drop for MotorModule<T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Scope-exit safety: outputs off, then release the bus.
        if let Err(e) = self.stop() {
            warn!("Failed to stop motor module on drop: {}", e);
        }
        self.bus.close();
    }
}
