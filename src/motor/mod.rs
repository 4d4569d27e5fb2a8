// Motor module control for the rover base
//
// Provides:
// - Exclusive-access i2c bus plumbing (SharedBus / BusGuard)
// - PCA9635-family register protocol for the dual H-bridge motor module
// - Differential-drive mixing and a high-level drive API

pub mod bus;
mod driver;
pub mod mixer;
pub mod pca9635;

pub use bus::{BusError, I2cTransport, SharedBus, DEFAULT_ACQUIRE_TIMEOUT};
pub use driver::MotorDriver;
pub use mixer::{mix, WheelSpeeds};
pub use pca9635::{Motor, MotorModule, Servo, MOTOR_MODULE_ADDR};
