// Timeouts, topics, motor module configuration
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_BASE: &str = "rover/cmd/base"; // commands
pub const TOPIC_RT_BASE: &str = "rover/rt/base"; // actuation
pub const TOPIC_HEALTH: &str = "rover/state/health"; // health status

// Motor module configuration
// i2c character device the motor module hangs off
pub const I2C_BUS: &str = "/dev/i2c-1";

// How long one operation may wait for exclusive bus access
pub const BUS_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

// Enable hardware motor control (set to false for simulation/testing)
pub const MOTOR_ENABLED: bool = true;
