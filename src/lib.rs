// Rover runtime: drives a dual H-bridge i2c motor module from zenoh commands.
// Shared by the runtime binary and the demo tools.

pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;
