// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::motor::WheelSpeeds;

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveCommand {
    pub linear: f32,  // forward, normalized [-1, 1]
    pub angular: f32, // counter-clockwise, normalized [-1, 1]
}

// What the runtime actually applied to the wheels this tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct DriveActuation {
    pub left: i8,
    pub right: i8,
}

impl From<WheelSpeeds> for DriveActuation {
    fn from(wheels: WheelSpeeds) -> Self {
        Self {
            left: wheels.left,
            right: wheels.right,
        }
    }
}

/// Health status published by the runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    MotorFault,
}
