// 50 Hz loop with watchdog
// If teleop crashes and stops sending commands, the watchdog zeroes the
// wheels instead of letting the rover run away on its last command.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use linux_embedded_hal::I2cdev;

use crate::config::{
    BUS_ACQUIRE_TIMEOUT, CMD_TIMEOUT, I2C_BUS, LOOP_HZ, MOTOR_ENABLED, TOPIC_CMD_BASE,
    TOPIC_HEALTH, TOPIC_RT_BASE,
};
use crate::messages::{DriveActuation, DriveCommand, RuntimeHealth};
use crate::motor::{mix, MotorDriver, SharedBus, WheelSpeeds};

pub struct Runtime {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Process incoming command
    fn on_command(&mut self, cmd: DriveCommand) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Compute wheel speeds based on watchdog state
    fn compute_wheels(&mut self) -> WheelSpeeds {
        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > CMD_TIMEOUT {
            // Watchdog triggered - zero the wheels
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), zeroing wheels", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            WheelSpeeds::zero()
        } else if let Some(ref cmd) = self.latest_cmd {
            self.health = RuntimeHealth::Ok;
            mix(cmd.linear, cmd.angular)
        } else {
            // No command ever received
            self.health = RuntimeHealth::CmdStale;
            WheelSpeeds::zero()
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let driver = if MOTOR_ENABLED {
        info!("Opening i2c bus {}...", I2C_BUS);
        let bus = SharedBus::new(I2cdev::new(I2C_BUS)?);
        let mut driver = MotorDriver::new(bus)?;
        driver.set_acquire_timeout(BUS_ACQUIRE_TIMEOUT);
        Some(driver)
    } else {
        info!("Motor control disabled, running in simulation mode");
        None
    };

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_BASE).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_BASE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_BASE);
    info!("Publishing to: {}, {}", TOPIC_RT_BASE, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Compute wheel speeds (includes watchdog logic)
        let wheels = runtime.compute_wheels();

        // 3. Apply to the motor module
        if let Some(ref driver) = driver {
            if let Err(e) = driver.drive(wheels) {
                warn!("Motor drive failed: {}", e);
                runtime.health = RuntimeHealth::MotorFault;
            }
        }

        // 4. Publish actuation
        let actuation_json = serde_json::to_string(&DriveActuation::from(wheels))?;
        pub_actuation.put(actuation_json).await?;

        // 5. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}
