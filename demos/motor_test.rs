// Motor test: Careful, step-by-step test for the motor module
//
// IMPORTANT: Run motor_diagnostic FIRST to verify read-only communication.
//
// Usage: cargo run --example motor_test -- [--bus /dev/i2c-1] [--address 0x0F]
//
// Safety features:
// - Explicit confirmation before any writes
// - Very slow test speeds first
// - Wheels coast between steps
// - Easy abort with Ctrl+C (the driver stops everything on drop)

use clap::Parser;
use linux_embedded_hal::I2cdev;
use rover_zenoh_runtime::motor::{
    MotorDriver, Servo, SharedBus, WheelSpeeds, MOTOR_MODULE_ADDR,
};
use std::io::{self, Write};
use std::thread::sleep;
use std::time::Duration;

fn parse_addr(s: &str) -> Result<u8, String> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
    }
}

#[derive(Parser)]
#[command(about = "Confirmation-gated live test of the motor module")]
struct Args {
    /// i2c character device the module hangs off
    #[arg(long, default_value = "/dev/i2c-1")]
    bus: String,

    /// 7-bit chip address (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_addr, default_value_t = MOTOR_MODULE_ADDR)]
    address: u8,
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().unwrap();
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║             Motor Module Test (WITH WRITES)                  ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  ⚠  This tool WILL write to the module and cause movement!   ║");
    println!("║  ⚠  Make sure wheels are OFF THE GROUND before proceeding!   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("i2c bus:      {}", args.bus);
    println!("Chip address: 0x{:02X}", args.address);
    println!();

    if !confirm("Have you run motor_diagnostic first and verified the chip responds?") {
        println!(
            "Please run: cargo run --example motor_diagnostic -- --bus {}",
            args.bus
        );
        return Ok(());
    }

    if !confirm("Are the rover's wheels OFF THE GROUND (robot elevated/on blocks)?") {
        println!("Please elevate the rover so wheels can spin freely.");
        return Ok(());
    }

    println!();
    println!("Opening i2c bus...");
    let bus = SharedBus::new(I2cdev::new(&args.bus)?);
    println!("✓ Connected");
    println!();

    // ========== STEP 1: Configure the chip ==========
    println!("Step 1: Configuring the motor module (MODE1/MODE2)...");
    let driver = MotorDriver::with_address(bus, args.address)?;
    println!("  ✓ Module configured");
    println!();

    // ========== STEP 2: Coast (no movement expected) ==========
    println!("Step 2: Coasting both wheels...");
    println!("  This should NOT cause any movement.");
    driver.coast_all()?;
    println!("  ✓ Coast commands sent");
    sleep(Duration::from_millis(500));
    println!();

    // ========== STEP 3: Very slow motion test ==========
    println!("Step 3: Very slow motion test");
    println!("  Speed: 20% duty per direction, 0.5 seconds each");
    println!();
    println!("  ⚠  WATCH THE WHEELS - they should spin slowly!");
    println!("  ⚠  Press Ctrl+C at any time to abort!");
    println!();

    if !confirm("Proceed with motion test?") {
        driver.stop()?;
        return Ok(());
    }

    let test_duration = Duration::from_millis(500);
    let pause_duration = Duration::from_millis(500);

    let tests = [
        ("Both forward", WheelSpeeds::new(20, 20)),
        ("Both reverse", WheelSpeeds::new(-20, -20)),
        ("Spin left", WheelSpeeds::new(-20, 20)),
        ("Spin right", WheelSpeeds::new(20, -20)),
    ];

    for (name, wheels) in tests {
        println!("  Testing: {}...", name);
        println!("    Wheel commands: left={}, right={}", wheels.left, wheels.right);
        driver.drive(wheels)?;
        sleep(test_duration);

        // Coast between tests
        driver.coast_all()?;
        sleep(pause_duration);
    }
    println!();

    // ========== STEP 4: Full speed and brake ==========
    println!("Step 4: Full speed (hard ON, no PWM) then active brake");
    if confirm("Run full-speed test?") {
        driver.drive(WheelSpeeds::new(100, 100))?;
        sleep(Duration::from_millis(500));
        println!("  Braking...");
        driver.brake_all()?;
        sleep(Duration::from_millis(500));
        driver.coast_all()?;
        println!("  ✓ Full speed and brake tested");
    }
    println!();

    // ========== STEP 5: Servo sweep ==========
    println!("Step 5: Servo sweep on S1");
    if confirm("Sweep servo 1 (0° → 90° → 180°)?") {
        for angle in [0.0, 90.0, 180.0] {
            println!("  Servo S1 -> {}°", angle);
            driver.servo_angle(Servo::S1, angle)?;
            sleep(Duration::from_millis(600));
        }
        driver.servo_stop(Servo::S1)?;
        println!("  ✓ Servo detached");
    }
    println!();

    // ========== FINAL: Stop and release ==========
    println!("Step 6: Stopping all outputs and releasing the bus...");
    driver.shutdown(true)?;
    println!("  ✓ Module shut down");

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Test Complete!                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the wheels moved as expected, the motor control is working correctly.");
    println!("You can now try the full runtime with: cargo run");

    Ok(())
}
