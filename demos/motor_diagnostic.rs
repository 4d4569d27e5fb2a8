// Motor module diagnostic: READ-ONLY register dump
//
// This tool does NOT write anything to the module - it's completely safe.
// Use this first before running motor_test.
//
// Usage: cargo run --example motor_diagnostic -- [--bus /dev/i2c-1] [--address 0x0F]

use clap::Parser;
use linux_embedded_hal::I2cdev;
use rover_zenoh_runtime::motor::{SharedBus, DEFAULT_ACQUIRE_TIMEOUT, MOTOR_MODULE_ADDR};

// Register layout of the PCA9635-family motor module.
const REGISTERS: [(&str, u8); 11] = [
    ("MODE1", 0x00),
    ("MODE2", 0x01),
    ("PWM0", 0x02),
    ("PWM1", 0x03),
    ("PWM2", 0x04),
    ("PWM3", 0x05),
    ("OUTS", 0x14),
    ("SERVO_ATTACHED0", 0x1C),
    ("SERVO_ATTACHED1", 0x1D),
    ("SERVO_ANGLE0", 0x1E),
    ("SERVO_ANGLE1", 0x1F),
];

const REG_OUTS: u8 = 0x14;

fn parse_addr(s: &str) -> Result<u8, String> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse().map_err(|e: std::num::ParseIntError| e.to_string()),
    }
}

#[derive(Parser)]
#[command(about = "Read-only register dump of the motor module")]
struct Args {
    /// i2c character device the module hangs off
    #[arg(long, default_value = "/dev/i2c-1")]
    bus: String,

    /// 7-bit chip address (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_addr, default_value_t = MOTOR_MODULE_ADDR)]
    address: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Motor Module Diagnostic (READ-ONLY)                 ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  This tool only READS registers - no writes, no movement     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("i2c bus:      {}", args.bus);
    println!("Chip address: 0x{:02X}", args.address);
    println!();

    println!("Step 1: Opening i2c bus...");
    let bus = match I2cdev::new(&args.bus) {
        Ok(dev) => {
            println!("  ✓ Bus opened successfully");
            SharedBus::new(dev)
        }
        Err(e) => {
            println!("  ✗ Failed to open {}: {}", args.bus, e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the device path (ls /dev/i2c-*)");
            println!("  - Enable the i2c interface (raspi-config on a Pi)");
            println!("  - Run as a user in the i2c group");
            return Err(e.into());
        }
    };
    println!();

    println!("Step 2: Reading registers...");
    println!();

    let mut guard = bus.acquire(DEFAULT_ACQUIRE_TIMEOUT)?;
    let mut outs = None;
    for (name, reg) in REGISTERS {
        let mut buf = [0u8; 1];
        match guard.write_read(args.address, &[reg], &mut buf) {
            Ok(()) => {
                println!("  {:16} (0x{:02X}): 0x{:02X}", name, reg, buf[0]);
                if reg == REG_OUTS {
                    outs = Some(buf[0]);
                }
            }
            Err(e) => println!("  {:16} (0x{:02X}): ERROR - {}", name, reg, e),
        }
    }
    drop(guard);
    println!();

    if let Some(outs) = outs {
        println!("Step 3: Decoding OUTS channels...");
        for ch in 0..4u8 {
            let field = (outs >> (ch * 2)) & 0b11;
            let state = match field {
                0b00 => "OFF",
                0b01 => "ON",
                0b10 => "PWM",
                _ => "RESERVED",
            };
            println!("  Channel {}: {} ({:02b})", ch, state, field);
        }
        println!();
    }

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Diagnostic Complete                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the reads succeeded the chip is reachable:");
    println!("  1. MODE1 = 0x01 / MODE2 = 0x05 means a runtime already configured it");
    println!("  2. All channels OFF means the motors are coasting");
    println!();
    println!("Next step: Run 'cargo run --example motor_test' with wheels OFF THE GROUND");

    Ok(())
}
