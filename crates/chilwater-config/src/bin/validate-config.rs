//! Config validation CLI tool
//!
//! Validates a chilwater configuration file and reports any errors.

use chilwater_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a chilwater configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config garden.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match chilwater_config::load_config(&config_path) {
        Ok(setup) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", chilwater_config::CURRENT_CONFIG_VERSION);
            println!("  Tick interval: {}ms", setup.daemon.tick_interval.as_millis());
            println!("  Pumps: {}", setup.pumps.len());
            println!("  Sensors: {}", setup.sensors.len());
            println!("  Controllers: {}", setup.controllers.len());

            if !setup.pumps.is_empty() {
                println!();
                println!("Pumps:");
                for pump in &setup.pumps {
                    let polarity = if pump.active_low { ", active low" } else { "" };
                    println!("  - {} [gpio {}{}]", pump.nr, pump.gpio, polarity);
                }
            }

            if !setup.sensors.is_empty() {
                println!();
                println!("Sensors:");
                for sensor in &setup.sensors {
                    println!("  - {} [{}]: {}", sensor.nr, sensor.kind, sensor.channel);
                }
            }

            if !setup.controllers.is_empty() {
                println!();
                println!("Controllers:");
                for controller in &setup.controllers {
                    let sensor = controller
                        .sensor
                        .map(|s| format!("sensor {}", s))
                        .unwrap_or_else(|| "no sensor".into());
                    println!("  - {} [pump {}, {}]", controller.nr, controller.pump, sensor);
                    for rule in &controller.rules {
                        let condition = rule
                            .condition
                            .map(|c| format!(" if value {} {}", c.comparator, c.threshold))
                            .unwrap_or_default();
                        println!(
                            "      {} {}: {}s{}",
                            rule.name, rule.window, rule.pump_seconds, condition
                        );
                    }
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                chilwater_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                chilwater_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                chilwater_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                chilwater_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        chilwater_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
