//! Init and config commands.

use std::path::PathBuf;

use crate::config::Settings;

pub fn run_init(force: bool) {
    let config_path = PathBuf::from(".elixir/settings.toml");

    if config_path.exists() && !force {
        eprintln!("Configuration file already exists at: {}", config_path.display());
        eprintln!("Use --force to overwrite");
        std::process::exit(1);
    }

    let settings = Settings::default();
    match settings.save(&config_path) {
        Ok(()) => {
            println!("Created configuration file at: {}", config_path.display());
            println!("Edit this file to customize your settings.");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn run_config(settings: &Settings) {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(settings) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
}
