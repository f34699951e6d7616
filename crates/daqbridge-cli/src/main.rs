//! `daqbridge` – interactive shell over the daqbridge command dispatcher.
//!
//! 1. Loads `~/.daqbridge/config.toml`, writing the defaults on first run.
//! 2. Creates an instance with the reference module and connects the
//!    configured `auto_connect` device, if any.
//! 3. Drops the user into a REPL where every line is a command for the
//!    current object (`print name`, `select channel 0`, `set Scale 2`).

mod repl;

use colored::Colorize;
use daqbridge_core::config::{self, Config};
use daqbridge_core::telemetry;

fn main() {
    // Logs go to stderr; RUST_LOG overrides the level and
    // DAQBRIDGE_LOG_FORMAT=json switches to JSON lines.
    telemetry::init_tracing("info");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            Config::default()
        }
    };

    println!(
        "  Reference module: {} device(s), {} channel(s) each, {} Hz",
        cfg.reference_devices.to_string().yellow(),
        cfg.reference_channels.to_string().yellow(),
        cfg.sample_rate.to_string().yellow()
    );
    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(cfg);
}

/// No config file yet: save the defaults so there is something to edit.
fn first_run() -> Config {
    let mut cfg = Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

fn print_banner() {
    println!();
    println!("{}", r#"       __                __         _     __         "#.bold().cyan());
    println!("{}", r#"  ____/ /___ _____ _    / /_  _____(_)___/ /___ ____ "#.bold().cyan());
    println!("{}", r#" / __  / __ `/ __ `/   / __ \/ ___/ / __  / __ `/ _ \"#.bold().cyan());
    println!("{}", r#"/ /_/ / /_/ / /_/ /   / /_/ / /  / / /_/ / /_/ /  __/"#.bold().cyan());
    println!("{}", r#"\__,_/\__,_/\__, /   /_.___/_/  /_/\__,_/\__, /\___/ "#.bold().cyan());
    println!("{}", r#"              /_/                      /____/        "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "daqbridge".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Data acquisition command shell");
    println!();
}
