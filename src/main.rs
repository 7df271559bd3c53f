#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use app_settings::config::Settings;
use app_settings::constants::prefs as keys;
use app_settings::gate;
use app_settings::host::sim::{Scenario, run_scenario};
use app_settings::prefs::JsonPreferences;
use app_settings::resolver::{self, OverrideRecord};

/// Inspect and exercise per-application display/locale overrides
#[derive(Parser)]
#[command(name = "app-settings", version, about, long_about = None)]
struct Cli {
    /// Preference file (overrides settings and APP_SETTINGS_PREFS)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved overrides for a package
    Resolve {
        package: String,
    },
    /// Run every chokepoint against a host scenario file
    Simulate {
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct Resolution<'a> {
    package: &'a str,
    active: bool,
    insistent_notifications: bool,
    overrides: OverrideRecord,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(path) = cli.prefs {
        settings.prefs_path = path;
    }
    if let Some(level) = cli.log_level {
        settings.log_level = level;
        settings.validate_and_clamp();
    }

    // Logs go to stderr so stdout stays machine readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.tracing_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prefs = JsonPreferences::open(&settings.prefs_path)?;
    info!(prefs = ?prefs.path(), keys = prefs.len(), sdk_int = settings.sdk_int, "Starting");

    let output = match cli.command {
        Command::Resolve { package } => {
            let resolution = Resolution {
                active: gate::is_active(&prefs, &package),
                insistent_notifications: gate::is_active_for(
                    &prefs,
                    &package,
                    keys::INSISTENT_NOTIF,
                ),
                overrides: resolver::resolve(&prefs, &package),
                package: &package,
            };
            serde_json::to_string_pretty(&resolution)?
        }
        Command::Simulate { path } => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read scenario from {:?}", path))?;
            let scenario: Scenario = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse scenario {:?}", path))?;
            let outcome = run_scenario(prefs, scenario, settings.sdk_int);
            serde_json::to_string_pretty(&outcome)?
        }
    };

    println!("{output}");
    Ok(())
}
