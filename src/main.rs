use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use droidsweep::driver::android::{adb, AndroidDriver};
use droidsweep::utils::config::{default_config_path, DebloatConfig};
use droidsweep::{report, runner};

#[derive(Parser)]
#[command(name = "droidsweep")]
#[command(version = "0.1.0")]
#[command(about = "Android device debloat automation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to the config file (default: ~/.droidsweep/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device serial, overrides the config value
    #[arg(short, long)]
    device: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full sequence: connect, freeze, uninstall with backup, install
    Run {
        #[command(flatten)]
        common: ConfigArgs,

        /// Write a JSON run report
        #[arg(long, default_value = "false")]
        report: bool,

        /// Output directory for the report
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Disable the configured freeze list
    Freeze {
        #[command(flatten)]
        common: ConfigArgs,
    },

    /// Re-enable the configured freeze list
    Unfreeze {
        #[command(flatten)]
        common: ConfigArgs,
    },

    /// Back up and uninstall the configured uninstall list
    Uninstall {
        #[command(flatten)]
        common: ConfigArgs,
    },

    /// Install the configured install list from the Play Store
    Install {
        #[command(flatten)]
        common: ConfigArgs,
    },

    /// Reinstall backed-up APKs for the configured uninstall list
    Restore {
        #[command(flatten)]
        common: ConfigArgs,
    },

    /// List connected devices
    Devices,

    /// Connect to a device, pairing interactively if needed
    Connect {
        /// Device address (host:port); prompted for if omitted
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            common,
            report: write_report,
            output,
        } => {
            let config = load_config(&common)?;
            println!(
                "{} Debloating device{}",
                "▶".green().bold(),
                config
                    .device
                    .as_deref()
                    .map(|d| format!(" {}", d.cyan()))
                    .unwrap_or_default()
            );

            let phases = runner::run_all(&config).await?;

            if write_report {
                let run_report = report::RunReport::new(phases);
                report::write_json(&run_report, &output.join("debloat-report.json"))?;
            }
        }

        Commands::Freeze { common } => {
            let config = load_config(&common)?;
            let driver = connect_driver(&config).await?;
            let phase = runner::freeze_packages(&driver, &config.freeze).await?;
            runner::print_summary(&[phase]);
        }

        Commands::Unfreeze { common } => {
            let config = load_config(&common)?;
            let driver = connect_driver(&config).await?;
            let phase = runner::unfreeze_packages(&driver, &config.freeze).await?;
            runner::print_summary(&[phase]);
        }

        Commands::Uninstall { common } => {
            let config = load_config(&common)?;
            let driver = connect_driver(&config).await?;
            let phase =
                runner::uninstall_packages(&driver, &config.uninstall, &config.backup_path())
                    .await?;
            runner::print_summary(&[phase]);
        }

        Commands::Install { common } => {
            let config = load_config(&common)?;
            let driver = connect_driver(&config).await?;
            let phase = runner::install_packages(&driver, &config.install).await?;
            runner::print_summary(&[phase]);
        }

        Commands::Restore { common } => {
            let config = load_config(&common)?;
            let driver = connect_driver(&config).await?;
            let phase =
                runner::restore_packages(&driver, &config.uninstall, &config.backup_path()).await?;
            runner::print_summary(&[phase]);
        }

        Commands::Devices => {
            println!("{} Connected devices:", "🔍".blue());
            droidsweep::list_devices().await?;
        }

        Commands::Connect { address } => {
            match address {
                Some(addr) => {
                    adb::connect(&addr).await?;
                    println!("{} Connected to {}", "✓".green(), addr.cyan());
                }
                None => {
                    runner::ensure_connected().await?;
                    println!("{} Device connected", "✓".green());
                }
            };
        }
    }

    Ok(())
}

/// Load the config file and apply CLI overrides
fn load_config(args: &ConfigArgs) -> anyhow::Result<DebloatConfig> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = DebloatConfig::load(&path)?;

    if args.device.is_some() {
        config.device = args.device.clone();
    }

    Ok(config)
}

/// Ensure a device is reachable and build the driver for it
async fn connect_driver(config: &DebloatConfig) -> anyhow::Result<AndroidDriver> {
    runner::ensure_connected().await?;
    AndroidDriver::new(config.device.as_deref(), config.retry.clone()).await
}
