pub mod state;

use crate::driver::android::{adb, AndroidDriver};
use crate::error::SweepError;
use crate::utils::config::DebloatConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use state::{PackageReport, PackageStatus, PhaseReport, RunSummary};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Ensure a device is reachable, prompting for connect/pair details if not
///
/// A device already in the `device` state means this is a no-op: no prompts
/// are issued.
pub async fn ensure_connected() -> Result<()> {
    if adb::is_connected().await? {
        return Ok(());
    }

    println!("{} No device connected yet", "ℹ".blue());
    let address = prompt("Device address (host:port): ")?;

    // `adb connect` reports failure without a non-zero exit, so don't trust
    // the call alone; re-check the device list and fall back to pairing
    if let Err(e) = adb::connect(&address).await {
        log::debug!("Initial connect attempt failed: {}", e);
    }

    if !adb::is_connected().await? {
        println!("{} Device isn't paired yet", "⚠".yellow());
        let pairing_address = prompt("Pairing address (host:port): ")?;
        let pairing_code = prompt("Pairing code: ")?;
        adb::pair(&pairing_address, &pairing_code).await?;
        adb::connect(&address).await?;
    }

    if !adb::is_connected().await? {
        return Err(SweepError::DeviceUnreachable(address).into());
    }

    Ok(())
}

/// Read one trimmed line from stdin
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Run the full debloat sequence: freeze, uninstall with backup, install
pub async fn run_all(config: &DebloatConfig) -> Result<Vec<PhaseReport>> {
    ensure_connected().await?;
    let driver = AndroidDriver::new(config.device.as_deref(), config.retry.clone()).await?;

    let phases = vec![
        freeze_packages(&driver, &config.freeze).await?,
        uninstall_packages(&driver, &config.uninstall, &config.backup_path()).await?,
        install_packages(&driver, &config.install).await?,
    ];

    print_summary(&phases);
    Ok(phases)
}

/// Disable every package in the list that is currently enabled
pub async fn freeze_packages(driver: &AndroidDriver, packages: &[String]) -> Result<PhaseReport> {
    println!(
        "{} Freezing {} package(s)",
        "▶".green().bold(),
        packages.len()
    );
    let mut phase = PhaseReport::new("freeze");

    for package in packages {
        let started = Instant::now();
        let status = match driver.is_enabled(package).await {
            Ok(false) => skipped(package, "not enabled"),
            Ok(true) => {
                let result = async {
                    driver.clear_data(package).await?;
                    driver.disable(package).await
                }
                .await;
                outcome(package, "Disabled", result)
            }
            Err(e) => failed(package, e),
        };
        phase.push(PackageReport::new(
            package,
            status,
            started.elapsed().as_millis() as u64,
        ));
    }

    Ok(phase)
}

/// Re-enable every package in the list that is currently disabled
pub async fn unfreeze_packages(driver: &AndroidDriver, packages: &[String]) -> Result<PhaseReport> {
    println!(
        "{} Unfreezing {} package(s)",
        "▶".green().bold(),
        packages.len()
    );
    let mut phase = PhaseReport::new("unfreeze");

    for package in packages {
        let started = Instant::now();
        let status = match driver.is_enabled(package).await {
            Ok(true) => skipped(package, "already enabled"),
            Ok(false) => outcome(package, "Enabled", driver.enable(package).await),
            Err(e) => failed(package, e),
        };
        phase.push(PackageReport::new(
            package,
            status,
            started.elapsed().as_millis() as u64,
        ));
    }

    Ok(phase)
}

/// Back up and uninstall every installed package in the list
///
/// Packages that are not installed are skipped outright: no extraction, no
/// uninstall attempt.
pub async fn uninstall_packages(
    driver: &AndroidDriver,
    packages: &[String],
    backup_dir: &Path,
) -> Result<PhaseReport> {
    println!(
        "{} Uninstalling {} package(s), backups in {}",
        "▶".green().bold(),
        packages.len(),
        backup_dir.display().to_string().cyan()
    );
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup dir {}", backup_dir.display()))?;

    let mut phase = PhaseReport::new("uninstall");

    for package in packages {
        let started = Instant::now();
        let status = match driver.is_installed(package).await {
            Ok(false) => skipped(package, "not installed"),
            Ok(true) => {
                let result = async {
                    driver.clear_data(package).await?;
                    driver.extract_apk(package, backup_dir).await?;
                    driver.uninstall(package).await
                }
                .await;
                outcome(package, "Uninstalled", result)
            }
            Err(e) => failed(package, e),
        };
        phase.push(PackageReport::new(
            package,
            status,
            started.elapsed().as_millis() as u64,
        ));
    }

    Ok(phase)
}

/// Install every missing package in the list from the Play Store
pub async fn install_packages(driver: &AndroidDriver, packages: &[String]) -> Result<PhaseReport> {
    println!(
        "{} Installing {} package(s) from the Play Store",
        "▶".green().bold(),
        packages.len()
    );
    let mut phase = PhaseReport::new("install");

    for package in packages {
        let started = Instant::now();
        let status = match driver.is_installed(package).await {
            Ok(true) => skipped(package, "already installed"),
            Ok(false) => outcome(
                package,
                "Install started for",
                driver.install_from_playstore(package).await,
            ),
            Err(e) => failed(package, e),
        };
        phase.push(PackageReport::new(
            package,
            status,
            started.elapsed().as_millis() as u64,
        ));
    }

    Ok(phase)
}

/// Reinstall backed-up APKs for packages that are no longer installed
pub async fn restore_packages(
    driver: &AndroidDriver,
    packages: &[String],
    backup_dir: &Path,
) -> Result<PhaseReport> {
    println!(
        "{} Restoring {} package(s) from {}",
        "▶".green().bold(),
        packages.len(),
        backup_dir.display().to_string().cyan()
    );
    let mut phase = PhaseReport::new("restore");

    for package in packages {
        let started = Instant::now();
        let apk = backup_dir.join(format!("{}.apk", package));
        let status = match driver.is_installed(package).await {
            Ok(true) => skipped(package, "already installed"),
            Ok(false) if !apk.exists() => skipped(package, "no backup APK"),
            Ok(false) => outcome(package, "Restored", driver.install_apk(&apk).await),
            Err(e) => failed(package, e),
        };
        phase.push(PackageReport::new(
            package,
            status,
            started.elapsed().as_millis() as u64,
        ));
    }

    Ok(phase)
}

fn skipped(package: &str, reason: &str) -> PackageStatus {
    println!("  {} {} ({})", "↷".dimmed(), package.dimmed(), reason);
    PackageStatus::Skipped {
        reason: reason.to_string(),
    }
}

fn failed(package: &str, error: anyhow::Error) -> PackageStatus {
    println!("  {} {}: {:#}", "✗".red(), package, error);
    PackageStatus::Failed {
        error: format!("{:#}", error),
    }
}

fn outcome(package: &str, verb: &str, result: Result<()>) -> PackageStatus {
    match result {
        Ok(()) => {
            println!("  {} {} {}", "✓".green(), verb, package);
            PackageStatus::Passed
        }
        Err(e) => failed(package, e),
    }
}

/// Print the end-of-run totals
pub fn print_summary(phases: &[PhaseReport]) {
    let summary = RunSummary::tally(phases);
    println!(
        "\n{} {} passed, {} failed, {} skipped",
        "∑".bold(),
        summary.passed.to_string().green(),
        summary.failed.to_string().red(),
        summary.skipped.to_string().yellow()
    );
}
