use super::{adb, uiautomator};
use crate::error::SweepError;
use crate::utils::config::RetryPolicy;
use anyhow::{Context, Result};
use std::path::Path;

/// Label of the Play Store install button in the UI hierarchy
const PLAY_STORE_INSTALL_LABEL: &str = "Install";

/// On-device path where `uiautomator dump` writes its snapshot
const UI_DUMP_PATH: &str = "/sdcard/window_dump.xml";

/// Android driver implementation using ADB
pub struct AndroidDriver {
    serial: Option<String>,
    retry: RetryPolicy,
}

impl AndroidDriver {
    /// Create a new Android driver
    ///
    /// Without an explicit serial the single ready device is selected;
    /// zero or multiple devices is an error.
    pub async fn new(serial: Option<&str>, retry: RetryPolicy) -> Result<Self> {
        let selected_serial = if let Some(s) = serial {
            Some(s.to_string())
        } else {
            let devices: Vec<_> = adb::get_devices()
                .await?
                .into_iter()
                .filter(|d| d.is_ready())
                .collect();
            match devices.len() {
                0 => {
                    return Err(SweepError::DeviceUnreachable(
                        "no Android devices connected".to_string(),
                    )
                    .into())
                }
                1 => Some(devices[0].serial.clone()),
                _ => anyhow::bail!("Multiple devices connected. Please specify one with --device"),
            }
        };

        Ok(Self {
            serial: selected_serial,
            retry,
        })
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Check if a package is currently installed
    pub async fn is_installed(&self, package: &str) -> Result<bool> {
        let output = adb::shell(
            self.serial.as_deref(),
            &format!("pm list packages {}", package),
        )
        .await?;
        Ok(parse_package_listing(&output).iter().any(|p| p == package))
    }

    /// Check if a package is currently enabled
    pub async fn is_enabled(&self, package: &str) -> Result<bool> {
        let output = adb::shell(
            self.serial.as_deref(),
            &format!("pm list packages -e {}", package),
        )
        .await?;
        Ok(parse_package_listing(&output).iter().any(|p| p == package))
    }

    /// Clear all app data for a package
    pub async fn clear_data(&self, package: &str) -> Result<()> {
        adb::shell(self.serial.as_deref(), &format!("pm clear {}", package)).await?;
        Ok(())
    }

    /// Disable a package for the current user
    ///
    /// A full uninstall is attempted first and its result ignored before
    /// the per-user disable.
    pub async fn disable(&self, package: &str) -> Result<()> {
        if let Err(e) = adb::exec(self.serial.as_deref(), &["uninstall", package]).await {
            log::debug!("Pre-disable uninstall of {} ignored: {}", package, e);
        }
        adb::shell(
            self.serial.as_deref(),
            &format!("pm disable-user {}", package),
        )
        .await?;
        Ok(())
    }

    /// Re-enable a previously disabled package
    pub async fn enable(&self, package: &str) -> Result<()> {
        adb::shell(self.serial.as_deref(), &format!("pm enable {}", package)).await?;
        Ok(())
    }

    /// Uninstall a package
    ///
    /// Tries the all-users uninstall first and unconditionally ignores its
    /// failure (system packages refuse it), then uninstalls for user 0,
    /// which is allowed to fail the operation.
    pub async fn uninstall(&self, package: &str) -> Result<()> {
        if let Err(e) = adb::exec(self.serial.as_deref(), &["uninstall", package]).await {
            log::debug!("All-users uninstall of {} ignored: {}", package, e);
        }
        adb::exec(
            self.serial.as_deref(),
            &["uninstall", "--user", "0", package],
        )
        .await?;
        Ok(())
    }

    /// Resolve the on-device APK path of an installed package
    pub async fn apk_path(&self, package: &str) -> Result<String> {
        let output = adb::shell(self.serial.as_deref(), &format!("pm path {}", package)).await?;

        match parse_apk_path(&output) {
            Some(path) => Ok(path),
            None if output.trim().is_empty() => {
                Err(SweepError::PackageAbsent(package.to_string()).into())
            }
            None => Err(SweepError::MalformedOutput(format!(
                "pm path {}: {}",
                package,
                output.trim()
            ))
            .into()),
        }
    }

    /// Extract a package's APK into `target_dir/<package>.apk`
    pub async fn extract_apk(&self, package: &str, target_dir: &Path) -> Result<()> {
        let remote = self.apk_path(package).await?;
        let local = target_dir.join(format!("{}.apk", package));
        adb::pull(
            self.serial.as_deref(),
            &remote,
            &local.to_string_lossy(),
        )
        .await
        .with_context(|| format!("Failed to back up APK for {}", package))?;
        Ok(())
    }

    /// Install an APK from a local path
    pub async fn install_apk(&self, apk_path: &Path) -> Result<()> {
        if !apk_path.exists() {
            anyhow::bail!("APK file not found: {}", apk_path.display());
        }
        adb::install(self.serial.as_deref(), &apk_path.to_string_lossy()).await
    }

    /// Tap at screen coordinates
    pub async fn tap(&self, x: i32, y: i32) -> Result<()> {
        adb::shell(self.serial.as_deref(), &format!("input tap {} {}", x, y)).await?;
        Ok(())
    }

    /// Get the current UI hierarchy XML
    pub async fn dump_ui_hierarchy(&self) -> Result<String> {
        adb::shell(self.serial.as_deref(), "uiautomator dump").await?;
        adb::shell(self.serial.as_deref(), &format!("cat {}", UI_DUMP_PATH)).await
    }

    /// Open a package's Play Store details page
    pub async fn open_play_store(&self, package: &str) -> Result<()> {
        // Quote the URI so `?` and `=` survive the device shell
        adb::shell(
            self.serial.as_deref(),
            &format!(
                "am start -a android.intent.action.VIEW -d 'market://details?id={}'",
                package
            ),
        )
        .await?;
        Ok(())
    }

    /// Install a package from the Play Store by tapping its Install button
    pub async fn install_from_playstore(&self, package: &str) -> Result<()> {
        self.open_play_store(package).await?;

        let center = uiautomator::locate_with_retry(
            || self.dump_ui_hierarchy(),
            PLAY_STORE_INSTALL_LABEL,
            &self.retry,
        )
        .await?;

        match center {
            Some((x, y)) => self.tap(x, y).await,
            None => Err(SweepError::ElementNotFound(format!(
                "'{}' button for {}",
                PLAY_STORE_INSTALL_LABEL, package
            ))
            .into()),
        }
    }
}

/// Parse `pm list packages` output into package identifiers
///
/// Lines look like `package:com.example.app`; anything else is ignored.
pub fn parse_package_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|p| p.to_string())
        .collect()
}

/// Parse the first APK path out of `pm path` output
///
/// Split APKs produce several `package:` lines; the base APK comes first.
pub fn parse_apk_path(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|p| p.to_string())
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_listing() {
        let output = "package:com.example.app\npackage:com.example.other\n";
        assert_eq!(
            parse_package_listing(output),
            vec!["com.example.app", "com.example.other"]
        );
    }

    #[test]
    fn test_parse_package_listing_exact_match_only() {
        let output = "package:com.example.appended\n";
        let packages = parse_package_listing(output);
        assert!(!packages.iter().any(|p| p == "com.example.app"));
    }

    #[test]
    fn test_parse_package_listing_ignores_noise() {
        let output = "\nSome warning line\npackage:com.example.app\n";
        assert_eq!(parse_package_listing(output), vec!["com.example.app"]);
    }

    #[test]
    fn test_parse_apk_path_first_line_wins() {
        let output = "package:/data/app/com.example/base.apk\npackage:/data/app/com.example/split_config.apk\n";
        assert_eq!(
            parse_apk_path(output).as_deref(),
            Some("/data/app/com.example/base.apk")
        );
    }

    #[test]
    fn test_parse_apk_path_empty() {
        assert_eq!(parse_apk_path(""), None);
        assert_eq!(parse_apk_path("\n"), None);
    }
}
