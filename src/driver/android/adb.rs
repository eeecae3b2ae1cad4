use crate::error::SweepError;
use crate::utils::binary_resolver;
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Represents an Android device
#[derive(Debug, Clone)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

impl Device {
    /// Whether the device is in the usable `device` state (not
    /// `offline`/`unauthorized`)
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

/// Get list of connected Android devices
pub async fn get_devices() -> Result<Vec<Device>> {
    let output = exec(None, &["devices"]).await?;

    let mut devices = Vec::new();

    // First line is the "List of devices attached" header
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            devices.push(Device {
                serial: parts[0].to_string(),
                state: parts[1].to_string(),
            });
        }
    }

    Ok(devices)
}

/// Whether any connected device is in the usable state
pub async fn is_connected() -> Result<bool> {
    let devices = get_devices().await?;
    Ok(devices.iter().any(|d| d.is_ready()))
}

/// Connect to a device over TCP/IP
pub async fn connect(address: &str) -> Result<()> {
    let output = exec(None, &["connect", address]).await?;

    // adb connect reports failure on stdout with exit code 0
    if output.contains("failed") || output.contains("cannot") {
        anyhow::bail!("ADB connect failed: {}", output.trim());
    }

    Ok(())
}

/// Pair with a device using a wireless-debugging pairing code
pub async fn pair(address: &str, pairing_code: &str) -> Result<()> {
    let output = exec(None, &["pair", address, pairing_code]).await?;

    if output.contains("Failed") || output.contains("failed") {
        anyhow::bail!("ADB pairing failed: {}", output.trim());
    }

    Ok(())
}

/// Execute an ADB shell command
pub async fn shell(serial: Option<&str>, cmd: &str) -> Result<String> {
    let mut args = Vec::new();

    if let Some(s) = serial {
        args.push("-s");
        args.push(s);
    }

    args.push("shell");
    args.push(cmd);

    log::debug!("adb shell {}", cmd);

    let adb_path = binary_resolver::find_adb()?;
    let output = Command::new(adb_path)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute: adb shell {}", cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SweepError::CommandFailed(format!("shell {}: {}", cmd, stderr.trim())).into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Execute a raw ADB command
pub async fn exec(serial: Option<&str>, args: &[&str]) -> Result<String> {
    let mut full_args = Vec::new();

    if let Some(s) = serial {
        full_args.push("-s");
        full_args.push(s);
    }

    full_args.extend_from_slice(args);

    log::debug!("adb {}", full_args.join(" "));

    let adb_path = binary_resolver::find_adb()?;
    let output = Command::new(adb_path)
        .args(&full_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute: adb {:?}", full_args))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SweepError::CommandFailed(format!(
            "{}: {}",
            full_args.join(" "),
            stderr.trim()
        ))
        .into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Pull a file from device
pub async fn pull(serial: Option<&str>, remote: &str, local: &str) -> Result<()> {
    exec(serial, &["pull", remote, local])
        .await
        .with_context(|| format!("Failed to pull {} to {}", remote, local))?;
    Ok(())
}

/// Install an APK on device
pub async fn install(serial: Option<&str>, apk_path: &str) -> Result<()> {
    exec(serial, &["install", "-r", apk_path])
        .await
        .with_context(|| format!("Failed to install {}", apk_path))?;
    Ok(())
}
