pub mod adb;
pub mod driver;
pub mod uiautomator;

pub use driver::AndroidDriver;

use anyhow::Result;
use colored::Colorize;

/// Print connected Android devices
pub async fn list_devices() -> Result<()> {
    let devices = adb::get_devices().await?;

    if devices.is_empty() {
        println!("{} No Android devices connected", "ℹ".blue());
        return Ok(());
    }

    for device in devices {
        let state = if device.is_ready() {
            device.state.green()
        } else {
            device.state.yellow()
        };
        println!("  {}  {}", device.serial.cyan(), state);
    }

    Ok(())
}
