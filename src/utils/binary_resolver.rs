use anyhow::Result;
use std::path::PathBuf;

/// Locate a binary from the install directory, then the system PATH
pub fn find_binary(name: &str) -> Result<PathBuf> {
    let mut checked_paths = Vec::new();

    // ~/.droidsweep/platform-tools/<name> takes precedence over PATH so a
    // pinned platform-tools drop wins over whatever the OS ships
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".droidsweep").join("platform-tools").join(name);
        checked_paths.push(format!("Install dir: {:?}", candidate));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    Err(anyhow::anyhow!(
        "Could not find binary '{}'. Checked paths:\n{}",
        name,
        checked_paths.join("\n")
    ))
}

/// Locate the ADB binary (adb or adb.exe)
pub fn find_adb() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        find_binary("adb.exe").or_else(|_| find_binary("adb"))
    }
    #[cfg(not(windows))]
    {
        find_binary("adb")
    }
}
