use thiserror::Error;

/// Error kinds for device and package operations
#[derive(Error, Debug)]
pub enum SweepError {
    /// No usable device behind the bridge
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    /// Package is not present on the device
    #[error("package not installed: {0}")]
    PackageAbsent(String),

    /// UI element could not be located after the retry budget
    #[error("UI element not found: {0}")]
    ElementNotFound(String),

    /// Tool output did not have the expected shape
    #[error("malformed adb output: {0}")]
    MalformedOutput(String),

    /// adb exited non-zero
    #[error("adb command failed: {0}")]
    CommandFailed(String),
}
