//! Port-specific error types.
//!
//! One variant per failure class the access layer can surface. Raw OS error
//! codes are folded into these variants where the descriptor gives us one.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device path does not resolve to a serial device.
    #[error("serial device not found: {0}")]
    NotFound(String),

    /// The caller lacks permission to open the device.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The device is already exclusively held.
    #[error("device busy: {0}")]
    Busy(String),

    /// The driver rejected the requested line configuration.
    #[error("unsupported port configuration: {0}")]
    UnsupportedConfig(String),

    /// The handle is unknown or has already been closed.
    #[error("invalid or closed port handle #{0}")]
    InvalidHandle(u32),

    /// No data arrived within the read deadline.
    #[error("read timed out after {0:?}")]
    TimedOut(Duration),

    /// An I/O error occurred on the underlying descriptor.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A driver-level error that fits none of the classes above.
    #[error("serial driver error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a device path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a PermissionDenied error from a device path.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a Busy error from a device path.
    pub fn busy(path: impl Into<String>) -> Self {
        Self::Busy(path.into())
    }

    /// Create an UnsupportedConfig error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfig(message.into())
    }

    /// Create a TimedOut error from a deadline.
    pub fn timeout(deadline: Duration) -> Self {
        Self::TimedOut(deadline)
    }

    /// Classify a descriptor-level I/O error by its raw OS code.
    ///
    /// Falls back to the generic `Io` variant when the code carries no
    /// classification we recognize.
    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        if let Some(code) = err.raw_os_error() {
            #[cfg(unix)]
            {
                match code {
                    libc::ENOENT | libc::ENXIO | libc::ENODEV => return Self::not_found(path),
                    libc::EACCES | libc::EPERM => return Self::permission_denied(path),
                    libc::EBUSY => return Self::busy(path),
                    _ => {}
                }
            }
            #[cfg(windows)]
            {
                use winapi::shared::winerror::{
                    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND,
                    ERROR_SHARING_VIOLATION,
                };
                match code as u32 {
                    ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => return Self::not_found(path),
                    ERROR_ACCESS_DENIED => return Self::permission_denied(path),
                    ERROR_SHARING_VIOLATION => return Self::busy(path),
                    _ => {}
                }
            }
            #[cfg(not(any(unix, windows)))]
            let _ = code;
        }
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::Io(err),
        }
    }
}
