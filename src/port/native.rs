//! Native serial transport backed by the `serialport` crate.
//!
//! The driver crate selects the platform implementation (termios on POSIX,
//! the COMM API on Windows) at compile time; this module maps its errors
//! into our typed kinds and adapts it to `SerialTransport`.

use super::error::PortError;
use super::traits::{PortConfig, SerialTransport, TransportOpener};
use serde::Serialize;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::warn;

/// An open native serial port.
pub struct NativeTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    timeout: Duration,
}

impl NativeTransport {
    /// Open a device path with the given line configuration.
    ///
    /// Opening and configuring happen in one driver call, so a configuration
    /// the driver rejects never leaves a dangling descriptor behind.
    pub fn open(path: &str, config: &PortConfig) -> Result<Self, PortError> {
        config.validate()?;
        let stop_bits: serialport::StopBits = config.stop_bits.try_into()?;

        let port = serialport::new(path, config.baud_rate)
            .data_bits(config.data_bits.into())
            .parity(config.parity.into())
            .stop_bits(stop_bits)
            .flow_control(config.flow_control.into())
            .timeout(config.timeout)
            .open()
            .map_err(|e| map_open_error(path, e))?;

        Ok(Self {
            port,
            name: path.to_string(),
            timeout: config.timeout,
        })
    }
}

fn map_open_error(path: &str, err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::NoDevice => PortError::not_found(path),
        serialport::ErrorKind::InvalidInput => PortError::unsupported(err.to_string()),
        serialport::ErrorKind::Io(kind) => match kind {
            std::io::ErrorKind::NotFound => PortError::not_found(path),
            std::io::ErrorKind::PermissionDenied => PortError::permission_denied(path),
            std::io::ErrorKind::ResourceBusy => PortError::busy(path),
            _ => PortError::Serial(err),
        },
        _ => PortError::Serial(err),
    }
}

fn map_apply_error(err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::InvalidInput => PortError::unsupported(err.to_string()),
        _ => PortError::Serial(err),
    }
}

impl SerialTransport for NativeTransport {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Err(PortError::timeout(self.timeout))
            }
            Err(e) => Err(PortError::from_io(&self.name, e)),
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port
            .write(data)
            .map_err(|e| PortError::from_io(&self.name, e))
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port.set_timeout(timeout).map_err(PortError::Serial)?;
        self.timeout = timeout;
        Ok(())
    }

    fn apply(&mut self, config: &PortConfig) -> Result<(), PortError> {
        config.validate()?;
        let stop_bits: serialport::StopBits = config.stop_bits.try_into()?;

        self.port
            .set_baud_rate(config.baud_rate)
            .map_err(map_apply_error)?;
        self.port
            .set_data_bits(config.data_bits.into())
            .map_err(map_apply_error)?;
        self.port
            .set_parity(config.parity.into())
            .map_err(map_apply_error)?;
        self.port.set_stop_bits(stop_bits).map_err(map_apply_error)?;
        self.port
            .set_flow_control(config.flow_control.into())
            .map_err(map_apply_error)?;
        self.set_timeout(config.timeout)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port
            .flush()
            .map_err(|e| PortError::from_io(&self.name, e))
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NativeTransport {
    fn drop(&mut self) {
        if let Err(e) = self.port.flush() {
            warn!(port = %self.name, error = %e, "flush on release failed");
        }
    }
}

impl std::fmt::Debug for NativeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Opener backing a bridge with real hardware ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOpener;

impl TransportOpener for NativeOpener {
    fn open(&self, path: &str, config: &PortConfig) -> Result<Box<dyn SerialTransport>, PortError> {
        Ok(Box::new(NativeTransport::open(path, config)?))
    }
}

/// A serial device known to the OS.
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    /// OS device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// What kind of bus the device hangs off.
    pub kind: PortKind,
}

/// Bus classification reported by the driver.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        serial_number: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        manufacturer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        product: Option<String>,
    },
    Pci,
    Bluetooth,
    Unknown,
}

/// Enumerate the serial devices currently visible to the OS.
pub fn list_ports() -> Result<Vec<PortInfo>, PortError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            name: p.port_name,
            kind: match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => PortKind::Usb {
                    vid: usb.vid,
                    pid: usb.pid,
                    serial_number: usb.serial_number,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                },
                serialport::SerialPortType::PciPort => PortKind::Pci,
                serialport::SerialPortType::BluetoothPort => PortKind::Bluetooth,
                serialport::SerialPortType::Unknown => PortKind::Unknown,
            },
        })
        .collect())
}
