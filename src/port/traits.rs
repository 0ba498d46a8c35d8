//! Line configuration types and the transport abstraction.
//!
//! `SerialTransport` is the seam between port sessions and the platform
//! driver; real ports and mocks implement it interchangeably. Opening goes
//! through `TransportOpener` so a whole bridge can be backed by either.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line configuration for a serial port.
///
/// Validation happens when a port is opened or reconfigured, never on the
/// write path. A combination the driver rejects surfaces as
/// [`PortError::UnsupportedConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Baud rate (bits per second). Must be positive.
    pub baud_rate: u32,

    /// Number of data bits per character.
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Default read deadline applied when a caller gives none.
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: Duration::from_millis(500),
        }
    }
}

impl PortConfig {
    /// Check the field-level invariants that hold regardless of driver.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.baud_rate == 0 {
            return Err(PortError::unsupported("baud rate must be positive"));
        }
        Ok(())
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
///
/// `OnePointFive` is representable because some line disciplines use it, but
/// the native driver layer has no 1.5 setting; converting it fails, which
/// surfaces as `UnsupportedConfig` at open or configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl TryFrom<StopBits> for serialport::StopBits {
    type Error = PortError;

    fn try_from(bits: StopBits) -> Result<Self, PortError> {
        match bits {
            StopBits::One => Ok(serialport::StopBits::One),
            StopBits::Two => Ok(serialport::StopBits::Two),
            StopBits::OnePointFive => Err(PortError::unsupported(
                "1.5 stop bits is not supported by the driver",
            )),
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    /// XON/XOFF in-band flow control.
    Software,
    /// RTS/CTS hardware flow control.
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Byte-stream operations on one open descriptor.
///
/// Implementations own the descriptor and release it on drop; release
/// failures are logged by the implementation and never surfaced.
pub trait SerialTransport: Send + std::fmt::Debug {
    /// Read bytes into `buffer`, blocking up to the configured timeout.
    ///
    /// A deadline that passes with no data is `PortError::TimedOut`, not a
    /// generic I/O failure.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes, returning how many the device accepted. May be short;
    /// the session loops until everything is flushed.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Change the read deadline for subsequent reads.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Re-apply a full line configuration to the live descriptor.
    fn apply(&mut self, config: &PortConfig) -> Result<(), PortError>;

    /// Block until all written bytes have left the transmit buffer.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Bytes currently buffered for reading, if the driver can tell.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }

    /// The device path this transport was opened on.
    fn name(&self) -> &str;
}

/// Opens transports for a given device path and configuration.
///
/// The returned transport is already configured; an opener that obtains a
/// descriptor and then fails to configure it must release the descriptor
/// before returning the error.
pub trait TransportOpener: Send + Sync {
    fn open(&self, path: &str, config: &PortConfig) -> Result<Box<dyn SerialTransport>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PortConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::None);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_baud_rejected() {
        let config = PortConfig {
            baud_rate: 0,
            ..PortConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PortError::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert!(matches!(
            serialport::StopBits::try_from(StopBits::One),
            Ok(serialport::StopBits::One)
        ));
        assert!(matches!(
            serialport::StopBits::try_from(StopBits::Two),
            Ok(serialport::StopBits::Two)
        ));
        assert!(matches!(
            serialport::StopBits::try_from(StopBits::OnePointFive),
            Err(PortError::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn test_flow_control_conversion() {
        let flow: serialport::FlowControl = FlowControl::Hardware.into();
        assert_eq!(flow, serialport::FlowControl::Hardware);
        let flow: serialport::FlowControl = FlowControl::Software.into();
        assert_eq!(flow, serialport::FlowControl::Software);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = PortConfig {
            baud_rate: 115_200,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            ..PortConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"even\""));
        let back: PortConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
