//! Byte-stream semantics for one open port.
//!
//! Reads block for the first chunk up to the deadline, then drain whatever
//! the device already buffered. Writes loop over short acceptance until the
//! whole payload is flushed. Reconfiguration rolls back to the previous line
//! settings when the driver rejects the new ones mid-apply.

use crate::port::{PortConfig, PortError, SerialTransport};
use crate::registry::PortState;
use std::time::Duration;
use tracing::{trace, warn};

/// Drain granularity after the first chunk has arrived.
const DRAIN_CHUNK: usize = 16;

impl PortState {
    /// Read up to `max_bytes`, waiting at most `timeout` (the port's default
    /// deadline when `None`) for the first byte.
    ///
    /// A deadline that passes with nothing read is `TimedOut`. Once data has
    /// arrived, already-buffered bytes are drained without further waiting.
    pub(crate) fn read_up_to(
        &mut self,
        max_bytes: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, PortError> {
        if max_bytes == 0 {
            return Ok(Vec::new());
        }

        let overridden = match timeout {
            Some(deadline) if deadline != self.config.timeout => {
                self.transport.set_timeout(deadline)?;
                true
            }
            _ => false,
        };

        let result = self.read_inner(max_bytes);

        if overridden {
            if let Err(e) = self.transport.set_timeout(self.config.timeout) {
                warn!(port = %self.path, error = %e, "failed to restore read deadline");
            }
        }

        let data = result?;
        self.bytes_read_total += data.len() as u64;
        trace!(port = %self.path, bytes = data.len(), "read");
        Ok(data)
    }

    fn read_inner(&mut self, max_bytes: usize) -> Result<Vec<u8>, PortError> {
        let mut buf = vec![0u8; max_bytes];

        let mut filled = match self.transport.read_bytes(&mut buf) {
            Ok(0) => return Err(PortError::timeout(self.config.timeout)),
            Ok(n) => n,
            Err(e) => return Err(e),
        };

        // The device may still hold bytes that arrived with the first chunk;
        // take them in small pieces without waiting for more.
        while filled < max_bytes {
            match self.transport.bytes_to_read() {
                Some(pending) if pending > 0 => {
                    let end = max_bytes.min(filled + DRAIN_CHUNK);
                    match self.transport.read_bytes(&mut buf[filled..end]) {
                        Ok(0) | Err(PortError::TimedOut(_)) => break,
                        Ok(n) => filled += n,
                        Err(e) => return Err(e),
                    }
                }
                _ => break,
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    /// Write the whole payload, looping over short acceptance.
    ///
    /// All-or-error: an underlying failure fails the call without reporting
    /// how much was already accepted.
    pub(crate) fn write_all(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut written = 0;
        while written < data.len() {
            let n = self.transport.write_bytes(&data[written..])?;
            if n == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "device accepted no bytes",
                )));
            }
            written += n;
        }
        self.transport.flush()?;
        self.bytes_written_total += written as u64;
        trace!(port = %self.path, bytes = written, "write");
        Ok(written)
    }

    /// Apply a new line configuration to the live descriptor.
    ///
    /// On mid-apply failure the previous settings are re-applied, so the
    /// descriptor never stays half-configured; the recorded config changes
    /// only on full success.
    pub(crate) fn reconfigure(&mut self, config: &PortConfig) -> Result<(), PortError> {
        config.validate()?;
        match self.transport.apply(config) {
            Ok(()) => {
                self.config = config.clone();
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.transport.apply(&self.config) {
                    warn!(port = %self.path, error = %rollback, "failed to restore previous line settings");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockTransport, StopBits};

    fn open_state(transport: MockTransport) -> PortState {
        let name = transport.name().to_string();
        PortState::new(Box::new(transport), PortConfig::default(), name)
    }

    #[test]
    fn test_read_drains_buffered_bytes() {
        let mock = MockTransport::new("/mock/a");
        mock.enqueue_read(b"the quick brown fox jumps over the lazy dog");
        let mut state = open_state(mock);

        let data = state.read_up_to(64, None).unwrap();
        assert_eq!(&data, b"the quick brown fox jumps over the lazy dog");
        assert_eq!(state.bytes_read_total, 43);
    }

    #[test]
    fn test_read_respects_max_bytes() {
        let mock = MockTransport::new("/mock/a");
        mock.enqueue_read(b"abcdef");
        let mut state = open_state(mock);

        let data = state.read_up_to(4, None).unwrap();
        assert_eq!(&data, b"abcd");

        let rest = state.read_up_to(4, None).unwrap();
        assert_eq!(&rest, b"ef");
    }

    #[test]
    fn test_read_zero_max_is_empty() {
        let mut state = open_state(MockTransport::new("/mock/a"));
        assert!(state.read_up_to(0, None).unwrap().is_empty());
    }

    #[test]
    fn test_empty_read_is_timeout() {
        let mut state = open_state(MockTransport::new("/mock/a"));
        assert!(matches!(
            state.read_up_to(16, Some(Duration::ZERO)),
            Err(PortError::TimedOut(_))
        ));
    }

    #[test]
    fn test_write_loops_over_short_acceptance() {
        let mock = MockTransport::new("/mock/a");
        mock.set_write_limit(1);
        let log_handle = mock.clone();
        let mut state = open_state(mock);

        let written = state.write_all(b"hello").unwrap();
        assert_eq!(written, 5);
        assert_eq!(state.bytes_written_total, 5);
        assert_eq!(log_handle.write_log().len(), 5);
        assert_eq!(log_handle.written(), b"hello");
        assert!(log_handle.was_flushed());
    }

    #[test]
    fn test_reconfigure_updates_recorded_config() {
        let mock = MockTransport::new("/mock/a");
        let handle = mock.clone();
        let mut state = open_state(mock);

        let config = PortConfig {
            baud_rate: 115_200,
            ..PortConfig::default()
        };
        state.reconfigure(&config).unwrap();
        assert_eq!(state.config.baud_rate, 115_200);
        assert_eq!(handle.applied_configs(), vec![config]);
    }

    #[test]
    fn test_reconfigure_rejects_invalid_and_keeps_config() {
        let mut state = open_state(MockTransport::new("/mock/a"));
        let bad = PortConfig {
            baud_rate: 0,
            ..PortConfig::default()
        };
        assert!(state.reconfigure(&bad).is_err());
        assert_eq!(state.config.baud_rate, 9600);
    }

    #[test]
    fn test_mock_accepts_one_point_five_stop_bits() {
        let mut state = open_state(MockTransport::new("/mock/a"));
        let config = PortConfig {
            stop_bits: StopBits::OnePointFive,
            ..PortConfig::default()
        };
        assert!(state.reconfigure(&config).is_ok());
        assert_eq!(state.config.stop_bits, StopBits::OnePointFive);
    }
}
