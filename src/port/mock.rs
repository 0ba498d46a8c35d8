//! Mock transport for tests.
//!
//! Simulates a serial device without hardware: scripted read queues, a write
//! log, optional echo (loopback) wiring, a per-call write cap for exercising
//! the partial-write loop, and timeout injection.

use super::error::PortError;
use super::traits::{PortConfig, SerialTransport, TransportOpener};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct MockState {
    /// Bytes the next reads will return.
    read_queue: VecDeque<u8>,
    /// Every write the session performed, one entry per transport call.
    write_log: Vec<Vec<u8>>,
    /// Writes that must occur, in order.
    expected_writes: VecDeque<Vec<u8>>,
    /// Route written bytes back into the read queue.
    echo: bool,
    /// Accept at most this many bytes per write call.
    write_limit: Option<usize>,
    /// Force the next read to time out even if data is queued.
    should_timeout: bool,
    timeout: Duration,
    flushed: bool,
    /// Configurations applied after open, newest last.
    applied: Vec<PortConfig>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            read_queue: VecDeque::new(),
            write_log: Vec::new(),
            expected_writes: VecDeque::new(),
            echo: false,
            write_limit: None,
            should_timeout: false,
            timeout: Duration::from_millis(500),
            flushed: false,
            applied: Vec::new(),
        }
    }
}

/// Mock serial transport.
///
/// Clones share state, so a test can keep one handle while the bridge owns
/// the other and inspect traffic after the port is closed.
///
/// # Example
/// ```
/// use serial_bridge::{MockTransport, SerialTransport};
///
/// let mut port = MockTransport::new("MOCK0");
/// port.enqueue_read(b"pong");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"pong");
///
/// port.write_bytes(b"ping").unwrap();
/// assert_eq!(port.write_log(), vec![b"ping".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a mock port that loops written bytes back to its reader.
    pub fn echo(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.state.lock().unwrap().echo = true;
        port
    }

    /// Queue bytes for subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().unwrap().read_queue.extend(data);
    }

    /// Cap how many bytes each write call accepts.
    pub fn set_write_limit(&self, limit: usize) {
        self.state.lock().unwrap().write_limit = Some(limit);
    }

    /// Force the next read to time out.
    pub fn set_should_timeout(&self, should_timeout: bool) {
        self.state.lock().unwrap().should_timeout = should_timeout;
    }

    /// Expect that `data` will be written (checked per transport call).
    pub fn expect_write(&self, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .expected_writes
            .push_back(data.to_vec());
    }

    /// Verify all expected writes occurred, in order.
    pub fn verify_expectations(&self) -> Result<(), String> {
        let state = self.state.lock().unwrap();
        if !state.expected_writes.is_empty() {
            return Err(format!(
                "expected {} more write(s), but none occurred",
                state.expected_writes.len()
            ));
        }
        Ok(())
    }

    /// Every write call the transport saw, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().write_log.clone()
    }

    /// All written bytes joined into one stream.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().write_log.concat()
    }

    /// Whether `flush` has been called since the last write.
    pub fn was_flushed(&self) -> bool {
        self.state.lock().unwrap().flushed
    }

    /// Configurations applied after open, newest last.
    pub fn applied_configs(&self) -> Vec<PortConfig> {
        self.state.lock().unwrap().applied.clone()
    }

    /// Bytes currently queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().unwrap().read_queue.len()
    }
}

impl SerialTransport for MockTransport {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock().unwrap();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }

        let mut bytes_read = 0;
        for slot in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !buffer.is_empty() {
            return Err(PortError::timeout(state.timeout));
        }
        Ok(bytes_read)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock().unwrap();

        let accepted = match state.write_limit {
            Some(limit) => data.len().min(limit),
            None => data.len(),
        };
        let chunk = &data[..accepted];

        state.write_log.push(chunk.to_vec());
        state.flushed = false;

        if let Some(expected) = state.expected_writes.pop_front() {
            if expected != chunk {
                return Err(PortError::Io(std::io::Error::other(format!(
                    "expected write {:?}, got {:?}",
                    expected, chunk
                ))));
            }
        }

        if state.echo {
            let echoed: Vec<u8> = chunk.to_vec();
            state.read_queue.extend(echoed);
        }

        Ok(accepted)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().unwrap().timeout = timeout;
        Ok(())
    }

    fn apply(&mut self, config: &PortConfig) -> Result<(), PortError> {
        config.validate()?;
        let mut state = self.state.lock().unwrap();
        state.timeout = config.timeout;
        state.applied.push(config.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.state.lock().unwrap().flushed = true;
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.state.lock().unwrap().read_queue.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[derive(Default)]
struct OpenerState {
    /// Transports handed out for paths opened so far (or pre-registered).
    ports: HashMap<String, MockTransport>,
    echo: bool,
    write_limit: Option<usize>,
    /// Reject paths not pre-registered with NotFound.
    strict: bool,
}

/// Opener backing a bridge with mock transports.
///
/// Unknown paths get a fresh transport on demand (strict mode rejects them
/// with `NotFound` instead). Clones share state, so tests keep a handle on
/// the opener to inspect traffic on any path the bridge opened.
#[derive(Clone, Default)]
pub struct MockOpener {
    state: Arc<Mutex<OpenerState>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transports this opener creates echo writes back to their reader.
    pub fn echoing() -> Self {
        let opener = Self::default();
        opener.state.lock().unwrap().echo = true;
        opener
    }

    /// Reject paths that were not pre-registered.
    pub fn strict() -> Self {
        let opener = Self::default();
        opener.state.lock().unwrap().strict = true;
        opener
    }

    /// Pre-register a transport for a path.
    pub fn register(&self, path: impl Into<String>, transport: MockTransport) {
        self.state.lock().unwrap().ports.insert(path.into(), transport);
    }

    /// Cap per-call write acceptance on every transport created from now on.
    pub fn set_write_limit(&self, limit: usize) {
        self.state.lock().unwrap().write_limit = Some(limit);
    }

    /// The transport serving `path`, if it was ever opened or registered.
    pub fn transport(&self, path: &str) -> Option<MockTransport> {
        self.state.lock().unwrap().ports.get(path).cloned()
    }
}

impl TransportOpener for MockOpener {
    fn open(&self, path: &str, config: &PortConfig) -> Result<Box<dyn SerialTransport>, PortError> {
        let mut state = self.state.lock().unwrap();

        let transport = match state.ports.get(path) {
            Some(existing) => existing.clone(),
            None if state.strict => return Err(PortError::not_found(path)),
            None => {
                let transport = if state.echo {
                    MockTransport::echo(path)
                } else {
                    MockTransport::new(path)
                };
                if let Some(limit) = state.write_limit {
                    transport.set_write_limit(limit);
                }
                state.ports.insert(path.to_string(), transport.clone());
                transport
            }
        };

        let mut boxed = Box::new(transport);
        boxed.apply(config)?;
        Ok(boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockTransport::new("MOCK0");
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_empty_read_times_out() {
        let mut port = MockTransport::new("MOCK0");
        let mut buffer = [0u8; 10];
        assert!(matches!(
            port.read_bytes(&mut buffer),
            Err(PortError::TimedOut(_))
        ));
    }

    #[test]
    fn test_echo_round_trip() {
        let mut port = MockTransport::echo("MOCK0");
        port.write_bytes(b"Kx").unwrap();

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Kx");
    }

    #[test]
    fn test_write_limit_shortens_writes() {
        let mut port = MockTransport::new("MOCK0");
        port.set_write_limit(1);

        let n = port.write_bytes(b"abc").unwrap();
        assert_eq!(n, 1);
        assert_eq!(port.write_log(), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_expectations() {
        let mut port = MockTransport::new("MOCK0");
        port.expect_write(b"ATZ");
        port.write_bytes(b"ATZ").unwrap();
        assert!(port.verify_expectations().is_ok());
    }

    #[test]
    fn test_expectation_mismatch() {
        let mut port = MockTransport::new("MOCK0");
        port.expect_write(b"ATZ");
        assert!(port.write_bytes(b"AT").is_err());
    }

    #[test]
    fn test_timeout_injection() {
        let mut port = MockTransport::new("MOCK0");
        port.enqueue_read(b"data");
        port.set_should_timeout(true);

        let mut buffer = [0u8; 10];
        assert!(matches!(
            port.read_bytes(&mut buffer),
            Err(PortError::TimedOut(_))
        ));

        // The flag is one-shot; the queued data is still there.
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"data");
    }

    #[test]
    fn test_opener_reuses_transport_per_path() {
        let opener = MockOpener::new();
        let config = PortConfig::default();

        opener.open("/mock/ttyA", &config).unwrap();
        let first = opener.transport("/mock/ttyA").unwrap();
        first.enqueue_read(b"x");

        let mut second = opener.open("/mock/ttyA", &config).unwrap();
        let mut buffer = [0u8; 4];
        assert_eq!(second.read_bytes(&mut buffer).unwrap(), 1);
    }

    #[test]
    fn test_strict_opener_rejects_unknown_paths() {
        let opener = MockOpener::strict();
        let result = opener.open("/mock/ghost", &PortConfig::default());
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[test]
    fn test_opener_records_applied_config() {
        let opener = MockOpener::new();
        let config = PortConfig {
            baud_rate: 115_200,
            ..PortConfig::default()
        };
        opener.open("/mock/ttyA", &config).unwrap();

        let transport = opener.transport("/mock/ttyA").unwrap();
        assert_eq!(transport.applied_configs(), vec![config]);
    }
}
