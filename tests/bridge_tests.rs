//! End-to-end tests of the bridge surface against the mock transport.

use pretty_assertions::assert_eq;
use serial_bridge::{MockOpener, PortConfig, PortError, SerialBridge, StopBits};
use std::time::Duration;

fn echo_bridge() -> (MockOpener, SerialBridge) {
    let opener = MockOpener::echoing();
    let bridge = SerialBridge::with_opener(Box::new(opener.clone()));
    (opener, bridge)
}

#[test]
fn full_exchange_round_trip() {
    let (_, bridge) = echo_bridge();

    let config = PortConfig {
        baud_rate: 9600,
        ..PortConfig::default()
    };
    let handle = bridge.open("/mock/ttyA", config).unwrap();
    assert_eq!(handle.id(), 1);

    assert_eq!(bridge.write(handle, b"Kx").unwrap(), 2);
    assert_eq!(bridge.read(handle, 64, None).unwrap(), b"Kx");

    bridge.close(handle);
    assert!(matches!(
        bridge.read(handle, 64, None),
        Err(PortError::InvalidHandle(_))
    ));
}

#[test]
fn close_is_idempotent() {
    let (_, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    bridge.close(handle);
    bridge.close(handle);
    bridge.close(handle);
    assert_eq!(bridge.open_count(), 0);
}

#[test]
fn handle_invalid_immediately_after_close() {
    let (_, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();
    bridge.write(handle, b"live").unwrap();

    bridge.close(handle);

    assert!(matches!(
        bridge.write(handle, b"dead"),
        Err(PortError::InvalidHandle(_))
    ));
    assert!(matches!(
        bridge.configure(handle, PortConfig::default()),
        Err(PortError::InvalidHandle(_))
    ));
}

#[test]
fn concurrent_opens_get_distinct_handles() {
    let (_, bridge) = echo_bridge();
    let bridge = std::sync::Arc::new(bridge);

    let mut threads = Vec::new();
    for i in 0..8 {
        let bridge = bridge.clone();
        threads.push(std::thread::spawn(move || {
            bridge.open_default(&format!("/mock/tty{i}")).unwrap()
        }));
    }

    let mut handles: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    handles.sort();
    handles.dedup();
    assert_eq!(handles.len(), 8);
    assert_eq!(bridge.open_count(), 8);
}

#[test]
fn partial_write_loop_reports_full_length() {
    let opener = MockOpener::new();
    opener.set_write_limit(1);
    let bridge = SerialBridge::with_opener(Box::new(opener.clone()));

    let handle = bridge.open_default("/mock/ttyA").unwrap();
    assert_eq!(bridge.write(handle, b"hello").unwrap(), 5);

    let transport = opener.transport("/mock/ttyA").unwrap();
    assert_eq!(transport.write_log().len(), 5);
    assert_eq!(transport.written(), b"hello");
}

#[test]
fn zero_timeout_read_times_out_instead_of_blocking() {
    let (_, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    let result = bridge.read(handle, 64, Some(Duration::ZERO));
    assert!(matches!(result, Err(PortError::TimedOut(_))));
}

#[test]
fn read_returns_queued_data_up_to_max() {
    let opener = MockOpener::new();
    let bridge = SerialBridge::with_opener(Box::new(opener.clone()));
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    opener
        .transport("/mock/ttyA")
        .unwrap()
        .enqueue_read(b"0123456789");

    assert_eq!(bridge.read(handle, 4, None).unwrap(), b"0123");
    assert_eq!(bridge.read(handle, 64, None).unwrap(), b"456789");
}

#[test]
fn handles_are_reused_only_after_close() {
    let (_, bridge) = echo_bridge();

    let a = bridge.open_default("/mock/ttyA").unwrap();
    let b = bridge.open_default("/mock/ttyB").unwrap();
    assert_eq!((a.id(), b.id()), (1, 2));

    bridge.close(a);
    let c = bridge.open_default("/mock/ttyC").unwrap();
    assert_eq!(c.id(), 1);

    let d = bridge.open_default("/mock/ttyD").unwrap();
    assert_eq!(d.id(), 3);
}

#[test]
fn open_on_unknown_path_is_not_found() {
    let opener = MockOpener::strict();
    opener.register("/mock/real", serial_bridge::MockTransport::new("/mock/real"));
    let bridge = SerialBridge::with_opener(Box::new(opener));

    assert!(matches!(
        bridge.open_default("/mock/ghost"),
        Err(PortError::NotFound(_))
    ));
    assert!(bridge.open_default("/mock/real").is_ok());
}

#[test]
fn configure_swaps_line_settings() {
    let (opener, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    let config = PortConfig {
        baud_rate: 115_200,
        stop_bits: StopBits::Two,
        timeout: Duration::from_millis(100),
        ..PortConfig::default()
    };
    bridge.configure(handle, config.clone()).unwrap();

    let status = bridge.status(handle).unwrap();
    assert_eq!(status.config, config);

    let applied = opener.transport("/mock/ttyA").unwrap().applied_configs();
    assert_eq!(applied.last(), Some(&config));
}

#[test]
fn status_counts_traffic_across_operations() {
    let (_, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    bridge.write(handle, b"Kx").unwrap();
    bridge.read(handle, 64, None).unwrap();
    bridge.write(handle, b"E").unwrap();
    bridge.read(handle, 64, None).unwrap();

    let status = bridge.status(handle).unwrap();
    assert_eq!(status.bytes_written_total, 3);
    assert_eq!(status.bytes_read_total, 3);
}

#[test]
fn traffic_is_inspectable_after_close() {
    let (opener, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    bridge.write(handle, b"shutdown").unwrap();
    bridge.close(handle);

    let transport = opener.transport("/mock/ttyA").unwrap();
    assert_eq!(transport.written(), b"shutdown");
    assert!(transport.was_flushed());
}

#[test]
fn status_serializes_for_reporting() {
    let (_, bridge) = echo_bridge();
    let handle = bridge.open_default("/mock/ttyA").unwrap();

    let status = bridge.status(handle).unwrap();
    let value = serde_json::to_value(&status).unwrap();
    assert_eq!(value["handle"], 1);
    assert_eq!(value["path"], "/mock/ttyA");
    assert_eq!(value["config"]["baud_rate"], 9600);
}
