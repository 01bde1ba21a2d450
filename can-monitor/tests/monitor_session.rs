// End-to-end behaviour of a monitor session through the public API
use can_monitor::protocol;
use can_monitor::{
    ConnectionStatus, Frame, IdentityKey, Monitor, MonitorConfig, SortOrder, SourceEvent,
    TableMode,
};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_frames() -> Vec<Frame> {
    vec![
        Frame::new(0x123, 1.0),
        Frame::new(0x456, 1.2),
        Frame::new(0x123, 1.5),
    ]
}

/// Deterministic pseudo-random stream over a handful of identities
fn interleaved_stream(count: usize) -> Vec<Frame> {
    let mut state: u32 = 0x2545_F491;
    (0..count)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let mut frame = Frame::new(0x100 + (state % 7), i as f64 * 0.001);
            if state % 11 == 0 {
                frame = frame.extended();
            }
            frame
        })
        .collect()
}

fn feed(monitor: &mut Monitor, frames: Vec<Frame>, now: Instant) {
    for frame in frames {
        monitor.push_frame(frame, now);
    }
    monitor.flush();
}

#[test]
fn coalescing_example_table() {
    init_logging();
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();
    feed(&mut monitor, sample_frames(), Instant::now());

    let rows = monitor.table().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].frame.arbitration_id, 0x123);
    assert_eq!(rows[0].timestamp(), 1.5);
    assert!((rows[0].delta_time - 0.5).abs() < 1e-9);
    assert_eq!(rows[1].frame.arbitration_id, 0x456);
    assert_eq!(rows[1].timestamp(), 1.2);
    assert_eq!(rows[1].delta_time, 0.0);
}

#[test]
fn log_mode_example_table() {
    let config = MonitorConfig::new().with_mode(TableMode::Log);
    let mut monitor = Monitor::new(config).unwrap();
    feed(&mut monitor, sample_frames(), Instant::now());

    let deltas: Vec<f64> = monitor.table().iter().map(|r| r.delta_time).collect();
    assert_eq!(deltas.len(), 3);
    assert_eq!(&deltas[..2], &[0.0, 0.0]);
    assert!((deltas[2] - 0.5).abs() < 1e-9);
}

#[test]
fn coalescing_keeps_one_row_per_identity() {
    let t0 = Instant::now();
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();
    let frames = interleaved_stream(500);
    let identities: HashSet<IdentityKey> = frames.iter().map(Frame::identity_key).collect();

    // Several flush boundaries, each checked
    for (i, chunk) in frames.chunks(60).enumerate() {
        let now = t0 + Duration::from_millis(i as u64 * 30);
        for frame in chunk {
            monitor.push_frame(frame.clone(), now);
        }
        monitor.poll(now + Duration::from_millis(100));

        let mut seen = HashSet::new();
        for row in monitor.table() {
            assert!(seen.insert(row.identity_key()), "duplicate row for {}", row.identity_key());
        }
    }
    monitor.flush();
    assert_eq!(monitor.table().len(), identities.len());
}

#[test]
fn live_rows_carry_latest_frame_and_delta() {
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();
    let frames = interleaved_stream(300);

    let mut last: HashMap<IdentityKey, f64> = HashMap::new();
    let mut prev: HashMap<IdentityKey, f64> = HashMap::new();
    for frame in &frames {
        if let Some(ts) = last.insert(frame.identity_key(), frame.timestamp) {
            prev.insert(frame.identity_key(), ts);
        }
    }
    feed(&mut monitor, frames, Instant::now());

    for row in monitor.table() {
        let key = row.identity_key();
        assert_eq!(row.timestamp(), last[&key]);
        let expected = prev.get(&key).map(|p| last[&key] - p).unwrap_or(0.0);
        assert!((row.delta_time - expected).abs() < 1e-9);
    }
}

#[test]
fn log_mode_grows_by_frame_count() {
    let t0 = Instant::now();
    let config = MonitorConfig::new().with_mode(TableMode::Log);
    let mut monitor = Monitor::new(config).unwrap();

    let mut expected = 0;
    for (i, chunk) in interleaved_stream(400).chunks(37).enumerate() {
        expected += chunk.len();
        feed(&mut monitor, chunk.to_vec(), t0 + Duration::from_millis(i as u64));
        assert_eq!(monitor.table().len(), expected);
    }
    assert_eq!(monitor.stats().frames_reconciled, 400);
}

#[test]
fn mode_toggle_applies_prospectively() {
    let now = Instant::now();
    let mut monitor = Monitor::new(MonitorConfig::new().with_mode(TableMode::Log)).unwrap();
    feed(
        &mut monitor,
        vec![Frame::new(0x1, 1.0), Frame::new(0x1, 2.0), Frame::new(0x1, 3.0)],
        now,
    );
    assert_eq!(monitor.table().len(), 3);

    monitor.set_mode(TableMode::Coalescing);
    assert_eq!(monitor.table().len(), 3);
    feed(&mut monitor, vec![Frame::new(0x1, 3.5)], now);
    assert_eq!(monitor.table().len(), 3);
    assert_eq!(monitor.table().rows()[2].timestamp(), 3.5);

    monitor.set_mode(TableMode::Log);
    feed(&mut monitor, vec![Frame::new(0x1, 4.0)], now);
    assert_eq!(monitor.table().len(), 4);
}

#[test]
fn flush_count_is_bounded_under_sustained_load() {
    let t0 = Instant::now();
    let window_ms = 50;
    let duration_ms = 2_000u64;
    let mut monitor = Monitor::new(MonitorConfig::new().with_window_ms(window_ms)).unwrap();

    let flushes = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&flushes);
    monitor.subscribe(move |_| counter.set(counter.get() + 1));

    // Ten frames per millisecond, driven the way an event loop would
    for tick in 0..duration_ms {
        let now = t0 + Duration::from_millis(tick);
        monitor.poll(now);
        for n in 0..10u32 {
            monitor.push_frame(Frame::new(n, tick as f64 / 1000.0), now);
        }
    }
    monitor.poll(t0 + Duration::from_millis(duration_ms + window_ms));

    let bound = duration_ms.div_ceil(window_ms) + 1;
    assert!(flushes.get() <= bound, "{} flushes > {}", flushes.get(), bound);
    assert_eq!(monitor.pending(), 0);
    assert_eq!(monitor.stats().frames_reconciled, duration_ms * 10);
    assert_eq!(monitor.table().len(), 10);
}

#[test]
fn sorting_is_a_view_only_operation() {
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();
    feed(
        &mut monitor,
        vec![
            Frame::new(0x300, 3.0),
            Frame::new(0x100, 1.0),
            Frame::new(0x200, 0.5),
        ],
        Instant::now(),
    );

    let by_id: Vec<u32> = monitor
        .snapshot(SortOrder::Id)
        .iter()
        .map(|r| r.frame.arbitration_id)
        .collect();
    assert_eq!(by_id, vec![0x100, 0x200, 0x300]);

    let by_time: Vec<u32> = monitor
        .snapshot(SortOrder::Time)
        .iter()
        .map(|r| r.frame.arbitration_id)
        .collect();
    assert_eq!(by_time, vec![0x200, 0x100, 0x300]);

    // Reconciliation still targets the original positions
    feed(&mut monitor, vec![Frame::new(0x100, 4.0)], Instant::now());
    assert_eq!(monitor.table().rows()[1].frame.arbitration_id, 0x100);
    assert_eq!(monitor.table().rows()[1].timestamp(), 4.0);
}

#[test]
fn remote_protocol_stream_drives_session() {
    init_logging();
    let now = Instant::now();
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();

    let lines = [
        r#"{"type": "bus_response", "payload": {"channel_info": "Virtual bus"}}"#,
        r#"{"type": "message", "payload": {"timestamp": 10.0, "arbitration_id": 291, "data": [255, 254, 253]}}"#,
        r#"{"type": "message", "payload": {"timestamp": 10.005, "arbitration_id": 291, "data": [255, 254, 253]}}"#,
        r#"{"type": "message", "payload": {"timestamp": 10.01, "arbitration_id": 1775, "is_remote_frame": true, "dlc": 8}}"#,
        r#"{"type": "error", "payload": "Bus off"}"#,
        r#"{"type": "message", "payload": {"timestamp": 10.02, "arbitration_id": 1110, "data": [1]}}"#,
    ];
    for line in lines {
        let event = protocol::decode_text(line).unwrap();
        if let Some(event) = event.into_source_event("tcp://127.0.0.1:54701") {
            monitor.handle_event(event, now);
        }
    }
    monitor.flush();

    assert_eq!(monitor.table().len(), 2);
    let row = &monitor.table().rows()[0];
    assert!((row.delta_time - 0.005).abs() < 1e-9);
    assert!(monitor.table().rows()[1].frame.is_remote_frame);
    assert_eq!(
        monitor.status(),
        &ConnectionStatus::Failed {
            error: "Bus off".to_string()
        }
    );
    assert_eq!(monitor.stats().frames_rejected, 1);
}

#[test]
fn bus_response_after_messages_keeps_rows() {
    let now = Instant::now();
    let endpoint = "tcp://127.0.0.1:54701";
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();
    monitor.handle_event(
        SourceEvent::Connected {
            channel_info: endpoint.to_string(),
        },
        now,
    );

    let lines = [
        r#"{"type": "message", "payload": {"timestamp": 1.0, "arbitration_id": 291}}"#,
        r#"{"type": "bus_response", "payload": {"channel_info": "Virtual bus"}}"#,
        r#"{"type": "message", "payload": {"timestamp": 1.1, "arbitration_id": 292}}"#,
    ];
    for line in lines {
        let event = protocol::decode_text(line).unwrap();
        if let Some(event) = event.into_source_event(endpoint) {
            monitor.handle_event(event, now);
        }
    }
    monitor.flush();

    assert_eq!(monitor.table().len(), 2);
    assert_eq!(
        monitor.status().to_string(),
        "Connected to Virtual bus on tcp://127.0.0.1:54701"
    );
}

#[test]
fn binary_frames_feed_the_same_table() {
    let now = Instant::now();
    let mut monitor = Monitor::new(MonitorConfig::new()).unwrap();

    let frames = [
        Frame::new(0xABCDEF, 1.0).extended().error_frame(),
        Frame::new(0xABCDEF, 1.25).extended().error_frame(),
    ];
    for frame in frames {
        let buf = protocol::encode_binary(&frame).unwrap();
        let decoded = protocol::decode_binary(&buf).unwrap().unwrap();
        monitor.handle_event(SourceEvent::Frame(decoded), now);
    }
    monitor.flush();

    assert_eq!(monitor.table().len(), 1);
    assert_eq!(monitor.table().rows()[0].delta_time, 0.25);
}
