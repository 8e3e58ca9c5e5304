//! Session-level behavior over scripted sources and decoders: emission
//! policy, camera switching, and read-failure handling, all without
//! hardware.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use scanrelay::{
    CameraProvider, CaptureSettings, CaptureStats, DecodedSymbol, Frame, FrameSource, MemorySink,
    ScanRecord, ScanSession, SessionOptions, SymbolDecoder, TickOutcome,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum DeviceEvent {
    Opened(u32),
    Closed(u32),
}

#[derive(Clone, Default)]
struct EventLog(Rc<RefCell<Vec<DeviceEvent>>>);

impl EventLog {
    fn push(&self, event: DeviceEvent) {
        self.0.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<DeviceEvent> {
        self.0.borrow().clone()
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

struct ScriptedProvider {
    available: Vec<u32>,
    log: EventLog,
    /// Read numbers (1-based, per source) that fail.
    failing_reads: Vec<u64>,
}

impl ScriptedProvider {
    fn new(available: Vec<u32>, log: EventLog) -> Self {
        Self {
            available,
            log,
            failing_reads: Vec::new(),
        }
    }

    fn with_failing_reads(mut self, reads: Vec<u64>) -> Self {
        self.failing_reads = reads;
        self
    }
}

impl CameraProvider for ScriptedProvider {
    fn open(&self, index: u32, _settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
        if !self.available.contains(&index) {
            return Err(anyhow!("failed to open camera {}: no such device", index));
        }
        self.log.push(DeviceEvent::Opened(index));
        Ok(Box::new(ScriptedSource {
            index,
            log: self.log.clone(),
            failing_reads: self.failing_reads.clone(),
            reads: 0,
        }))
    }
}

struct ScriptedSource {
    index: u32,
    log: EventLog,
    failing_reads: Vec<u64>,
    reads: u64,
}

impl FrameSource for ScriptedSource {
    fn index(&self) -> u32 {
        self.index
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.reads += 1;
        if self.failing_reads.contains(&self.reads) {
            return Err(anyhow!("sensor stall"));
        }
        Frame::from_rgb(vec![0u8; 8 * 8 * 3], 8, 8)
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.reads,
            device: format!("scripted:{}", self.index),
        }
    }

    fn close(self: Box<Self>) {
        self.log.push(DeviceEvent::Closed(self.index));
    }
}

/// Decoder returning one scripted payload list per frame, then nothing.
#[derive(Default)]
struct ScriptedDecoder {
    queue: VecDeque<Vec<String>>,
}

impl ScriptedDecoder {
    fn with_frames(frames: &[&[&str]]) -> Self {
        Self {
            queue: frames
                .iter()
                .map(|frame| frame.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn decode(&mut self, _luma: &[u8], _width: u32, _height: u32) -> Result<Vec<DecodedSymbol>> {
        Ok(self
            .queue
            .pop_front()
            .unwrap_or_default()
            .into_iter()
            .map(|text| DecodedSymbol {
                text,
                corners: None,
            })
            .collect())
    }
}

fn options(cooldown_secs: u64) -> SessionOptions {
    SessionOptions {
        cooldown: Duration::from_secs(cooldown_secs),
        ..SessionOptions::default()
    }
}

fn start_session(
    provider: ScriptedProvider,
    decoder: ScriptedDecoder,
    sink: &MemorySink,
    opts: SessionOptions,
) -> Result<ScanSession> {
    ScanSession::start(
        Box::new(provider),
        Box::new(decoder),
        Box::new(sink.clone()),
        opts,
    )
}

fn results(sink: &MemorySink) -> Vec<String> {
    sink.records()
        .into_iter()
        .filter_map(|record| match record {
            ScanRecord::Result(text) => Some(text),
            _ => None,
        })
        .collect()
}

#[test]
fn startup_emits_the_enumeration_info_record() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let _session = start_session(
        ScriptedProvider::new(vec![0, 1], log),
        ScriptedDecoder::default(),
        &sink,
        options(20),
    )?;

    assert_eq!(
        sink.records()[0],
        ScanRecord::Info("cameras: [0, 1]".to_string())
    );
    Ok(())
}

#[test]
fn zero_cameras_is_fatal_with_exactly_one_error_record() {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let err = start_session(
        ScriptedProvider::new(vec![], log),
        ScriptedDecoder::default(),
        &sink,
        options(20),
    )
    .err()
    .expect("startup must fail");

    assert_eq!(err.to_string(), "No cameras available");
    assert_eq!(
        sink.records(),
        vec![ScanRecord::Error("No cameras available".to_string())]
    );
}

#[test]
fn differing_payloads_both_emit_within_the_cooldown() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0], log),
        ScriptedDecoder::with_frames(&[&["A"], &["B"]]),
        &sink,
        options(20),
    )?;

    let t0 = Instant::now();
    session.tick(t0);
    session.tick(t0 + Duration::from_secs(1));

    assert_eq!(results(&sink), vec!["A", "B"]);
    Ok(())
}

#[test]
fn repeated_payload_is_gated_by_the_cooldown() -> Result<()> {
    // cooldown 20s: "A"@0 emits, "A"@5 suppressed, "A"@21 emits again.
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0], log),
        ScriptedDecoder::with_frames(&[&["A"], &["A"], &["A"]]),
        &sink,
        options(20),
    )?;

    let t0 = Instant::now();
    session.tick(t0);
    session.tick(t0 + Duration::from_secs(5));
    session.tick(t0 + Duration::from_secs(21));

    assert_eq!(results(&sink), vec!["A", "A"]);
    Ok(())
}

#[test]
fn two_symbols_in_one_frame_both_emit() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0], log),
        ScriptedDecoder::with_frames(&[&["A", "B"]]),
        &sink,
        options(20),
    )?;

    match session.tick(Instant::now()) {
        TickOutcome::Frame(report) => {
            assert_eq!(report.symbols.len(), 2);
            assert_eq!(report.emitted, 2);
        }
        TickOutcome::ReadFailed => panic!("read should succeed"),
    }
    assert_eq!(results(&sink), vec!["A", "B"]);
    Ok(())
}

#[test]
fn switching_closes_the_old_handle_before_opening_the_new_one() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0, 1], log.clone()),
        ScriptedDecoder::default(),
        &sink,
        options(20),
    )?;
    log.clear();

    session.request_switch(1);
    session.tick(Instant::now());

    assert_eq!(
        log.events(),
        vec![DeviceEvent::Closed(0), DeviceEvent::Opened(1)]
    );
    assert_eq!(session.active_index(), Some(1));
    assert!(sink
        .records()
        .contains(&ScanRecord::Info("switched to camera 1".to_string())));
    Ok(())
}

#[test]
fn failed_switch_falls_back_to_the_previous_index() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0, 1], log.clone()),
        ScriptedDecoder::default(),
        &sink,
        options(20),
    )?;
    log.clear();

    session.request_switch(7);
    session.tick(Instant::now());

    // Old handle released first, failed open of 7, fallback reopened 0.
    assert_eq!(
        log.events(),
        vec![DeviceEvent::Closed(0), DeviceEvent::Opened(0)]
    );
    assert_eq!(session.active_index(), Some(0));

    let records = sink.records();
    assert!(records
        .iter()
        .any(|r| matches!(r, ScanRecord::Error(msg) if msg.contains("camera 7"))));
    assert!(records.contains(&ScanRecord::Info("fell back to camera 0".to_string())));
    Ok(())
}

#[test]
fn read_failures_back_off_and_report_once_per_streak() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let provider = ScriptedProvider::new(vec![0], log).with_failing_reads(vec![1, 2]);
    let mut session = start_session(provider, ScriptedDecoder::default(), &sink, options(20))?;

    let t0 = Instant::now();
    assert!(matches!(session.tick(t0), TickOutcome::ReadFailed));
    assert!(matches!(
        session.tick(t0 + Duration::from_millis(100)),
        TickOutcome::ReadFailed
    ));
    assert!(matches!(
        session.tick(t0 + Duration::from_millis(200)),
        TickOutcome::Frame(_)
    ));

    let error_count = sink
        .records()
        .iter()
        .filter(|record| matches!(record, ScanRecord::Error(_)))
        .count();
    assert_eq!(error_count, 1);
    Ok(())
}

#[test]
fn read_failure_does_not_reset_suppression_state() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    // Second read fails; decoder scripts "A" for the two successful frames.
    let provider = ScriptedProvider::new(vec![0], log).with_failing_reads(vec![2]);
    let decoder = ScriptedDecoder::with_frames(&[&["A"], &["A"]]);
    let mut session = start_session(provider, decoder, &sink, options(20))?;

    let t0 = Instant::now();
    session.tick(t0);
    session.tick(t0 + Duration::from_secs(1)); // fails
    session.tick(t0 + Duration::from_secs(2)); // same payload, still cooling

    assert_eq!(results(&sink), vec!["A"]);
    Ok(())
}

#[test]
fn shutdown_closes_the_handle_exactly_once() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0], log.clone()),
        ScriptedDecoder::default(),
        &sink,
        options(20),
    )?;
    log.clear();

    session.shutdown();
    session.shutdown();
    drop(session);

    assert_eq!(log.events(), vec![DeviceEvent::Closed(0)]);
    Ok(())
}

#[test]
fn cooldown_remaining_is_clamped_for_display() -> Result<()> {
    let log = EventLog::default();
    let sink = MemorySink::new();
    let mut session = start_session(
        ScriptedProvider::new(vec![0], log),
        ScriptedDecoder::with_frames(&[&["A"]]),
        &sink,
        options(20),
    )?;

    let t0 = Instant::now();
    session.tick(t0);

    assert!(session.is_cooling(t0 + Duration::from_secs(5)));
    assert_eq!(
        session.cooldown_remaining(t0 + Duration::from_secs(5)),
        Duration::from_secs(15)
    );
    assert_eq!(
        session.cooldown_remaining(t0 + Duration::from_secs(60)),
        Duration::ZERO
    );
    Ok(())
}
