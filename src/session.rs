//! Scan session.
//!
//! The session is the explicit context object behind the driving loop: the
//! open frame source, the enumerated cameras, the repeat-suppression state,
//! the pending camera switch, and the record sink. One `tick` performs one
//! loop iteration; the caller (the preview app, or a test) decides the
//! pacing.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::capture::{CameraProvider, CaptureSettings, CaptureStats, FrameSource};
use crate::decode::{DecodedSymbol, SymbolDecoder};
use crate::emit::{RecordSink, ScanRecord};
use crate::frame::Frame;
use crate::suppress::RepeatSuppressor;
use crate::ScanError;

/// Backoff before retrying after a failed frame read.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Startup parameters for a session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub settings: CaptureSettings,
    pub cooldown: Duration,
    pub probe_limit: u32,
    /// Preferred startup camera; the first enumerated index when unset.
    pub initial_index: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: CaptureSettings::default(),
            cooldown: Duration::from_secs(20),
            probe_limit: 10,
            initial_index: None,
        }
    }
}

/// Result of one loop iteration.
pub enum TickOutcome {
    /// A frame was read and processed; hand it to the presentation layer.
    Frame(FrameReport),
    /// The read failed; retry after [`READ_RETRY_DELAY`].
    ReadFailed,
}

pub struct FrameReport {
    pub frame: Frame,
    /// Symbols decoded in this frame, suppressed or not; the presentation
    /// layer outlines them.
    pub symbols: Vec<DecodedSymbol>,
    /// Payloads that passed suppression and were emitted.
    pub emitted: usize,
}

pub struct ScanSession {
    provider: Box<dyn CameraProvider>,
    settings: CaptureSettings,
    decoder: Box<dyn SymbolDecoder>,
    suppressor: RepeatSuppressor,
    sink: Box<dyn RecordSink>,
    source: Option<Box<dyn FrameSource>>,
    cameras: Vec<u32>,
    pending_switch: Option<u32>,
    read_failure_streak: bool,
    frames_processed: u64,
    payloads_emitted: u64,
    last_health_log: Instant,
}

impl ScanSession {
    /// Enumerate cameras and open the starting device.
    ///
    /// Zero enumerated cameras is the one fatal startup condition: exactly
    /// one `{"error": ...}` record is emitted and the error is returned
    /// without entering the loop.
    pub fn start(
        provider: Box<dyn CameraProvider>,
        decoder: Box<dyn SymbolDecoder>,
        mut sink: Box<dyn RecordSink>,
        options: SessionOptions,
    ) -> Result<Self> {
        let cameras = provider.probe(options.probe_limit, &options.settings);
        if cameras.is_empty() {
            sink.emit(&ScanRecord::Error(ScanError::NoCameraAvailable.to_string()))?;
            return Err(ScanError::NoCameraAvailable.into());
        }
        sink.emit(&ScanRecord::Info(format!("cameras: {:?}", cameras)))?;

        let start_index = match options.initial_index {
            Some(index) if cameras.contains(&index) => index,
            Some(index) => {
                log::warn!(
                    "configured camera {} did not enumerate, starting on {}",
                    index,
                    cameras[0]
                );
                cameras[0]
            }
            None => cameras[0],
        };

        let mut session = Self {
            provider,
            settings: options.settings,
            decoder,
            suppressor: RepeatSuppressor::new(options.cooldown),
            sink,
            source: None,
            cameras,
            pending_switch: None,
            read_failure_streak: false,
            frames_processed: 0,
            payloads_emitted: 0,
            last_health_log: Instant::now(),
        };

        match session.provider.open(start_index, &session.settings) {
            Ok(source) => session.source = Some(source),
            Err(err) => {
                session.emit_or_log(&ScanRecord::Error(format!("{:#}", err)));
                // The probe just saw this set, so a second failure here is
                // unusual; fall through to the first other index.
                let fallback = session.cameras.iter().copied().find(|&i| i != start_index);
                match fallback {
                    Some(index) => match session.provider.open(index, &session.settings) {
                        Ok(source) => {
                            session.emit_or_log(&ScanRecord::Info(format!(
                                "fell back to camera {}",
                                index
                            )));
                            session.source = Some(source);
                        }
                        Err(err) => {
                            session.emit_or_log(&ScanRecord::Error(format!("{:#}", err)));
                            return Err(err);
                        }
                    },
                    None => return Err(err),
                }
            }
        }

        Ok(session)
    }

    /// Ask for a camera switch; applied at the top of the next tick, never
    /// concurrently with a frame read.
    pub fn request_switch(&mut self, index: u32) {
        self.pending_switch = Some(index);
    }

    /// One loop iteration: apply a pending switch, read, decode, suppress,
    /// emit. Steady-state failures never propagate out of here.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(target) = self.pending_switch.take() {
            self.apply_switch(target);
        }

        let Some(source) = self.source.as_mut() else {
            self.reopen_any();
            return TickOutcome::ReadFailed;
        };

        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame read failed: {:#}", err);
                if !self.read_failure_streak {
                    // One record per failure streak; every occurrence is
                    // logged above.
                    self.read_failure_streak = true;
                    let record = ScanRecord::Error(
                        ScanError::ReadFailure {
                            reason: format!("{:#}", err),
                        }
                        .to_string(),
                    );
                    self.emit_or_log(&record);
                }
                return TickOutcome::ReadFailed;
            }
        };
        self.read_failure_streak = false;
        self.frames_processed += 1;

        let luma = frame.to_luma();
        let symbols = match self.decoder.decode(&luma, frame.width(), frame.height()) {
            Ok(symbols) => symbols,
            Err(err) => {
                log::warn!("decoder failed on frame: {:#}", err);
                Vec::new()
            }
        };

        let mut emitted = 0;
        for symbol in &symbols {
            if !self.suppressor.should_emit(&symbol.text, now) {
                continue;
            }
            self.suppressor.record(&symbol.text, now);
            self.emit_or_log(&ScanRecord::Result(symbol.text.clone()));
            emitted += 1;
            self.payloads_emitted += 1;
        }

        if now.saturating_duration_since(self.last_health_log) >= HEALTH_LOG_INTERVAL {
            if let Some(source) = &self.source {
                let stats = source.stats();
                log::info!(
                    "capture health: device={} frames={} emitted={}",
                    stats.device,
                    stats.frames_captured,
                    self.payloads_emitted
                );
            }
            self.last_health_log = now;
        }

        TickOutcome::Frame(FrameReport {
            frame,
            symbols,
            emitted,
        })
    }

    /// Close the old handle, then open the new index. On failure, fall back
    /// to the previously-active index, then the first enumerated one; the
    /// selector display follows `active_index`, so a fallback is visible to
    /// the user without extra plumbing.
    fn apply_switch(&mut self, target: u32) {
        let previous = match self.source.take() {
            Some(source) => {
                let index = source.index();
                if index == target {
                    self.source = Some(source);
                    return;
                }
                source.close();
                Some(index)
            }
            None => None,
        };

        match self.provider.open(target, &self.settings) {
            Ok(source) => {
                self.source = Some(source);
                self.emit_or_log(&ScanRecord::Info(format!("switched to camera {}", target)));
                return;
            }
            Err(err) => {
                self.emit_or_log(&ScanRecord::Error(format!("{:#}", err)));
            }
        }

        let mut fallbacks = Vec::new();
        fallbacks.extend(previous);
        if let Some(&first) = self.cameras.first() {
            fallbacks.push(first);
        }
        fallbacks.dedup();
        for index in fallbacks {
            if index == target || self.source.is_some() {
                continue;
            }
            match self.provider.open(index, &self.settings) {
                Ok(source) => {
                    self.source = Some(source);
                    self.emit_or_log(&ScanRecord::Info(format!("fell back to camera {}", index)));
                }
                Err(err) => {
                    self.emit_or_log(&ScanRecord::Error(format!("{:#}", err)));
                }
            }
        }
    }

    /// With no open source (every fallback failed), quietly retry the first
    /// known-good index once per tick. The failed opens already produced
    /// records; this path only logs.
    fn reopen_any(&mut self) {
        let Some(&first) = self.cameras.first() else {
            return;
        };
        match self.provider.open(first, &self.settings) {
            Ok(source) => {
                self.source = Some(source);
                self.emit_or_log(&ScanRecord::Info(format!("reopened camera {}", first)));
            }
            Err(err) => {
                log::warn!("reopen of camera {} failed: {:#}", first, err);
            }
        }
    }

    fn emit_or_log(&mut self, record: &ScanRecord) {
        if let Err(err) = self.sink.emit(record) {
            log::error!("record emission failed: {:#}", err);
        }
    }

    /// Release the device. Safe to call more than once; the handle closes
    /// exactly once.
    pub fn shutdown(&mut self) {
        if let Some(source) = self.source.take() {
            source.close();
        }
    }

    pub fn cameras(&self) -> &[u32] {
        &self.cameras
    }

    pub fn active_index(&self) -> Option<u32> {
        self.source.as_ref().map(|source| source.index())
    }

    pub fn capture_stats(&self) -> Option<CaptureStats> {
        self.source.as_ref().map(|source| source.stats())
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn payloads_emitted(&self) -> u64 {
        self.payloads_emitted
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.suppressor.remaining(now)
    }

    pub fn is_cooling(&self, now: Instant) -> bool {
        self.suppressor.is_cooling(now)
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.suppressor.last_payload()
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
