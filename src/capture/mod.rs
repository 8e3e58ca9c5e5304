//! Frame capture sources.
//!
//! This module provides the sources that produce frames for the scan loop:
//! - V4L2 devices addressed by index (feature: capture-v4l2)
//! - Synthetic sources (testing, hardware-free runs)
//!
//! A provider opens sources by device index and doubles as the camera
//! enumerator: probing attempts to open each index in a bounded range and
//! releases it immediately, keeping the indices that opened.
//!
//! Capture invariants:
//! - At most one source handle is open at a time; callers close the old
//!   handle before opening another index.
//! - A source never retains frames; each read hands ownership to the caller.

use anyhow::Result;

use crate::frame::Frame;

#[cfg(feature = "capture-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "capture-v4l2")]
pub mod v4l2;

/// Capture parameters shared by all backends.
///
/// Width/height are requests; a device may negotiate something else, and the
/// frames report their actual dimensions.
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    /// Target frame rate. Sources decimate to this rate.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Counters for one open source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

/// One open capture handle, bound to a device index.
pub trait FrameSource {
    /// The device index this source is bound to.
    fn index(&self) -> u32;

    /// Read the next available frame. A failure is transient: the caller
    /// backs off briefly and retries, it never tears the loop down.
    fn read_frame(&mut self) -> Result<Frame>;

    fn stats(&self) -> CaptureStats;

    /// Release the device. Consuming the box makes a double close
    /// unrepresentable.
    fn close(self: Box<Self>);
}

/// Opens frame sources by device index.
pub trait CameraProvider {
    /// Acquire exclusive access to a device. Fails when the device cannot
    /// be opened; the caller falls back to a previously-known-good index.
    fn open(&self, index: u32, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>>;

    /// Probe indices `0..limit`: attempt to open each and release it
    /// immediately, returning the indices that opened, in ascending order.
    fn probe(&self, limit: u32, settings: &CaptureSettings) -> Vec<u32> {
        let mut found = Vec::new();
        for index in 0..limit {
            match self.open(index, settings) {
                Ok(source) => {
                    source.close();
                    found.push(index);
                }
                Err(err) => {
                    log::debug!("probe: camera {} unavailable: {:#}", index, err);
                }
            }
        }
        found
    }
}
