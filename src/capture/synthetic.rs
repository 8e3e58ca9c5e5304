//! Synthetic frame source.
//!
//! Generates deterministic frames without hardware. Used by tests and by the
//! `synthetic` source configuration for running the app on machines with no
//! camera attached.

use anyhow::Result;

use super::{CameraProvider, CaptureSettings, CaptureStats, FrameSource};
use crate::frame::Frame;
use crate::ScanError;

/// Provider over a fixed set of "attached" device indices.
pub struct SyntheticProvider {
    available: Vec<u32>,
}

impl SyntheticProvider {
    pub fn new(available: Vec<u32>) -> Self {
        Self { available }
    }
}

impl CameraProvider for SyntheticProvider {
    fn open(&self, index: u32, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
        if !self.available.contains(&index) {
            return Err(ScanError::DeviceUnavailable {
                index,
                reason: "no such synthetic device".to_string(),
            }
            .into());
        }
        log::info!("SyntheticCamera: opened index {}", index);
        Ok(Box::new(SyntheticCamera::new(index, settings.clone())))
    }
}

/// Frame source producing a drifting gradient pattern.
pub struct SyntheticCamera {
    index: u32,
    settings: CaptureSettings,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new(index: u32, settings: CaptureSettings) -> Self {
        Self {
            index,
            settings,
            frame_count: 0,
        }
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let len = (self.settings.width * self.settings.height * 3) as usize;
        let mut pixels = vec![0u8; len];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            // Drift the gradient with the frame counter so consecutive
            // frames differ.
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticCamera {
    fn index(&self) -> u32 {
        self.index
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        Frame::from_rgb(
            self.generate_pixels(),
            self.settings.width,
            self.settings.height,
        )
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: format!("synthetic:{}", self.index),
        }
    }

    fn close(self: Box<Self>) {
        log::info!("SyntheticCamera: closed index {}", self.index);
    }
}
