//! Owned frame type.
//!
//! A `Frame` is one captured image: an RGB24 pixel buffer plus its
//! dimensions. Frames are owned by the driving loop for the duration of one
//! iteration and are not retained across iterations; the preview uploads the
//! pixels to a texture and the frame is dropped.

use anyhow::{anyhow, Result};

/// One captured RGB24 image.
#[derive(Clone, Debug)]
pub struct Frame {
    rgb: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap an RGB24 buffer. Fails when the buffer length does not match
    /// `width * height * 3`.
    pub fn from_rgb(rgb: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))? as usize;
        if rgb.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                rgb.len()
            ));
        }
        Ok(Self { rgb, width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB24 pixels, row-major.
    pub fn as_rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// Grayscale view for the decoder (BT.601 luma, one byte per pixel).
    pub fn to_luma(&self) -> Vec<u8> {
        self.rgb
            .chunks_exact(3)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect()
    }
}
