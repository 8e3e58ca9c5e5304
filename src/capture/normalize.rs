//! Pixel-format normalization for captured buffers.
//!
//! Webcams negotiate one of a handful of formats; everything downstream
//! (decoder, preview) consumes RGB24. RGB3 passes through with a length
//! check, YUYV is converted in place, MJPG is decoded with the `image`
//! crate.

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}

pub(crate) fn frame_from_raw(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Frame> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = width
                .checked_mul(height)
                .and_then(|v| v.checked_mul(3))
                .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))? as usize;
            if pixels.len() != expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Frame::from_rgb(pixels.to_vec(), width, height)
        }
        PixelFormat::Yuyv => yuyv_to_frame(pixels, width, height),
        PixelFormat::Mjpeg => mjpeg_to_frame(pixels),
    }
}

fn yuyv_to_frame(pixels: &[u8], width: u32, height: u32) -> Result<Frame> {
    let w = width as usize;
    let h = height as usize;
    let expected = w
        .checked_mul(h)
        .and_then(|v| v.checked_mul(2))
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; w * h * 3];
    // Macropixels of two horizontal pixels sharing one U/V pair.
    for (pair_index, macro_px) in pixels.chunks_exact(4).enumerate() {
        let u = macro_px[1] as f32 - 128.0;
        let v = macro_px[3] as f32 - 128.0;
        for (sub, &y_raw) in [macro_px[0], macro_px[2]].iter().enumerate() {
            let y = y_raw as f32;
            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;

            let offset = (pair_index * 2 + sub) * 3;
            rgb[offset] = clamp_to_u8(r);
            rgb[offset + 1] = clamp_to_u8(g);
            rgb[offset + 2] = clamp_to_u8(b);
        }
    }

    Frame::from_rgb(rgb, width, height)
}

fn mjpeg_to_frame(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes).context("decode mjpeg frame")?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    // The decoded image carries its own dimensions; some devices pad or
    // crop relative to the negotiated format.
    Frame::from_rgb(rgb.into_raw(), width, height)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_conversion_produces_gray() -> Result<()> {
        // Y=128, U=V=128 is mid-gray in every pixel.
        let yuyv = vec![128u8; 2 * 2 * 2];
        let frame = frame_from_raw(&yuyv, 2, 2, PixelFormat::Yuyv)?;
        assert_eq!(frame.as_rgb(), &vec![128u8; 12][..]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_validates_length() {
        assert!(frame_from_raw(&[1u8; 9], 1, 3, PixelFormat::Rgb24).is_ok());
        assert!(frame_from_raw(&[1u8; 8], 1, 3, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn yuyv_validates_length() {
        assert!(frame_from_raw(&[0u8; 7], 2, 2, PixelFormat::Yuyv).is_err());
    }

    #[test]
    fn garbage_mjpeg_is_rejected() {
        assert!(frame_from_raw(&[0u8; 64], 8, 8, PixelFormat::Mjpeg).is_err());
    }
}
