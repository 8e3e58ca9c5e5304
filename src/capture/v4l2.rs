//! V4L2 frame source.
//!
//! Opens local V4L2 devices by index (`/dev/video{N}`), negotiates a pixel
//! format the pipeline understands, and produces RGB frames. The frame rate
//! is requested from the driver; decoding and preview consume whatever the
//! device actually delivers.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{frame_from_raw, PixelFormat};
use super::{CameraProvider, CaptureSettings, CaptureStats, FrameSource};
use crate::frame::Frame;
use crate::ScanError;

/// Provider for local V4L2 capture devices.
pub struct V4l2Provider;

impl CameraProvider for V4l2Provider {
    fn open(&self, index: u32, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
        let camera = V4l2Camera::open(index, settings).map_err(|err| ScanError::DeviceUnavailable {
            index,
            reason: format!("{:#}", err),
        })?;
        Ok(Box::new(camera))
    }
}

/// One open V4L2 device.
pub struct V4l2Camera {
    index: u32,
    state: V4l2State,
    format: PixelFormat,
    active_width: u32,
    active_height: u32,
    frame_count: u64,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this>,
}

impl V4l2Camera {
    pub fn open(index: u32, settings: &CaptureSettings) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device =
            v4l::Device::new(index as usize).with_context(|| format!("open v4l2 device {}", index))?;

        let caps = device.query_caps().context("query v4l2 capabilities")?;
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(anyhow!("device {} is not a video capture device", index));
        }

        let mut format = device.format().context("read v4l2 format")?;
        format.width = settings.width;
        format.height = settings.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2Camera: failed to set format on {}: {}", index, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = if format.fourcc == v4l::FourCC::new(b"RGB3") {
            PixelFormat::Rgb24
        } else if format.fourcc == v4l::FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if format.fourcc == v4l::FourCC::new(b"MJPG") {
            PixelFormat::Mjpeg
        } else {
            return Err(anyhow!(
                "device {} negotiated unsupported pixel format {}",
                index,
                format.fourcc
            ));
        };

        if settings.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(settings.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Camera: failed to set fps on {}: {}", index, err);
            }
        }

        let active_width = format.width;
        let active_height = format.height;

        let state = V4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Camera: opened index {} ({}x{}, {:?})",
            index,
            active_width,
            active_height,
            pixel_format
        );

        Ok(Self {
            index,
            state,
            format: pixel_format,
            active_width,
            active_height,
            frame_count: 0,
        })
    }
}

impl FrameSource for V4l2Camera {
    fn index(&self) -> u32 {
        self.index
    }

    fn read_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (buf, _meta) = self
            .state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                anyhow::Error::from(ScanError::ReadFailure {
                    reason: err.to_string(),
                })
            })?;

        let frame = frame_from_raw(buf, self.active_width, self.active_height, self.format)?;

        self.frame_count += 1;
        Ok(frame)
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: format!("/dev/video{}", self.index),
        }
    }

    fn close(self: Box<Self>) {
        log::info!("V4l2Camera: closed index {}", self.index);
        drop(self);
    }
}
