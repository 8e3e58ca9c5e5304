//! scanrelay
//!
//! Continuous camera QR scanner. Captures frames from a local camera,
//! decodes QR symbols in each frame, and relays newly-seen payloads as
//! JSON lines on stdout while showing a live preview window.
//!
//! # Architecture
//!
//! One cooperative loop drives everything; a single iteration is:
//!
//! 1. apply any pending camera switch (close old handle, open new one)
//! 2. read one frame from the active source
//! 3. decode symbols in the frame
//! 4. ask the repeat suppressor which payloads are reportable
//! 5. emit approved payloads as `{"result": ...}` records
//! 6. hand the frame to the preview for rendering
//!
//! # Module Structure
//!
//! - `capture`: frame sources (V4L2 devices, synthetic) and the enumerator
//! - `frame`: the owned RGB frame type
//! - `decode`: symbol decoding over a luma view of the frame
//! - `suppress`: repeat-suppression cooldown state
//! - `emit`: structured record sink (stdout JSON lines)
//! - `session`: the scan session driving one iteration per tick
//! - `config`: file + environment configuration
//! - `app`: egui preview window (feature `gui`)

pub mod capture;
pub mod config;
pub mod decode;
pub mod emit;
pub mod frame;
pub mod session;
pub mod suppress;

#[cfg(feature = "gui")]
pub mod app;

pub use capture::synthetic::{SyntheticCamera, SyntheticProvider};
#[cfg(feature = "capture-v4l2")]
pub use capture::v4l2::{V4l2Camera, V4l2Provider};
pub use capture::{CameraProvider, CaptureSettings, CaptureStats, FrameSource};
pub use config::{ScanConfig, SourceKind};
pub use decode::{qr::QrDecoder, Corner, DecodedSymbol, SymbolDecoder};
pub use emit::{JsonLineSink, MemorySink, RecordSink, ScanRecord};
pub use frame::Frame;
pub use session::{FrameReport, ScanSession, SessionOptions, TickOutcome, READ_RETRY_DELAY};
pub use suppress::RepeatSuppressor;

/// Errors with loop-level handling policies attached to them.
///
/// Everything else in the crate flows as `anyhow::Error` with context; these
/// variants exist because the session reacts to each one differently
/// (terminate, fall back, back off).
#[derive(Debug)]
pub enum ScanError {
    /// Enumeration found zero usable devices. Fatal, startup only.
    NoCameraAvailable,
    /// A device could not be opened. Recoverable: fall back to a
    /// previously-known-good index.
    DeviceUnavailable { index: u32, reason: String },
    /// A single frame read failed. Recoverable: back off briefly and retry.
    ReadFailure { reason: String },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::NoCameraAvailable => write!(f, "No cameras available"),
            ScanError::DeviceUnavailable { index, reason } => {
                write!(f, "failed to open camera {}: {}", index, reason)
            }
            ScanError::ReadFailure { reason } => {
                write!(f, "frame read failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for ScanError {}
