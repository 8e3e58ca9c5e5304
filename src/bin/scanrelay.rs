//! scanrelay - continuous QR scanner with live preview
//!
//! Startup sequence:
//! 1. Load configuration (defaults, optional JSON file, env overrides)
//! 2. Enumerate cameras; zero cameras is fatal and emits one error record
//! 3. Open the starting camera and emit the enumeration info record
//! 4. Run the preview window; each UI update drives one scan iteration
//!
//! Decoded payloads, informational messages, and errors are written to
//! stdout as JSON lines; logs go to stderr.

use anyhow::{anyhow, Result};

use scanrelay::app::{ScanApp, WINDOW_TITLE};
use scanrelay::{
    CameraProvider, JsonLineSink, QrDecoder, ScanConfig, ScanSession, SessionOptions,
    SourceKind, SyntheticProvider,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ScanConfig::load()?;
    log::info!(
        "scanrelay starting: source={:?} cooldown={}s probe_limit={}",
        cfg.source,
        cfg.cooldown.as_secs(),
        cfg.probe_limit
    );

    let provider: Box<dyn CameraProvider> = match cfg.source {
        #[cfg(feature = "capture-v4l2")]
        SourceKind::V4l2 => Box::new(scanrelay::V4l2Provider),
        #[cfg(not(feature = "capture-v4l2"))]
        SourceKind::V4l2 => {
            return Err(anyhow!("v4l2 capture support is not compiled in"));
        }
        SourceKind::Synthetic => Box::new(SyntheticProvider::new(vec![0])),
    };

    let options = SessionOptions {
        settings: cfg.capture.clone(),
        cooldown: cfg.cooldown,
        probe_limit: cfg.probe_limit,
        initial_index: cfg.initial_index,
    };

    let session = ScanSession::start(
        provider,
        Box::new(QrDecoder::new()),
        Box::new(JsonLineSink::stdout()),
        options,
    )?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([960.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(move |_cc| Ok(Box::new(ScanApp::new(session)))),
    )
    .map_err(|err| anyhow!("preview window failed: {}", err))
}
