//! camprobe - list usable camera indices
//!
//! Probes the configured index range the same way scanrelay does at startup
//! and prints the result in the same record shape, so a deployment can be
//! checked without opening a window.

use anyhow::Result;

use scanrelay::{
    CameraProvider, JsonLineSink, RecordSink, ScanConfig, ScanError, ScanRecord, V4l2Provider,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ScanConfig::load()?;
    let cameras = V4l2Provider.probe(cfg.probe_limit, &cfg.capture);

    let mut sink = JsonLineSink::stdout();
    if cameras.is_empty() {
        sink.emit(&ScanRecord::Error(ScanError::NoCameraAvailable.to_string()))?;
        return Err(ScanError::NoCameraAvailable.into());
    }
    sink.emit(&ScanRecord::Info(format!("cameras: {:?}", cameras)))?;
    Ok(())
}
