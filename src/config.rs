//! Runtime configuration.
//!
//! Configuration is ambient, not contractual: everything has a working
//! default, an optional JSON file named by `SCANRELAY_CONFIG` overrides the
//! defaults, and a handful of environment variables override the file.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::CaptureSettings;

const DEFAULT_COOLDOWN_SECS: u64 = 20;
const DEFAULT_PROBE_LIMIT: u32 = 10;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// Which capture backend to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    V4l2,
    Synthetic,
}

impl SourceKind {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "v4l2" => Ok(SourceKind::V4l2),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(anyhow!(
                "unknown source '{}': expected 'v4l2' or 'synthetic'",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    source: Option<String>,
    camera: Option<CameraConfigFile>,
    cooldown_secs: Option<u64>,
    probe_limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    index: Option<u32>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub source: SourceKind,
    /// Preferred startup camera; the first enumerated index when unset.
    pub initial_index: Option<u32>,
    pub capture: CaptureSettings,
    pub cooldown: Duration,
    pub probe_limit: u32,
}

impl ScanConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCANRELAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => ScanConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScanConfigFile) -> Result<Self> {
        let source = match file.source.as_deref() {
            Some(value) => SourceKind::parse(value)?,
            None => SourceKind::V4l2,
        };
        let camera = file.camera.unwrap_or_default();
        Ok(Self {
            source,
            initial_index: camera.index,
            capture: CaptureSettings {
                target_fps: camera.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                width: camera.width.unwrap_or(DEFAULT_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_HEIGHT),
            },
            cooldown: Duration::from_secs(file.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS)),
            probe_limit: file.probe_limit.unwrap_or(DEFAULT_PROBE_LIMIT),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("SCANRELAY_SOURCE") {
            if !source.trim().is_empty() {
                self.source = SourceKind::parse(source.trim())?;
            }
        }
        if let Ok(index) = std::env::var("SCANRELAY_CAMERA_INDEX") {
            let index: u32 = index
                .parse()
                .map_err(|_| anyhow!("SCANRELAY_CAMERA_INDEX must be a device index"))?;
            self.initial_index = Some(index);
        }
        if let Ok(cooldown) = std::env::var("SCANRELAY_COOLDOWN_SECS") {
            let seconds: u64 = cooldown.parse().map_err(|_| {
                anyhow!("SCANRELAY_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.cooldown = Duration::from_secs(seconds);
        }
        if let Ok(limit) = std::env::var("SCANRELAY_PROBE_LIMIT") {
            let limit: u32 = limit
                .parse()
                .map_err(|_| anyhow!("SCANRELAY_PROBE_LIMIT must be an integer"))?;
            self.probe_limit = limit;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cooldown.as_secs() == 0 {
            return Err(anyhow!("cooldown must be greater than zero"));
        }
        if self.probe_limit == 0 {
            return Err(anyhow!("probe_limit must be at least 1"));
        }
        if let Some(index) = self.initial_index {
            if index >= self.probe_limit {
                return Err(anyhow!(
                    "camera index {} is outside the probe range 0..{}",
                    index,
                    self.probe_limit
                ));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
