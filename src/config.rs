use crate::format::PixelFormat;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderConfig {
    #[serde(default = "DownloaderConfig::default_workers")]
    pub workers: usize,
    #[serde(default = "DownloaderConfig::default_queue_depth")]
    pub queue_depth: usize,
    #[serde(default = "DownloaderConfig::default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "ProbeConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "ProbeConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanoramaConfig {
    #[serde(default = "PanoramaConfig::default_format_name")]
    pub default_format: String,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct PanoramaConfigOverrides {
    pub format: Option<String>,
    pub workers: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub asset_root: Option<PathBuf>,
}

impl DownloaderConfig {
    pub const MAX_WORKERS: usize = 8;

    const fn default_workers() -> usize {
        2
    }

    const fn default_queue_depth() -> usize {
        8
    }

    const fn default_max_dimension() -> u32 {
        8192
    }

    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, Self::MAX_WORKERS)
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            queue_depth: Self::default_queue_depth(),
            max_dimension: Self::default_max_dimension(),
            asset_root: None,
        }
    }
}

impl ProbeConfig {
    const fn default_timeout_ms() -> u64 {
        5_000
    }

    const fn default_poll_interval_ms() -> u64 {
        10
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_ms: Self::default_timeout_ms(), poll_interval_ms: Self::default_poll_interval_ms() }
    }
}

impl Default for PanoramaConfig {
    fn default() -> Self {
        Self {
            default_format: Self::default_format_name(),
            downloader: DownloaderConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl PanoramaConfig {
    fn default_format_name() -> String {
        PixelFormat::default().label().to_string()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        cfg.format().with_context(|| format!("Invalid default_format in {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn format(&self) -> Result<PixelFormat> {
        Ok(PixelFormat::from_name(&self.default_format)?)
    }

    pub fn apply_overrides(&mut self, overrides: &PanoramaConfigOverrides) {
        if let Some(format) = overrides.format.as_ref() {
            self.default_format = format.clone();
        }
        if let Some(workers) = overrides.workers {
            self.downloader.workers = workers;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.probe.timeout_ms = timeout_ms;
        }
        if let Some(root) = overrides.asset_root.as_ref() {
            self.downloader.asset_root = Some(root.clone());
        }
    }
}

impl PanoramaConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.workers.is_none() && self.timeout_ms.is_none() && self.asset_root.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.format.is_some() {
            fields.push("format");
        }
        if self.workers.is_some() {
            fields.push("workers");
        }
        if self.timeout_ms.is_some() {
            fields.push("timeout");
        }
        if self.asset_root.is_some() {
            fields.push("asset_root");
        }
        fields
    }
}
