use crate::config::PanoramaConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeArgs {
    pub image: PathBuf,
    pub config: Option<PathBuf>,
    pub stereo_mode: Option<String>,
    pub rotation: Option<[f32; 3]>,
    format: Option<String>,
    workers: Option<usize>,
    timeout_ms: Option<u64>,
    asset_root: Option<PathBuf>,
}

impl ProbeArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = ProbeArgs::default();
        let mut image = None;
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw) = iter.next() {
            let arg = raw.as_ref();
            let Some(key) = arg.strip_prefix("--") else {
                if image.is_some() {
                    bail!("Unexpected argument '{arg}'. Only one image path may be given.");
                }
                image = Some(PathBuf::from(arg));
                continue;
            };
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?.as_ref().to_string();
            match key {
                "config" => parsed.config = Some(PathBuf::from(value)),
                "format" => parsed.format = Some(value),
                "stereo" => parsed.stereo_mode = Some(value),
                "rotation" => parsed.rotation = Some(parse_rotation(&value)?),
                "workers" => {
                    parsed.workers =
                        Some(value.parse::<usize>().with_context(|| format!("Invalid workers '{value}'"))?);
                }
                "timeout" => {
                    parsed.timeout_ms =
                        Some(value.parse::<u64>().with_context(|| format!("Invalid timeout '{value}'"))?);
                }
                "asset-root" => parsed.asset_root = Some(PathBuf::from(value)),
                _ => bail!(
                    "Unknown flag '{arg}'. Supported flags: --config, --format, --stereo, --rotation, --workers, \
                     --timeout, --asset-root."
                ),
            }
        }
        parsed.image = image.ok_or_else(|| anyhow!("Missing image path. Usage: kestrel_panorama <image> [flags]"))?;
        Ok(parsed)
    }

    pub fn config_overrides(&self) -> PanoramaConfigOverrides {
        PanoramaConfigOverrides {
            format: self.format.clone(),
            workers: self.workers,
            timeout_ms: self.timeout_ms,
            asset_root: self.asset_root.clone(),
        }
    }
}

fn parse_rotation(value: &str) -> Result<[f32; 3]> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("Invalid rotation '{value}'. Expected three comma-separated numbers, e.g. 0,90,0.");
    }
    let mut rotation = [0.0; 3];
    for (slot, part) in rotation.iter_mut().zip(parts) {
        *slot = part.parse::<f32>().with_context(|| format!("Invalid rotation component '{part}'"))?;
    }
    Ok(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_and_flags() {
        let args = ["probe", "sky.png", "--format", "rgb565", "--rotation", "0, 90.5, 0", "--stereo", "TopBottom"];
        let parsed = ProbeArgs::parse(args).expect("parse args");
        assert_eq!(parsed.image, PathBuf::from("sky.png"));
        assert_eq!(parsed.rotation, Some([0.0, 90.5, 0.0]));
        assert_eq!(parsed.stereo_mode.as_deref(), Some("TopBottom"));
        assert_eq!(parsed.config_overrides().applied_fields(), vec!["format"]);
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["probe", "--workers", "1", "sky.png", "--workers", "3"];
        let parsed = ProbeArgs::parse(args).expect("parse args");
        assert_eq!(parsed.config_overrides().workers, Some(3));
    }

    #[test]
    fn missing_image_errors() {
        let err = ProbeArgs::parse(["probe", "--format", "RGBA8"]).unwrap_err();
        assert!(err.to_string().contains("Missing image path"));
    }

    #[test]
    fn rejects_bad_rotation() {
        let err = ProbeArgs::parse(["probe", "sky.png", "--rotation", "1,2"]).unwrap_err();
        assert!(err.to_string().contains("three comma-separated"));
    }

    #[test]
    fn rejects_unknown_flags() {
        let err = ProbeArgs::parse(["probe", "sky.png", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
    }
}
