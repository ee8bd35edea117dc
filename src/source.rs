use crate::error::{PanoramaError, PanoramaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Key-value description of where an image comes from, as handed over by the declarative layer.
///
/// The node treats the map as opaque; only the downloader interprets it. The `uri` entry is the
/// one key every downloader understands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSource {
    entries: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    File(PathBuf),
    Remote(String),
}

impl ImageSource {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let mut entries = Map::new();
        entries.insert("uri".to_string(), Value::String(uri.into()));
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn uri(&self) -> Option<&str> {
        self.entries.get("uri").and_then(Value::as_str).map(str::trim).filter(|uri| !uri.is_empty())
    }

    pub fn origin(&self) -> PanoramaResult<SourceOrigin> {
        let uri = self.uri().ok_or(PanoramaError::MissingUri)?;
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(SourceOrigin::File(PathBuf::from(path)));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(SourceOrigin::Remote(uri.to_string()));
        }
        if has_scheme(uri) {
            return Err(PanoramaError::UnsupportedSource(uri.to_string()));
        }
        Ok(SourceOrigin::File(PathBuf::from(uri)))
    }
}

fn has_scheme(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once("://") else {
        return false;
    };
    !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
