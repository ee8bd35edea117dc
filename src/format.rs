use crate::error::{PanoramaError, PanoramaResult};
use std::fmt;

/// Pixel layout an image is decoded into before it is handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Rgba4,
    Rgb565,
    Rgb8,
    Rgba16F,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 5] =
        [PixelFormat::Rgba8, PixelFormat::Rgba4, PixelFormat::Rgb565, PixelFormat::Rgb8, PixelFormat::Rgba16F];

    pub fn from_name(name: &str) -> PanoramaResult<Self> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PanoramaError::InvalidFormat(name.to_string()))
    }

    pub fn label(self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Rgba4 => "RGBA4",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::Rgba16F => "RGBA16F",
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba4 | PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba16F => 8,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_case_insensitively() {
        assert_eq!(PixelFormat::from_name("RGBA8").unwrap(), PixelFormat::Rgba8);
        assert_eq!(PixelFormat::from_name("rgb565").unwrap(), PixelFormat::Rgb565);
        assert_eq!(PixelFormat::from_name(" RGBA16F ").unwrap(), PixelFormat::Rgba16F);
    }

    #[test]
    fn unknown_name_is_invalid_format() {
        let err = PixelFormat::from_name("invalid-name").unwrap_err();
        assert!(matches!(err, PanoramaError::InvalidFormat(ref name) if name == "invalid-name"));
    }

    #[test]
    fn labels_round_trip_through_from_name() {
        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::from_name(format.label()).unwrap(), format);
        }
    }

    #[test]
    fn packed_sizes() {
        assert_eq!(PixelFormat::Rgba4.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Rgba16F.bytes_per_pixel(), 8);
    }
}
