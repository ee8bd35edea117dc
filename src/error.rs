use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PanoramaError {
    #[error("Invalid pixel format '{0}'. Expected one of RGBA8, RGBA4, RGB565, RGB8, RGBA16F.")]
    InvalidFormat(String),

    #[error("Image source has no 'uri' entry")]
    MissingUri,

    #[error("Unsupported image source '{0}'")]
    UnsupportedSource(String),

    #[error("Failed to read image '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image is {width}x{height}, larger than the {max} pixel limit")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    PixelBuffer { expected: usize, actual: usize },

    #[error("Renderer error: {0}")]
    Renderer(String),
}

pub type PanoramaResult<T> = std::result::Result<T, PanoramaError>;
