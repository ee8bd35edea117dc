use crate::error::{PanoramaError, PanoramaResult};
use crate::format::PixelFormat;
use half::f16;
use image::{DynamicImage, ImageError, ImageReader, Limits};
use std::io::Cursor;

/// Decoded pixels packed in the layout requested by the node.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Decodes `bytes`, refusing images wider or taller than `max_dimension` before any pixel
    /// data is allocated.
    pub fn decode(bytes: &[u8], format: PixelFormat, max_dimension: u32) -> PanoramaResult<Self> {
        let mut header = guessed_reader(bytes)?;
        header.limits(Limits::no_limits());
        let (width, height) = header.into_dimensions()?;
        if width > max_dimension || height > max_dimension {
            return Err(PanoramaError::TooLarge { width, height, max: max_dimension });
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(max_dimension);
        limits.max_image_height = Some(max_dimension);
        let mut reader = guessed_reader(bytes)?;
        reader.limits(limits);
        let image = reader.decode().map_err(|err| match err {
            ImageError::Limits(_) => PanoramaError::TooLarge { width, height, max: max_dimension },
            other => PanoramaError::Decode(other),
        })?;
        Self::from_image(&image, format, max_dimension)
    }

    pub fn from_image(image: &DynamicImage, format: PixelFormat, max_dimension: u32) -> PanoramaResult<Self> {
        let (width, height) = (image.width(), image.height());
        if width > max_dimension || height > max_dimension {
            return Err(PanoramaError::TooLarge { width, height, max: max_dimension });
        }
        if format == PixelFormat::Rgba16F {
            let rgba = image.to_rgba32f();
            let mut pixels = Vec::with_capacity(rgba.as_raw().len() * 2);
            for channel in rgba.as_raw() {
                pixels.extend_from_slice(&f16::from_f32(*channel).to_le_bytes());
            }
            return Ok(Self { width, height, format, pixels });
        }
        let rgba = image.to_rgba8();
        Self::from_rgba8(width, height, format, rgba.as_raw())
    }

    /// Packs tightly laid out RGBA8 data into `format`. `rgba` must hold exactly
    /// `width * height` texels.
    pub fn from_rgba8(width: u32, height: u32, format: PixelFormat, rgba: &[u8]) -> PanoramaResult<Self> {
        let expected = (width as usize).checked_mul(height as usize).and_then(|texels| texels.checked_mul(4));
        if expected != Some(rgba.len()) {
            let expected = expected.unwrap_or(usize::MAX);
            return Err(PanoramaError::PixelBuffer { expected, actual: rgba.len() });
        }
        let texel_count = rgba.len() / 4;
        let mut pixels = Vec::with_capacity(texel_count * format.bytes_per_pixel());
        for texel in rgba.chunks_exact(4) {
            let (r, g, b, a) = (texel[0], texel[1], texel[2], texel[3]);
            match format {
                PixelFormat::Rgba8 => pixels.extend_from_slice(texel),
                PixelFormat::Rgb8 => pixels.extend_from_slice(&[r, g, b]),
                PixelFormat::Rgba4 => {
                    let packed = (u16::from(r >> 4) << 12)
                        | (u16::from(g >> 4) << 8)
                        | (u16::from(b >> 4) << 4)
                        | u16::from(a >> 4);
                    pixels.extend_from_slice(&packed.to_le_bytes());
                }
                PixelFormat::Rgb565 => {
                    let packed = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                    pixels.extend_from_slice(&packed.to_le_bytes());
                }
                PixelFormat::Rgba16F => {
                    for channel in [r, g, b, a] {
                        let value = f16::from_f32(f32::from(channel) / 255.0);
                        pixels.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        Ok(Self { width, height, format, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

fn guessed_reader(bytes: &[u8]) -> PanoramaResult<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| PanoramaError::Decode(ImageError::IoError(err)))
}
