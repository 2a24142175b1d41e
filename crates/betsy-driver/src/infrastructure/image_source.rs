//! Image decoding into pixel sources.
//!
//! Files and uploaded bytes are decoded with the `image` crate.  Sources with
//! 16 bits per channel keep their precision until the color pipeline narrows
//! them; everything else is converted to 8-bit RGBA.
//!
//! Samples are alpha-premultiplied, so transparent regions read as black.

use std::path::{Path, PathBuf};

use betsy_core::color::pipeline::narrow_u16;
use betsy_core::PixelSource;
use image::{ColorType, DynamicImage, ImageBuffer, Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

/// 16-bit RGBA image buffer.
pub type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Errors produced while loading images.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    /// A file could not be opened or decoded.
    #[error("failed to load image {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// In-memory bytes could not be decoded.
    #[error("failed to decode image data: {0}")]
    Decode(#[source] image::ImageError),

    /// A frame path pattern contains an unsupported directive.
    #[error("invalid frame path pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// The requested index range selects no frames.
    #[error("frame range {start}..={stop} is empty")]
    EmptySequence { start: u32, stop: u32 },
}

/// A decoded image held in memory.
#[derive(Debug, Clone)]
pub enum DecodedImage {
    Rgba8(RgbaImage),
    Rgba16(Rgba16Image),
}

impl DecodedImage {
    fn from_dynamic(image: DynamicImage) -> Self {
        match image.color() {
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                DecodedImage::Rgba16(image.to_rgba16())
            }
            _ => DecodedImage::Rgba8(image.into_rgba8()),
        }
    }
}

impl PixelSource for DecodedImage {
    fn width(&self) -> u32 {
        match self {
            DecodedImage::Rgba8(img) => img.width(),
            DecodedImage::Rgba16(img) => img.width(),
        }
    }

    fn height(&self) -> u32 {
        match self {
            DecodedImage::Rgba8(img) => img.height(),
            DecodedImage::Rgba16(img) => img.height(),
        }
    }

    fn sample(&self, x: u32, y: u32) -> [u8; 3] {
        match self {
            DecodedImage::Rgba8(img) => {
                let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
                [r, g, b].map(|c| premultiply_u8(c, a))
            }
            DecodedImage::Rgba16(img) => {
                let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
                [r, g, b].map(|c| narrow_u16(premultiply_u16(c, a)))
            }
        }
    }
}

fn premultiply_u8(channel: u8, alpha: u8) -> u8 {
    (u32::from(channel) * u32::from(alpha) / 0xff) as u8
}

fn premultiply_u16(channel: u16, alpha: u16) -> u16 {
    (u32::from(channel) * u32::from(alpha) / 0xffff) as u16
}

/// Opens and decodes the image at `path`.
pub fn load_image(path: &Path) -> Result<DecodedImage, ImageLoadError> {
    let image = image::open(path).map_err(|source| ImageLoadError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "loaded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(DecodedImage::from_dynamic(image))
}

/// Decodes an in-memory image, guessing the format from its contents.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, ImageLoadError> {
    image::load_from_memory(bytes)
        .map(DecodedImage::from_dynamic)
        .map_err(ImageLoadError::Decode)
}

/// Expands a printf-style frame path for `index`.
///
/// Supports `%d`, zero-padded `%0Nd`, space-padded `%Nd`, and `%%`.
///
/// ```rust
/// use betsy_driver::infrastructure::image_source::format_frame_path;
///
/// assert_eq!(format_frame_path("frames/%04d.png", 7).unwrap(), "frames/0007.png");
/// ```
pub fn format_frame_path(pattern: &str, index: u32) -> Result<String, ImageLoadError> {
    let invalid = |reason: &str| ImageLoadError::Pattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let zero_pad = chars.peek() == Some(&'0');
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            chars.next();
            width = width * 10 + d as usize;
        }
        match chars.next() {
            Some('d') if zero_pad => out.push_str(&format!("{index:0width$}")),
            Some('d') => out.push_str(&format!("{index:width$}")),
            Some(_) => return Err(invalid("only %d directives are supported")),
            None => return Err(invalid("dangling '%' at end of pattern")),
        }
    }
    Ok(out)
}

/// Loads frames `start..=stop` named by `pattern`.
pub fn load_sequence(pattern: &str, start: u32, stop: u32) -> Result<Vec<DecodedImage>, ImageLoadError> {
    if start > stop {
        return Err(ImageLoadError::EmptySequence { start, stop });
    }
    (start..=stop)
        .map(|i| {
            let path = format_frame_path(pattern, i)?;
            load_image(Path::new(&path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn test_format_frame_path_directives() {
        assert_eq!(format_frame_path("f%d.png", 12).unwrap(), "f12.png");
        assert_eq!(format_frame_path("f%04d.png", 12).unwrap(), "f0012.png");
        assert_eq!(format_frame_path("f%4d.png", 12).unwrap(), "f  12.png");
        assert_eq!(format_frame_path("100%%_%d", 3).unwrap(), "100%_3");
        assert_eq!(format_frame_path("static.png", 3).unwrap(), "static.png");
    }

    #[test]
    fn test_format_frame_path_rejects_other_verbs() {
        assert!(matches!(
            format_frame_path("f%s.png", 1),
            Err(ImageLoadError::Pattern { .. })
        ));
        assert!(matches!(
            format_frame_path("f%", 1),
            Err(ImageLoadError::Pattern { .. })
        ));
    }

    #[test]
    fn test_decode_8bit_png() {
        // Arrange
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(img));

        // Act
        let decoded = decode_image(&bytes).expect("decode");

        // Assert
        assert!(matches!(decoded, DecodedImage::Rgba8(_)));
        assert_eq!((decoded.width(), decoded.height()), (2, 1));
        assert_eq!(decoded.sample(1, 0), [10, 20, 30]);
        assert_eq!(decoded.rgb8_at(2, 0), [0, 0, 0], "outside reads black");
    }

    #[test]
    fn test_decode_16bit_png_narrows_on_sample() {
        // Arrange
        let mut img = Rgba16Image::new(1, 1);
        img.put_pixel(0, 0, Rgba([65535, 257 * 100, 0, 65535]));
        let bytes = png_bytes(DynamicImage::ImageRgba16(img));

        // Act
        let decoded = decode_image(&bytes).expect("decode");

        // Assert
        assert!(matches!(decoded, DecodedImage::Rgba16(_)));
        assert_eq!(decoded.sample(0, 0), [255, 100, 0]);
    }

    #[test]
    fn test_translucent_pixels_are_premultiplied() {
        // Arrange
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 128]));
        img.put_pixel(1, 0, Rgba([255, 200, 100, 0]));
        img.put_pixel(2, 0, Rgba([255, 200, 100, 255]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(img));

        // Act
        let decoded = decode_image(&bytes).expect("decode");

        // Assert
        assert_eq!(decoded.sample(0, 0), [128, 128, 128]);
        assert_eq!(decoded.sample(1, 0), [0, 0, 0], "transparent reads black");
        assert_eq!(decoded.sample(2, 0), [255, 200, 100]);
    }

    #[test]
    fn test_translucent_16bit_pixels_are_premultiplied() {
        let mut img = Rgba16Image::new(2, 1);
        img.put_pixel(0, 0, Rgba([65535, 65535, 0, 32768]));
        img.put_pixel(1, 0, Rgba([65535, 65535, 65535, 0]));
        let bytes = png_bytes(DynamicImage::ImageRgba16(img));

        let decoded = decode_image(&bytes).expect("decode");

        assert_eq!(decoded.sample(0, 0), [127, 127, 0]);
        assert_eq!(decoded.sample(1, 0), [0, 0, 0]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_image(b"not an image"), Err(ImageLoadError::Decode(_))));
    }

    #[test]
    fn test_load_sequence_reads_each_index() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 1..=3u8 {
            let img = RgbaImage::from_pixel(1, 1, Rgba([i, 0, 0, 255]));
            img.save(dir.path().join(format!("frame{i:02}.png"))).expect("save");
        }
        let pattern = format!("{}/frame%02d.png", dir.path().display());

        // Act
        let frames = load_sequence(&pattern, 1, 3).expect("load");

        // Assert
        let reds: Vec<u8> = frames.iter().map(|f| f.sample(0, 0)[0]).collect();
        assert_eq!(reds, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_sequence_rejects_empty_range() {
        assert!(matches!(
            load_sequence("%d.png", 5, 4),
            Err(ImageLoadError::EmptySequence { start: 5, stop: 4 })
        ));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = load_image(Path::new("/nonexistent/betsy.png")).unwrap_err();

        assert!(err.to_string().contains("/nonexistent/betsy.png"));
    }
}
