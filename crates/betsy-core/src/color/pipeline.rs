//! Pixel conversion into tile frame buffers.
//!
//! For every pixel of a tile's crop, in raster order:
//!
//! 1. **Normalize** – read the source pixel as 8-bit RGB.  Pixels outside the
//!    source bounds read as black.
//! 2. **Gamma** – look each channel up in the [`GammaTable`].
//! 3. **Transform** – multiply by the 3×3 color matrix.
//! 4. **Post-scale** – multiply by the scalar brightness factor.
//! 5. **Clamp** – saturate into `[0, 1]`.
//! 6. **Quantize** – scale by [`PWM_FULL_SCALE`] and truncate to `u16`.
//!
//! Each pixel becomes three little-endian `u16` values in the output buffer.
//!
//! [`GammaTable`]: crate::color::settings::GammaTable

use crate::color::settings::{ColorError, ColorSettings};
use crate::domain::geometry::{CropRect, BYTES_PER_PIXEL};

/// Largest PWM value a tile accepts (12 bits).
pub const PWM_FULL_SCALE: u16 = 0x0FFF;

/// Alpha sentinel carried in [`PwmPixel`]; never transmitted.
const PWM_ALPHA: u16 = 1;

/// Random-access source of RGB pixels.
///
/// Implemented by in-memory decoded images.  `Sync` so one source can feed
/// several tile conversions at once.
pub trait PixelSource: Sync {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// 8-bit RGB value at `(x, y)`; only called for in-bounds coordinates.
    fn sample(&self, x: u32, y: u32) -> [u8; 3];

    /// 8-bit RGB value at canvas coordinates, black outside the source.
    fn rgb8_at(&self, x: i32, y: i32) -> [u8; 3] {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return [0, 0, 0];
        }
        self.sample(x as u32, y as u32)
    }
}

/// Narrows a 16-bit channel to 8 bits (`v / 257`).
#[inline]
pub fn narrow_u16(value: u16) -> u8 {
    (value / 257) as u8
}

/// An owned 8-bit RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaFrame {
    /// Wraps raw RGBA bytes, or returns `None` if `data` is not exactly
    /// `width × height × 4` bytes long.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Sets one pixel; out-of-bounds writes are ignored.
    pub fn put(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * 4;
            self.data[i..i + 4].copy_from_slice(&rgba);
        }
    }
}

impl PixelSource for RgbaFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// One converted pixel in tile PWM space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmPixel {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    /// Fixed sentinel; tiles have no alpha channel.
    pub a: u16,
}

/// Applies a [`ColorSettings`] snapshot to pixels and crops.
#[derive(Debug, Clone, Copy)]
pub struct PixelConverter<'a> {
    settings: &'a ColorSettings,
}

impl<'a> PixelConverter<'a> {
    pub fn new(settings: &'a ColorSettings) -> Self {
        Self { settings }
    }

    /// Converts one 8-bit RGB pixel.
    #[inline]
    pub fn convert_pixel(&self, rgb: [u8; 3]) -> PwmPixel {
        let lut = self.settings.lut();
        let gamma = [lut.lookup(rgb[0]), lut.lookup(rgb[1]), lut.lookup(rgb[2])];
        let mixed = self.settings.transform().apply(gamma);
        let scale = self.settings.postscaler();
        PwmPixel {
            r: quantize(mixed[0] * scale),
            g: quantize(mixed[1] * scale),
            b: quantize(mixed[2] * scale),
            a: PWM_ALPHA,
        }
    }

    /// Converts every pixel of `crop` into `dst`, in raster order.
    ///
    /// Returns the number of bytes written, which always equals
    /// `dst.len()`.  No allocation takes place.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::BufferSize`] if `dst` is not exactly
    /// `BYTES_PER_PIXEL × crop pixels` long; `dst` is left untouched.
    pub fn convert_crop<S>(&self, source: &S, crop: CropRect, dst: &mut [u8]) -> Result<usize, ColorError>
    where
        S: PixelSource + ?Sized,
    {
        let expected = crop.pixel_count() * BYTES_PER_PIXEL;
        if dst.len() != expected {
            return Err(ColorError::BufferSize {
                expected,
                actual: dst.len(),
            });
        }

        let mut out = dst.chunks_exact_mut(BYTES_PER_PIXEL);
        for y in crop.min_y..crop.max_y {
            for x in crop.min_x..crop.max_x {
                let pwm = self.convert_pixel(source.rgb8_at(x, y));
                // The length check above guarantees one slot per pixel.
                if let Some(slot) = out.next() {
                    slot[0..2].copy_from_slice(&pwm.r.to_le_bytes());
                    slot[2..4].copy_from_slice(&pwm.g.to_le_bytes());
                    slot[4..6].copy_from_slice(&pwm.b.to_le_bytes());
                }
            }
        }
        Ok(expected)
    }
}

/// Clamps to `[0, 1]` and scales to the 12-bit PWM range, truncating.
/// NaN quantizes to zero.
#[inline]
fn quantize(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * PWM_FULL_SCALE as f32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::settings::{Gamma, Matrix3x3};
    use crate::domain::geometry::TileGeometry;

    fn words(buf: &[u8]) -> Vec<u16> {
        buf.chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_white_pixel_saturates_full_scale() {
        // Arrange
        let settings = ColorSettings::default();
        let converter = PixelConverter::new(&settings);

        // Act
        let pwm = converter.convert_pixel([255, 255, 255]);

        // Assert
        assert_eq!(
            pwm,
            PwmPixel {
                r: 0x0FFF,
                g: 0x0FFF,
                b: 0x0FFF,
                a: 1
            }
        );
    }

    #[test]
    fn test_black_pixel_is_zero() {
        let settings = ColorSettings::default();
        let pwm = PixelConverter::new(&settings).convert_pixel([0, 0, 0]);

        assert_eq!((pwm.r, pwm.g, pwm.b), (0, 0, 0));
    }

    #[test]
    fn test_identity_transform_equals_gamma_only() {
        // Arrange
        let settings = ColorSettings::default();
        let converter = PixelConverter::new(&settings);

        for v in [1u8, 17, 64, 128, 200, 254] {
            // Act
            let pwm = converter.convert_pixel([v, v, v]);

            // Assert
            let expected = (settings.lut().lookup(v).clamp(0.0, 1.0) * 4095.0) as u16;
            assert_eq!(pwm.r, expected, "channel value {v}");
            assert_eq!(pwm.g, expected);
            assert_eq!(pwm.b, expected);
        }
    }

    #[test]
    fn test_clamp_saturates_high_and_low() {
        // Arrange – boost red, invert green
        let m = Matrix3x3([[3.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]]);
        let settings = ColorSettings::new(Gamma::new(1.0).unwrap(), m, 1.0).unwrap();
        let converter = PixelConverter::new(&settings);

        // Act
        let pwm = converter.convert_pixel([128, 255, 0]);

        // Assert
        assert_eq!(pwm.r, PWM_FULL_SCALE, "values above one saturate");
        assert_eq!(pwm.g, 0, "negative values clamp to zero");
        assert_eq!(pwm.b, 0);
    }

    #[test]
    fn test_postscaler_halves_output() {
        let settings = ColorSettings::new(Gamma::new(1.0).unwrap(), Matrix3x3::IDENTITY, 0.5).unwrap();

        let pwm = PixelConverter::new(&settings).convert_pixel([255, 0, 0]);

        assert_eq!(pwm.r, 2047);
    }

    #[test]
    fn test_quantize_nan_is_zero() {
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(f32::INFINITY), PWM_FULL_SCALE);
    }

    #[test]
    fn test_convert_crop_white_tile() {
        // Arrange
        let geometry = TileGeometry::BETSY;
        let image = RgbaFrame::solid(18, 18, [255, 255, 255, 255]);
        let settings = ColorSettings::default();
        let mut buf = vec![0u8; geometry.frame_len()];

        // Act
        let written = PixelConverter::new(&settings)
            .convert_crop(&image, geometry.crop_at(0, 0), &mut buf)
            .unwrap();

        // Assert
        assert_eq!(written, 1944);
        assert!(buf.chunks_exact(2).all(|b| b == [0xFF, 0x0F]));
    }

    #[test]
    fn test_convert_crop_outside_source_reads_black() {
        // Arrange – white image, crop entirely to its right
        let geometry = TileGeometry::new(2, 2);
        let image = RgbaFrame::solid(2, 2, [255, 255, 255, 255]);
        let settings = ColorSettings::default();
        let mut buf = vec![0xAAu8; geometry.frame_len()];

        // Act
        PixelConverter::new(&settings)
            .convert_crop(&image, geometry.crop_at(2, 0), &mut buf)
            .unwrap();

        // Assert
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_convert_crop_is_raster_order() {
        // Arrange – one red pixel at (1, 0) and one blue at (0, 1)
        let geometry = TileGeometry::new(2, 2);
        let mut image = RgbaFrame::solid(2, 2, [0, 0, 0, 255]);
        image.put(1, 0, [255, 0, 0, 255]);
        image.put(0, 1, [0, 0, 255, 255]);
        let settings = ColorSettings::default();
        let mut buf = vec![0u8; geometry.frame_len()];

        // Act
        PixelConverter::new(&settings)
            .convert_crop(&image, geometry.crop_at(0, 0), &mut buf)
            .unwrap();

        // Assert
        assert_eq!(
            words(&buf),
            vec![
                0, 0, 0, // (0,0)
                0x0FFF, 0, 0, // (1,0)
                0, 0, 0x0FFF, // (0,1)
                0, 0, 0, // (1,1)
            ]
        );
    }

    #[test]
    fn test_convert_crop_rejects_wrong_buffer_size() {
        let settings = ColorSettings::default();
        let image = RgbaFrame::solid(18, 18, [0, 0, 0, 255]);
        let mut short = vec![0u8; 100];

        let result = PixelConverter::new(&settings).convert_crop(
            &image,
            TileGeometry::BETSY.crop_at(0, 0),
            &mut short,
        );

        assert_eq!(
            result,
            Err(ColorError::BufferSize {
                expected: 1944,
                actual: 100
            })
        );
    }

    #[test]
    fn test_narrow_u16() {
        assert_eq!(narrow_u16(0), 0);
        assert_eq!(narrow_u16(65535), 255);
        assert_eq!(narrow_u16(257 * 128), 128);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(RgbaFrame::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(RgbaFrame::from_raw(2, 2, vec![0; 15]).is_none());
    }
}
