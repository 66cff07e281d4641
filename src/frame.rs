use crate::error::{Error, Result};
use image::DynamicImage;
use ndarray::{Array2, Array3};

/// Normalized grayscale frame: f32 values in [0, 1], shape (height, width)
pub type Frame = Array2<f32>;

/// Element type of a raw frame as delivered by a video source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
    F32,
}

/// Frame as delivered by a video source, before normalization
///
/// Data is laid out as (height, width, channels).
#[derive(Debug, Clone, PartialEq)]
pub enum RawFrame {
    U8(Array3<u8>),
    U16(Array3<u16>),
    F32(Array3<f32>),
}

impl RawFrame {
    /// Wrap a single-channel 8-bit array
    pub fn gray_u8(data: Array2<u8>) -> Self {
        RawFrame::U8(data.insert_axis(ndarray::Axis(2)))
    }

    /// Wrap a single-channel float array
    pub fn gray_f32(data: Array2<f32>) -> Self {
        RawFrame::F32(data.insert_axis(ndarray::Axis(2)))
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            RawFrame::U8(_) => PixelType::U8,
            RawFrame::U16(_) => PixelType::U16,
            RawFrame::F32(_) => PixelType::F32,
        }
    }

    /// Returns (height, width, channels)
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            RawFrame::U8(a) => a.dim(),
            RawFrame::U16(a) => a.dim(),
            RawFrame::F32(a) => a.dim(),
        }
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    pub fn channels(&self) -> usize {
        self.dim().2
    }
}

impl From<Frame> for RawFrame {
    fn from(frame: Frame) -> Self {
        RawFrame::gray_f32(frame)
    }
}

impl RawFrame {
    /// Convert a decoded image, keeping its channel layout and bit depth
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let frame = match image {
            DynamicImage::ImageLuma8(buf) => {
                RawFrame::U8(shaped(buf.into_raw(), height, width, 1)?)
            }
            DynamicImage::ImageRgb8(buf) => {
                RawFrame::U8(shaped(buf.into_raw(), height, width, 3)?)
            }
            DynamicImage::ImageRgba8(buf) => {
                RawFrame::U8(shaped(buf.into_raw(), height, width, 4)?)
            }
            DynamicImage::ImageLuma16(buf) => {
                RawFrame::U16(shaped(buf.into_raw(), height, width, 1)?)
            }
            other => {
                let color = other.color();
                match color.bytes_per_pixel() / color.channel_count() {
                    1 => RawFrame::U8(shaped(other.to_rgb8().into_raw(), height, width, 3)?),
                    2 => RawFrame::U16(shaped(other.to_rgb16().into_raw(), height, width, 3)?),
                    _ => RawFrame::F32(shaped(other.to_rgb32f().into_raw(), height, width, 3)?),
                }
            }
        };
        Ok(frame)
    }
}

fn shaped<T>(raw: Vec<T>, height: usize, width: usize, channels: usize) -> Result<Array3<T>> {
    let mut raw = raw;
    raw.truncate(height * width * channels);
    Array3::from_shape_vec((height, width, channels), raw)
        .map_err(|e| Error::Decode(format!("image buffer does not match its dimensions: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_from_gray_image() {
        let img = GrayImage::from_fn(4, 2, |x, y| Luma([(x + 10 * y) as u8]));
        let raw = RawFrame::from_image(DynamicImage::ImageLuma8(img)).unwrap();

        assert_eq!(raw.dim(), (2, 4, 1));
        assert_eq!(raw.pixel_type(), PixelType::U8);
        match raw {
            RawFrame::U8(a) => assert_eq!(a[[1, 3, 0]], 13),
            _ => panic!("expected u8 frame"),
        }
    }

    #[test]
    fn test_from_rgb_image_keeps_channels() {
        let img = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        let raw = RawFrame::from_image(DynamicImage::ImageRgb8(img)).unwrap();

        assert_eq!(raw.channels(), 3);
        match raw {
            RawFrame::U8(a) => assert_eq!(a[[2, 2, 2]], 3),
            _ => panic!("expected u8 frame"),
        }
    }
}
