use super::{not_initialized, subtract_background, BackgroundModel, Polarity};
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;
use ndarray::{Array2, Array3, Axis};
use ndarray_npy::{ReadNpyExt, ReadableElement};
use std::fs::File;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// Background loaded once from a file
///
/// `.npy` array dumps (u8, u16, f32 or f64; 2-D or height x width x channels)
/// and common image formats are accepted.
pub struct StaticImage {
    path: PathBuf,
    background: Option<Frame>,
    polarity: Polarity,
}

impl StaticImage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            background: None,
            polarity: Polarity::default(),
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }
}

/// Load a background file, dispatching on its extension
pub fn load_background_file(path: &Path) -> Result<RawFrame> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ext == "npy" {
        read_npy_frame(path)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        RawFrame::from_image(image::open(path)?)
    } else {
        Err(Error::Config(format!(
            "{}: unknown background image type",
            path.display()
        )))
    }
}

fn read_npy_frame(path: &Path) -> Result<RawFrame> {
    if let Some(frame) = try_read_npy::<u8>(path, RawFrame::U8) {
        return Ok(frame);
    }
    if let Some(frame) = try_read_npy::<u16>(path, RawFrame::U16) {
        return Ok(frame);
    }
    if let Some(frame) = try_read_npy::<f32>(path, RawFrame::F32) {
        return Ok(frame);
    }
    if let Some(frame) = try_read_npy::<f64>(path, |a| RawFrame::F32(a.mapv(|v| v as f32))) {
        return Ok(frame);
    }
    // surface I/O failures before claiming the dtype is unsupported
    File::open(path)?;
    Err(Error::Decode(format!(
        "{}: expected a 2-D or 3-D u8, u16, f32 or f64 array",
        path.display()
    )))
}

fn try_read_npy<T>(path: &Path, wrap: impl Fn(Array3<T>) -> RawFrame) -> Option<RawFrame>
where
    T: ReadableElement,
{
    if let Ok(array) = File::open(path).ok().map(Array2::<T>::read_npy)? {
        return Some(wrap(array.insert_axis(Axis(2))));
    }
    let array = File::open(path).ok().map(Array3::<T>::read_npy)?.ok()?;
    Some(wrap(array))
}

impl BackgroundModel for StaticImage {
    fn initialize(&mut self) -> Result<()> {
        tracing::info!("Loading static background from {}", self.path.display());
        let raw = load_background_file(&self.path)?;
        self.background = Some(to_single_precision_grayscale(&raw)?);
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        let background = self
            .background
            .as_ref()
            .ok_or_else(|| not_initialized("StaticImage"))?;
        let gray = to_single_precision_grayscale(frame)?;
        subtract_background(&gray, background, self.polarity)
    }

    fn background_image(&self) -> Option<Frame> {
        self.background.clone()
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    fn is_initialized(&self) -> bool {
        self.background.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use ndarray_npy::WriteNpyExt;

    #[test]
    fn test_loads_npy_u8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.npy");
        Array2::<u8>::from_elem((3, 3), 51)
            .write_npy(File::create(&path).unwrap())
            .unwrap();

        let mut model = StaticImage::new(&path);
        assert!(!model.is_initialized());
        model.initialize().unwrap();

        let background = model.background_image().unwrap();
        assert_eq!(background.dim(), (3, 3));
        assert!(background.iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_loads_npy_f64_color() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.npy");
        Array3::<f64>::from_elem((2, 4, 3), 0.5)
            .write_npy(File::create(&path).unwrap())
            .unwrap();

        let raw = load_background_file(&path).unwrap();
        assert_eq!(raw.dim(), (2, 4, 3));
        let gray = to_single_precision_grayscale(&raw).unwrap();
        assert!(gray.iter().all(|&v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        GrayImage::from_pixel(5, 4, Luma([255])).save(&path).unwrap();

        let mut model = StaticImage::new(&path);
        model.initialize().unwrap();
        assert_eq!(model.background_image().unwrap().dim(), (4, 5));
    }

    #[test]
    fn test_unknown_extension_is_config_error() {
        let mut model = StaticImage::new("background.bmp.gz");
        assert!(matches!(model.initialize(), Err(Error::Config(_))));
    }

    #[test]
    fn test_random_frame_gives_non_negative_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.npy");
        Array2::<u8>::from_shape_fn((3, 3), |(r, c)| (r * 80 + c * 7) as u8)
            .write_npy(File::create(&path).unwrap())
            .unwrap();
        let mut model = StaticImage::new(&path);
        model.initialize().unwrap();

        let frame = RawFrame::gray_u8(Array2::from_shape_fn((3, 3), |(r, c)| (c * 90 + r) as u8));
        for polarity in [Polarity::BrightOnDark, Polarity::DarkOnBright] {
            model.set_polarity(polarity);
            let out = model.subtract(&frame).unwrap();
            assert_eq!(out.dim(), (3, 3));
            assert!(out.iter().all(|&v| v >= 0.0));
        }
    }
}
