use super::VideoSource;
use crate::error::{Error, Result};
use crate::frame::{PixelType, RawFrame};
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Video source reading a directory of image files, one file per frame
///
/// Frames are ordered by file name, so zero-padded numbering is expected.
pub struct ImageSequence {
    files: Vec<PathBuf>,
    position: usize,
    height: usize,
    width: usize,
    channels: usize,
    pixel_type: PixelType,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Opening image sequence in {}", dir.display());

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        let first = files.first().ok_or_else(|| {
            Error::Config(format!("no image files found in {}", dir.display()))
        })?;
        let probe = decode(first)?;
        let (height, width, channels) = probe.dim();

        tracing::info!(
            "Image sequence: {} frames, {}x{}, {} channel(s)",
            files.len(),
            width,
            height,
            channels
        );

        Ok(Self {
            pixel_type: probe.pixel_type(),
            files,
            position: 0,
            height,
            width,
            channels,
        })
    }

    /// Path of each frame, in playback order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn decode(path: &Path) -> Result<RawFrame> {
    let image = image::open(path)?;
    RawFrame::from_image(image)
}

impl VideoSource for ImageSequence {
    fn next_frame(&mut self) -> Option<RawFrame> {
        let path = self.files.get(self.position)?;
        self.position += 1;
        match decode(path) {
            Ok(frame) if frame.dim() == (self.height, self.width, self.channels) => Some(frame),
            Ok(frame) => {
                tracing::warn!(
                    "{} has shape {:?}, expected {:?}",
                    path.display(),
                    frame.dim(),
                    (self.height, self.width, self.channels)
                );
                None
            }
            Err(e) => {
                tracing::warn!("Failed to decode {}: {}", path.display(), e);
                None
            }
        }
    }

    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.files.len() {
            return Err(Error::Decode(format!(
                "seek to frame {index} past end of {}-frame sequence",
                self.files.len()
            )));
        }
        self.position = index;
        Ok(())
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }
}
