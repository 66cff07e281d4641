use super::VideoSource;
use crate::error::{Error, Result};
use crate::frame::{PixelType, RawFrame};

/// Video source backed by frames held in memory
///
/// All frames must share the shape and pixel type of the first one.
pub struct MemorySource {
    frames: Vec<RawFrame>,
    position: usize,
    failing: Vec<usize>,
}

impl MemorySource {
    pub fn new(frames: Vec<RawFrame>) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| Error::Config("memory source needs at least one frame".into()))?;
        let (dim, pixel_type) = (first.dim(), first.pixel_type());

        if let Some(bad) = frames
            .iter()
            .position(|f| f.dim() != dim || f.pixel_type() != pixel_type)
        {
            return Err(Error::Config(format!(
                "frame {bad} differs in shape or pixel type from frame 0"
            )));
        }

        Ok(Self {
            frames,
            position: 0,
            failing: Vec::new(),
        })
    }

    /// Make reads of the given frame indices fail, simulating decode errors
    pub fn with_failing_frames(mut self, indices: &[usize]) -> Self {
        self.failing = indices.to_vec();
        self
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.position
    }
}

impl VideoSource for MemorySource {
    fn next_frame(&mut self) -> Option<RawFrame> {
        let index = self.position;
        let frame = self.frames.get(index)?;
        self.position += 1;
        if self.failing.contains(&index) {
            return None;
        }
        Some(frame.clone())
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return Err(Error::Decode(format!(
                "seek to frame {index} past end of {}-frame source",
                self.frames.len()
            )));
        }
        self.position = index;
        Ok(())
    }

    fn width(&self) -> usize {
        self.frames[0].width()
    }

    fn height(&self) -> usize {
        self.frames[0].height()
    }

    fn channel_count(&self) -> usize {
        self.frames[0].channels()
    }

    fn pixel_type(&self) -> PixelType {
        self.frames[0].pixel_type()
    }
}
