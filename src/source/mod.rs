mod image_sequence;
mod memory;

pub use image_sequence::ImageSequence;
pub use memory::MemorySource;

use crate::error::Result;
use crate::frame::{PixelType, RawFrame};

/// Trait for seekable video sources
///
/// Background models only read through this interface; decode state stays
/// with the implementation.
pub trait VideoSource {
    /// Read the frame at the current position and advance
    ///
    /// Returns `None` when no frame could be read.
    fn next_frame(&mut self) -> Option<RawFrame>;

    /// Total number of frames in the source
    fn frame_count(&self) -> usize;

    /// Position the source so the next read returns frame `index`
    fn seek(&mut self, index: usize) -> Result<()>;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn channel_count(&self) -> usize;

    fn pixel_type(&self) -> PixelType;

    /// Rewind to the first frame
    fn reset(&mut self) -> Result<()> {
        self.seek(0)
    }
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn next_frame(&mut self) -> Option<RawFrame> {
        (**self).next_frame()
    }

    fn frame_count(&self) -> usize {
        (**self).frame_count()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        (**self).seek(index)
    }

    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn pixel_type(&self) -> PixelType {
        (**self).pixel_type()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}
