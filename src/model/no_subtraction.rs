use super::{not_initialized, BackgroundModel, Polarity};
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;

/// Pass-through model: the background is all zeros
///
/// Frames are only normalized, so polarity has no effect.
pub struct NoSubtraction {
    height: usize,
    width: usize,
    polarity: Polarity,
    initialized: bool,
}

impl NoSubtraction {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            polarity: Polarity::default(),
            initialized: false,
        }
    }
}

impl BackgroundModel for NoSubtraction {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        if !self.initialized {
            return Err(not_initialized("NoSubtraction"));
        }
        let gray = to_single_precision_grayscale(frame)?;
        if gray.dim() != (self.height, self.width) {
            return Err(Error::ShapeMismatch {
                expected: (self.height, self.width),
                actual: gray.dim(),
            });
        }
        Ok(gray)
    }

    fn background_image(&self) -> Option<Frame> {
        self.initialized
            .then(|| Frame::zeros((self.height, self.width)))
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
