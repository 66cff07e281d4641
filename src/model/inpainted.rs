use super::{not_initialized, subtract_background, BackgroundModel, Polarity};
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::inpaint::{inpaint, RegionMask};
use crate::normalize::to_single_precision_grayscale;
use crate::source::VideoSource;

#[derive(Debug, Clone, Copy)]
pub struct InpaintSettings {
    /// Frame of the video used as the background
    pub frame_num: usize,
    /// Neighborhood radius, in pixels, used to fill masked pixels
    pub inpaint_radius: usize,
}

impl Default for InpaintSettings {
    fn default() -> Self {
        Self {
            frame_num: 0,
            inpaint_radius: 3,
        }
    }
}

/// Background taken from a single frame with a region painted out
///
/// Useful when one frame shows the empty scene except for an object that
/// can be outlined by hand.
pub struct InpaintedStatic<S: VideoSource> {
    source: S,
    mask: RegionMask,
    settings: InpaintSettings,
    background: Option<Frame>,
    polarity: Polarity,
}

impl<S: VideoSource> InpaintedStatic<S> {
    pub fn new(source: S, mask: RegionMask, settings: InpaintSettings) -> Self {
        Self {
            source,
            mask,
            settings,
            background: None,
            polarity: Polarity::default(),
        }
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let index = self.settings.frame_num;
        self.source.seek(index)?;
        let raw = self.source.next_frame().ok_or_else(|| {
            Error::Decode(format!("InpaintedStatic: frame {index} not valid"))
        })?;
        to_single_precision_grayscale(&raw)
    }
}

impl<S: VideoSource> BackgroundModel for InpaintedStatic<S> {
    fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Inpainting background from frame {} ({} masked pixels)",
            self.settings.frame_num,
            self.mask.masked_count()
        );
        let frame = self.read_frame()?;
        self.background = Some(inpaint(&frame, &self.mask, self.settings.inpaint_radius)?);
        self.source.reset()?;
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        let background = self
            .background
            .as_ref()
            .ok_or_else(|| not_initialized("InpaintedStatic"))?;
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
