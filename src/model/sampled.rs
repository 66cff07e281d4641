use super::{not_initialized, subtract_background, BackgroundModel, Polarity};
use crate::aggregate::AggregationMethod;
use crate::error::Result;
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;
use crate::sampler::{sample_evenly_with_progress, sampling_progress};
use crate::source::VideoSource;

#[derive(Debug, Clone, Copy)]
pub struct SampledSettings {
    pub num_sample_frames: usize,
    pub method: AggregationMethod,
    /// Draw a progress bar while sampling
    pub show_progress: bool,
}

impl Default for SampledSettings {
    fn default() -> Self {
        Self {
            num_sample_frames: 500,
            method: AggregationMethod::default(),
            show_progress: false,
        }
    }
}

/// Static background aggregated from frames sampled across a whole video
///
/// Use this when the full video is available up front and the background
/// does not change over time.
pub struct SampledStatic<S: VideoSource> {
    source: S,
    settings: SampledSettings,
    background: Option<Frame>,
    polarity: Polarity,
}

impl<S: VideoSource> SampledStatic<S> {
    pub fn new(source: S, settings: SampledSettings) -> Self {
        Self {
            source,
            settings,
            background: None,
            polarity: Polarity::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: VideoSource> BackgroundModel for SampledStatic<S> {
    fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Static background: sampling {} frames of {}",
            self.settings.num_sample_frames,
            self.source.frame_count()
        );
        let progress = sampling_progress(self.settings.show_progress);
        progress.set_message("Sampling");
        let stack = sample_evenly_with_progress(
            &mut self.source,
            self.settings.num_sample_frames,
            None,
            &progress,
        )?;
        progress.finish_and_clear();

        tracing::info!("Computing {} background", self.settings.method);
        self.background = Some(self.settings.method.aggregate(stack.view())?);
        self.source.reset()?;
        tracing::info!("Static background ready");
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        let background = self
            .background
            .as_ref()
            .ok_or_else(|| not_initialized("SampledStatic"))?;
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
