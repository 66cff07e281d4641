use super::{not_initialized, subtract_background, BackgroundModel, Polarity};
use crate::aggregate::AggregationMethod;
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;
use ndarray::{stack, Axis};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowSettings {
    /// Number of recent samples the background is computed from
    pub num_sample_frames: usize,
    /// Take a sample (and recompute) every n-th frame
    pub sample_every_n_frames: usize,
    pub method: AggregationMethod,
}

impl Default for SlidingWindowSettings {
    fn default() -> Self {
        Self {
            num_sample_frames: 100,
            sample_every_n_frames: 10,
            method: AggregationMethod::default(),
        }
    }
}

/// Background recomputed from a trailing window of the incoming stream
///
/// Recomputation happens inside `subtract`, so sampled frames pay the full
/// aggregation cost. See [`OffloadedStreaming`](super::OffloadedStreaming)
/// for latency-sensitive use.
pub struct SlidingWindow {
    settings: SlidingWindowSettings,
    window: VecDeque<Frame>,
    background: Option<Frame>,
    counter: usize,
    polarity: Polarity,
    initialized: bool,
}

impl SlidingWindow {
    pub fn new(settings: SlidingWindowSettings) -> Result<Self> {
        if settings.num_sample_frames == 0 || settings.sample_every_n_frames == 0 {
            return Err(Error::Config(
                "sliding window size and sampling interval must be > 0".into(),
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(settings.num_sample_frames),
            settings,
            background: None,
            counter: 0,
            polarity: Polarity::default(),
            initialized: false,
        })
    }

    /// Number of frames currently in the window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    fn push_sample(&mut self, frame: Frame) -> Result<()> {
        if let Some(first) = self.window.front() {
            if first.dim() != frame.dim() {
                return Err(Error::ShapeMismatch {
                    expected: first.dim(),
                    actual: frame.dim(),
                });
            }
        }
        if self.window.len() == self.settings.num_sample_frames {
            self.window.pop_front();
        }
        self.window.push_back(frame);

        let views: Vec<_> = self.window.iter().map(|f| f.view()).collect();
        let samples = stack(Axis(2), &views)
            .map_err(|e| Error::Config(format!("failed to stack window: {e}")))?;
        self.background = Some(self.settings.method.aggregate(samples.view())?);
        Ok(())
    }
}

impl BackgroundModel for SlidingWindow {
    fn initialize(&mut self) -> Result<()> {
        self.window.clear();
        self.background = None;
        self.counter = 0;
        self.initialized = true;
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        if !self.initialized {
            return Err(not_initialized("SlidingWindow"));
        }
        let gray = to_single_precision_grayscale(frame)?;
        if self.counter % self.settings.sample_every_n_frames == 0 {
            self.push_sample(gray.clone())?;
        }
        self.counter += 1;

        match &self.background {
            Some(background) => subtract_background(&gray, background, self.polarity),
            // unreachable in practice: the first call always samples
            None => Err(not_initialized("SlidingWindow")),
        }
    }

    fn background_image(&self) -> Option<Frame> {
        if self.initialized {
            self.background.clone()
        } else {
            None
        }
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
