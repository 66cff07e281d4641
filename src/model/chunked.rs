use super::{not_initialized, subtract_background, BackgroundModel, Polarity};
use crate::aggregate::AggregationMethod;
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;
use crate::sampler::{sample_evenly_with_progress, sampling_progress, Chunk};
use crate::source::VideoSource;
use ndarray::{stack, Axis};

#[derive(Debug, Clone, Copy)]
pub struct ChunkedSettings {
    /// Frames sampled within each chunk
    pub num_sample_frames: usize,
    pub num_chunks: usize,
    pub method: AggregationMethod,
    pub show_progress: bool,
}

impl Default for ChunkedSettings {
    fn default() -> Self {
        Self {
            num_sample_frames: 500,
            num_chunks: 5,
            method: AggregationMethod::default(),
            show_progress: false,
        }
    }
}

/// One static background per time chunk of a video
///
/// Use this when the full video is available up front but the background
/// drifts over time. Frames passed to `subtract` are assumed to arrive in
/// playback order; the chunk is picked from the number of frames seen so far.
pub struct ChunkedStatic<S: VideoSource> {
    source: S,
    settings: ChunkedSettings,
    backgrounds: Vec<Frame>,
    frames_per_chunk: usize,
    image_count: usize,
    polarity: Polarity,
}

impl<S: VideoSource> ChunkedStatic<S> {
    pub fn new(source: S, settings: ChunkedSettings) -> Self {
        Self {
            source,
            settings,
            backgrounds: Vec::new(),
            frames_per_chunk: 0,
            image_count: 0,
            polarity: Polarity::default(),
        }
    }

    /// Chunk used for the next `subtract` call
    ///
    /// Clamped to the last chunk once more frames than the video holds
    /// have been subtracted.
    pub fn current_chunk(&self) -> usize {
        if self.frames_per_chunk == 0 {
            return 0;
        }
        (self.image_count / self.frames_per_chunk).min(self.settings.num_chunks - 1)
    }

    /// Background of a single chunk
    pub fn chunk_background(&self, chunk: usize) -> Option<&Frame> {
        self.backgrounds.get(chunk)
    }
}

impl<S: VideoSource> BackgroundModel for ChunkedStatic<S> {
    fn initialize(&mut self) -> Result<()> {
        let num_chunks = self.settings.num_chunks;
        let total = self.source.frame_count();
        if num_chunks == 0 || total / num_chunks == 0 {
            return Err(Error::Config(format!(
                "cannot split a {total}-frame video into {num_chunks} chunks"
            )));
        }

        tracing::info!(
            "Chunked background: {} chunks, {} samples each",
            num_chunks,
            self.settings.num_sample_frames
        );
        let progress = sampling_progress(self.settings.show_progress);
        let mut backgrounds = Vec::with_capacity(num_chunks);
        for index in 0..num_chunks {
            progress.set_message(format!("Chunk {}/{}", index + 1, num_chunks));
            let samples = sample_evenly_with_progress(
                &mut self.source,
                self.settings.num_sample_frames,
                Some(Chunk::new(index, num_chunks)),
                &progress,
            )?;
            tracing::debug!("Computing background for chunk {}/{}", index + 1, num_chunks);
            backgrounds.push(self.settings.method.aggregate(samples.view())?);
        }
        progress.finish_and_clear();
        self.source.reset()?;

        self.backgrounds = backgrounds;
        self.frames_per_chunk = total / num_chunks;
        self.image_count = 0;
        tracing::info!("Chunked background ready");
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        if self.backgrounds.is_empty() {
            return Err(not_initialized("ChunkedStatic"));
        }
        let chunk = self.current_chunk();
        let gray = to_single_precision_grayscale(frame)?;
        let out = subtract_background(&gray, &self.backgrounds[chunk], self.polarity)?;
        self.image_count += 1;
        Ok(out)
    }

    /// Mean over all chunk backgrounds
    fn background_image(&self) -> Option<Frame> {
        if self.backgrounds.is_empty() {
            return None;
        }
        let views: Vec<_> = self.backgrounds.iter().map(|b| b.view()).collect();
        stack(Axis(2), &views).ok()?.mean_axis(Axis(2))
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    fn is_initialized(&self) -> bool {
        !self.backgrounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use ndarray::Array2;

    /// 12 frames whose level steps up every 4 frames: 30, 60, 90
    fn stepped_source() -> MemorySource {
        MemorySource::new(
            (0..12)
                .map(|i| RawFrame::gray_u8(Array2::from_elem((2, 2), 30 * (1 + i / 4) as u8)))
                .collect(),
        )
        .unwrap()
    }

    fn settings() -> ChunkedSettings {
        ChunkedSettings {
            num_sample_frames: 3,
            num_chunks: 3,
            method: AggregationMethod::Median,
            show_progress: false,
        }
    }

    #[test]
    fn test_each_chunk_gets_its_own_background() {
        let mut model = ChunkedStatic::new(stepped_source(), settings());
        model.initialize().unwrap();

        for (chunk, level) in [30.0f32, 60.0, 90.0].iter().enumerate() {
            let background = model.chunk_background(chunk).unwrap();
            assert!(background.iter().all(|&v| (v - level / 255.0).abs() < 1e-6));
        }

        let mean = model.background_image().unwrap();
        assert!(mean.iter().all(|&v| (v - 60.0 / 255.0).abs() < 1e-6));
    }

    #[test]
    fn test_chunk_index_monotonic_and_clamped() {
        let mut model = ChunkedStatic::new(stepped_source(), settings());
        model.initialize().unwrap();

        let frame = RawFrame::gray_u8(Array2::from_elem((2, 2), 90));
        let mut previous = 0;
        for call in 0..20 {
            let chunk = model.current_chunk();
            assert!(chunk >= previous);
            assert!(chunk <= 2);
            if call >= 8 {
                assert_eq!(chunk, 2);
            }
            previous = chunk;
            model.subtract(&frame).unwrap();
        }
    }

    #[test]
    fn test_subtraction_follows_chunk() {
        let mut model = ChunkedStatic::new(stepped_source(), settings());
        model.initialize().unwrap();

        // a level-90 frame is foreground against chunk 0 and background in chunk 2
        let frame = RawFrame::gray_u8(Array2::from_elem((2, 2), 90));
        let first = model.subtract(&frame).unwrap();
        assert!(first.iter().all(|&v| v > 0.2));

        for _ in 0..8 {
            model.subtract(&frame).unwrap();
        }
        let late = model.subtract(&frame).unwrap();
        assert!(late.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn test_more_chunks_than_frames_rejected() {
        let source = MemorySource::new(vec![RawFrame::gray_u8(Array2::zeros((2, 2)))]).unwrap();
        let mut model = ChunkedStatic::new(source, settings());
        assert!(matches!(model.initialize(), Err(Error::Config(_))));
    }
}
