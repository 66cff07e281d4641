use crate::error::{Error, Result};
use crate::normalize::to_single_precision_grayscale;
use crate::source::VideoSource;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array3, Axis};

/// A contiguous time slice of a video: chunk `index` of `count`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub count: usize,
}

impl Chunk {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// Inclusive frame range `[start, end]` covered by this chunk
    pub fn frame_range(&self, total_frames: usize) -> Result<(usize, usize)> {
        if self.count == 0 || self.index >= self.count {
            return Err(Error::Config(format!(
                "chunk {} of {} is out of range",
                self.index, self.count
            )));
        }
        let start = self.index * total_frames / self.count;
        let end = (self.index + 1) * total_frames / self.count;
        if end <= start {
            return Err(Error::Config(format!(
                "chunk {} of {} holds no frames of a {}-frame video",
                self.index, self.count, total_frames
            )));
        }
        Ok((start, end - 1))
    }
}

/// `n` frame indices spaced evenly over the video (or over one chunk of it)
///
/// Indices are linearly interpolated between the first and last frame of
/// the range, inclusive, and rounded to the nearest frame. Duplicates occur
/// when `n` exceeds the number of frames in the range.
pub fn sample_indices(total_frames: usize, n: usize, chunk: Option<Chunk>) -> Result<Vec<usize>> {
    if n == 0 {
        return Err(Error::Config("number of sample frames must be > 0".into()));
    }
    if total_frames == 0 {
        return Err(Error::Decode("video source has no frames".into()));
    }

    let (start, end) = match chunk {
        Some(chunk) => chunk.frame_range(total_frames)?,
        None => (0, total_frames - 1),
    };

    if n == 1 {
        return Ok(vec![start]);
    }
    let step = (end - start) as f64 / (n - 1) as f64;
    Ok((0..n)
        .map(|i| start + (i as f64 * step).round() as usize)
        .collect())
}

/// Read and normalize evenly spaced frames into a (height, width, n) stack
///
/// Any failed seek or read aborts sampling with a decode error. The read
/// position is left wherever the last read put it; callers rewind.
pub fn sample_evenly<S>(source: &mut S, n: usize, chunk: Option<Chunk>) -> Result<Array3<f32>>
where
    S: VideoSource + ?Sized,
{
    sample_evenly_with_progress(source, n, chunk, &ProgressBar::hidden())
}

/// [`sample_evenly`], reporting each sampled frame on `progress`
///
/// The bar is reset to this run's length but left unfinished, so one bar can
/// span several runs; the caller finishes it.
pub fn sample_evenly_with_progress<S>(
    source: &mut S,
    n: usize,
    chunk: Option<Chunk>,
    progress: &ProgressBar,
) -> Result<Array3<f32>>
where
    S: VideoSource + ?Sized,
{
    let _span = tracing::debug_span!("sample_evenly", n, ?chunk).entered();

    let indices = sample_indices(source.frame_count(), n, chunk)?;
    let (height, width) = (source.height(), source.width());
    let mut stack = Array3::<f32>::zeros((height, width, n));

    progress.set_length(n as u64);
    progress.set_position(0);

    for (i, &index) in indices.iter().enumerate() {
        source.seek(index)?;
        let raw = source
            .next_frame()
            .ok_or_else(|| Error::Decode(format!("failed to read frame {index}")))?;
        let frame = to_single_precision_grayscale(&raw)?;
        if frame.dim() != (height, width) {
            return Err(Error::ShapeMismatch {
                expected: (height, width),
                actual: frame.dim(),
            });
        }
        stack.index_axis_mut(Axis(2), i).assign(&frame);
        progress.inc(1);
    }

    Ok(stack)
}

/// Progress bar for a sampling run; hidden unless `visible`
pub fn sampling_progress(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} frames ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}
