use crate::error::{Error, Result};
use crate::frame::Frame;
use ndarray::{concatenate, ArrayView1, ArrayView3, Axis, Zip};
use rayon::prelude::*;

/// Most frequent value of each pixel along the sample axis
///
/// Ties resolve to the lowest value.
pub fn mode(stack: ArrayView3<'_, f32>) -> Result<Frame> {
    if stack.len_of(Axis(2)) == 0 {
        return Err(Error::EmptyStack);
    }
    Ok(Zip::from(stack.lanes(Axis(2))).map_collect(mode_of))
}

/// Mode computed over contiguous row bands, one band per worker
///
/// Bands are `ceil(height / partitions)` rows tall, so the last band may be
/// shorter. Results are stitched back in row order and are identical to
/// [`mode`] on the same stack.
pub fn mode_partitioned(stack: ArrayView3<'_, f32>, partitions: usize) -> Result<Frame> {
    if partitions == 0 {
        return Err(Error::Config("mode partition count must be > 0".into()));
    }
    let height = stack.len_of(Axis(0));
    if height == 0 || stack.len_of(Axis(2)) == 0 {
        return mode(stack);
    }

    let band_rows = height.div_ceil(partitions);
    let bands: Vec<ArrayView3<'_, f32>> = stack.axis_chunks_iter(Axis(0), band_rows).collect();
    tracing::debug!("mode over {} bands of {} rows", bands.len(), band_rows);

    let results = bands.into_par_iter().map(mode).collect::<Result<Vec<_>>>()?;
    let views: Vec<_> = results.iter().map(|band| band.view()).collect();

    concatenate(Axis(0), &views)
        .map_err(|e| Error::Config(format!("failed to stitch mode bands: {e}")))
}

fn mode_of(samples: ArrayView1<'_, f32>) -> f32 {
    let mut values = samples.to_vec();
    values.sort_unstable_by(f32::total_cmp);

    let mut best = values[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        // bitwise grouping, so NaN samples form a run of their own
        let run = values[i..]
            .iter()
            .take_while(|v| v.total_cmp(&value).is_eq())
            .count();
        // strictly greater keeps the lowest value on ties
        if run > best_count {
            best = value;
            best_count = run;
        }
        i += run;
    }
    best
}
