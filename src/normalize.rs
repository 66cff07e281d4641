use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use ndarray::{Array3, Axis, Zip};

// Rec.601 luma weights, channel order R, G, B
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Convert any raw frame into a single-precision grayscale frame in [0, 1]
///
/// Integer frames are scaled by the maximum of their type. Float frames are
/// assumed to already be in [0, 1] and are clamped; NaN becomes 0. Color frames (3 or 4
/// channels, alpha ignored) are reduced with Rec.601 luma weights.
pub fn to_single_precision_grayscale(frame: &RawFrame) -> Result<Frame> {
    match frame {
        RawFrame::U8(data) => reduce(data, |v| v as f32 / u8::MAX as f32),
        RawFrame::U16(data) => reduce(data, |v| v as f32 / u16::MAX as f32),
        RawFrame::F32(data) => reduce(data, unit_float),
    }
}

/// NaN maps to 0, infinities clamp to the range ends
fn unit_float(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn reduce<T, F>(data: &Array3<T>, scale: F) -> Result<Frame>
where
    T: Copy,
    F: Fn(T) -> f32,
{
    let channels = data.len_of(Axis(2));
    match channels {
        1 => Ok(data.index_axis(Axis(2), 0).mapv(&scale)),
        3 | 4 => Ok(Zip::from(data.lanes(Axis(2))).map_collect(|px| {
            LUMA_WEIGHTS
                .iter()
                .zip(px.iter())
                .map(|(w, &v)| w * scale(v))
                .sum::<f32>()
                .clamp(0.0, 1.0)
        })),
        n => Err(Error::Config(format!(
            "cannot convert a {n}-channel frame to grayscale"
        ))),
    }
}
