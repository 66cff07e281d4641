mod chunked;
mod inpainted;
mod no_subtraction;
mod offloaded;
mod sampled;
mod sliding;
mod static_image;

pub use chunked::{ChunkedSettings, ChunkedStatic};
pub use inpainted::{InpaintSettings, InpaintedStatic};
pub use no_subtraction::NoSubtraction;
pub use offloaded::{EngineState, OffloadedStreaming, StreamingSettings};
pub use sampled::{SampledSettings, SampledStatic};
pub use sliding::{SlidingWindow, SlidingWindowSettings};
pub use static_image::StaticImage;

use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use ndarray::Zip;
use std::fmt;
use std::str::FromStr;

/// Whether foreground objects are darker or brighter than the background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    DarkOnBright = -1,
    #[default]
    BrightOnDark = 1,
}

impl Polarity {
    /// Sign applied to `frame - background` before clamping at zero
    pub fn sign(self) -> f32 {
        self as i8 as f32
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::DarkOnBright => f.write_str("dark_on_bright"),
            Polarity::BrightOnDark => f.write_str("bright_on_dark"),
        }
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark_on_bright" | "-1" => Ok(Polarity::DarkOnBright),
            "bright_on_dark" | "1" | "+1" => Ok(Polarity::BrightOnDark),
            other => Err(Error::Config(format!(
                "unknown polarity '{other}', expected dark_on_bright or bright_on_dark"
            ))),
        }
    }
}

/// Trait for background models
///
/// Every variant follows the same lifecycle: construct with settings,
/// [`initialize`](BackgroundModel::initialize) once, then call
/// [`subtract`](BackgroundModel::subtract) for each incoming frame.
pub trait BackgroundModel {
    /// Establish the background estimate
    ///
    /// May be cheap (loading a file) or expensive (sampling a whole video).
    fn initialize(&mut self) -> Result<()>;

    /// Remove the background from a frame
    ///
    /// # Returns
    /// * Foreground frame, same height and width as the input, every value >= 0
    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame>;

    /// Current background estimate, `None` before initialization
    fn background_image(&self) -> Option<Frame>;

    fn polarity(&self) -> Polarity;

    fn set_polarity(&mut self, polarity: Polarity);

    fn is_initialized(&self) -> bool;
}

/// `max(0, sign * (frame - background))`, element-wise
pub fn subtract_background(frame: &Frame, background: &Frame, polarity: Polarity) -> Result<Frame> {
    if frame.dim() != background.dim() {
        return Err(Error::ShapeMismatch {
            expected: background.dim(),
            actual: frame.dim(),
        });
    }
    let sign = polarity.sign();
    Ok(Zip::from(frame)
        .and(background)
        .map_collect(|&f, &b| (sign * (f - b)).max(0.0)))
}

fn not_initialized(model: &str) -> Error {
    Error::Precondition(format!("{model}: subtract called before initialize"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    #[test]
    fn test_polarity_sign() {
        assert_eq!(Polarity::DarkOnBright.sign(), -1.0);
        assert_eq!(Polarity::BrightOnDark.sign(), 1.0);
        assert_eq!(Polarity::default(), Polarity::BrightOnDark);
    }

    #[test]
    fn test_polarity_parse_round_trip() {
        for polarity in [Polarity::DarkOnBright, Polarity::BrightOnDark] {
            assert_eq!(polarity.to_string().parse::<Polarity>().unwrap(), polarity);
        }
        assert_eq!("-1".parse::<Polarity>().unwrap(), Polarity::DarkOnBright);
        assert!(matches!("sideways".parse::<Polarity>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_subtract_clamps_at_zero() {
        let frame = arr2(&[[0.8f32, 0.2], [0.5, 0.0]]);
        let background = Array2::from_elem((2, 2), 0.5f32);

        let bright = subtract_background(&frame, &background, Polarity::BrightOnDark).unwrap();
        let dark = subtract_background(&frame, &background, Polarity::DarkOnBright).unwrap();

        let expect_close = |a: &Frame, b: &Frame| {
            assert!(a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-6))
        };
        expect_close(&bright, &arr2(&[[0.3, 0.0], [0.0, 0.0]]));
        expect_close(&dark, &arr2(&[[0.0, 0.3], [0.0, 0.5]]));
    }

    #[test]
    fn test_polarity_flip_mirrors_pre_clamp_signal() {
        let frame = arr2(&[[0.9f32, 0.1, 0.4]]);
        let background = arr2(&[[0.3f32, 0.6, 0.4]]);

        // dark-on-bright of F over B equals bright-on-dark of B over F
        let dark = subtract_background(&frame, &background, Polarity::DarkOnBright).unwrap();
        let swapped = subtract_background(&background, &frame, Polarity::BrightOnDark).unwrap();
        assert_eq!(dark, swapped);

        // and the two polarities never both report the same pixel
        let bright = subtract_background(&frame, &background, Polarity::BrightOnDark).unwrap();
        assert!(bright.iter().zip(dark.iter()).all(|(b, d)| b * d == 0.0));
    }

    #[test]
    fn test_subtract_shape_mismatch() {
        let frame = Array2::<f32>::zeros((2, 3));
        let background = Array2::<f32>::zeros((3, 2));
        assert!(matches!(
            subtract_background(&frame, &background, Polarity::BrightOnDark),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
