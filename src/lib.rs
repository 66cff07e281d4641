//! Background estimation and subtraction for grayscale video
//!
//! A [`BackgroundModel`] estimates what a scene looks like without its moving
//! foreground and removes that estimate from each incoming frame. Models
//! range from a fixed image on disk to a streaming estimate recomputed on a
//! worker thread while frames are being subtracted.
//!
//! Frames enter as [`RawFrame`]s of 8-bit, 16-bit or float samples and are
//! normalized to single-channel `f32` in `[0, 1]` before any arithmetic.

pub mod aggregate;
pub mod error;
pub mod frame;
pub mod inpaint;
pub mod model;
pub mod normalize;
pub mod sampler;
pub mod source;
pub mod streaming;

pub use aggregate::AggregationMethod;
pub use error::{Error, Result};
pub use frame::{Frame, PixelType, RawFrame};
pub use inpaint::RegionMask;
pub use model::{
    subtract_background, BackgroundModel, ChunkedSettings, ChunkedStatic, EngineState,
    InpaintSettings, InpaintedStatic, NoSubtraction, OffloadedStreaming, Polarity,
    SampledSettings, SampledStatic, SlidingWindow, SlidingWindowSettings, StaticImage,
    StreamingSettings,
};
pub use normalize::to_single_precision_grayscale;
pub use source::{ImageSequence, MemorySource, VideoSource};
