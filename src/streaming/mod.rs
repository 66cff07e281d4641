//! Shared state for recomputing a background off the subtraction path
//!
//! One producer (the thread calling `subtract`) feeds frames into a
//! [`FrameRing`]; one worker repeatedly aggregates the ring and writes the
//! result to a [`PublishedBackground`]. Each shared field has exactly one
//! writer:
//!
//! - ring slots, `count`, `next_write_index`: the producer
//! - published background: the worker, except for the bootstrap frame the
//!   producer writes before its first ring insert becomes visible
//!
//! The worker never publishes while the ring is empty, so the bootstrap write
//! always completes before the worker's first write can start. Neither side
//! takes a lock or waits on the other.

mod published;
mod ring;
mod slot;
mod worker;

pub use published::PublishedBackground;
pub use ring::FrameRing;
pub use worker::{spawn_worker, WorkerHandle};

use crate::error::{Error, Result};
use crate::frame::Frame;
use ndarray::{Array3, ArrayView2};
use std::sync::Arc;

struct SharedRegion {
    ring: FrameRing,
    background: PublishedBackground,
}

/// Create the shared ring and background slot, returning both ends
pub fn shared_region(
    height: usize,
    width: usize,
    capacity: usize,
) -> Result<(FrameProducer, FrameConsumer)> {
    let region = Arc::new(SharedRegion {
        ring: FrameRing::new(height, width, capacity)?,
        background: PublishedBackground::new(height, width),
    });
    Ok((
        FrameProducer {
            region: Arc::clone(&region),
        },
        FrameConsumer { region },
    ))
}

/// Producer end: inserts frames and reads the published background
///
/// Not `Clone`, so there is only ever one producer per region.
pub struct FrameProducer {
    region: Arc<SharedRegion>,
}

impl FrameProducer {
    /// Insert a frame, seeding the published background on the first insert
    pub fn insert(&self, frame: ArrayView2<'_, f32>) -> Result<()> {
        let region = &*self.region;
        let expected = region.ring.frame_dim();
        if frame.dim() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: frame.dim(),
            });
        }
        if region.ring.inserted() == 0 {
            region.background.publish(frame);
        }
        region.ring.push(frame)
    }

    /// Snapshot of the most recently published background
    pub fn background(&self) -> Frame {
        self.region.background.snapshot()
    }

    /// Publishes so far, including the bootstrap frame
    pub fn background_generation(&self) -> u64 {
        self.region.background.generation()
    }

    pub fn ring(&self) -> &FrameRing {
        &self.region.ring
    }
}

/// Consumer end: reads ring contents and publishes backgrounds
///
/// Not `Clone`, so there is only ever one publisher per region.
pub struct FrameConsumer {
    region: Arc<SharedRegion>,
}

impl FrameConsumer {
    /// Current ring contents, shape (count, height, width)
    pub fn get_data(&self) -> Option<Array3<f32>> {
        self.region.ring.get_data()
    }

    /// Total inserts the producer has made
    pub fn inserted(&self) -> u64 {
        self.region.ring.inserted()
    }

    pub fn publish(&self, background: ArrayView2<'_, f32>) {
        self.region.background.publish(background);
    }
}
