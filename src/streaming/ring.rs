use super::slot::SeqFrame;
use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView2, Axis};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Fixed-capacity ring of recent frames shared between one producer and one
/// consumer
///
/// Once full, each insert overwrites the oldest slot. `count` and
/// `next_write_index` are written only by the producer; the consumer only
/// reads them.
pub struct FrameRing {
    slots: Vec<SeqFrame>,
    dim: (usize, usize),
    count: AtomicUsize,
    next_write_index: AtomicUsize,
    inserted: AtomicU64,
}

impl FrameRing {
    pub fn new(height: usize, width: usize, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("ring buffer capacity must be > 0".into()));
        }
        Ok(Self {
            slots: (0..capacity).map(|_| SeqFrame::new((height, width))).collect(),
            dim: (height, width),
            count: AtomicUsize::new(0),
            next_write_index: AtomicUsize::new(0),
            inserted: AtomicU64::new(0),
        })
    }

    /// (height, width) of every slot
    pub fn frame_dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of populated slots, saturating at capacity
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot the next insert goes to
    pub fn next_write_index(&self) -> usize {
        self.next_write_index.load(Ordering::Acquire)
    }

    /// Total inserts since creation, never wraps back
    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Acquire)
    }

    /// Copy a frame into the next slot
    ///
    /// Must only be called from the single producer.
    pub(crate) fn push(&self, frame: ArrayView2<'_, f32>) -> Result<()> {
        if frame.dim() != self.dim {
            return Err(Error::ShapeMismatch {
                expected: self.dim,
                actual: frame.dim(),
            });
        }
        let capacity = self.slots.len();
        let index = self.next_write_index.load(Ordering::Relaxed);
        self.slots[index].write(frame);

        let count = self.count.load(Ordering::Relaxed);
        self.next_write_index
            .store((index + 1) % capacity, Ordering::Release);
        self.count.store((count + 1).min(capacity), Ordering::Release);
        self.inserted.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Copy of the first `count` slots in slot order, shape (count, height, width)
    ///
    /// Slot order equals insertion order until the ring wraps. Returns `None`
    /// while the ring is empty.
    pub fn get_data(&self) -> Option<Array3<f32>> {
        let count = self.len();
        if count == 0 {
            return None;
        }
        let mut data = Array3::<f32>::zeros((count, self.dim.0, self.dim.1));
        for (slot, out) in self.slots.iter().zip(data.axis_iter_mut(Axis(0))) {
            slot.read_into(out);
        }
        Some(data)
    }
}
