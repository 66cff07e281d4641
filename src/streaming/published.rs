use super::slot::SeqFrame;
use crate::frame::Frame;
use ndarray::ArrayView2;
use std::hint;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// The background frame the worker publishes for the producer to read
///
/// Double buffered: a new frame is written into the back slot and then made
/// current by swapping the front index, so readers always copy a complete
/// frame of one generation.
pub struct PublishedBackground {
    slots: [SeqFrame; 2],
    front: AtomicUsize,
    generation: AtomicU64,
}

impl PublishedBackground {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            slots: [SeqFrame::new((height, width)), SeqFrame::new((height, width))],
            front: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Number of frames published so far; 0 means still all zeros
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the current background
    ///
    /// Only one thread may publish at a time.
    pub(crate) fn publish(&self, frame: ArrayView2<'_, f32>) {
        let back = 1 - self.front.load(Ordering::Relaxed);
        self.slots[back].write(frame);
        self.front.store(back, Ordering::Release);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Copy of the current background
    pub fn snapshot(&self) -> Frame {
        let mut out = Frame::zeros(self.slots[0].dim());
        loop {
            let front = self.front.load(Ordering::Acquire);
            if self.slots[front].try_read_into(out.view_mut()) {
                return out;
            }
            // the publisher lapped us and is rewriting this slot
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_zeroed() {
        let published = PublishedBackground::new(2, 3);
        assert_eq!(published.generation(), 0);
        assert_eq!(published.snapshot(), Frame::zeros((2, 3)));
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let published = PublishedBackground::new(2, 2);
        published.publish(Array2::from_elem((2, 2), 0.25).view());
        published.publish(Array2::from_elem((2, 2), 0.75).view());

        assert_eq!(published.generation(), 2);
        assert_eq!(published.snapshot(), Array2::from_elem((2, 2), 0.75));
    }

    #[test]
    fn test_snapshots_are_single_generation() {
        let published = Arc::new(PublishedBackground::new(32, 32));
        let publisher = Arc::clone(&published);

        let worker = thread::spawn(move || {
            for generation in 1..=3000 {
                publisher.publish(Array2::from_elem((32, 32), generation as f32).view());
            }
        });

        for _ in 0..3000 {
            let snapshot = published.snapshot();
            let value = snapshot[[0, 0]];
            assert!(snapshot.iter().all(|&v| v == value), "torn background read");
        }
        worker.join().unwrap();
    }
}
