use ndarray::{ArrayView2, ArrayViewMut2};
use std::hint;
use std::sync::atomic::{fence, AtomicU32, AtomicU64, Ordering};

/// Frame storage shared across threads, guarded by a sequence counter
///
/// Pixels are stored as `f32` bit patterns in atomics, so concurrent access
/// is never a data race. The sequence number is odd while a write is in
/// progress; readers that see it change retry, so a completed read never
/// mixes two writes.
///
/// At most one thread may write a given slot at any time.
pub(crate) struct SeqFrame {
    seq: AtomicU64,
    data: Box<[AtomicU32]>,
    dim: (usize, usize),
}

impl SeqFrame {
    pub fn new(dim: (usize, usize)) -> Self {
        let zero = 0.0f32.to_bits();
        Self {
            seq: AtomicU64::new(0),
            data: (0..dim.0 * dim.1).map(|_| AtomicU32::new(zero)).collect(),
            dim,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Overwrite the slot; never waits on readers
    pub fn write(&self, frame: ArrayView2<'_, f32>) {
        debug_assert_eq!(frame.dim(), self.dim);
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        for (cell, value) in self.data.iter().zip(frame.iter()) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Copy the slot into `out` once, returning false if a write interfered
    pub fn try_read_into(&self, mut out: ArrayViewMut2<'_, f32>) -> bool {
        debug_assert_eq!(out.dim(), self.dim);
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 == 1 {
            return false;
        }

        for (value, cell) in out.iter_mut().zip(self.data.iter()) {
            *value = f32::from_bits(cell.load(Ordering::Relaxed));
        }

        fence(Ordering::Acquire);
        self.seq.load(Ordering::Relaxed) == before
    }

    /// Copy the slot into `out`, retrying until the copy is consistent
    pub fn read_into(&self, mut out: ArrayViewMut2<'_, f32>) {
        while !self.try_read_into(out.view_mut()) {
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
    fn test_write_then_read() {
        let slot = SeqFrame::new((2, 3));
        let frame = Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as f32);
        slot.write(frame.view());

        let mut out = Array2::<f32>::zeros((2, 3));
        slot.read_into(out.view_mut());
        assert_eq!(out, frame);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let slot = Arc::new(SeqFrame::new((16, 16)));
        let writer_slot = Arc::clone(&slot);

        let writer = thread::spawn(move || {
            for generation in 0..2000 {
                let frame = Array2::from_elem((16, 16), generation as f32);
                writer_slot.write(frame.view());
            }
        });

        let mut out = Array2::<f32>::zeros((16, 16));
        for _ in 0..2000 {
            slot.read_into(out.view_mut());
            let first = out[[0, 0]];
            assert!(out.iter().all(|&v| v == first), "read mixed two writes");
        }
        writer.join().unwrap();
    }
}
