use super::FrameConsumer;
use crate::aggregate::AggregationMethod;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to a running background recompute worker
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    entered: Arc<AtomicBool>,
    recomputes: Arc<AtomicU64>,
    thread: Option<JoinHandle<Result<()>>>,
}

/// Start a worker that keeps aggregating the ring and publishing the result
///
/// The worker polls without blocking: when nothing new was inserted since its
/// last recompute it yields and looks again. It checks the stop flag once per
/// iteration.
pub fn spawn_worker(consumer: FrameConsumer, method: AggregationMethod) -> Result<WorkerHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(AtomicBool::new(false));
    let recomputes = Arc::new(AtomicU64::new(0));

    let thread = {
        let stop = Arc::clone(&stop);
        let entered = Arc::clone(&entered);
        let recomputes = Arc::clone(&recomputes);
        thread::Builder::new()
            .name("background-recompute".into())
            .spawn(move || {
                entered.store(true, Ordering::Release);
                recompute_loop(&consumer, method, &stop, &recomputes)
            })?
    };
    tracing::debug!("Background recompute worker started ({})", method);

    Ok(WorkerHandle {
        stop,
        entered,
        recomputes,
        thread: Some(thread),
    })
}

fn recompute_loop(
    consumer: &FrameConsumer,
    method: AggregationMethod,
    stop: &AtomicBool,
    recomputes: &AtomicU64,
) -> Result<()> {
    let mut last_seen = 0;
    while !stop.load(Ordering::Acquire) {
        let inserted = consumer.inserted();
        if inserted == last_seen {
            thread::yield_now();
            continue;
        }
        let Some(data) = consumer.get_data() else {
            thread::yield_now();
            continue;
        };

        // ring data is (slot, height, width); aggregate over slots
        let stack = data.view().permuted_axes([1, 2, 0]);
        let background = method.aggregate(stack)?;
        consumer.publish(background.view());

        last_seen = inserted;
        recomputes.fetch_add(1, Ordering::Release);
    }
    tracing::debug!(
        "Background recompute worker exiting after {} recomputes",
        recomputes.load(Ordering::Relaxed)
    );
    Ok(())
}

impl WorkerHandle {
    /// True once the worker thread has entered its loop
    pub fn has_started(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    /// Completed recompute-and-publish cycles
    pub fn recomputes(&self) -> u64 {
        self.recomputes.load(Ordering::Acquire)
    }

    /// Signal the worker and wait for it to exit
    ///
    /// There is no timeout: a recompute in progress runs to completion
    /// before the flag is seen.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::Release);
        match thread.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Worker("background recompute worker panicked".into())),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("{}", e);
        }
    }
}
