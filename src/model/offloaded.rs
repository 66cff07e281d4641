use super::{subtract_background, BackgroundModel, Polarity};
use crate::aggregate::AggregationMethod;
use crate::error::{Error, Result};
use crate::frame::{Frame, RawFrame};
use crate::normalize::to_single_precision_grayscale;
use crate::streaming::{shared_region, spawn_worker, FrameProducer, WorkerHandle};

#[derive(Debug, Clone, Copy)]
pub struct StreamingSettings {
    /// Ring buffer capacity: the background covers this many recent samples
    pub num_images: usize,
    /// Insert every n-th subtracted frame into the ring
    pub every_n_image: usize,
    pub method: AggregationMethod,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            num_images: 500,
            every_n_image: 100,
            method: AggregationMethod::default(),
        }
    }
}

/// Lifecycle of the streaming engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    /// Worker launched but not yet in its loop
    Started,
    Running,
    Stopped,
}

enum Engine {
    Idle,
    Running {
        producer: FrameProducer,
        worker: WorkerHandle,
    },
    Stopped {
        producer: FrameProducer,
    },
}

/// Streaming background recomputed on a separate worker thread
///
/// Use this for live sources where subtraction must keep frame rate. The
/// subtraction path only copies sampled frames into a shared ring and reads
/// the latest published background; it never waits for a recompute. The
/// background it sees may therefore lag the stream by however long the
/// worker takes to aggregate the ring.
///
/// Call [`stop`](OffloadedStreaming::stop) to shut the worker down; dropping
/// the model does the same.
pub struct OffloadedStreaming {
    height: usize,
    width: usize,
    settings: StreamingSettings,
    engine: Engine,
    counter: usize,
    polarity: Polarity,
}

impl OffloadedStreaming {
    pub fn new(height: usize, width: usize, settings: StreamingSettings) -> Result<Self> {
        if settings.num_images == 0 || settings.every_n_image == 0 {
            return Err(Error::Config(
                "streaming ring size and sampling interval must be > 0".into(),
            ));
        }
        Ok(Self {
            height,
            width,
            settings,
            engine: Engine::Idle,
            counter: 0,
            polarity: Polarity::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        match &self.engine {
            Engine::Idle => EngineState::Idle,
            Engine::Running { worker, .. } if !worker.has_started() => EngineState::Started,
            Engine::Running { .. } => EngineState::Running,
            Engine::Stopped { .. } => EngineState::Stopped,
        }
    }

    /// Number of backgrounds published, counting the bootstrap frame
    pub fn background_generation(&self) -> u64 {
        match &self.engine {
            Engine::Idle => 0,
            Engine::Running { producer, .. } | Engine::Stopped { producer } => {
                producer.background_generation()
            }
        }
    }

    /// Signal the worker to exit and wait for it
    ///
    /// Blocks until any recompute in progress finishes. The last published
    /// background stays readable afterwards.
    pub fn stop(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.engine, Engine::Idle) {
            Engine::Running { producer, worker } => {
                self.engine = Engine::Stopped { producer };
                let result = worker.stop();
                tracing::info!("Streaming background stopped after {} frames", self.counter);
                result
            }
            other => {
                self.engine = other;
                Err(Error::Precondition(
                    "OffloadedStreaming: stop called while not running".into(),
                ))
            }
        }
    }

    fn producer(&self) -> Result<&FrameProducer> {
        match &self.engine {
            Engine::Running { producer, .. } => Ok(producer),
            Engine::Idle => Err(Error::Precondition(
                "OffloadedStreaming: subtract called before initialize".into(),
            )),
            Engine::Stopped { .. } => Err(Error::Precondition(
                "OffloadedStreaming: subtract called after stop".into(),
            )),
        }
    }
}

impl BackgroundModel for OffloadedStreaming {
    fn initialize(&mut self) -> Result<()> {
        if let Engine::Running { .. } = self.engine {
            return Err(Error::Precondition(
                "OffloadedStreaming: initialize called twice without stop".into(),
            ));
        }
        let (producer, consumer) =
            shared_region(self.height, self.width, self.settings.num_images)?;
        let worker = spawn_worker(consumer, self.settings.method)?;

        tracing::info!(
            "Streaming background: {}x{}, ring of {}, sampling every {} frames",
            self.width,
            self.height,
            self.settings.num_images,
            self.settings.every_n_image
        );
        self.engine = Engine::Running { producer, worker };
        self.counter = 0;
        Ok(())
    }

    fn subtract(&mut self, frame: &RawFrame) -> Result<Frame> {
        let producer = self.producer()?;
        let gray = to_single_precision_grayscale(frame)?;
        if gray.dim() != (self.height, self.width) {
            return Err(Error::ShapeMismatch {
                expected: (self.height, self.width),
                actual: gray.dim(),
            });
        }

        if self.counter % self.settings.every_n_image == 0 {
            producer.insert(gray.view())?;
        }
        let background = producer.background();
        self.counter += 1;

        subtract_background(&gray, &background, self.polarity)
    }

    fn background_image(&self) -> Option<Frame> {
        match &self.engine {
            Engine::Idle => None,
            Engine::Running { producer, .. } | Engine::Stopped { producer } => {
                Some(producer.background())
            }
        }
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    fn is_initialized(&self) -> bool {
        matches!(self.engine, Engine::Running { .. })
    }
}

impl Drop for OffloadedStreaming {
    fn drop(&mut self) {
        if let Engine::Running { .. } = self.engine {
            if let Err(e) = self.stop() {
                tracing::warn!("{}", e);
            }
        }
    }
}
