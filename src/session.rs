//! Per-caller session handle over a learning-engine model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::LearnerSettings;
use crate::engine::{ExampleHandle, LearnerEngine, ModelHandle};
use crate::error::{Error, Result};
use crate::model::SharedModel;
use crate::prediction::{ExampleReader, Prediction};

/// Selects the engine path a pipeline request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnMode {
    /// Pure forward pass, no model update.
    Predict,
    /// Forward pass plus weight update.
    Learn,
}

enum SessionOwnership {
    /// This session built the model resource and frees it on close.
    Owned,
    /// The model handle was seeded from a shared container that owns the
    /// underlying resource; close only deregisters.
    Borrowed(Arc<SharedModel>),
}

/// Handle bound to one engine model, exposing hashing and the
/// predict/learn pipeline.
///
/// A session either owns its model resource outright (built from settings)
/// or borrows one through a [`SharedModel`]. Closing is idempotent and also
/// runs on drop; operations on a closed session report
/// [`Error::SessionClosed`].
pub struct Session {
    engine: Arc<dyn LearnerEngine>,
    model: ModelHandle,
    ownership: SessionOwnership,
    closed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.model)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a fresh model resource from settings. The session is the sole
    /// owner and frees the resource on close.
    pub fn create(engine: Arc<dyn LearnerEngine>, settings: &LearnerSettings) -> Result<Self> {
        let model = engine.create_model(settings)?;
        debug!("owning session created for {}", model);
        Ok(Session {
            engine,
            model,
            ownership: SessionOwnership::Owned,
            closed: AtomicBool::new(false),
        })
    }

    /// Seed an independent model handle from a shared container and register
    /// a reference on it.
    ///
    /// If seeding fails, the failure is reported as the translated engine
    /// error and no reference is registered on the container.
    pub fn attach(shared: &Arc<SharedModel>) -> Result<Self> {
        let engine = Arc::clone(shared.engine());
        let model = engine.seed_model(shared.model())?;
        shared.increment_ref();
        debug!("borrowing session seeded {} from {}", model, shared.model());
        Ok(Session {
            engine,
            model,
            ownership: SessionOwnership::Borrowed(Arc::clone(shared)),
            closed: AtomicBool::new(false),
        })
    }

    /// Namespace hash for `name`.
    pub fn hash_space(&self, name: &str) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.engine.hash_space(self.model, name)?)
    }

    /// Feature hash for `name` under `seed`.
    pub fn hash_feature(&self, name: &str, seed: u32) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.engine.hash_feature(self.model, name, seed)?)
    }

    /// Run one example through the engine and extract a typed result.
    ///
    /// The example is parsed from the line's UTF-8 bytes, driven through the
    /// predict or learn path, read into a fresh `T`, and finished. On every
    /// exit path the example, once created, is finished exactly once; a
    /// failure at any step surfaces as the translated engine error.
    pub fn predict_or_learn<T: Prediction>(&self, line: &str, mode: LearnMode) -> Result<T> {
        self.ensure_open()?;

        // the byte view stays borrowed for the whole parse call
        let bytes = line.as_bytes();
        let example = self.engine.read_example(self.model, bytes)?;
        let mut guard = ExampleGuard::new(self.engine.as_ref(), self.model, example);

        match mode {
            LearnMode::Predict => self.engine.predict(self.model, example)?,
            LearnMode::Learn => self.engine.learn(self.model, example)?,
        }

        let mut prediction = T::default();
        let reader = ExampleReader::new(self.engine.as_ref(), self.model, example);
        prediction.read_from(&reader)?;

        guard.finish()?;
        Ok(prediction)
    }

    /// Learn from one example line.
    pub fn learn<T: Prediction>(&self, line: &str) -> Result<T> {
        self.predict_or_learn(line, LearnMode::Learn)
    }

    /// Predict on one example line without updating the model.
    pub fn predict<T: Prediction>(&self, line: &str) -> Result<T> {
        self.predict_or_learn(line, LearnMode::Predict)
    }

    /// Run the engine's training loop against this session's model.
    pub fn driver(&self) -> Result<()> {
        self.ensure_open()?;
        Ok(self.engine.run_driver(self.model)?)
    }

    /// Release this session's interest in its model.
    ///
    /// Idempotent, and safe to invoke concurrently with a drop elsewhere:
    /// only the first close deregisters or frees. Subsequent operations on
    /// the session report [`Error::SessionClosed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match &self.ownership {
            SessionOwnership::Borrowed(shared) => {
                debug!("borrowing session closing {}", self.model);
                shared.decrement_ref();
            }
            SessionOwnership::Owned => {
                debug!("owning session closing {}", self.model);
                self.engine.free_model(self.model);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Finishes an example exactly once.
///
/// Holds the example until the pipeline either consumes it through
/// [`finish`](Self::finish) or unwinds, in which case drop hands it back to
/// the engine. Either way the engine sees one finish call per example.
struct ExampleGuard<'a> {
    engine: &'a dyn LearnerEngine,
    model: ModelHandle,
    example: Option<ExampleHandle>,
}

impl<'a> ExampleGuard<'a> {
    fn new(engine: &'a dyn LearnerEngine, model: ModelHandle, example: ExampleHandle) -> Self {
        ExampleGuard {
            engine,
            model,
            example: Some(example),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.example.take() {
            Some(example) => Ok(self.engine.finish_example(self.model, example)?),
            None => Ok(()),
        }
    }
}

impl Drop for ExampleGuard<'_> {
    fn drop(&mut self) {
        if let Some(example) = self.example.take() {
            if let Err(err) = self.engine.finish_example(self.model, example) {
                warn!("example cleanup failed for {}: {}", self.model, err);
            }
        }
    }
}
