//! Reference-counted container for a model resource shared by many
//! sessions.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::LearnerSettings;
use crate::engine::{LearnerEngine, ModelHandle};
use crate::error::Result;

/// Single ownership authority for one engine model resource.
///
/// Sessions attach by seeding an independent handle from this container's
/// resource and registering a reference; the resource is freed exactly once,
/// on the last deregistration, or on drop if no session ever borrowed it.
/// Count manipulation is atomic: sessions may deregister from different
/// threads (an explicit close racing a drop elsewhere).
pub struct SharedModel {
    engine: Arc<dyn LearnerEngine>,
    model: ModelHandle,
    refs: AtomicUsize,
    released: AtomicBool,
}

impl SharedModel {
    /// Build a fresh model resource from settings and wrap it for sharing.
    pub fn create(engine: Arc<dyn LearnerEngine>, settings: &LearnerSettings) -> Result<Arc<Self>> {
        let model = engine.create_model(settings)?;
        debug!("shared container created for {}", model);
        Ok(Arc::new(SharedModel {
            engine,
            model,
            refs: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        }))
    }

    /// Wrap a model resource that a collaborator already built.
    pub fn from_handle(engine: Arc<dyn LearnerEngine>, model: ModelHandle) -> Arc<Self> {
        Arc::new(SharedModel {
            engine,
            model,
            refs: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        })
    }

    pub(crate) fn engine(&self) -> &Arc<dyn LearnerEngine> {
        &self.engine
    }

    pub(crate) fn model(&self) -> ModelHandle {
        self.model
    }

    /// Register one borrowing session.
    pub fn increment_ref(&self) {
        self.refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Deregister one borrowing session, freeing the model resource on the
    /// last deregistration.
    ///
    /// # Panics
    ///
    /// Panics on reference-count underflow: calling this more often than
    /// [`increment_ref`](Self::increment_ref) is a contract violation the
    /// session layer is responsible for never committing.
    pub fn decrement_ref(&self) {
        let previous = self.refs.fetch_sub(1, Ordering::AcqRel);
        assert!(previous != 0, "reference count underflow on shared model");
        if previous == 1 {
            self.release();
        }
    }

    /// Current number of registered sessions.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!("shared container releasing {}", self.model);
            self.engine.free_model(self.model);
        }
    }
}

impl Drop for SharedModel {
    fn drop(&mut self) {
        // a container that was never borrowed still owns its resource; with
        // borrowers, the last decrement has already released it and the
        // latch makes this a no-op
        if self.refs.load(Ordering::Acquire) == 0 {
            self.release();
        }
    }
}
