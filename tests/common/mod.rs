//! Shared resource-tracking double for the engine boundary.
//!
//! Counts every lifecycle-relevant engine call and can be told to fail at
//! any step, so the suites can pin down cleanup behavior on each exit path.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use leveret_core::config::LearnerSettings;
use leveret_core::engine::hash::uniform_hash;
use leveret_core::engine::{EngineError, EngineResult, ExampleHandle, LearnerEngine, ModelHandle};

#[derive(Default)]
struct FailureFlags {
    seed: bool,
    read: bool,
    predict: bool,
    learn: bool,
    scalar: bool,
    hash: bool,
}

#[derive(Default)]
pub struct TrackingEngine {
    flags: Mutex<FailureFlags>,
    next_model: AtomicU64,
    next_example: AtomicU64,
    created: AtomicUsize,
    seeded: AtomicUsize,
    freed: Mutex<Vec<u64>>,
    reads: AtomicUsize,
    predicts: AtomicUsize,
    learns: AtomicUsize,
    finishes: AtomicUsize,
    live: Mutex<HashSet<u64>>,
    driver_runs: AtomicUsize,
}

impl TrackingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(TrackingEngine::default())
    }

    pub fn fail_seed(&self) {
        self.flags.lock().seed = true;
    }

    pub fn fail_read(&self) {
        self.flags.lock().read = true;
    }

    pub fn fail_predict(&self) {
        self.flags.lock().predict = true;
    }

    pub fn fail_learn(&self) {
        self.flags.lock().learn = true;
    }

    pub fn fail_scalar(&self) {
        self.flags.lock().scalar = true;
    }

    pub fn fail_hash(&self) {
        self.flags.lock().hash = true;
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn seeded_count(&self) -> usize {
        self.seeded.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> Vec<u64> {
        self.freed.lock().clone()
    }

    pub fn free_count(&self) -> usize {
        self.freed.lock().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn predict_count(&self) -> usize {
        self.predicts.load(Ordering::SeqCst)
    }

    pub fn learn_count(&self) -> usize {
        self.learns.load(Ordering::SeqCst)
    }

    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }

    pub fn live_examples(&self) -> usize {
        self.live.lock().len()
    }

    pub fn driver_runs(&self) -> usize {
        self.driver_runs.load(Ordering::SeqCst)
    }
}

impl LearnerEngine for TrackingEngine {
    fn create_model(&self, _settings: &LearnerSettings) -> EngineResult<ModelHandle> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(ModelHandle::from_raw(
            self.next_model.fetch_add(1, Ordering::SeqCst),
        ))
    }

    fn seed_model(&self, _model: ModelHandle) -> EngineResult<ModelHandle> {
        if self.flags.lock().seed {
            return Err(EngineError::new("seed failure injected"));
        }
        self.seeded.fetch_add(1, Ordering::SeqCst);
        Ok(ModelHandle::from_raw(
            self.next_model.fetch_add(1, Ordering::SeqCst),
        ))
    }

    fn free_model(&self, model: ModelHandle) {
        self.freed.lock().push(model.into_raw());
    }

    fn hash_space(&self, _model: ModelHandle, name: &str) -> EngineResult<u32> {
        if self.flags.lock().hash {
            return Err(EngineError::new("hash failure injected"));
        }
        Ok(uniform_hash(name.as_bytes(), 0))
    }

    fn hash_feature(&self, _model: ModelHandle, name: &str, seed: u32) -> EngineResult<u32> {
        if self.flags.lock().hash {
            return Err(EngineError::new("hash failure injected"));
        }
        Ok(uniform_hash(name.as_bytes(), seed))
    }

    fn read_example(&self, _model: ModelHandle, _line: &[u8]) -> EngineResult<ExampleHandle> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.flags.lock().read {
            return Err(EngineError::new("read failure injected"));
        }
        let id = self.next_example.fetch_add(1, Ordering::SeqCst);
        self.live.lock().insert(id);
        Ok(ExampleHandle::from_raw(id))
    }

    fn predict(&self, _model: ModelHandle, _example: ExampleHandle) -> EngineResult<()> {
        self.predicts.fetch_add(1, Ordering::SeqCst);
        if self.flags.lock().predict {
            return Err(EngineError::new("predict failure injected"));
        }
        Ok(())
    }

    fn learn(&self, _model: ModelHandle, _example: ExampleHandle) -> EngineResult<()> {
        self.learns.fetch_add(1, Ordering::SeqCst);
        if self.flags.lock().learn {
            return Err(EngineError::new("learn failure injected"));
        }
        Ok(())
    }

    fn finish_example(&self, _model: ModelHandle, example: ExampleHandle) -> EngineResult<()> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        if self.live.lock().remove(&example.into_raw()) {
            Ok(())
        } else {
            Err(EngineError::new("example finished twice"))
        }
    }

    fn scalar_prediction(
        &self,
        _model: ModelHandle,
        _example: ExampleHandle,
    ) -> EngineResult<f32> {
        if self.flags.lock().scalar {
            return Err(EngineError::new("extraction failure injected"));
        }
        Ok(0.25)
    }

    fn scores_prediction(
        &self,
        _model: ModelHandle,
        _example: ExampleHandle,
    ) -> EngineResult<Vec<f32>> {
        Ok(vec![0.25])
    }

    fn multiclass_prediction(
        &self,
        _model: ModelHandle,
        _example: ExampleHandle,
    ) -> EngineResult<u32> {
        Ok(7)
    }

    fn run_driver(&self, _model: ModelHandle) -> EngineResult<()> {
        self.driver_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
