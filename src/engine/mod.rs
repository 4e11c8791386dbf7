//! Engine abstraction layer for pluggable learning backends.
//!
//! The session layer never talks to a concrete learner directly; everything
//! goes through [`LearnerEngine`]. Model and example state live inside the
//! engine and are addressed through opaque handles, so the caller-facing
//! types can manage lifecycles without knowing anything about learner
//! internals. Engine failures stay behind this boundary as [`EngineError`]
//! and are translated into the crate error type by the session layer.

use std::fmt;

use crate::config::LearnerSettings;

pub mod hash;
pub mod sgd;
pub mod textfmt;

pub use sgd::SgdEngine;

/// Opaque handle to an engine-owned model resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(u64);

impl ModelHandle {
    pub fn from_raw(raw: u64) -> Self {
        ModelHandle(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

/// Opaque handle to an engine-owned example, valid for a single
/// predict/learn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExampleHandle(u64);

impl ExampleHandle {
    pub fn from_raw(raw: u64) -> Self {
        ExampleHandle(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExampleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "example#{}", self.0)
    }
}

/// Failure raised by a learning engine.
///
/// Deliberately just a diagnostic message: the session layer collapses every
/// engine failure into one caller-visible error kind, so structure here
/// would never survive the boundary anyway.
#[derive(Debug, Clone)]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine-internal operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Interface the session layer requires from a learning engine.
///
/// Handle validity rules:
/// - A [`ModelHandle`] stays valid until [`free_model`](Self::free_model)
///   is called on it, or until the root model it was seeded from is freed.
/// - An [`ExampleHandle`] belongs to the model it was read against and must
///   be passed to [`finish_example`](Self::finish_example) exactly once.
///
/// Implementations must be safe to share across threads; the session layer
/// does not serialize calls on a shared model.
pub trait LearnerEngine: Send + Sync {
    /// Build a fresh model resource from validated settings.
    fn create_model(&self, settings: &LearnerSettings) -> EngineResult<ModelHandle>;

    /// Produce an independent model handle seeded from an existing one,
    /// sharing underlying weight state per the engine's own semantics.
    fn seed_model(&self, model: ModelHandle) -> EngineResult<ModelHandle>;

    /// Release a model resource and everything seeded from it.
    fn free_model(&self, model: ModelHandle);

    /// Hash a namespace name to its id.
    fn hash_space(&self, model: ModelHandle, name: &str) -> EngineResult<u32>;

    /// Hash a feature name under the given seed.
    fn hash_feature(&self, model: ModelHandle, name: &str, seed: u32) -> EngineResult<u32>;

    /// Parse one text-encoded example into engine-internal representation.
    fn read_example(&self, model: ModelHandle, line: &[u8]) -> EngineResult<ExampleHandle>;

    /// Run the prediction path over an example. Must not mutate model state.
    fn predict(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()>;

    /// Run the learning path over an example, updating model weights.
    fn learn(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()>;

    /// Release engine-internal per-example state.
    fn finish_example(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()>;

    /// Scalar prediction stored on a just-driven example.
    fn scalar_prediction(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<f32>;

    /// Per-class scores stored on a just-driven example.
    fn scores_prediction(
        &self,
        model: ModelHandle,
        example: ExampleHandle,
    ) -> EngineResult<Vec<f32>>;

    /// Multiclass label stored on a just-driven example.
    fn multiclass_prediction(
        &self,
        model: ModelHandle,
        example: ExampleHandle,
    ) -> EngineResult<u32>;

    /// Run the engine's generic training loop against the model's
    /// configured input source.
    fn run_driver(&self, model: ModelHandle) -> EngineResult<()>;
}
