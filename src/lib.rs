pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod prediction;
pub mod session;

// Re-export commonly used types
pub use config::LearnerSettings;
pub use engine::{EngineError, ExampleHandle, LearnerEngine, ModelHandle, SgdEngine};
pub use error::{Error, Result};
pub use model::SharedModel;
pub use prediction::{
    MulticlassPrediction, Prediction, ProbabilityPrediction, ScalarPrediction, ScoresPrediction,
};
pub use session::{LearnMode, Session};
