//! Typed prediction extraction.
//!
//! The pipeline drives the engine over one example, then hands the populated
//! example to a caller-chosen result type through [`Prediction`]. A result
//! type is default-constructed and fills itself in from the engine's view of
//! the example; the pipeline owns example cleanup either way.

use serde::{Deserialize, Serialize};

use crate::engine::{ExampleHandle, LearnerEngine, ModelHandle};
use crate::error::Result;

/// Read access to a just-driven example.
pub struct ExampleReader<'a> {
    engine: &'a dyn LearnerEngine,
    model: ModelHandle,
    example: ExampleHandle,
}

impl<'a> ExampleReader<'a> {
    pub(crate) fn new(
        engine: &'a dyn LearnerEngine,
        model: ModelHandle,
        example: ExampleHandle,
    ) -> Self {
        ExampleReader {
            engine,
            model,
            example,
        }
    }

    /// Scalar prediction value.
    pub fn scalar(&self) -> Result<f32> {
        Ok(self.engine.scalar_prediction(self.model, self.example)?)
    }

    /// Per-class score vector.
    pub fn scores(&self) -> Result<Vec<f32>> {
        Ok(self.engine.scores_prediction(self.model, self.example)?)
    }

    /// Multiclass label.
    pub fn multiclass(&self) -> Result<u32> {
        Ok(self.engine.multiclass_prediction(self.model, self.example)?)
    }
}

/// Capability to extract a typed result from a populated example.
pub trait Prediction: Default {
    fn read_from(&mut self, reader: &ExampleReader<'_>) -> Result<()>;
}

/// Raw scalar score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarPrediction {
    pub value: f32,
}

impl Prediction for ScalarPrediction {
    fn read_from(&mut self, reader: &ExampleReader<'_>) -> Result<()> {
        self.value = reader.scalar()?;
        Ok(())
    }
}

/// Scalar score squashed through the logistic link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPrediction {
    pub probability: f32,
}

impl Prediction for ProbabilityPrediction {
    fn read_from(&mut self, reader: &ExampleReader<'_>) -> Result<()> {
        let value = reader.scalar()?;
        self.probability = 1.0 / (1.0 + (-value).exp());
        Ok(())
    }
}

/// Predicted class label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticlassPrediction {
    pub label: u32,
}

impl Prediction for MulticlassPrediction {
    fn read_from(&mut self, reader: &ExampleReader<'_>) -> Result<()> {
        self.label = reader.multiclass()?;
        Ok(())
    }
}

/// Per-class score vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoresPrediction {
    pub scores: Vec<f32>,
}

impl Prediction for ScoresPrediction {
    fn read_from(&mut self, reader: &ExampleReader<'_>) -> Result<()> {
        self.scores = reader.scores()?;
        Ok(())
    }
}
