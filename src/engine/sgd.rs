//! Built-in reference engine: a feature-hashed linear learner trained with
//! stochastic gradient descent on squared loss.
//!
//! Models live in an engine-internal table addressed by handle. A seeded
//! model shares its root's weight table but keeps its own example slots, so
//! updates made through any handle are visible to every handle sharing the
//! table. Freeing a root reclaims every handle seeded from it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::LearnerSettings;

use super::hash::uniform_hash;
use super::textfmt::{parse_line, ParsedExample};
use super::{EngineError, EngineResult, ExampleHandle, LearnerEngine, ModelHandle};

/// Fixed hashed slot for the bias weight, so it shares the weight table
/// with regular features.
const BIAS_FEATURE: u32 = 11650396;

struct ExampleSlot {
    parsed: ParsedExample,
    prediction: f32,
}

struct ModelEntry {
    mask: u32,
    learning_rate: f32,
    data: Option<PathBuf>,
    passes: u32,
    weights: Arc<RwLock<Vec<f32>>>,
    /// Root this entry was seeded from; `None` for roots.
    seeded_from: Option<u64>,
    /// Seeded children, reclaimed when this root is freed.
    children: Vec<u64>,
    examples: HashMap<u64, ExampleSlot>,
}

impl ModelEntry {
    fn margin(&self, parsed: &ParsedExample) -> f32 {
        let weights = self.weights.read();
        let mut sum = weights[(BIAS_FEATURE & self.mask) as usize];
        for (index, value) in &parsed.features {
            sum += weights[*index as usize] * value;
        }
        sum
    }
}

#[derive(Default)]
struct EngineState {
    models: HashMap<u64, ModelEntry>,
    next_model: u64,
    next_example: u64,
}

impl EngineState {
    fn entry(&mut self, model: ModelHandle) -> EngineResult<&mut ModelEntry> {
        self.models
            .get_mut(&model.into_raw())
            .ok_or_else(|| EngineError::new(format!("unknown {}", model)))
    }
}

/// In-process [`LearnerEngine`] implementation.
pub struct SgdEngine {
    state: Mutex<EngineState>,
}

impl SgdEngine {
    pub fn new() -> Self {
        SgdEngine {
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Number of live model resources, seeded handles included.
    pub fn model_count(&self) -> usize {
        self.state.lock().models.len()
    }

    /// Number of examples read but not yet finished, across all models.
    pub fn live_examples(&self) -> usize {
        self.state
            .lock()
            .models
            .values()
            .map(|entry| entry.examples.len())
            .sum()
    }
}

impl Default for SgdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnerEngine for SgdEngine {
    fn create_model(&self, settings: &LearnerSettings) -> EngineResult<ModelHandle> {
        let mut state = self.state.lock();
        let mask = settings.mask();
        let id = state.next_model;
        state.next_model += 1;
        state.models.insert(
            id,
            ModelEntry {
                mask,
                learning_rate: settings.learning_rate,
                data: settings.data.clone(),
                passes: settings.passes,
                weights: Arc::new(RwLock::new(vec![
                    settings.initial_weight;
                    mask as usize + 1
                ])),
                seeded_from: None,
                children: Vec::new(),
                examples: HashMap::new(),
            },
        );
        debug!(
            "created model#{} ({}-bit weight table, learning rate {})",
            id, settings.bits, settings.learning_rate
        );
        Ok(ModelHandle::from_raw(id))
    }

    fn seed_model(&self, model: ModelHandle) -> EngineResult<ModelHandle> {
        let mut state = self.state.lock();
        let source = state.entry(model)?;
        let root = source.seeded_from.unwrap_or(model.into_raw());
        let seeded = ModelEntry {
            mask: source.mask,
            learning_rate: source.learning_rate,
            data: source.data.clone(),
            passes: source.passes,
            weights: Arc::clone(&source.weights),
            seeded_from: Some(root),
            children: Vec::new(),
            examples: HashMap::new(),
        };
        let id = state.next_model;
        state.next_model += 1;
        state.models.insert(id, seeded);
        state
            .models
            .get_mut(&root)
            .expect("seed source resolved to a live root")
            .children
            .push(id);
        debug!("seeded model#{} from {}", id, model);
        Ok(ModelHandle::from_raw(id))
    }

    fn free_model(&self, model: ModelHandle) {
        let mut state = self.state.lock();
        let raw = model.into_raw();
        match state.models.remove(&raw) {
            Some(entry) => {
                if let Some(root) = entry.seeded_from {
                    if let Some(parent) = state.models.get_mut(&root) {
                        parent.children.retain(|child| *child != raw);
                    }
                }
                for child in entry.children {
                    state.models.remove(&child);
                }
                debug!("freed {}", model);
            }
            None => warn!("free of unknown {}", model),
        }
    }

    fn hash_space(&self, model: ModelHandle, name: &str) -> EngineResult<u32> {
        let mut state = self.state.lock();
        state.entry(model)?;
        Ok(uniform_hash(name.as_bytes(), 0))
    }

    fn hash_feature(&self, model: ModelHandle, name: &str, seed: u32) -> EngineResult<u32> {
        let mut state = self.state.lock();
        let entry = state.entry(model)?;
        Ok(uniform_hash(name.as_bytes(), seed) & entry.mask)
    }

    fn read_example(&self, model: ModelHandle, line: &[u8]) -> EngineResult<ExampleHandle> {
        let text = std::str::from_utf8(line)
            .map_err(|_| EngineError::new("example line is not valid UTF-8"))?;
        let mut state = self.state.lock();
        let id = state.next_example;
        let entry = state.entry(model)?;
        let parsed = parse_line(text, entry.mask)?;
        entry.examples.insert(
            id,
            ExampleSlot {
                parsed,
                prediction: 0.0,
            },
        );
        state.next_example += 1;
        Ok(ExampleHandle::from_raw(id))
    }

    fn predict(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        let entry = state.entry(model)?;
        let slot = entry
            .examples
            .get(&example.into_raw())
            .ok_or_else(|| EngineError::new(format!("unknown {} for {}", example, model)))?;
        let prediction = entry.margin(&slot.parsed);
        entry
            .examples
            .get_mut(&example.into_raw())
            .expect("slot looked up above")
            .prediction = prediction;
        Ok(())
    }

    fn learn(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        let entry = state.entry(model)?;
        let raw = example.into_raw();
        let learning_rate = entry.learning_rate;
        let (margin, update) = {
            let slot = entry
                .examples
                .get(&raw)
                .ok_or_else(|| EngineError::new(format!("unknown {} for {}", example, model)))?;
            let margin = entry.margin(&slot.parsed);
            let update = slot.parsed.label.map(|label| {
                let step = learning_rate * (label - margin) * slot.parsed.weight;
                (slot.parsed.features.clone(), step)
            });
            (margin, update)
        };
        // unlabeled examples run the forward pass only
        if let Some((features, step)) = update {
            let mut weights = entry.weights.write();
            weights[(BIAS_FEATURE & entry.mask) as usize] += step;
            for (index, value) in features {
                weights[index as usize] += step * value;
            }
        }
        entry
            .examples
            .get_mut(&raw)
            .expect("slot looked up above")
            .prediction = margin;
        Ok(())
    }

    fn finish_example(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        let entry = state.entry(model)?;
        match entry.examples.remove(&example.into_raw()) {
            Some(_) => Ok(()),
            None => Err(EngineError::new(format!(
                "{} already finished or unknown for {}",
                example, model
            ))),
        }
    }

    fn scalar_prediction(&self, model: ModelHandle, example: ExampleHandle) -> EngineResult<f32> {
        let mut state = self.state.lock();
        let entry = state.entry(model)?;
        entry
            .examples
            .get(&example.into_raw())
            .map(|slot| slot.prediction)
            .ok_or_else(|| EngineError::new(format!("unknown {} for {}", example, model)))
    }

    fn scores_prediction(
        &self,
        model: ModelHandle,
        example: ExampleHandle,
    ) -> EngineResult<Vec<f32>> {
        self.scalar_prediction(model, example)
            .map(|prediction| vec![prediction])
    }

    fn multiclass_prediction(
        &self,
        model: ModelHandle,
        _example: ExampleHandle,
    ) -> EngineResult<u32> {
        let mut state = self.state.lock();
        state.entry(model)?;
        Err(EngineError::new(format!(
            "{} is a scalar learner; no multiclass prediction available",
            model
        )))
    }

    fn run_driver(&self, model: ModelHandle) -> EngineResult<()> {
        let (data, passes) = {
            let mut state = self.state.lock();
            let entry = state.entry(model)?;
            (entry.data.clone(), entry.passes)
        };
        let path = match data {
            Some(path) => path,
            None => {
                debug!("no data source configured for {}; driver is a no-op", model);
                return Ok(());
            }
        };

        for pass in 0..passes {
            let file = File::open(&path).map_err(|err| {
                EngineError::new(format!("failed to open {}: {}", path.display(), err))
            })?;
            let mut count = 0u64;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|err| {
                    EngineError::new(format!("failed to read {}: {}", path.display(), err))
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let example = self.read_example(model, line.as_bytes())?;
                let learned = self.learn(model, example);
                self.finish_example(model, example)?;
                learned?;
                count += 1;
            }
            info!("pass {} complete ({} examples)", pass + 1, count);
        }
        Ok(())
    }
}
