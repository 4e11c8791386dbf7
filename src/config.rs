//! Configuration management for leveret learners.
//!
//! Settings are loaded from layered sources, later sources overriding
//! earlier ones:
//! 1. Default configuration (embedded in the binary)
//! 2. User-specified configuration file
//! 3. Environment variables (prefixed with `LEVERET_`)
//! 4. Command-line arguments

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Command-line arguments
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Weight-table bit width
    #[clap(short, long)]
    pub bits: Option<u8>,

    /// SGD learning rate
    #[clap(short, long)]
    pub learning_rate: Option<f32>,

    /// Initial value for every weight-table slot
    #[clap(long)]
    pub initial_weight: Option<f32>,

    /// Training data file consumed by the driver
    #[clap(short, long)]
    pub data: Option<PathBuf>,

    /// Number of driver passes over the data file
    #[clap(long)]
    pub passes: Option<u32>,
}

/// Validated learner settings, ready for model construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSettings {
    /// Weight-table bit width; the table holds `1 << bits` weights
    #[serde(default = "default_bits")]
    pub bits: u8,
    /// SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Initial value for every weight-table slot
    #[serde(default)]
    pub initial_weight: f32,
    /// Training data file consumed by the driver
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Number of driver passes over the data file
    #[serde(default = "default_passes")]
    pub passes: u32,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            bits: default_bits(),
            learning_rate: default_learning_rate(),
            initial_weight: 0.0,
            data: None,
            passes: default_passes(),
        }
    }
}

impl LearnerSettings {
    /// Load settings from all sources.
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ));

        // Load user config if specified
        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        // Add environment variables
        builder = builder.add_source(config::Environment::with_prefix("LEVERET"));

        // Build config
        let mut settings: LearnerSettings = builder.build()?.try_deserialize()?;

        // Override with command line args
        if let Some(bits) = args.bits {
            settings.bits = bits;
        }
        if let Some(learning_rate) = args.learning_rate {
            settings.learning_rate = learning_rate;
        }
        if let Some(initial_weight) = args.initial_weight {
            settings.initial_weight = initial_weight;
        }
        if let Some(data) = &args.data {
            settings.data = Some(data.clone());
        }
        if let Some(passes) = args.passes {
            settings.passes = passes;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings an engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.bits == 0 || self.bits > 28 {
            return Err(Error::Config(format!(
                "bits must be between 1 and 28, got {}",
                self.bits
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::Config(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.passes == 0 {
            return Err(Error::Config("passes must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Weight-table index mask derived from the bit width.
    pub fn mask(&self) -> u32 {
        (1u32 << self.bits) - 1
    }
}

fn default_bits() -> u8 {
    18
}

fn default_learning_rate() -> f32 {
    0.5
}

fn default_passes() -> u32 {
    1
}
