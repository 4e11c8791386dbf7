//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Training a model over a data file
//! - Scoring example lines against a trained model

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{Args, LearnerSettings};
use crate::engine::SgdEngine;
use crate::error::Result;
use crate::prediction::ScalarPrediction;
use crate::session::Session;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Train a model over the configured data file
    Train(TrainCommand),
    /// Train over the configured data file, then score example lines
    Predict(PredictCommand),
}

#[derive(Debug, clap::Args)]
pub struct TrainCommand {
    #[command(flatten)]
    pub args: Args,
}

#[derive(Debug, clap::Args)]
pub struct PredictCommand {
    #[command(flatten)]
    pub args: Args,

    /// File of example lines to score; stdin when omitted
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// Emit predictions as JSON objects instead of bare scores
    #[clap(long)]
    pub json: bool,
}

pub fn handle_train(cmd: &TrainCommand) -> Result<()> {
    let settings = LearnerSettings::load(&cmd.args)?;
    let engine = Arc::new(SgdEngine::new());
    let session = Session::create(engine, &settings)?;

    session.driver()?;
    info!("training complete");

    session.close();
    Ok(())
}

pub fn handle_predict(cmd: &PredictCommand) -> Result<()> {
    let settings = LearnerSettings::load(&cmd.args)?;
    let engine = Arc::new(SgdEngine::new());
    let session = Session::create(engine, &settings)?;

    if settings.data.is_some() {
        session.driver()?;
    }

    let reader: Box<dyn BufRead> = match &cmd.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let prediction: ScalarPrediction = session.predict(&line)?;
        if cmd.json {
            println!("{}", serde_json::to_string(&prediction)?);
        } else {
            println!("{:.6}", prediction.value);
        }
    }

    session.close();
    Ok(())
}
