//! Demographic bias scoring for text-to-image models.
//!
//! Generated attribute distributions are compared against curated reference
//! distributions by three engines (eta, explicit, implicit), each rolled up
//! from prompts to categories, prompt families and a whole-model score.

pub mod config;
pub mod error;
pub mod matching;
pub mod output;
pub mod run;
pub mod scoring;
pub mod store;
pub mod tables;

pub use error::{BiasError, Result};
pub use run::{run_benchmark, score_store, write_report, BenchmarkReport};
