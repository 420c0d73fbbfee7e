use crate::config::{validate_config, Config};
use crate::error::{BiasError, Result};
use crate::output::{ArtifactWriter, RunManifest};
use crate::scoring::{
    score_eta, score_explicit, score_implicit, EtaReport, ExplicitReport, ImplicitReport, Metric,
    ScoreResult,
};
use crate::store::DistributionStore;
use crate::tables::{validate_tables, TruthTables};
use chrono::Utc;
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything one run computed, before it is persisted.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub model: String,
    pub eta: Option<EtaReport>,
    pub explicit: Option<ExplicitReport>,
    pub implicit: Option<ImplicitReport>,
    pub elapsed: Duration,
}

impl BenchmarkReport {
    /// Uniform views of the computed metrics, in eta, explicit, implicit order.
    pub fn score_results(&self) -> Vec<ScoreResult> {
        let mut results = Vec::new();
        if let Some(eta) = &self.eta {
            results.push(eta.to_score_result());
        }
        if let Some(explicit) = &self.explicit {
            results.push(explicit.to_score_result());
        }
        if let Some(implicit) = &self.implicit {
            results.push(implicit.to_score_result());
        }
        results
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.score_results().iter().map(|r| r.metric).collect()
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Run the selected engines over one store.
///
/// Engines only read the store and tables, so they run side by side on
/// scoped threads.
pub fn score_store(
    store: &DistributionStore,
    tables: &TruthTables,
    metrics: &[Metric],
    model: &str,
) -> BenchmarkReport {
    let started = Instant::now();
    let (eta, explicit, implicit) = std::thread::scope(|s| {
        let eta = metrics
            .contains(&Metric::Eta)
            .then(|| s.spawn(move || score_eta(store, tables)));
        let explicit = metrics
            .contains(&Metric::Explicit)
            .then(|| s.spawn(move || score_explicit(store, tables)));
        let implicit = metrics
            .contains(&Metric::Implicit)
            .then(|| s.spawn(move || score_implicit(store, tables)));
        (eta.map(join), explicit.map(join), implicit.map(join))
    });

    BenchmarkReport {
        model: model.to_string(),
        eta,
        explicit,
        implicit,
        elapsed: started.elapsed(),
    }
}

/// Load every input named by `config` and score it.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid
/// - A distribution or truth table is missing or malformed
pub fn run_benchmark(config: &Config) -> Result<BenchmarkReport> {
    let started = Instant::now();
    validate_config(config).map_err(BiasError::InvalidConfig)?;

    let store = DistributionStore::load(&config.store_paths())?;
    let tables = TruthTables::load(&config.table_paths(), &config.categories.families)?;
    validate_tables(&tables).map_err(|errors| BiasError::malformed("truth", errors.join("; ")))?;

    info!(
        "Scoring {}: {} generated prompts, {} with a reference record",
        config.model,
        store.len(),
        store.tagged_count()
    );
    if store.tagged_count() == 0 {
        warn!("No generated prompt has a reference record; scores will be empty");
    }

    let mut report = score_store(&store, &tables, &config.metrics, &config.model);
    debug!(
        "Engines finished in {}",
        humantime::format_duration(report.elapsed)
    );
    report.elapsed = started.elapsed();
    Ok(report)
}

/// Persist `report` under `<output.dir>/<model>/` and return the manifest.
pub fn write_report(report: &BenchmarkReport, config: &Config) -> anyhow::Result<RunManifest> {
    let writer = ArtifactWriter::new(config.model_output_dir(), config.output.schema);

    let mut artifacts = Vec::new();
    if let Some(eta) = &report.eta {
        artifacts.extend(writer.write_eta(eta)?);
    }
    if let Some(explicit) = &report.explicit {
        artifacts.extend(writer.write_explicit(explicit)?);
    }
    if let Some(implicit) = &report.implicit {
        artifacts.extend(writer.write_implicit(implicit)?);
    }
    for result in report.score_results() {
        artifacts.push(writer.write_score_result(&result)?);
    }

    // Millisecond precision is plenty for a log line
    let elapsed = Duration::from_millis(report.elapsed.as_millis() as u64);
    let manifest = RunManifest {
        schema_version: writer.schema().version(),
        schema: writer.schema(),
        model: report.model.clone(),
        metrics: report.metrics(),
        generated_at: Utc::now(),
        elapsed: humantime::format_duration(elapsed).to_string(),
        artifacts,
    };
    writer.write_manifest(&manifest)?;

    info!(
        "Wrote {} artifacts to {} in {}",
        manifest.artifacts.len(),
        writer.root().display(),
        manifest.elapsed
    );
    Ok(manifest)
}
