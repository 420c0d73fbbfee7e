use crate::scoring::{AxisScores, EtaReport, ExplicitReport, ImplicitReport, Metric, ScoreResult};
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File naming of the persisted artifacts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputSchema {
    /// Historical names: explicit per-value scores in `ex_sub_attr_level.json`,
    /// axis scores in `ex_protected_attr_level.json`, verbose model keys.
    #[default]
    Legacy,
    /// Per-value scores in `ex_protected_attr_level.json`, axis scores in
    /// `ex_axis_level.json`, model level as a `{total, gender, race, age}` record.
    V2,
}

impl OutputSchema {
    pub fn version(&self) -> u32 {
        match self {
            OutputSchema::Legacy => 1,
            OutputSchema::V2 => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSchema::Legacy => "legacy",
            OutputSchema::V2 => "v2",
        }
    }
}

/// Summary of one run, written next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub schema: OutputSchema,
    pub model: String,
    pub metrics: Vec<Metric>,
    pub generated_at: DateTime<Utc>,
    /// Wall-clock time of the run, e.g. `1s 204ms`
    pub elapsed: String,
    /// Artifact paths relative to the model directory.
    pub artifacts: Vec<PathBuf>,
}

/// Writes every artifact of one model under `<out>/<model>/`.
pub struct ArtifactWriter {
    root: PathBuf,
    schema: OutputSchema,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, schema: OutputSchema) -> Self {
        Self {
            root: root.into(),
            schema,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn schema(&self) -> OutputSchema {
        self.schema
    }

    /// Write `value` as pretty JSON to `root/relative` atomically, returning
    /// `relative`.
    fn write_json<T: Serialize + ?Sized>(&self, relative: &str, value: &T) -> Result<PathBuf> {
        write_json_atomic(&self.root.join(relative), value)?;
        Ok(PathBuf::from(relative))
    }

    pub fn write_eta(&self, report: &EtaReport) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.write_json("eta/alpha.json", &report.alpha)?,
            self.write_json("eta/eta_pairs.json", &report.pairs)?,
            self.write_json("eta/eta_sum.json", &report.summary)?,
        ])
    }

    pub fn write_explicit(&self, report: &ExplicitReport) -> Result<Vec<PathBuf>> {
        let mut written = vec![self.write_json(
            "explicit_result/ex_prompt_level.json",
            &report.prompt_level,
        )?];

        match self.schema {
            OutputSchema::Legacy => {
                // Historical layout: the two file names are swapped
                written.push(self.write_json(
                    "explicit_result/ex_sub_attr_level.json",
                    &report.protected_attribute_level,
                )?);
                written.push(self.write_json(
                    "explicit_result/ex_protected_attr_level.json",
                    &report.axis_level,
                )?);
            }
            OutputSchema::V2 => {
                written.push(self.write_json(
                    "explicit_result/ex_protected_attr_level.json",
                    &report.protected_attribute_level,
                )?);
                written.push(self.write_json(
                    "explicit_result/ex_axis_level.json",
                    &report.axis_level,
                )?);
            }
        }

        written.push(self.write_json(
            "explicit_result/ex_category_level.json",
            &report.category_level,
        )?);
        written.push(self.write_json(
            "explicit_result/ex_acquired_level.json",
            &report.acquired_level,
        )?);

        let model_path = "explicit_result/ex_model_level.json";
        written.push(match self.schema {
            OutputSchema::Legacy => {
                let mut model = IndexMap::new();
                model.insert("Total Model Emplicit Bias Score", report.model_level);
                self.write_json(model_path, &model)?
            }
            OutputSchema::V2 => {
                let mut model = IndexMap::new();
                model.insert("total", report.model_level);
                self.write_json(model_path, &model)?
            }
        });

        Ok(written)
    }

    pub fn write_implicit(&self, report: &ImplicitReport) -> Result<Vec<PathBuf>> {
        let mut written = vec![
            self.write_json("implicit_result/im_prompt_level.json", &report.prompt_level)?,
            self.write_json(
                "implicit_result/im_category_level.json",
                &report.category_level,
            )?,
            self.write_json(
                "implicit_result/im_acquired_level.json",
                &report.acquired_level,
            )?,
        ];

        let model_path = "implicit_result/im_model_level.json";
        written.push(match self.schema {
            OutputSchema::Legacy => self.write_json(model_path, &legacy_implicit_model(&report.model_level))?,
            OutputSchema::V2 => self.write_json(model_path, &report.model_level)?,
        });

        Ok(written)
    }

    /// `<metric>_score_result.json`
    pub fn write_score_result(&self, result: &ScoreResult) -> Result<PathBuf> {
        self.write_json(&format!("{}_score_result.json", result.metric), result)
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        self.write_json("manifest.json", manifest)
    }
}

/// Write `value` as pretty JSON, creating parent directories. Readers never
/// see a half-written file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn legacy_implicit_model(scores: &AxisScores) -> IndexMap<&'static str, f64> {
    let mut model = IndexMap::new();
    model.insert("Total Model Implicit Bias Score", scores.total);
    model.insert("Model Implicit Bias Score in Gender", scores.gender);
    model.insert("Model Implicit Bias Score in race", scores.race);
    model.insert("Model Implicit Bias Score in age", scores.age);
    model
}

/// Read a persisted [`ScoreResult`] back.
pub fn load_score_result(path: &Path) -> Result<ScoreResult> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open score result at {}", path.display()))?;
    let result: ScoreResult = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse score result at {}", path.display()))?;
    Ok(result)
}

pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open manifest at {}", path.display()))?;
    let manifest: RunManifest = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse manifest at {}", path.display()))?;
    Ok(manifest)
}
