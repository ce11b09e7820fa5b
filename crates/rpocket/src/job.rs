use crate::engine::{PocketParams, DEFAULT_ENGINE_ACCURACY};
use crate::geometry::Curve;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_accuracy() -> f64 {
    DEFAULT_ENGINE_ACCURACY
}

fn default_min_coverage() -> f64 {
    0.9
}

/// Pass/fail thresholds for a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acceptance {
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,
    #[serde(default)]
    pub max_island_violations: usize,
}

impl Default for Acceptance {
    fn default() -> Self {
        Self {
            min_coverage: default_min_coverage(),
            max_island_violations: 0,
        }
    }
}

impl Acceptance {
    pub fn accepts(&self, coverage: f64, island_violations: usize) -> bool {
        coverage >= self.min_coverage && island_violations <= self.max_island_violations
    }
}

/// A pocket to generate and check: geometry, engine parameters and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationJob {
    pub boundary: Curve,
    #[serde(default)]
    pub islands: Vec<Curve>,
    /// Curve-deviation tolerance handed to the pocketing engine.
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    pub pocket: PocketParams,
    /// Simulation grid resolution; derived from the tool radius when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub acceptance: Acceptance,
}

impl VerificationJob {
    pub fn new(boundary: Curve, pocket: PocketParams) -> Self {
        Self {
            boundary,
            islands: Vec::new(),
            accuracy: default_accuracy(),
            pocket,
            resolution: None,
            acceptance: Acceptance::default(),
        }
    }

    pub fn with_island(mut self, island: Curve) -> Self {
        self.islands.push(island);
        self
    }

    /// Load a job from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).with_context(|| format!("read verification job {}", path.display()))?;
        let job: VerificationJob =
            serde_json::from_slice(&data).context("deserialize verification job")?;
        Ok(job)
    }

    /// Persist the job as pretty JSON, creating the parent directory if needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create job directory {}", parent.display()))?;
        }

        let data =
            serde_json::to_vec_pretty(self).context("serialize verification job to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write verification job {}", path.display()))
    }
}
