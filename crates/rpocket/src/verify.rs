use crate::engine::{ClipperArea, PocketEngine};
use crate::geometry::{Curve, PocketCurve};
use crate::job::VerificationJob;
use crate::simulator::{MaterialSimulator, SimulationResult};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// Toolpaths produced for a job and how they fared in simulation.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub toolpaths: Vec<PocketCurve>,
    pub simulation: SimulationResult,
    pub passed: bool,
}

/// Generate the job's pocket with engine `E` and check it on the material grid.
///
/// The boundary is forced counter-clockwise. Islands drawn counter-clockwise
/// go through [`PocketEngine::add_island`]; clockwise ones are added as-is.
pub fn verify_job<E: PocketEngine>(job: &VerificationJob) -> Result<VerificationReport> {
    let boundary = if job.boundary.is_ccw() {
        job.boundary.clone()
    } else {
        job.boundary.reversed()
    };

    let mut engine = E::create(job.accuracy);
    engine.add_curve(&boundary).context("add pocket boundary")?;
    for (index, island) in job.islands.iter().enumerate() {
        let added = if island.is_ccw() {
            engine.add_island(island)
        } else {
            engine.add_curve(island)
        };
        added.with_context(|| format!("add island {index}"))?;
    }

    let toolpaths = engine
        .make_pocket(&job.pocket)
        .context("generate pocket toolpath")?;

    let islands: Vec<Curve> = job.islands.clone();
    let simulator = MaterialSimulator::new(
        boundary,
        islands,
        job.pocket.tool_radius,
        job.resolution,
    )
    .context("configure material simulator")?;
    let simulation = simulator.simulate(&toolpaths);

    let passed = job
        .acceptance
        .accepts(simulation.coverage, simulation.island_violation_cells);
    info!(
        curves = toolpaths.len(),
        coverage = simulation.coverage,
        island_violations = simulation.island_violation_cells,
        passed,
        "verified pocket toolpath"
    );

    Ok(VerificationReport {
        toolpaths,
        simulation,
        passed,
    })
}

/// [`verify_job`] with the bundled [`ClipperArea`] engine.
pub fn verify_job_with_clipper(job: &VerificationJob) -> Result<VerificationReport> {
    verify_job::<ClipperArea>(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PocketParams, PocketStrategy};
    use crate::error::PocketError;

    /// Engine that always emits one fixed pass, to isolate the pipeline.
    struct FixedPath {
        curves: Vec<Curve>,
    }

    impl PocketEngine for FixedPath {
        fn create(_accuracy: f64) -> Self {
            Self { curves: Vec::new() }
        }

        fn add_curve(&mut self, curve: &Curve) -> Result<(), PocketError> {
            if self.curves.is_empty() && !curve.is_ccw() {
                return Err(PocketError::Engine("boundary must be counter-clockwise".into()));
            }
            if !self.curves.is_empty() && curve.is_ccw() {
                return Err(PocketError::Engine("island must be clockwise".into()));
            }
            self.curves.push(curve.clone());
            Ok(())
        }

        fn unite(&mut self, _other: &Self) -> Result<(), PocketError> {
            Ok(())
        }

        fn subtract(&mut self, _other: &Self) -> Result<(), PocketError> {
            Ok(())
        }

        fn curves(&self) -> Vec<Curve> {
            self.curves.clone()
        }

        fn make_pocket(&self, params: &PocketParams) -> Result<Vec<PocketCurve>, PocketError> {
            params.validate()?;
            if self.curves.len() > 1 {
                return Err(PocketError::Engine("islands not supported".to_string()));
            }
            Ok(vec![Curve::from_points(&[(1.0, 5.0), (9.0, 5.0)])])
        }
    }

    #[test]
    fn test_pipeline_uses_engine_output() {
        let job = VerificationJob::new(
            Curve::square(0.0, 0.0, 10.0),
            PocketParams::new(1.0, 0.5, PocketStrategy::Spiral),
        );
        let report = verify_job::<FixedPath>(&job).expect("verify");
        assert_eq!(report.toolpaths.len(), 1);
        assert!(report.simulation.cut_cells > 0);
        assert!(report.simulation.coverage < 0.9);
        assert!(!report.passed);
    }

    #[test]
    fn test_engine_errors_propagate() {
        let job = VerificationJob::new(
            Curve::square(0.0, 0.0, 10.0),
            PocketParams::new(-1.0, 0.5, PocketStrategy::Spiral),
        );
        let err = verify_job::<FixedPath>(&job).expect_err("negative radius");
        assert_eq!(
            err.downcast_ref::<PocketError>(),
            Some(&PocketError::NegativeToolRadius(-1.0))
        );
    }

    #[test]
    fn test_winding_is_normalized_before_engine() {
        let job = VerificationJob::new(
            Curve::square(0.0, 0.0, 10.0).reversed(),
            PocketParams::new(1.0, 0.5, PocketStrategy::Spiral),
        );
        let report = verify_job::<FixedPath>(&job).expect("clockwise boundary is flipped");
        assert!(report.simulation.total_cuttable_cells > 0);

        // Both island windings reach the engine clockwise; the engine then
        // refuses islands, which proves they were accepted by add_curve.
        for island in [Curve::square(4.0, 4.0, 2.0), Curve::square(4.0, 4.0, 2.0).reversed()] {
            let job = VerificationJob::new(
                Curve::square(0.0, 0.0, 10.0),
                PocketParams::new(1.0, 0.5, PocketStrategy::Spiral),
            )
            .with_island(island);
            let err = verify_job::<FixedPath>(&job).expect_err("engine refuses islands");
            assert_eq!(
                err.downcast_ref::<PocketError>(),
                Some(&PocketError::Engine("islands not supported".to_string()))
            );
        }
    }
}
