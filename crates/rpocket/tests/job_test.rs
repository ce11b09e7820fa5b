use rpocket::*;
use tempfile::tempdir;

fn sample_job() -> VerificationJob {
    let island = Curve::from_points(&[
        (35.0, 35.0),
        (35.0, 65.0),
        (65.0, 65.0),
        (65.0, 35.0),
        (35.0, 35.0),
    ]);
    VerificationJob::new(
        Curve::rect(0.0, 0.0, 100.0, 60.0),
        PocketParams::new(3.0, 2.5, PocketStrategy::Spiral),
    )
    .with_island(island)
}

#[test]
fn test_job_round_trips_through_disk() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("jobs").join("pocket.json");

    let mut job = sample_job();
    job.resolution = Some(0.5);
    job.acceptance.min_coverage = 0.8;
    job.save_to_path(&path).expect("save job");
    assert!(path.exists(), "save should create parent directories");

    let loaded = VerificationJob::load_from_path(&path).expect("load job");
    assert_eq!(loaded, job);
}

#[test]
fn test_missing_job_file_is_an_error() {
    let dir = tempdir().expect("temp dir");
    let err = VerificationJob::load_from_path(dir.path().join("absent.json"))
        .expect_err("missing file");
    assert!(err.to_string().contains("read verification job"));
}

#[test]
fn test_invalid_job_json_is_an_error() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"boundary": {"vertices": []}}"#).expect("write");
    let err = VerificationJob::load_from_path(&path).expect_err("missing pocket params");
    assert!(err.to_string().contains("deserialize verification job"));
}

#[test]
fn test_verify_job_with_clipper_passes() {
    let report = verify_job_with_clipper(&sample_job()).expect("verify");
    assert!(!report.toolpaths.is_empty());
    assert_eq!(report.simulation.island_violation_cells, 0);
    assert!(report.simulation.coverage > 0.9);
    assert!(report.passed);
}

#[test]
fn test_verify_normalizes_winding() {
    // Clockwise boundary and counter-clockwise island describe the same pocket.
    let mut job = sample_job();
    job.boundary = job.boundary.reversed();
    job.islands = job.islands.iter().map(Curve::reversed).collect();
    let report = verify_job_with_clipper(&job).expect("verify");
    assert_eq!(report.simulation.island_violation_cells, 0);
    assert!(report.passed);
}

#[test]
fn test_strict_acceptance_fails() {
    let mut job = sample_job();
    job.acceptance.min_coverage = 1.0;
    let report = verify_job_with_clipper(&job).expect("verify");
    // Square corners are never reachable by a round tool.
    assert!(report.simulation.coverage < 1.0);
    assert!(!report.passed);
}

#[test]
fn test_verify_rejects_bad_params() {
    let mut job = sample_job();
    job.pocket.stepover = 0.0;
    let err = verify_job_with_clipper(&job).expect_err("zero stepover");
    assert!(matches!(
        err.downcast_ref::<PocketError>(),
        Some(PocketError::InvalidStepover(_))
    ));
}
