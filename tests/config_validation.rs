use expblock::config::{AppConfig, Experiment, RunConfig};
use expblock::error::ConfigError;
use expblock::index::IndexConfig;
use expblock::similarity::SimilarityConfig;

#[test]
fn defaults_and_validation_ok() {
    let cfg = AppConfig {
        experiments: vec![Experiment::preset(3).unwrap(), Experiment::preset(8).unwrap()],
        index: IndexConfig { capacity: 500, xi: 0.1, ..Default::default() },
        run: RunConfig { repetitions: 2, out_dir: "./tmp".into(), ..Default::default() },
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn validation_catches_issues() {
    let bad = AppConfig { experiments: vec![], ..Default::default() };
    assert_eq!(bad.validate().unwrap_err(), ConfigError::Missing("experiments"));

    let bad = AppConfig { index: IndexConfig { epsilon: f64::INFINITY, ..Default::default() }, ..Default::default() };
    let msg = format!("{}", bad.validate().unwrap_err());
    assert!(msg.contains("epsilon") && msg.contains("finite"));

    let bad = AppConfig { run: RunConfig { repetitions: 0, ..Default::default() }, ..Default::default() };
    assert!(format!("{}", bad.validate().unwrap_err()).contains("out of range"));
}

#[test]
fn similarity_weights_must_be_unit_interval() {
    let mut sim = SimilarityConfig::default();
    sim.name_threshold = -0.1;
    let bad = AppConfig { experiments: vec![Experiment { index: 1, similarity: sim }], ..Default::default() };
    assert!(matches!(bad.validate(), Err(ConfigError::OutOfRange { field: "name_threshold", .. })));
}

#[test]
fn sweep_quota_must_be_positive() {
    let bad = AppConfig { index: IndexConfig { capacity: 10, xi: 0.08, ..Default::default() }, ..Default::default() };
    assert!(matches!(bad.validate(), Err(ConfigError::Invalid(_))));
}
