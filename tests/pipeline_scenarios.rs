mod support {
    pub mod home_env;
    pub mod hr_csv;
}

use attrition_gan::app_dirs::AppDirs;
use attrition_gan::config::PipelineConfig;
use attrition_gan::data::{read_csv, IngestOptions};
use attrition_gan::ml::augment::{assemble, synthetic_count_for_parity};
use attrition_gan::ml::gan::{GanOptions, train_gan};
use attrition_gan::pipeline::{self, PipelineError};
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use support::home_env::HomeEnvGuard;
use support::hr_csv::write_hr_csv;
use tempfile::tempdir;

fn quick_config(data: std::path::PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.seed = 11;
    config.data.path = Some(data);
    config.gan.epochs = 3;
    config.gan.batch_size = 16;
    config.gan.generator_hidden = (16, 16);
    config.gan.discriminator_hidden = (16, 8);
    config.split.test_per_class = 10;
    config.classifier.epochs = 1;
    config.classifier.batch_size = 16;
    config.classifier.head_size = 4;
    config.classifier.num_heads = 2;
    config.classifier.num_blocks = 1;
    config.classifier.mlp_units = (8, 4);
    config.explain.background_pool = 10;
    config.explain.background_size = 3;
    config.explain.coalition_samples = 16;
    config.explain.explain_count = 4;
    config
}

fn quick_gan(epochs: usize) -> GanOptions {
    GanOptions {
        epochs,
        batch_size: 8,
        generator_hidden: (16, 16),
        discriminator_hidden: (16, 8),
        learning_rate: 1e-3,
        ..GanOptions::default()
    }
}

#[test]
fn full_run_balances_classifies_and_explains() {
    let dir = tempdir().unwrap();
    let data = write_hr_csv(dir.path(), 80, 4);
    let out = dir.path().join("run");
    let outcome = pipeline::run(&quick_config(data), &out).unwrap();
    let report = &outcome.report;

    assert_eq!(report.feature_names, vec!["Age", "BusinessTravel", "MonthlyIncome", "OverTime"]);
    assert_eq!((report.original_counts.negative, report.original_counts.positive), (60, 20));
    assert_eq!(report.minority_label, 1);
    assert_eq!(report.synthetic_rows, 40);
    assert_eq!((report.balanced_counts.negative, report.balanced_counts.positive), (60, 60));
    assert_eq!((report.train_rows, report.test_rows), (100, 20));
    assert_eq!(report.gan_history.len(), 3);
    assert_eq!(report.classifier_history.epochs.len(), 1);
    assert!((0.0..=1.0).contains(&report.evaluation.auc));
    assert_eq!(report.categories["OverTime"], vec!["No", "Yes"]);

    let explanation = &report.explanation;
    assert_eq!(explanation.attributions.len(), 4);
    assert!(explanation.attributions.iter().all(|row| row.len() == 4));
    for (row, prediction) in explanation.attributions.iter().zip(&explanation.predictions) {
        let total: f32 = row.iter().sum();
        assert!((total - (prediction - explanation.expected_value)).abs() < 1e-4);
    }
    assert_eq!(explanation.ranking.len(), 4);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.report_path).unwrap()).unwrap();
    for key in ["gan_history", "classifier_history", "evaluation", "explanation"] {
        assert!(json.get(key).is_some(), "report is missing {key}");
    }
    let csv = std::fs::read_to_string(&outcome.balanced_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Age,BusinessTravel,MonthlyIncome,OverTime,Attrition")
    );
    assert_eq!(lines.count(), 120);
    assert!(out.join(pipeline::EFFECTIVE_CONFIG_FILE).is_file());
}

#[test]
fn oversample_alone_writes_a_balanced_csv() {
    let dir = tempdir().unwrap();
    let data = write_hr_csv(dir.path(), 40, 5);
    let outcome = pipeline::oversample(&quick_config(data), dir.path()).unwrap();
    assert_eq!(outcome.balanced.class_counts(), (32, 32));
    assert_eq!(outcome.balanced.synthetic_count(), 24);
    assert!(outcome.balanced_path.is_file());
}

#[test]
fn undersized_holdout_reports_the_split_stage() {
    let dir = tempdir().unwrap();
    let data = write_hr_csv(dir.path(), 40, 4);
    let mut config = quick_config(data);
    config.split.test_per_class = 30;
    let err = pipeline::run(&config, &dir.path().join("run")).unwrap_err();
    assert!(matches!(err, PipelineError::Split(_)));
}

#[test]
fn invalid_explain_settings_fail_before_any_training() {
    let dir = tempdir().unwrap();
    let data = write_hr_csv(dir.path(), 80, 4);
    let out = dir.path().join("run");
    let mut config = quick_config(data);
    config.explain.background_pool = 10;
    config.explain.background_size = 15;
    let err = pipeline::run(&config, &out).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(err.to_string().contains("explain.background_size"));
    assert!(!out.exists(), "no stage may write output for a rejected config");

    config.explain.background_size = 3;
    config.explain.background_pool = 21;
    let err = pipeline::oversample(&config, &out).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(!out.exists());
}

#[test]
fn twenty_negatives_four_positives_gain_sixteen_synthetic_rows() {
    let features = Array2::from_shape_fn((24, 4), |(r, c)| ((r * 3 + c) % 10) as f32 / 10.0);
    let labels: Vec<u8> = (0..24).map(|r| u8::from(r >= 20)).collect();
    let minority = features.select(Axis(0), &[20, 21, 22, 23]);
    let mut rng = StdRng::seed_from_u64(2);
    let gan = train_gan(minority.view(), &quick_gan(5), &mut rng).unwrap();

    let count = synthetic_count_for_parity(&labels);
    assert_eq!(count, 16);
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let balanced =
        assemble(&names, features.view(), &labels, &gan.generator, count, 1, &mut rng).unwrap();
    assert_eq!(balanced.len(), 40);
    assert_eq!(balanced.class_counts(), (20, 20));
    assert_eq!(balanced.feature_count(), 4);
    assert_eq!(balanced.synthetic_count(), 16);
}

#[test]
fn same_seed_gan_runs_produce_matching_distributions() {
    let minority = Array2::from_shape_fn((12, 4), |(r, c)| 0.1 + 0.07 * ((r + 2 * c) % 11) as f32);
    let sample_moments = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let gan = train_gan(minority.view(), &quick_gan(4), &mut rng).unwrap();
        let rows = gan.generator.sample(500, &mut rng).unwrap();
        assert_eq!(rows.ncols(), 4);
        assert!(rows.iter().all(|v| (0.0..=1.0).contains(v)));
        let means = rows.mean_axis(Axis(0)).unwrap();
        let stds = rows.std_axis(Axis(0), 0.0);
        (means, stds)
    };
    let (first_means, first_stds) = sample_moments(99);
    let (second_means, second_stds) = sample_moments(99);
    // Same seed, same distribution: moments agree well inside sampling noise.
    for (a, b) in first_means.iter().zip(second_means.iter()) {
        assert!((a - b).abs() < 0.05, "means {a} vs {b}");
    }
    for (a, b) in first_stds.iter().zip(second_stds.iter()) {
        assert!((a - b).abs() < 0.05, "stds {a} vs {b}");
    }
}

#[test]
fn ingest_reads_the_generated_export() {
    let dir = tempdir().unwrap();
    let path = write_hr_csv(dir.path(), 12, 3);
    let table = read_csv(&path, &IngestOptions::default()).unwrap();
    assert_eq!(table.features.dim(), (12, 4));
    assert_eq!(table.labels.iter().filter(|&&l| l == 1).count(), 4);
    assert_eq!(table.categories["BusinessTravel"].len(), 3);
}

#[test]
fn home_override_relocates_app_directories() {
    let dir = tempdir().unwrap();
    let _guard = HomeEnvGuard::set(dir.path().to_path_buf());
    let dirs = AppDirs::discover().unwrap();
    assert_eq!(dirs.root(), dir.path());
    assert_eq!(dirs.runs_dir().unwrap(), dir.path().join("runs"));
}
