//! Full run: oversample, train, evaluate, explain, write `report.json`.

use attrition_gan::{cli, logging, pipeline};

const USAGE: &str = "attrition-gan --data <csv> [--config <toml>] [--out <dir>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = cli::parse_args(std::env::args().skip(1).collect(), USAGE)?;
    let config = options.load_config().map_err(|err| err.to_string())?;
    let out_dir = cli::resolve_output_dir(&config).map_err(|err| err.to_string())?;
    if let Err(err) = logging::init(&cli::resolve_log_dir(&out_dir)) {
        eprintln!("File logging disabled: {err}");
    }

    let outcome = pipeline::run(&config, &out_dir).map_err(|err| err.to_string())?;
    let evaluation = &outcome.report.evaluation;
    println!("test accuracy: {:.4}", evaluation.accuracy);
    println!("test ROC AUC:  {:.4}", evaluation.auc);
    for (class, stats) in evaluation.per_class.iter().enumerate() {
        println!(
            "class {class}  precision={:.3}  recall={:.3}  support={}",
            stats.precision, stats.recall, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..evaluation.confusion.n_classes {
        let row: String = (0..evaluation.confusion.n_classes)
            .map(|pred| format!("{:6}", evaluation.confusion.get(truth, pred)))
            .collect();
        println!("{row}");
    }
    println!("top features by mean |SHAP|:");
    for entry in outcome.report.explanation.ranking.iter().take(10) {
        println!("  {:<28} {:.4}", entry.feature, entry.mean_abs_shap);
    }
    println!("balanced dataset: {}", outcome.balanced_path.display());
    println!("report: {}", outcome.report_path.display());
    Ok(())
}
