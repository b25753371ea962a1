//! Classify one flower with a saved model bundle.

use std::path::PathBuf;

use irislab::config::AppConfig;
use irislab::dataset::{FEATURE_NAMES, Features, N_FEATURES, Species};
use irislab::ml::bundle::ModelBundle;
use irislab::ml::selector::predict_with;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_path: Option<PathBuf>,
    features: Features,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let model_path = match options.model_path {
        Some(path) => path,
        None => AppConfig::load_or_default()
            .and_then(|config| config.model_path())
            .map_err(|err| err.to_string())?,
    };
    let bundle = ModelBundle::load(&model_path).map_err(|err| err.to_string())?;
    let Some(prediction) = predict_with(&bundle.model, &[options.features]).pop() else {
        return Err("Model produced no prediction".to_string());
    };

    println!("model: {}", bundle.name);
    if let Some(accuracy) = bundle.accuracy {
        println!("held-out accuracy: {accuracy:.4}");
    }
    println!(
        "prediction: {} (confidence {:.3})",
        prediction.species.as_str(),
        prediction.confidence
    );
    for (species, probability) in Species::ALL.iter().zip(prediction.probabilities) {
        println!("  {:<11} {probability:.3}", species.as_str());
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_path: Option<PathBuf> = None;
    let mut values: Vec<f64> = Vec::with_capacity(N_FEATURES);

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            value => {
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| format!("Invalid measurement: {value}\n\n{}", help_text()))?;
                values.push(parsed);
            }
        }
        idx += 1;
    }

    let features: Features = values.try_into().map_err(|values: Vec<f64>| {
        format!(
            "Expected {N_FEATURES} measurements ({}), got {}",
            FEATURE_NAMES.join(", "),
            values.len()
        )
    })?;
    Ok(CliOptions {
        model_path,
        features,
    })
}

fn help_text() -> String {
    [
        "irislab-predict",
        "",
        "Usage:",
        "  irislab-predict [--model <bundle.json>] <sepal_length> <sepal_width> <petal_length> <petal_width>",
        "",
        "Measurements are in centimetres. Without --model the bundle saved by",
        "the last irislab run is used.",
    ]
    .join("\n")
}
