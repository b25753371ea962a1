//! Command-line entry point: load the iris data, train and compare the
//! classifiers, export predictions and persist them to the document store.

use std::path::PathBuf;

use irislab::app_dirs;
use irislab::config::AppConfig;
use irislab::dataset::loader::DataSource;
use irislab::logging::{self, Verbosity};
use irislab::pipeline::{self, Persistence, PipelineOptions};
use irislab::report;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    source: Option<DataSource>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
    model_out: Option<PathBuf>,
    no_save: bool,
    skip_store: bool,
    write_config: bool,
    verbosity: Verbosity,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    match logging::init(options.verbosity) {
        Ok(path) => tracing::debug!(log = %path.display(), "Logging initialised"),
        Err(err) => eprintln!("Logging disabled: {err}"),
    }

    let config_path = match &options.config_path {
        Some(path) => path.clone(),
        None => app_dirs::config_file_path().map_err(|err| err.to_string())?,
    };
    let mut config = AppConfig::load_from(&config_path).map_err(|err| err.to_string())?;
    config
        .apply_env(|var| std::env::var(var).ok())
        .map_err(|err| err.to_string())?;
    apply_overrides(&mut config, &options);
    config.validate().map_err(|err| err.to_string())?;

    if options.write_config {
        config.save_to(&config_path).map_err(|err| err.to_string())?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let model_path = if options.no_save {
        None
    } else {
        Some(config.model_path().map_err(|err| err.to_string())?)
    };
    let pipeline_options = PipelineOptions {
        skip_store: options.skip_store,
        model_path,
    };
    let outcome = pipeline::run(&config, &pipeline_options).map_err(|err| err.to_string())?;
    print!("{}", report::render_outcome(&outcome));
    if let Persistence::Unavailable(_) = outcome.persistence {
        eprintln!("warning: results were not persisted");
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, options: &CliOptions) {
    if let Some(source) = &options.source {
        config.data.source = source.clone();
    }
    if let Some(fraction) = options.test_fraction {
        config.training.test_fraction = fraction;
    }
    if let Some(seed) = options.seed {
        config.training.seed = seed;
    }
    if let Some(path) = &options.model_out {
        config.model_path = Some(path.clone());
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--source" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--source requires a value".to_string())?;
                options.source = Some(
                    value
                        .parse::<DataSource>()
                        .map_err(|err| format!("Invalid --source value: {err}"))?,
                );
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                options.test_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-fraction value: {value}"))?,
                );
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--model-out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--no-save" => options.no_save = true,
            "--skip-store" => options.skip_store = true,
            "--write-config" => options.write_config = true,
            "-q" | "--quiet" => options.verbosity = Verbosity::Quiet,
            "-v" | "--verbose" => options.verbosity = Verbosity::Verbose,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    if options.no_save && options.model_out.is_some() {
        return Err("--no-save and --model-out cannot be combined".to_string());
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "irislab",
        "",
        "Usage:",
        "  irislab [options]",
        "",
        "Options:",
        "  --config <path>          Settings file (default: config.toml in the app directory).",
        "  --source <source>        auto | reference | csv:<path> | <http(s) url> (default: auto).",
        "  --test-fraction <f>      Held-out share of rows (default: 0.2).",
        "  --seed <n>               Seed for splitting and training (default: 42).",
        "  --model-out <path>       Where to write the best-model bundle.",
        "  --no-save                Do not write the model bundle.",
        "  --skip-store             Do not touch the document store.",
        "  --write-config           Write the effective settings and exit.",
        "  -q, --quiet              Only show warnings on stderr.",
        "  -v, --verbose            Show debug events on stderr.",
        "",
        "Environment:",
        "  IRISLAB_HOME, IRISLAB_DB_PATH, IRISLAB_COLLECTION, IRISLAB_DATA_SOURCE",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_overrides() {
        let options = parse_args(args(&[
            "--source",
            "reference",
            "--seed",
            "7",
            "--test-fraction",
            "0.3",
            "--skip-store",
        ]))
        .unwrap();
        assert_eq!(options.source, Some(DataSource::Reference));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.test_fraction, Some(0.3));
        assert!(options.skip_store);
    }

    #[test]
    fn rejects_unknown_and_conflicting_flags() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--seed"])).is_err());
        assert!(parse_args(args(&["--no-save", "--model-out", "m.json"])).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AppConfig::default();
        let options = CliOptions {
            seed: Some(9),
            model_out: Some(PathBuf::from("out.json")),
            ..CliOptions::default()
        };
        apply_overrides(&mut config, &options);
        assert_eq!(config.training.seed, 9);
        assert_eq!(config.model_path, Some(PathBuf::from("out.json")));
    }
}
