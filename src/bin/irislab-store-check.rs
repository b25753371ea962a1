//! Connectivity and index check for the flower document store.

use std::path::PathBuf;

use irislab::config::AppConfig;
use irislab::logging::{self, Verbosity};
use irislab::store::{FlowerStore, StoreConfig};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    db_path: Option<PathBuf>,
    collection: Option<String>,
    ensure_indexes: bool,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init(Verbosity::Quiet) {
        eprintln!("Logging disabled: {err}");
    }
    let mut store_config = AppConfig::load_or_default()
        .map_err(|err| err.to_string())?
        .store_config()
        .map_err(|err| err.to_string())?;
    if let Some(path) = options.db_path {
        store_config = StoreConfig::new(path).with_collection(store_config.collection);
    }
    if let Some(collection) = options.collection {
        store_config = store_config.with_collection(collection);
    }

    let store = FlowerStore::open(&store_config).map_err(|err| err.to_string())?;
    println!(
        "Connected to {} (collection {})",
        store_config.path.display(),
        store.collection()
    );
    if options.ensure_indexes {
        store.ensure_indexes().map_err(|err| err.to_string())?;
    }

    let counts = store.aggregate_counts().map_err(|err| err.to_string())?;
    println!("documents: {}", counts.total);
    for (species, count) in &counts.by_species {
        println!("  {species:<11} {count}");
    }

    let indexes = store.list_indexes().map_err(|err| err.to_string())?;
    if indexes.is_empty() {
        println!("indexes: none (run with --ensure-indexes to create them)");
    }
    for index in &indexes {
        println!("index {}: {}", index.name, index.keys.join(", "));
    }

    match store.find_one().map_err(|err| err.to_string())? {
        Some(record) => {
            let json = serde_json::to_string_pretty(&record).map_err(|err| err.to_string())?;
            println!("sample document:\n{json}");
        }
        None => println!("collection is empty"),
    }
    store.close().map_err(|err| err.to_string())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--db" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                options.db_path = Some(PathBuf::from(value));
            }
            "--collection" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--collection requires a value".to_string())?;
                options.collection = Some(value.to_string());
            }
            "--ensure-indexes" => options.ensure_indexes = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "irislab-store-check",
        "",
        "Usage:",
        "  irislab-store-check [--db <path>] [--collection <name>] [--ensure-indexes]",
        "",
        "Without --db the location comes from config.toml or IRISLAB_DB_PATH.",
    ]
    .join("\n")
}
