use irislab::dataset::Species;
use irislab::dataset::reference::reference_flowers;
use irislab::ml::export::{PredictionRecord, assign_ids};
use irislab::store::{FlowerRecord, FlowerStore, PETAL_INDEX, SPECIES_INDEX, StoreConfig, StoreError};
use tempfile::tempdir;
use time::macros::datetime;

fn stored_records() -> Vec<FlowerRecord> {
    FlowerRecord::from_rows(&reference_flowers(), datetime!(2024-05-01 12:00 UTC))
}

fn prediction(id: &str, species: Species) -> PredictionRecord {
    PredictionRecord {
        id: id.to_string(),
        prediction: species,
        confidence: 0.9,
        model: "SVM".to_string(),
    }
}

#[test]
fn records_survive_reopening_the_file() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("nested").join("iris.sqlite"));
    let mut store = FlowerStore::open(&config).unwrap();
    assert_eq!(store.replace_all(&stored_records()).unwrap(), 150);
    store.ensure_indexes().unwrap();
    store.close().unwrap();

    let store = FlowerStore::open(&config).unwrap();
    let counts = store.aggregate_counts().unwrap();
    assert_eq!(counts.total, 150);
    for species in Species::ALL {
        assert_eq!(counts.get(species), 50);
    }
    let names: Vec<String> = store.list_indexes().unwrap().into_iter().map(|index| index.name).collect();
    assert!(names.contains(&SPECIES_INDEX.to_string()));
    assert!(names.contains(&PETAL_INDEX.to_string()));
}

#[test]
fn collections_are_isolated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("iris.sqlite");
    let mut main = FlowerStore::open(&StoreConfig::new(&path)).unwrap();
    main.replace_all(&stored_records()).unwrap();
    main.close().unwrap();

    let other = FlowerStore::open(&StoreConfig::new(&path).with_collection("scratch")).unwrap();
    assert_eq!(other.count().unwrap(), 0);
    assert!(other.find_one().unwrap().is_none());
}

#[test]
fn unknown_prediction_ids_are_reported_not_inserted() {
    let mut store = FlowerStore::open_in_memory("iris_flowers").unwrap();
    store.replace_all(&stored_records()).unwrap();
    let predictions = [
        prediction("IR000", Species::Setosa),
        prediction("IR999", Species::Virginica),
    ];
    let report = store.merge_predictions(&predictions).unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.skipped, vec!["IR999".to_string()]);
    assert_eq!(store.count().unwrap(), 150);

    let merged = store.find_one_with_prediction().unwrap().unwrap();
    assert_eq!(merged.id, "IR000");
    assert_eq!(merged.prediction, Some(Species::Setosa));
    assert_eq!(merged.model.as_deref(), Some("SVM"));
}

#[test]
fn queries_agree_with_and_without_indexes() {
    let mut store = FlowerStore::open_in_memory("iris_flowers").unwrap();
    store.replace_all(&stored_records()).unwrap();

    let plain_setosa = store.find_by_species(Species::Setosa).unwrap().len();
    let plain_petals = store.find_petals_above(5.0, 1.5).unwrap().len();
    store.ensure_indexes().unwrap();
    assert_eq!(store.find_by_species(Species::Setosa).unwrap().len(), plain_setosa);
    assert_eq!(store.find_petals_above(5.0, 1.5).unwrap().len(), plain_petals);
    assert_eq!(plain_setosa, 50);

    let long = store.find_petal_length_above(5.0).unwrap();
    assert!(long.iter().all(|record| record.features.petal_length > 5.0));
    let short = store.find_sepal_length_below(5.0).unwrap();
    assert!(short.iter().all(|record| record.features.sepal_length < 5.0));
}

#[test]
fn every_predicted_id_matches_after_full_export() {
    let mut store = FlowerStore::open_in_memory("iris_flowers").unwrap();
    let records = stored_records();
    store.replace_all(&records).unwrap();
    let predictions: Vec<PredictionRecord> = assign_ids(records.len())
        .iter()
        .zip(&records)
        .map(|(id, record)| prediction(id, record.species))
        .collect();
    let report = store.merge_predictions(&predictions).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.matched, 150);
}

#[test]
fn invalid_collection_names_are_rejected() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("iris.sqlite")).with_collection("drop table;");
    assert!(matches!(
        FlowerStore::open(&config),
        Err(StoreError::InvalidCollection(_))
    ));
}
