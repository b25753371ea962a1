use criterion::{Criterion, criterion_group, criterion_main};
use irislab::dataset::Species;
use irislab::dataset::reference::reference_flowers;
use irislab::store::{FlowerRecord, FlowerStore};
use time::OffsetDateTime;

/// Copies of the reference rows stored per run.
const COPIES: usize = 20;

fn seeded_store() -> FlowerStore {
    let rows = reference_flowers();
    let now = OffsetDateTime::now_utc();
    let records: Vec<FlowerRecord> = (0..COPIES)
        .flat_map(|_| FlowerRecord::from_rows(&rows, now))
        .collect();
    let mut store = FlowerStore::open_in_memory("iris_flowers").expect("open store");
    store.replace_all(&records).expect("seed records");
    store
}

fn bench_queries(c: &mut Criterion, store: &FlowerStore, label: &str) {
    c.bench_function(&format!("find_by_species_{label}"), |b| {
        b.iter(|| store.find_by_species(Species::Versicolor).expect("query"));
    });
    c.bench_function(&format!("find_petals_above_{label}"), |b| {
        b.iter(|| store.find_petals_above(5.0, 1.8).expect("query"));
    });
    c.bench_function(&format!("aggregate_counts_{label}"), |b| {
        b.iter(|| store.aggregate_counts().expect("query"));
    });
}

fn bench_store_queries(c: &mut Criterion) {
    let store = seeded_store();
    store.drop_indexes().expect("drop indexes");
    bench_queries(c, &store, "unindexed");
    store.ensure_indexes().expect("ensure indexes");
    bench_queries(c, &store, "indexed");
}

criterion_group!(benches, bench_store_queries);
criterion_main!(benches);
