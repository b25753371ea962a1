use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use irislab::dataset::feature_matrix;
use irislab::dataset::reference::reference_flowers;
use irislab::ml::{ModelSelector, SelectorOptions};

fn bench_training(c: &mut Criterion) {
    let rows = reference_flowers();
    let selector = ModelSelector::new(SelectorOptions::default());
    let split = selector.prepare(&rows, 0.2).expect("split");

    c.bench_function("train_all_models", |b| {
        b.iter_batched(
            || ModelSelector::new(SelectorOptions::default()),
            |mut selector| {
                selector.train_all(&split.train).expect("train");
                selector
            },
            BatchSize::SmallInput,
        );
    });

    let mut trained = ModelSelector::new(SelectorOptions::default());
    trained.train_all(&split.train).expect("train");
    c.bench_function("evaluate_all_models", |b| {
        b.iter_batched(
            || trained.clone(),
            |mut selector| selector.evaluate(&split.test).expect("evaluate"),
            BatchSize::SmallInput,
        );
    });

    trained.evaluate(&split.test).expect("evaluate");
    let features = feature_matrix(&rows);
    c.bench_function("predict_full_dataset", |b| {
        b.iter(|| trained.predict(&features).expect("predict"));
    });
}

criterion_group!(benches, bench_training);
criterion_main!(benches);
