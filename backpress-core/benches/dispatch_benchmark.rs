use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use backpress_core::{
    BackPressCategory, BackPressHandler, BackPressManager, BackPressSignal, CategoryMetricIds,
    InMemoryMetricsRecorder, MetricsRecorder, handler,
};

struct Noop(BackPressSignal);

impl BackPressHandler for Noop {
    fn handle_back_press(&mut self) {}

    fn back_press_signal(&self) -> BackPressSignal {
        self.0.clone()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

struct Discard;

impl MetricsRecorder for Discard {
    fn record_enumeration(&self, _histogram: &str, _sample: i32, _boundary: i32) {}
}

/// Every category registered, only the lowest-priority one armed.
fn worst_case_manager() -> (BackPressManager, Vec<BackPressSignal>) {
    let manager = BackPressManager::new(CategoryMetricIds::new(), Arc::new(Discard));
    let last = BackPressCategory::ALL.len() - 1;

    let signals = BackPressCategory::ALL
        .iter()
        .enumerate()
        .map(|(index, &category)| {
            let signal = BackPressSignal::new(index == last);
            manager
                .register_handler(category, handler::shared(Noop(signal.clone())))
                .unwrap();
            signal
        })
        .collect();

    (manager, signals)
}

fn bench_dispatch(c: &mut Criterion) {
    let (manager, _signals) = worst_case_manager();

    c.bench_function("dispatch_last_category", |b| {
        b.iter(|| black_box(manager.dispatch()))
    });

    let empty = BackPressManager::new(
        CategoryMetricIds::new(),
        Arc::new(InMemoryMetricsRecorder::new()),
    );
    c.bench_function("dispatch_unarmed", |b| b.iter(|| black_box(empty.dispatch())));
}

fn bench_want_state_toggle(c: &mut Criterion) {
    let (manager, signals) = worst_case_manager();
    let mut group = c.benchmark_group("want_state_toggle");

    for index in [0usize, 8, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(index), &index, |b, &index| {
            b.iter(|| {
                signals[index].set(true);
                signals[index].set(false);
                black_box(manager.is_armed())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_want_state_toggle);
criterion_main!(benches);
