use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fibre_functional::{FunctionalMap, ThreadExecutor, WaitMode, WriteEntry};
use std::sync::Arc;

const NUM_ITEMS: u64 = 10_000;

// --- Setup ---

fn build_map(mode: WaitMode) -> FunctionalMap<u64, u64> {
  let mut builder = FunctionalMap::builder().wait_mode(mode);
  if cfg!(not(feature = "rayon")) {
    builder = builder.executor(Arc::new(ThreadExecutor));
  }
  let map = builder.build().unwrap();

  // Pre-populate on the caller's thread.
  let writer = map.write_only().with_params(&[WaitMode::Blocking.into()]);
  for i in 0..NUM_ITEMS {
    writer.eval(i, move |view| view.set(i, [])).wait();
  }
  map
}

fn modes() -> [(WaitMode, &'static str); 2] {
  [(WaitMode::Blocking, "blocking"), (WaitMode::NonBlocking, "non_blocking")]
}

// --- Benchmark Functions ---

fn bench_read_eval(c: &mut Criterion) {
  let mut group = c.benchmark_group("read_only_eval");
  group.throughput(Throughput::Elements(1));
  for (mode, name) in modes() {
    let map = build_map(mode);
    let ro = map.read_only();
    let mut key = 0u64;
    group.bench_function(BenchmarkId::from_parameter(name), |b| {
      b.iter(|| {
        key = (key + 1) % NUM_ITEMS;
        black_box(ro.eval(key, |view| view.find()).wait());
      })
    });
  }
  group.finish();
}

fn bench_write_eval(c: &mut Criterion) {
  let mut group = c.benchmark_group("write_only_eval");
  group.throughput(Throughput::Elements(1));
  for (mode, name) in modes() {
    let map = build_map(mode);
    let wo = map.write_only();
    let mut key = 0u64;
    group.bench_function(BenchmarkId::from_parameter(name), |b| {
      b.iter(|| {
        key = (key + 1) % NUM_ITEMS;
        let value = key;
        black_box(wo.eval(key, move |view| view.set(value, [])).wait());
      })
    });
  }
  group.finish();
}

fn bench_read_write_eval(c: &mut Criterion) {
  let mut group = c.benchmark_group("read_write_eval");
  group.throughput(Throughput::Elements(1));
  for (mode, name) in modes() {
    let map = build_map(mode);
    let rw = map.read_write();
    let mut key = 0u64;
    group.bench_function(BenchmarkId::from_parameter(name), |b| {
      b.iter(|| {
        key = (key + 1) % NUM_ITEMS;
        let previous = rw
          .eval(key, |view| {
            let previous = view.find();
            let next = previous.as_deref().copied().unwrap_or_default() + 1;
            view.set(next, []);
            previous
          })
          .wait();
        black_box(previous);
      })
    });
  }
  group.finish();
}

fn bench_bulk_eval(c: &mut Criterion) {
  let mut group = c.benchmark_group("read_only_eval_many");
  group.throughput(Throughput::Elements(NUM_ITEMS));
  for (mode, name) in modes() {
    let map = build_map(mode);
    let ro = map.read_only();
    group.bench_function(BenchmarkId::from_parameter(name), |b| {
      b.iter(|| {
        let found = ro
          .eval_many(0..NUM_ITEMS, |view| view.is_present())
          .filter(|present| *present)
          .count();
        black_box(found);
      })
    });
  }
  group.finish();
}

criterion_group!(
  benches,
  bench_read_eval,
  bench_write_eval,
  bench_read_write_eval,
  bench_bulk_eval
);
criterion_main!(benches);
