use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use objref_column::{CountingBridge, Handle, ObjectColumn};
use std::sync::Arc;

const CELLS: usize = 1024;

fn host() -> (Arc<CountingBridge>, Vec<Handle>) {
    let bridge = Arc::new(CountingBridge::new());
    bridge.set_recording(false);
    let handles: Vec<Handle> = (1..=64u64).map(|i| Handle::from_raw(i * 0x10)).collect();
    for handle in &handles {
        bridge.register(*handle);
    }
    (bridge, handles)
}

fn filled(bridge: &Arc<CountingBridge>, handles: &[Handle]) -> ObjectColumn {
    let mut column = ObjectColumn::with_len(CELLS, bridge.clone());
    for index in 0..CELLS {
        column.set(index, handles[index % handles.len()]).unwrap();
    }
    column
}

fn bench_set(c: &mut Criterion) {
    let (bridge, handles) = host();
    let mut column = ObjectColumn::with_len(CELLS, bridge.clone());
    let mut index = 0usize;

    c.bench_function("set_overwrite", |b| {
        b.iter(|| {
            let cell = index % CELLS;
            column.set(cell, black_box(handles[index % handles.len()])).unwrap();
            index += 1;
        });
    });
}

fn bench_copy_into(c: &mut Criterion) {
    let (bridge, handles) = host();
    let source = filled(&bridge, &handles);

    c.bench_function("copy_into_1k", |b| {
        b.iter_batched(
            || ObjectColumn::new(bridge.clone()),
            |mut destination| {
                source.copy_into(&mut destination).unwrap();
                destination
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_destroy(c: &mut Criterion) {
    let (bridge, handles) = host();

    c.bench_function("destroy_1k", |b| {
        b.iter_batched(
            || filled(&bridge, &handles),
            |mut column| black_box(column.destroy()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_set, bench_copy_into, bench_destroy);
criterion_main!(benches);
