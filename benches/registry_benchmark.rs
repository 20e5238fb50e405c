/*!
 * Registry Benchmarks
 *
 * Object create/delete churn, ID validation and one tick pass over timer
 * rings of increasing size
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use osal::timebase::{process_tick, CallbackArena, TimeBaseState};
use osal::{LockMode, ObjectLimits, ObjectType, Osal, OsalConfig};

fn osal(capacity: usize) -> Osal {
    Osal::initialize(OsalConfig {
        limits: ObjectLimits::uniform(capacity),
        ..OsalConfig::default()
    })
    .unwrap()
}

fn bench_create_delete(c: &mut Criterion) {
    let osal = osal(64);
    c.bench_function("bin_sem_create_delete", |b| {
        b.iter(|| {
            let id = osal.bin_sem_create(black_box("bench"), 0).unwrap();
            osal.bin_sem_delete(id).unwrap();
        });
    });
    osal.teardown().unwrap();
}

fn bench_lookup(c: &mut Criterion) {
    let osal = osal(64);
    let id = osal.mutex_create("bench").unwrap();
    let mut group = c.benchmark_group("lookup");

    for mode in [LockMode::None, LockMode::Refcount] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", mode)),
            &mode,
            |b, &mode| {
                b.iter(|| {
                    let token = osal
                        .registry()
                        .get_by_id(mode, ObjectType::Mutex, black_box(id))
                        .unwrap();
                    black_box(token.index());
                });
            },
        );
    }
    group.bench_function("find_by_name", |b| {
        b.iter(|| osal.mutex_get_id_by_name(black_box("bench")).unwrap());
    });
    group.finish();
    osal.teardown().unwrap();
}

fn bench_tick_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_pass");

    for timers in [1usize, 8, 32] {
        let arena = CallbackArena::new(timers);
        let mut state = TimeBaseState::default();
        for index in 0..timers {
            arena.insert_head(&mut state.first_cb, index);
        }

        group.bench_with_input(BenchmarkId::from_parameter(timers), &timers, |b, _| {
            b.iter(|| process_tick(&arena, &mut state, black_box(100)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create_delete, bench_lookup, bench_tick_pass);
criterion_main!(benches);
