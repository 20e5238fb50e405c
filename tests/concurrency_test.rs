/*!
 * Concurrency Stress Tests
 * Randomized create/delete churn and timer rings mutated while ticking
 */

use osal::{ObjectId, ObjectLimits, ObjectType, Osal, OsalConfig, OsalError};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: u64 = 4;
const OPS_PER_THREAD: usize = 400;

#[test]
fn test_concurrent_churn_never_reissues_ids() {
    let osal = Osal::initialize(OsalConfig {
        limits: ObjectLimits::uniform(8),
        ..OsalConfig::default()
    })
    .unwrap();
    let issued = Arc::new(Mutex::new(HashSet::new()));

    let workers: Vec<_> = (0..THREADS)
        .map(|seed| {
            let osal = osal.clone();
            let issued = Arc::clone(&issued);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut live: Vec<ObjectId> = Vec::new();
                for op in 0..OPS_PER_THREAD {
                    if live.is_empty() || rng.gen_bool(0.55) {
                        let name = format!("w{}-{}", seed, op);
                        match osal.count_sem_create(&name, 0) {
                            Ok(id) => {
                                assert!(issued.lock().insert(id), "{} issued twice", id);
                                assert_eq!(osal.count_sem_get_id_by_name(&name), Ok(id));
                                live.push(id);
                            }
                            Err(e) => assert_eq!(e, OsalError::NoFreeIds),
                        }
                    } else {
                        let id = live.swap_remove(rng.gen_range(0..live.len()));
                        osal.count_sem_delete(id).unwrap();
                    }
                }
                for id in live {
                    osal.count_sem_delete(id).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(osal.registry().active_count(ObjectType::CountSem), 0);
    osal.teardown().unwrap();
}

#[test]
fn test_timers_added_and_deleted_while_ticking() {
    let osal = Osal::initialize(OsalConfig {
        limits: ObjectLimits::uniform(16),
        ..OsalConfig::default()
    })
    .unwrap();
    let tb = osal.time_base_create("busy", None).unwrap();
    osal.time_base_set(tb, 1_000, 1_000).unwrap();
    let fired = Arc::new(AtomicU32::new(0));

    let mut rng = StdRng::seed_from_u64(7);
    let mut live: Vec<ObjectId> = Vec::new();
    for n in 0..200 {
        if live.len() < 8 && rng.gen_bool(0.6) {
            let fired = Arc::clone(&fired);
            let id = osal
                .timer_add(&format!("t{}", n), tb, move |_| {
                    fired.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            osal.timer_set(id, rng.gen_range(500..3_000), 1_000).unwrap();
            live.push(id);
        } else if !live.is_empty() {
            let id = live.swap_remove(rng.gen_range(0..live.len()));
            osal.timer_delete(id).unwrap();
        }
        if n % 20 == 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }

    let mut ring = osal.time_base_timers(tb).unwrap();
    ring.sort();
    live.sort();
    assert_eq!(ring, live);

    for id in live {
        osal.timer_delete(id).unwrap();
    }
    assert!(osal.time_base_timers(tb).unwrap().is_empty());
    osal.time_base_delete(tb).unwrap();
    osal.teardown().unwrap();
}
