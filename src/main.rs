/*!
 * OSAL Demo
 *
 * Exercises the core end to end:
 * - a periodic timer on its own timebase
 * - a task pacing itself on a binary semaphore given by the timer
 * - teardown of everything still alive
 *
 * Usage: `osal-demo [ticks]` (default 20). Configuration comes from the
 * `OSAL_*` environment variables; logging from `RUST_LOG`.
 */

use miette::{miette, IntoDiagnostic, Result};
use osal::{init_tracing, Osal, OsalConfig};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const DEFAULT_TICKS: u32 = 20;
const TIMER_PERIOD_USEC: u32 = 10_000;

#[derive(Debug, Serialize)]
struct Summary {
    ticks_requested: u32,
    timer_fires: u32,
    task_wakeups: u32,
    backlog_resets: u32,
    elapsed_ms: u128,
}

fn main() -> Result<()> {
    init_tracing();

    let ticks = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u32>()
            .map_err(|e| miette!("invalid tick count {:?}: {}", arg, e))?,
        None => DEFAULT_TICKS,
    };

    let config = OsalConfig::from_env()?;
    let osal = Osal::initialize(config)?;
    info!(ticks, "OSAL demo starting");

    let sem = osal.bin_sem_create("demo-sem", 0)?;
    let fires = Arc::new(AtomicU32::new(0));
    let wakeups = Arc::new(AtomicU32::new(0));

    let (timer, accuracy) = {
        let fires = Arc::clone(&fires);
        let handle = osal.clone();
        osal.timer_create("demo-timer", move |_| {
            fires.fetch_add(1, Ordering::Relaxed);
            let _ = handle.bin_sem_give(sem);
        })?
    };
    info!(%timer, accuracy, "timer created");

    let (done_tx, done_rx) = flume::bounded::<()>(1);
    {
        let handle = osal.clone();
        let wakeups = Arc::clone(&wakeups);
        osal.task_create(
            "demo-task",
            move || {
                while wakeups.load(Ordering::Relaxed) < ticks {
                    if handle.bin_sem_take(sem).is_err() {
                        break;
                    }
                    wakeups.fetch_add(1, Ordering::Relaxed);
                }
                let _ = done_tx.send(());
            },
            64 * 1024,
            100,
        )?;
    }

    let started = Instant::now();
    osal.timer_set(timer, TIMER_PERIOD_USEC, TIMER_PERIOD_USEC)?;
    done_rx
        .recv()
        .map_err(|_| miette!("demo task ended without reporting"))?;

    let summary = Summary {
        ticks_requested: ticks,
        timer_fires: fires.load(Ordering::Relaxed),
        task_wakeups: wakeups.load(Ordering::Relaxed),
        backlog_resets: osal.timer_get_info(timer)?.backlog_resets,
        elapsed_ms: started.elapsed().as_millis(),
    };

    osal.teardown()?;
    println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
    Ok(())
}
