use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use memo_cache::trial::{run_cancellable_trial, TrialConfig};
use memo_cache::Strategy;

// The shape of the classic demonstration: a small key space hammered by a
// large worker count, so every key is contended while it is still missing.
const DEFAULT_WORKERS: usize = 5000;
const DEFAULT_ATTEMPTS: usize = 5000;
const DEFAULT_KEY_SPACE: usize = 100;

fn arg_or(args: &mut impl Iterator<Item = String>, default: usize) -> usize {
    args.next()
        .map_or(default, |arg| arg.parse().expect("arguments must be numbers"))
}

fn main() {
    let mut args = env::args().skip(1);
    let config = TrialConfig {
        workers: arg_or(&mut args, DEFAULT_WORKERS),
        attempts: arg_or(&mut args, DEFAULT_ATTEMPTS),
        key_space: arg_or(&mut args, DEFAULT_KEY_SPACE),
    };

    // Ctrl-C stops the trial at the next attempt boundary of each worker.
    let cancel = Arc::new(AtomicBool::new(false));
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        ctrlc_cancel.store(true, Ordering::Release);
    })
    .expect("Error setting Ctrl-C handler");

    println!("[config] {config:?}");

    for strategy in [Strategy::Naive, Strategy::GlobalLock, Strategy::ClaimRetry] {
        if cancel.load(Ordering::Acquire) {
            break;
        }

        let start = Instant::now();
        let report = run_cancellable_trial(strategy, &config, &cancel);
        let elapsed = start.elapsed();

        println!(
            "[{strategy:?}] {}/{} keys resolved, {} overcomputed (max {} invocations), {elapsed:?}",
            report.resolved_keys(),
            report.key_space(),
            report.overcomputed_keys(),
            report.max_invocations(),
        );
    }
}
