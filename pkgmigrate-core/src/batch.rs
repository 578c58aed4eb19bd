//! Batch execution with a concurrency cap.

use crate::pipeline::{MigrateError, migrate_item};
use crate::ports::{Level, Ports};
use crate::selection::Selection;
use crate::settings::MigrateSettings;
use chrono::Utc;
use pkgmigrate_types::outcome::ItemOutcome;
use pkgmigrate_types::report::BatchReport;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::debug;

/// Run `job` over `items` with at most `cap` in flight, returning results in input order.
///
/// A panicking job does not take the batch down: its slot is filled by `recover` with the
/// item's index and the panic message.
pub fn run_bounded<T, R, F, G>(items: Vec<T>, cap: NonZeroUsize, job: F, recover: G) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
    G: Fn(usize, String) -> R + Sync,
{
    let total = items.len();
    if total == 0 {
        return vec![];
    }

    let (work_tx, work_rx) = crossbeam_channel::bounded(total);
    for entry in items.into_iter().enumerate() {
        if work_tx.send(entry).is_err() {
            break;
        }
    }
    drop(work_tx);

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    let workers = cap.get().min(total);
    debug!(total, workers, "starting batch");

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            let job = &job;
            let recover = &recover;
            scope.spawn(move || {
                for (i, item) in work_rx.iter() {
                    let result = match catch_unwind(AssertUnwindSafe(|| job(item))) {
                        Ok(r) => r,
                        Err(payload) => recover(i, panic_message(payload.as_ref())),
                    };
                    if done_tx.send((i, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(done_tx);

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    for (i, result) in done_rx.try_iter() {
        slots[i] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Migrate every selected item and aggregate the outcomes.
///
/// Rejected selections become failed items without running. One item's failure never stops the
/// others.
pub fn run_batch(selection: Selection, settings: &MigrateSettings, ports: Ports<'_>) -> BatchReport {
    let report = BatchReport::new(Utc::now());
    let labels: Vec<String> = selection
        .iter()
        .map(|s| match s {
            Ok(pair) => pair.manifest.to_string(),
            Err(err) => err.manifest.to_string(),
        })
        .collect();

    let outcomes = run_bounded(
        selection,
        settings.concurrency,
        |selected| match selected {
            Ok(pair) => migrate_item(&pair, settings, ports),
            Err(rejected) => {
                let manifest = rejected.manifest.to_string();
                let err = MigrateError::Selection(rejected.reason);
                ports
                    .logger
                    .log(Level::Error, &format!("Skipping \"{manifest}\": {err}"));
                ItemOutcome::failed(manifest, None, err.to_string())
            }
        },
        |i, message| {
            let manifest = labels.get(i).cloned().unwrap_or_default();
            ports.logger.log(
                Level::Error,
                &format!("Migration of \"{manifest}\" panicked: {message}"),
            );
            ItemOutcome::failed(manifest, None, format!("internal error: {message}"))
        },
    );

    let mut report = report.with_items(outcomes);
    report.ended_at = Some(Utc::now());
    ports.logger.log(
        Level::Info,
        &format!(
            "{} of {} manifests migrated, {} failed",
            report.summary.succeeded, report.summary.total, report.summary.failed
        ),
    );
    report
}
