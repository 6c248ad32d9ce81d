// src/pipeline/schedule.rs

//! Repeating crawl runs on a fixed interval.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::CancelToken;
use crate::pipeline::crawl::CrawlSummary;

/// Shortest pause between two runs.
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Granularity at which a pause notices cancellation.
const TICK: Duration = Duration::from_secs(1);

pub fn effective_interval(requested: Duration) -> Duration {
    requested.max(MIN_INTERVAL)
}

/// Call `run` once per interval until `cancel` is set.
///
/// `run` receives the 1-based cycle number. A failed run is logged and the
/// schedule continues. Returns the number of runs started.
pub async fn run_every<F, Fut>(interval: Duration, cancel: &CancelToken, mut run: F) -> u32
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<CrawlSummary>>,
{
    let interval = effective_interval(interval);
    let mut cycle = 0;

    while !cancel.is_cancelled() {
        cycle += 1;
        log::info!("Interval run #{}", cycle);
        match run(cycle).await {
            Ok(summary) => log::info!(
                "Run {} done: processed={}, failed={}, stop={:?}",
                summary.run_id,
                summary.processed,
                summary.failed,
                summary.stop
            ),
            Err(e) => log::error!("Run #{} failed: {}", cycle, e),
        }

        if cancel.is_cancelled() {
            break;
        }
        log::info!("Next run in {}s", interval.as_secs());
        pause(interval, cancel).await;
    }

    log::info!("Interval mode stopped after {} run(s)", cycle);
    cycle
}

async fn pause(total: Duration, cancel: &CancelToken) {
    let mut waited = Duration::ZERO;
    while waited < total && !cancel.is_cancelled() {
        let step = TICK.min(total - waited);
        tokio::time::sleep(step).await;
        waited += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::cell::Cell;

    #[test]
    fn test_interval_has_floor() {
        assert_eq!(effective_interval(Duration::from_secs(5)), MIN_INTERVAL);
        assert_eq!(
            effective_interval(Duration::from_secs(600)),
            Duration::from_secs(600)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_does_not_stop_schedule() {
        let cancel = CancelToken::new();
        let calls = Cell::new(0);

        let runs = run_every(Duration::from_secs(60), &cancel, |cycle| {
            calls.set(calls.get() + 1);
            let cancel = cancel.clone();
            async move {
                if cycle == 3 {
                    cancel.cancel();
                }
                if cycle == 2 {
                    return Err(AppError::navigation("menu not found"));
                }
                Ok(CrawlSummary {
                    run_id: format!("run-{cycle}"),
                    ..CrawlSummary::default()
                })
            }
        })
        .await;

        assert_eq!(runs, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_schedule_never_runs() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let runs = run_every(Duration::from_secs(60), &cancel, |_| async {
            Ok(CrawlSummary::default())
        })
        .await;
        assert_eq!(runs, 0);
    }
}
