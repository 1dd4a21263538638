use std::time::Duration as StdDuration;

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::{sync::watch, time as tokio_time};

use recall_service::{JobOutcome, ReviewDispatcher, Scheduler};

pub struct WorkerState {
	pub scheduler: Scheduler,
	pub dispatcher: ReviewDispatcher,
	pub poll_interval: Duration,
	/// `None` disables periodic reconciliation.
	pub reconcile_interval: Option<Duration>,
}

/// Drains due jobs, reconciles on the configured interval and sleeps between polls until
/// Ctrl-C. A job already in flight finishes before the loop exits.
pub async fn run_worker(state: WorkerState) -> Result<()> {
	let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			let _ = shutdown_tx.send(true);
		}
	});

	let mut last_reconcile = OffsetDateTime::now_utc();

	tracing::info!("Review worker started.");

	loop {
		drain_due_jobs(&state, &shutdown_rx).await;

		if *shutdown_rx.borrow() {
			break;
		}

		let now = OffsetDateTime::now_utc();

		if let Some(interval) = state.reconcile_interval
			&& now - last_reconcile >= interval
		{
			if let Err(err) = state.scheduler.reconcile_at(now).await {
				tracing::error!(error = %err, "Periodic reconciliation failed.");
			}

			last_reconcile = now;
		}

		tokio::select! {
			Ok(()) = shutdown_rx.changed() => {},
			_ = tokio_time::sleep(to_std_duration(state.poll_interval)) => {},
		}

		if *shutdown_rx.borrow() {
			break;
		}
	}

	tracing::info!("Review worker stopped.");

	Ok(())
}

async fn drain_due_jobs(state: &WorkerState, shutdown: &watch::Receiver<bool>) {
	while !*shutdown.borrow() {
		let now = OffsetDateTime::now_utc();

		match state.scheduler.queue().process_next(now, &state.dispatcher).await {
			Ok(Some(run)) => {
				if matches!(run.outcome, JobOutcome::Superseded) {
					tracing::debug!(job_key = %run.job_key, "Job superseded while firing.");
				}
			},
			Ok(None) => break,
			Err(err) => {
				tracing::error!(error = %err, "Review queue processing failed.");

				break;
			},
		}
	}
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(millis as u64)
}
