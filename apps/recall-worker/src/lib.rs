pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use time::Duration;
use tracing_subscriber::EnvFilter;

use recall_providers::NtfyClient;
use recall_service::RecallService;
use recall_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = recall_cli::VERSION,
	rename_all = "kebab",
	styles = recall_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = recall_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	// Bad transport configuration is fatal here rather than a failure on every job.
	let transport = NtfyClient::new(&config.notifier)?;
	let poll_interval = Duration::milliseconds(
		i64::try_from(config.queue.poll_interval_ms.min(recall_config::MAX_POLL_INTERVAL_MS))
			.unwrap_or(i64::MAX),
	);
	let reconcile_interval = match config.reconcile.interval_seconds {
		0 => None,
		seconds => Some(Duration::seconds(
			i64::try_from(seconds.min(recall_config::MAX_RECONCILE_INTERVAL_SECONDS))
				.unwrap_or(i64::MAX),
		)),
	};
	let reconcile_on_startup = config.reconcile.on_startup;
	let service = RecallService::new(config, db, Arc::new(transport));

	if reconcile_on_startup {
		service.scheduler.reconcile().await?;
	}

	let state = worker::WorkerState {
		scheduler: service.scheduler.clone(),
		dispatcher: service.dispatcher(),
		poll_interval,
		reconcile_interval,
	};

	worker::run_worker(state).await
}

fn init_tracing(config: &recall_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
