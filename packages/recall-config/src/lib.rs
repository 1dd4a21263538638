mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Notifier, Postgres, Queue, Reconcile, Service, Storage};

use std::{fs, path::Path};

/// Upper bound for `queue.base_backoff_ms` and `queue.max_backoff_ms` (one day).
pub const MAX_BACKOFF_MS: u64 = 86_400_000;
/// Upper bound for `queue.claim_lease_seconds` (one day).
pub const MAX_CLAIM_LEASE_SECONDS: u64 = 86_400;
/// Upper bound for `queue.poll_interval_ms` (one hour).
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
/// Upper bound for `reconcile.interval_seconds` (one week).
pub const MAX_RECONCILE_INTERVAL_SECONDS: u64 = 604_800;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("service.log_level", &cfg.service.log_level),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, value) in
		[("service.app_base_url", &cfg.service.app_base_url), ("notifier.base_url", &cfg.notifier.base_url)]
	{
		if !is_http_url(value) {
			return Err(Error::Validation {
				message: format!("{label} must be an http or https URL."),
			});
		}
	}

	// The transport refuses to start without shared credentials rather than failing per message.
	for (label, value) in
		[("notifier.username", &cfg.notifier.username), ("notifier.password", &cfg.notifier.password)]
	{
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.notifier.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "notifier.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.max_attempts == 0 {
		return Err(Error::Validation {
			message: "queue.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.base_backoff_ms == 0 {
		return Err(Error::Validation {
			message: "queue.base_backoff_ms must be greater than zero.".to_string(),
		});
	}

	for (label, value, max) in [
		("queue.base_backoff_ms", cfg.queue.base_backoff_ms, MAX_BACKOFF_MS),
		("queue.max_backoff_ms", cfg.queue.max_backoff_ms, MAX_BACKOFF_MS),
		("queue.poll_interval_ms", cfg.queue.poll_interval_ms, MAX_POLL_INTERVAL_MS),
		("queue.claim_lease_seconds", cfg.queue.claim_lease_seconds, MAX_CLAIM_LEASE_SECONDS),
		(
			"reconcile.interval_seconds",
			cfg.reconcile.interval_seconds,
			MAX_RECONCILE_INTERVAL_SECONDS,
		),
	] {
		if value > max {
			return Err(Error::Validation {
				message: format!("{label} must be less than or equal to {max}."),
			});
		}
	}

	if cfg.queue.max_backoff_ms < cfg.queue.base_backoff_ms {
		return Err(Error::Validation {
			message: "queue.max_backoff_ms must be greater than or equal to queue.base_backoff_ms."
				.to_string(),
		});
	}
	if cfg.queue.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "queue.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.claim_lease_seconds == 0 {
		return Err(Error::Validation {
			message: "queue.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.app_base_url = cfg.service.app_base_url.trim().trim_end_matches('/').to_string();
	cfg.notifier.base_url = cfg.notifier.base_url.trim().trim_end_matches('/').to_string();
}

fn is_http_url(value: &str) -> bool {
	let Some(rest) = value.strip_prefix("https://").or_else(|| value.strip_prefix("http://"))
	else {
		return false;
	};

	!rest.trim().is_empty()
}
