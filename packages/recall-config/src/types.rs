use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub notifier: Notifier,
	#[serde(default)]
	pub queue: Queue,
	#[serde(default)]
	pub reconcile: Reconcile,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	/// Base URL of the web app. Notification deep links point at `<app_base_url>/notes/<id>`.
	pub app_base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Push transport (ntfy-compatible) shared by every user topic.
#[derive(Debug, Clone, Deserialize)]
pub struct Notifier {
	pub base_url: String,
	pub username: String,
	pub password: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Queue {
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default = "default_base_backoff_ms")]
	pub base_backoff_ms: u64,
	#[serde(default = "default_max_backoff_ms")]
	pub max_backoff_ms: u64,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: u64,
}
impl Default for Queue {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			base_backoff_ms: default_base_backoff_ms(),
			max_backoff_ms: default_max_backoff_ms(),
			poll_interval_ms: default_poll_interval_ms(),
			claim_lease_seconds: default_claim_lease_seconds(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reconcile {
	#[serde(default = "default_on_startup")]
	pub on_startup: bool,
	/// Periodic reconciliation interval. Zero disables the periodic pass.
	#[serde(default)]
	pub interval_seconds: u64,
}
impl Default for Reconcile {
	fn default() -> Self {
		Self { on_startup: default_on_startup(), interval_seconds: 0 }
	}
}

fn default_max_attempts() -> u32 {
	3
}

fn default_base_backoff_ms() -> u64 {
	2_000
}

fn default_max_backoff_ms() -> u64 {
	60_000
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_claim_lease_seconds() -> u64 {
	30
}

fn default_on_startup() -> bool {
	true
}
