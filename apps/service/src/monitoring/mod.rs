/// Monitoring engine module - probing, retries and check bookkeeping
///
/// This module is responsible for:
/// - Executing single HTTP/HTTPS probes
/// - Retrying failed probes with exponential backoff
/// - Validating monitor configuration
/// - Computing uptime statistics from check history
pub mod checker;
pub mod retry;
pub mod stats;
pub mod types;
pub mod validation;

pub use checker::{HttpProber, Prober};
pub use retry::{RetryConfig, RetryController};
pub use stats::MonitorStats;
pub use types::{AlertTargets, CheckRecord, CheckResult, Monitor, MonitorStatus};
