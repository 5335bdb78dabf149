//! Configuration module
//!
//! Environment-driven configuration for the worker process and the storage
//! factory. `dotenvy` loading happens in the binary; this module only reads
//! the process environment.

use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::storage_types::StorageBackend;

const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const WORKER_POLL_INTERVAL_MS: u64 = 1000;
const WORKER_STALE_CLAIM_SECS: i64 = 300;
const WORKER_STALE_REAP_INTERVAL_SECS: u64 = 60;
const WORKER_STORAGE_RETRY_ATTEMPTS: u32 = 3;
const WORKER_JOB_RETENTION_DAYS: i32 = 30;

/// Worker loop tuning.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Idle backoff between claim attempts when no job is claimable.
    pub poll_interval_ms: u64,
    /// Jobs claimed longer than this without reaching a terminal state are
    /// treated as abandoned and reclaimed.
    pub stale_claim_secs: i64,
    /// Interval between runs of the stale-claim reaper. 0 = disabled.
    pub stale_reap_interval_secs: u64,
    /// Bounded attempts for transient storage errors within one job.
    pub storage_retry_attempts: u32,
    /// Retention in days for finished jobs (ready/failed). 0 = disabled.
    pub job_retention_days: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            stale_claim_secs: WORKER_STALE_CLAIM_SECS,
            stale_reap_interval_secs: WORKER_STALE_REAP_INTERVAL_SECS,
            storage_retry_attempts: WORKER_STORAGE_RETRY_ATTEMPTS,
            job_retention_days: WORKER_JOB_RETENTION_DAYS,
        }
    }
}

/// Process configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub s3_endpoint: Option<String>,
    pub worker: WorkerConfig,
}

impl Config {
    /// Load configuration from the environment. `DATABASE_URL` is required;
    /// everything else has a default.
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::InvalidInput("DATABASE_URL not set".to_string()))?;

        let storage_backend = parse_or_default(
            env::var("STORAGE_BACKEND").ok(),
            "STORAGE_BACKEND",
            StorageBackend::Local,
        )?;

        Ok(Config {
            database_url,
            db_max_connections: parse_or_default(
                env::var("DB_MAX_CONNECTIONS").ok(),
                "DB_MAX_CONNECTIONS",
                DB_MAX_CONNECTIONS,
            )?,
            db_timeout_seconds: parse_or_default(
                env::var("DB_TIMEOUT_SECONDS").ok(),
                "DB_TIMEOUT_SECONDS",
                DB_TIMEOUT_SECS,
            )?,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            worker: WorkerConfig {
                poll_interval_ms: parse_or_default(
                    env::var("WORKER_POLL_INTERVAL_MS").ok(),
                    "WORKER_POLL_INTERVAL_MS",
                    WORKER_POLL_INTERVAL_MS,
                )?,
                stale_claim_secs: parse_or_default(
                    env::var("WORKER_STALE_CLAIM_SECS").ok(),
                    "WORKER_STALE_CLAIM_SECS",
                    WORKER_STALE_CLAIM_SECS,
                )?,
                stale_reap_interval_secs: parse_or_default(
                    env::var("WORKER_STALE_REAP_INTERVAL_SECS").ok(),
                    "WORKER_STALE_REAP_INTERVAL_SECS",
                    WORKER_STALE_REAP_INTERVAL_SECS,
                )?,
                storage_retry_attempts: parse_or_default(
                    env::var("WORKER_STORAGE_RETRY_ATTEMPTS").ok(),
                    "WORKER_STORAGE_RETRY_ATTEMPTS",
                    WORKER_STORAGE_RETRY_ATTEMPTS,
                )?,
                job_retention_days: parse_or_default(
                    env::var("WORKER_JOB_RETENTION_DAYS").ok(),
                    "WORKER_JOB_RETENTION_DAYS",
                    WORKER_JOB_RETENTION_DAYS,
                )?,
            },
        })
    }
}

/// Parse an optional env value, falling back to a default when unset and
/// erroring (rather than silently defaulting) when set but malformed.
fn parse_or_default<T: FromStr>(
    value: Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::InvalidInput(format!("Invalid value for {}: {}", name, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_unset() {
        let v: u64 = parse_or_default(None, "X", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_parse_or_default_set() {
        let v: u64 = parse_or_default(Some("7".to_string()), "X", 42).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_parse_or_default_trims() {
        let v: i64 = parse_or_default(Some(" 120 ".to_string()), "X", 0).unwrap();
        assert_eq!(v, 120);
    }

    #[test]
    fn test_parse_or_default_malformed_is_error() {
        let r: Result<u64, _> = parse_or_default(Some("abc".to_string()), "X", 42);
        assert!(r.is_err());
    }

    #[test]
    fn test_parse_backend() {
        let b: StorageBackend =
            parse_or_default(Some("s3".to_string()), "STORAGE_BACKEND", StorageBackend::Local)
                .unwrap();
        assert_eq!(b, StorageBackend::S3);
    }

    #[test]
    fn test_worker_defaults() {
        let w = WorkerConfig::default();
        assert_eq!(w.poll_interval_ms, 1000);
        assert_eq!(w.stale_claim_secs, 300);
        assert_eq!(w.storage_retry_attempts, 3);
    }
}
