//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{WorkerError, WorkerResult};

/// How persisted EDLs are handed to a render worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Spawn the render binary as a child process.
    Process,
    /// Enqueue on the Redis render stream.
    Redis,
}

impl DispatchMode {
    pub fn parse(value: &str) -> WorkerResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "process" | "" => Ok(Self::Process),
            "redis" | "queue" => Ok(Self::Redis),
            other => Err(WorkerError::config_error(format!("unknown dispatch mode '{}'", other))),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch root; each job renders in `{work_dir}/{jobId}`
    pub work_dir: PathBuf,
    /// Optional timeout per FFmpeg step. `None` waits indefinitely.
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Maximum jobs the queue consumer renders at once
    pub max_concurrent_jobs: usize,
    /// How the generator dispatches render jobs
    pub dispatch_mode: DispatchMode,
    /// Render binary launched by the process dispatcher
    pub render_program: PathBuf,
    /// Prometheus listener; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/vforge"),
            ffmpeg_timeout_secs: None,
            max_concurrent_jobs: 1,
            dispatch_mode: DispatchMode::Process,
            render_program: PathBuf::from("vforge-render"),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(addr) if !addr.trim().is_empty() => Some(addr.trim().parse().map_err(|e| {
                WorkerError::config_error(format!("invalid METRICS_ADDR '{}': {}", addr, e))
            })?),
            _ => None,
        };

        Ok(Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout_secs: std::env::var("WORKER_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0),
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            dispatch_mode: match std::env::var("WORKER_DISPATCH") {
                Ok(mode) => DispatchMode::parse(&mode)?,
                Err(_) => defaults.dispatch_mode,
            },
            render_program: std::env::var("WORKER_RENDER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.render_program),
            metrics_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert!(config.ffmpeg_timeout_secs.is_none());
        assert_eq!(config.dispatch_mode, DispatchMode::Process);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/vforge"));
    }

    #[test]
    fn test_dispatch_mode_parse() {
        assert_eq!(DispatchMode::parse("redis").unwrap(), DispatchMode::Redis);
        assert_eq!(DispatchMode::parse(" Process ").unwrap(), DispatchMode::Process);
        assert!(DispatchMode::parse("carrier-pigeon").is_err());
    }
}
