//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with proper
//! logging, heartbeat, and graceful shutdown.

use std::time::Duration;
use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heartbeat_interval_secs: 300, // 5 minutes default
        }
    }

    pub fn with_heartbeat(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

/// Trait for binary applications
pub trait BinaryRunner {
    /// Run the application until it is asked to stop
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    /// Summary printed with the shutdown banner
    fn stats(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        let config = self.config();
        info!("----------------------------------------");
        info!("{} starting (heartbeat every {}s)", config.name, config.heartbeat_interval().as_secs());
        info!("Ctrl+C stops the bot");
        info!("----------------------------------------");
    }

    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("----------------------------------------");
        match stats {
            Some(stats) => info!("{} stopped: {}", config.name, stats),
            None => info!("{} stopped", config.name),
        }
        info!("----------------------------------------");
    }

    /// Execute the binary with proper initialization and cleanup
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        self.print_shutdown(self.stats().as_deref());
        result
    }
}

/// Resolve on Ctrl+C
///
/// If the signal handler cannot be installed this never resolves, so the
/// caller keeps running instead of exiting at once.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new("test-binary").with_heartbeat(120);

        assert_eq!(config.name, "test-binary");
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::new("default");
        assert_eq!(config.heartbeat_interval_secs, 300);
    }

    #[test]
    fn test_zero_heartbeat_is_clamped() {
        let config = RunConfig::new("x").with_heartbeat(0);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
    }
}
