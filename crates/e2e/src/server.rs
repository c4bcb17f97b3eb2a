//! Server management - optionally launching the system under test and
//! health checking it before scenarios run

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Configuration for reaching (and optionally launching) the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path polled until it answers 2xx
    pub health_path: String,

    /// How long to wait for the health check to pass
    pub startup_timeout_secs: u64,

    /// Shell command that starts the server (None = already running)
    pub command: Option<String>,

    /// Working directory for `command`
    pub workdir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            health_path: "/api/ping".to_string(),
            startup_timeout_secs: 30,
            command: None,
            workdir: None,
        }
    }
}

impl ServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

/// A reachable server, plus the child process if we launched it
pub struct ServerHandle {
    child: Option<Child>,
    base_url: String,
}

impl ServerHandle {
    /// Launch the configured command (if any) and wait until healthy
    pub async fn start(base_url: &str, config: &ServerConfig) -> E2eResult<Self> {
        let child = match &config.command {
            Some(command) => Some(spawn_command(command, config)?),
            None => None,
        };

        let mut handle = ServerHandle {
            child,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        if let Err(e) = handle
            .wait_for_healthy(&config.health_path, config.startup_timeout())
            .await
        {
            handle.stop()?;
            return Err(e);
        }

        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    pub async fn wait_for_healthy(
        &self,
        health_path: &str,
        timeout_duration: Duration,
    ) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url, health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server at {}...", self.base_url);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn launched(&self) -> bool {
        self.child.is_some()
    }

    /// Stop the server if we launched it
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping server (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn spawn_command(command: &str, config: &ServerConfig) -> E2eResult<Child> {
    info!("Launching server: {}", command);

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(dir) = &config.workdir {
        cmd.current_dir(dir);
    }
    cmd.stdout(Stdio::null()).stderr(Stdio::inherit());

    cmd.spawn()
        .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn `{}`: {}", command, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_gives_up() {
        // Bind then drop to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let handle = ServerHandle {
            child: None,
            base_url: format!("http://127.0.0.1:{port}"),
        };
        let err = handle
            .wait_for_healthy("/api/ping", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::ServerHealthCheck(n) if n >= 1));
    }

    #[test]
    fn test_stop_without_child_is_noop() {
        let mut handle = ServerHandle {
            child: None,
            base_url: "http://127.0.0.1:1".to_string(),
        };
        assert!(!handle.launched());
        assert!(handle.stop().is_ok());
    }
}
