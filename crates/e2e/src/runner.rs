//! Main scenario runner: probes the server, executes scenarios, records results

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::context::ScenarioContext;
use crate::error::{E2eError, E2eResult};
use crate::scenarios;
use crate::server::ServerHandle;
use crate::spec::Scenario;
use crate::steps::{StepExecutor, StepResult};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    /// Wrap the result of a single scenario
    pub fn single(result: TestResult) -> Self {
        let (passed, failed, skipped) = match (result.skipped, result.success) {
            (true, _) => (0, 0, 1),
            (false, true) => (1, 0, 0),
            (false, false) => (0, 1, 0),
        };
        Self {
            total: 1,
            passed,
            failed,
            skipped,
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

pub struct TestRunner {
    config: RunnerConfig,
    executor: StepExecutor,
    /// Reachable server (launched by us or not)
    server: Option<ServerHandle>,
    /// Health-probe the server before the first scenario
    probe: bool,
}

impl TestRunner {
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        let executor = StepExecutor::from_config(&config)?;
        Ok(Self {
            config,
            executor,
            server: None,
            probe: true,
        })
    }

    /// Skip the startup health probe
    pub fn without_probe(mut self) -> Self {
        self.probe = false;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Launch (if configured) and wait for the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() || !self.probe {
            return Ok(());
        }
        let server = ServerHandle::start(self.config.base_url(), &self.config.server).await?;
        self.server = Some(server);
        Ok(())
    }

    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Scenarios from `specs_dir`, or the built-in set
    pub fn scenarios(&self) -> E2eResult<Vec<Scenario>> {
        match &self.config.specs_dir {
            Some(dir) => Scenario::load_all(dir),
            None => scenarios::builtin(),
        }
    }

    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = self.scenarios()?;
        self.run_specs(&specs).await
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs: Vec<Scenario> = self
            .scenarios()?
            .into_iter()
            .filter(|s| s.has_tag(tag))
            .collect();
        if specs.is_empty() {
            warn!("No scenarios tagged '{}'", tag);
        }
        self.run_specs(&specs).await
    }

    /// Run a specific scenario by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<TestResult> {
        let spec = self
            .scenarios()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))?;

        self.start_server().await?;
        Ok(self.run_spec(&spec).await)
    }

    pub async fn run_specs(&mut self, specs: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        self.start_server().await?;

        info!(
            "Running {} scenario(s) against {} ({} profile)...",
            specs.len(),
            self.config.base_url(),
            self.executor.profile()
        );

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.skipped {
                skipped += 1;
                info!("- {} skipped: {}", result.name, result.error.as_deref().unwrap_or(""));
            } else if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(TestSuiteResult {
            total: specs.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    /// Run one scenario with fresh actors. Stops at the first failing step.
    pub async fn run_spec(&self, spec: &Scenario) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let mut ctx = ScenarioContext::new();
        let mut step_results = Vec::new();
        let mut test_error: Option<String> = None;
        let mut skipped = false;

        for step in &spec.steps {
            let result = self.executor.execute_step(step, &mut ctx).await;

            if !result.success {
                skipped = result.skipped;
                test_error = result
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", result.step_name, e));
                step_results.push(result);
                break;
            }
            step_results.push(result);
        }

        TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            error: test_error,
        }
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> TestSuiteResult {
        TestSuiteResult {
            total: 2,
            passed: 1,
            failed: 0,
            skipped: 1,
            duration_ms: 12,
            results: vec![
                TestResult {
                    name: "register-new-user".to_string(),
                    success: true,
                    skipped: false,
                    duration_ms: 10,
                    steps: vec![],
                    error: None,
                },
                TestResult {
                    name: "admin-users".to_string(),
                    success: false,
                    skipped: true,
                    duration_ms: 2,
                    steps: vec![],
                    error: Some("require_admin(admin): Skipped: no admin".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig {
            output_dir: dir.path().join("out"),
            ..RunnerConfig::default()
        };
        let runner = TestRunner::with_config(config).unwrap();

        let path = runner.write_results(&suite()).unwrap();
        assert!(path.ends_with("test-results.json"));

        let written: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.total, 2);
        assert!(written.all_passed());
        assert!(written.result("admin-users").unwrap().skipped);
    }

    #[test]
    fn test_scenarios_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ping.yaml"),
            "name: ping-only\ntags: [smoke]\nsteps:\n  - action: ping\n",
        )
        .unwrap();

        let config = RunnerConfig {
            specs_dir: Some(dir.path().to_path_buf()),
            ..RunnerConfig::default()
        };
        let runner = TestRunner::with_config(config).unwrap();
        let specs = runner.scenarios().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "ping-only");
    }

    #[tokio::test]
    async fn test_unknown_scenario() {
        let mut runner = TestRunner::with_config(RunnerConfig::default())
            .unwrap()
            .without_probe();
        let err = runner.run_test("does-not-exist").await.unwrap_err();
        assert!(matches!(err, E2eError::ScenarioNotFound(_)));
    }
}
