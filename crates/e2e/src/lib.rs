//! Pavlo API scenario runner
//!
//! This crate drives a live Pavlo server over HTTP and checks the
//! behavioral contract of its API:
//! - Probes (and optionally launches) the server
//! - Parses declarative YAML scenarios
//! - Executes steps for named actors with a shared HTTP client
//! - Validates bodies against the wire types in `pavlo-contract`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_spec(scenario) -> TestResult                     │
//! │    └── write_results() -> test-results.json                 │
//! │  StepExecutor                                               │
//! │    ├── ApiClient (reqwest)                                  │
//! │    ├── ContractProfile (canonical | lenient)                │
//! │    └── ScenarioContext { actors, last scrape }              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    └── steps: [Step]                                        │
//! │          ├── register / login / logout / me { actor }       │
//! │          ├── add_search / history { actor }                 │
//! │          ├── scrape / n8n_scrape / location                 │
//! │          ├── require_admin / admin_users                    │
//! │          └── request { method, path, body }                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod expect;
pub mod runner;
pub mod scenarios;
pub mod server;
pub mod spec;
pub mod steps;

pub use client::{ApiClient, ApiResponse};
pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use expect::Outcome;
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use spec::{Scenario, Step};
pub use steps::{StepExecutor, StepResult};
