//! Scenario runner entry point
//!
//! Runs the built-in (or a directory of) YAML scenarios against a live
//! server. Exit code 0 = all passed, 1 = failures, 2 = could not run.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pavlo_contract::{AuthRequest, ContractProfile};
use pavlo_e2e::{E2eResult, RunnerConfig, TestRunner, TestSuiteResult};

#[derive(Parser, Debug)]
#[command(name = "pavlo-e2e")]
#[command(author, version, about = "Behavioral scenario runner for the Pavlo API")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of YAML scenarios (default: built-in scenarios)
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Base URL of the server under test
    #[arg(long)]
    base_url: Option<String>,

    /// Contract profile: canonical or lenient
    #[arg(long)]
    profile: Option<ContractProfile>,

    /// Email of a pre-provisioned admin account
    #[arg(long, requires = "admin_password")]
    admin_email: Option<String>,

    /// Password of the admin account
    #[arg(long, requires = "admin_email")]
    admin_password: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the startup health probe
    #[arg(long)]
    no_probe: bool,

    /// List scenarios and exit
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn build_config(args: &Args) -> E2eResult<RunnerConfig> {
    let mut config = RunnerConfig::load(args.config.as_deref())?;

    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if let (Some(email), Some(password)) = (&args.admin_email, &args.admin_password) {
        config.admin = Some(AuthRequest {
            email: email.clone(),
            password: password.clone(),
        });
    }
    if let Some(dir) = &args.specs {
        config.specs_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = build_config(&args)?;
    let mut runner = TestRunner::with_config(config)?;
    if args.no_probe {
        runner = runner.without_probe();
    }

    if args.list {
        for scenario in runner.scenarios()? {
            println!(
                "{:<24} [{}] {}",
                scenario.name,
                scenario.tags.join(","),
                scenario.description
            );
        }
        return Ok(true);
    }

    let results = if let Some(name) = &args.name {
        TestSuiteResult::single(runner.run_test(name).await?)
    } else if let Some(tag) = &args.tag {
        runner.run_tagged(tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&results)?;

    Ok(results.all_passed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "pavlo-e2e",
            "--base-url",
            "http://127.0.0.1:4000",
            "--profile",
            "lenient",
            "--admin-email",
            "admin@example.com",
            "--admin-password",
            "AdminPass123!",
            "--tag",
            "smoke",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:4000");
        assert_eq!(config.profile, ContractProfile::Lenient);
        assert_eq!(config.admin.unwrap().email, "admin@example.com");
        assert_eq!(args.tag.as_deref(), Some("smoke"));
    }

    #[test]
    fn test_admin_flags_go_together() {
        let parsed = Args::try_parse_from(["pavlo-e2e", "--admin-email", "admin@example.com"]);
        assert!(parsed.is_err());
    }
}
