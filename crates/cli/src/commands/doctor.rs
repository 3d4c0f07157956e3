//! `scopepilot doctor`: Diagnose configuration and connectivity.

use scopepilot_config::AppConfig;
use scopepilot_contracts::DocumentDrafter;
use scopepilot_store::RemoteStore;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug)]
pub struct Check {
    pub status: Status,
    pub message: String,
}

impl Check {
    fn pass(message: impl Into<String>) -> Self {
        Self { status: Status::Pass, message: message.into() }
    }
    fn warn(message: impl Into<String>) -> Self {
        Self { status: Status::Warn, message: message.into() }
    }
    fn fail(message: impl Into<String>) -> Self {
        Self { status: Status::Fail, message: message.into() }
    }

    fn icon(&self) -> &'static str {
        match self.status {
            Status::Pass => "ok  ",
            Status::Warn => "warn",
            Status::Fail => "FAIL",
        }
    }
}

pub async fn run(config_path: Option<&Path>, offline: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("ScopePilot Doctor");
    println!("=================\n");

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    let mut checks = Vec::new();
    let config = match super::load_config(config_path) {
        Ok(config) => {
            checks.push(config_file_check(&path));
            config
        }
        Err(e) => {
            checks.push(Check::fail(format!("Config invalid: {e}")));
            print_checks(&checks);
            return Ok(());
        }
    };

    checks.extend(config_checks(&config));
    if !offline {
        checks.extend(connectivity_checks(&config).await);
    }

    print_checks(&checks);
    Ok(())
}

fn print_checks(checks: &[Check]) {
    for check in checks {
        println!("  [{}] {}", check.icon(), check.message);
    }

    let issues = checks.iter().filter(|c| c.status != Status::Pass).count();
    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
}

fn config_file_check(path: &Path) -> Check {
    if path.exists() {
        Check::pass(format!("Config file valid ({})", path.display()))
    } else {
        Check::warn(format!("No config file at {}, using defaults and environment", path.display()))
    }
}

/// Checks that need no network.
pub fn config_checks(config: &AppConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    let provider_key = config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.api_key.as_ref());
    if config.has_api_key() || provider_key.is_some() || config.default_provider == "ollama" {
        checks.push(Check::pass(format!(
            "Provider '{}' has credentials (model {})",
            config.default_provider, config.default_model
        )));
    } else {
        checks.push(Check::fail(
            "No API key configured. Set SCOPEPILOT_API_KEY or OPENAI_API_KEY",
        ));
    }

    if config.store.is_configured() {
        checks.push(Check::pass(format!(
            "Store configured ({})",
            config.store.base_url().unwrap_or_default()
        )));
    } else {
        checks.push(Check::warn(
            "Store not configured (SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY). Reads return empty, writes are refused",
        ));
    }

    match DocumentDrafter::from_config(&config.drafting) {
        Ok(_) => checks.push(Check::pass("MSA/SOW templates compile")),
        Err(e) => checks.push(Check::fail(format!("Document templates broken: {e}"))),
    }

    checks
}

/// Probe the provider and the store.
async fn connectivity_checks(config: &AppConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    let router = scopepilot_providers::build_from_config(config);
    if let Some(provider) = router.default() {
        match provider.health_check().await {
            Ok(true) => checks.push(Check::pass(format!("Provider '{}' reachable", provider.name()))),
            Ok(false) => checks.push(Check::warn(format!("Provider '{}' responded but is unhealthy", provider.name()))),
            Err(e) => checks.push(Check::fail(format!("Provider '{}' unreachable: {e}", provider.name()))),
        }
    }

    if config.store.is_configured() {
        match RemoteStore::from_config(&config.store) {
            Ok(store) => match store.estimate("00000000-0000-0000-0000-000000000000").await {
                Ok(_) => checks.push(Check::pass("Store reachable")),
                Err(e) => checks.push(Check::fail(format!("Store unreachable: {e}"))),
            },
            Err(e) => checks.push(Check::fail(format!("Store client failed: {e}"))),
        }
    }

    checks
}
