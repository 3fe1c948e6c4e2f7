// Diagnostics module - `darci-sync check`
//
// Walks every dependency of a sync run and prints one status line each:
// - Required environment variables
// - Member store (open + count)
// - Google Sheet (only when configured)
// - dclisync binary (`--help` probe)
//
// Nothing is added or written. Failures are reported, never fatal.

use std::time::Duration;

use crate::backend::DcliBackend;
use crate::config::{Config, VERSION};
use crate::sheets::{fetch_candidates, GoogleSheetsSource};
use crate::store::{MemberDirectory, SqliteMemberDirectory};

/// Timeout for the `--help` probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckState {
    Ok,
    Failed,
    Skipped,
}

/// One line of the check report
#[derive(Debug, Clone)]
pub struct CheckStatus {
    pub name: &'static str,
    pub state: CheckState,
    pub detail: String,
}

impl CheckStatus {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            state: CheckState::Ok,
            detail: detail.into(),
        }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            state: CheckState::Failed,
            detail: detail.into(),
        }
    }

    fn skipped(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            state: CheckState::Skipped,
            detail: detail.into(),
        }
    }
}

/// Environment check
pub fn check_environment(config: &Config) -> CheckStatus {
    let missing = config.missing_required();
    if missing.is_empty() {
        CheckStatus::ok("env", "all required variables set")
    } else {
        CheckStatus::failed("env", format!("missing: {}", missing.join(", ")))
    }
}

/// Member store check: open, verify schema, count members
pub fn check_store(store: &dyn MemberDirectory, label: &str) -> CheckStatus {
    match store.known_identifiers() {
        Ok(known) => CheckStatus::ok("store", format!("{} members in {}", known.len(), label)),
        Err(e) => CheckStatus::failed("store", e.to_string()),
    }
}

/// Sheet check: one read of the configured range
pub async fn check_sheet(config: &Config) -> CheckStatus {
    if !config.sheet.is_configured() {
        return CheckStatus::skipped("sheet", "GOOGLE_SHEET_ID not set");
    }

    let source = match GoogleSheetsSource::new(&config.sheet) {
        Ok(source) => source,
        Err(e) => return CheckStatus::failed("sheet", e.to_string()),
    };

    match fetch_candidates(&source).await {
        Ok(candidates) => CheckStatus::ok(
            "sheet",
            format!("{} users in {}", candidates.len(), config.sheet.range),
        ),
        Err(e) => CheckStatus::failed("sheet", e.to_string()),
    }
}

/// Binary check: can `dclisync --help` be run
pub async fn check_binary(backend: &DcliBackend, binary: &str) -> CheckStatus {
    match backend.probe(PROBE_TIMEOUT).await {
        Ok(()) => CheckStatus::ok("dclisync", format!("{} is runnable", binary)),
        Err(e) => CheckStatus::failed("dclisync", e.to_string()),
    }
}

/// Run all checks in order and print the report
pub async fn run_checks(config: &Config) -> Vec<CheckStatus> {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}darci-sync{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Checking sync dependencies...{RESET}");
    println!();

    let store = SqliteMemberDirectory::new(config.dcli.db_path());
    let backend = DcliBackend::from_config(&config.dcli);

    let mut statuses = Vec::with_capacity(4);
    for status in [
        check_environment(config),
        check_store(&store, &store.path().display().to_string()),
    ] {
        print_status(&status);
        statuses.push(status);
    }

    let status = check_sheet(config).await;
    print_status(&status);
    statuses.push(status);

    let status = check_binary(&backend, &config.dcli.binary).await;
    print_status(&status);
    statuses.push(status);

    println!();
    statuses
}

/// Print a single check's status
fn print_status(status: &CheckStatus) {
    use colors::*;

    let (icon, style) = match status.state {
        CheckState::Ok => (format!("{GREEN}✓{RESET}"), ""),
        CheckState::Failed => (format!("{RED}✗{RESET}"), ""),
        CheckState::Skipped => (format!("{YELLOW}○{RESET}"), DIM),
    };

    println!(
        "    {icon} {style}{:<10}{RESET} {DIM}{}{RESET}",
        status.name, status.detail
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DcliConfig;
    use crate::secret::ApiKey;

    #[test]
    fn test_environment_reports_missing_names() {
        let status = check_environment(&Config::default());
        assert_eq!(status.state, CheckState::Failed);
        assert!(status.detail.contains("GOOGLE_SHEET_ID"));
        assert!(status.detail.contains("BUNGIE_API_KEY"));
    }

    #[test]
    fn test_store_failure_is_reported() {
        let store = SqliteMemberDirectory::new("/nonexistent/dcli.sqlite3");
        let status = check_store(&store, "/nonexistent/dcli.sqlite3");
        assert_eq!(status.state, CheckState::Failed);
    }

    #[tokio::test]
    async fn test_sheet_skipped_when_unconfigured() {
        let status = check_sheet(&Config::default()).await;
        assert_eq!(status.state, CheckState::Skipped);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_probe() {
        let config = DcliConfig {
            binary: "/nonexistent/dclisync".to_string(),
            api_key: Some(ApiKey::new("secret-key")),
            ..Default::default()
        };
        let backend = DcliBackend::from_config(&config);

        let status = check_binary(&backend, &config.binary).await;
        assert_eq!(status.state, CheckState::Failed);
        assert!(!status.detail.contains("secret-key"));
    }
}
