use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary database
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
    workspace: Option<String>,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("test.db");

        Self {
            temp_dir,
            db_path,
            workspace: None,
        }
    }

    /// Same database, different workspace
    pub fn in_workspace(&self, workspace: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        Self {
            temp_dir,
            db_path: self.db_path.clone(),
            workspace: Some(workspace.to_string()),
        }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("recurra").expect("Failed to find recurra binary");

        // Run from the temp dir so no stray recurra.toml is picked up
        cmd.current_dir(self.temp_dir.path());
        cmd.env("RECURRA_DATABASE_PATH", &self.db_path);
        cmd.env("RECURRA_TIMEZONE", "UTC");
        cmd.env_remove("RECURRA_LOG");
        match &self.workspace {
            Some(workspace) => cmd.env("RECURRA_WORKSPACE_ID", workspace),
            None => cmd.env_remove("RECURRA_WORKSPACE_ID"),
        };

        cmd
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Entries between `from` and `to` as JSON values
    pub fn list_json(&self, from: &str, to: &str) -> Vec<Value> {
        let output = self
            .command()
            .args(["list", "--from", from, "--to", to, "--json"])
            .output()
            .expect("Failed to run list");
        assert!(output.status.success(), "list failed: {}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).expect("list --json prints a JSON array")
    }

    /// Id of the only entry with `label` dated `date`
    pub fn id_of(&self, label: &str, date: &str) -> String {
        self.list_json(date, date)
            .into_iter()
            .find(|entry| entry["label"] == label)
            .and_then(|entry| entry["id"].as_str().map(str::to_string))
            .unwrap_or_else(|| panic!("no entry '{}' on {}", label, date))
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Monthly rent from January 15 through April 2024
    pub fn monthly_rent_args() -> Vec<&'static str> {
        vec![
            "add", "Rent", "--amount", "-900", "--date", "2024-01-15", "--every", "monthly", "--until", "2024-04-30",
        ]
    }
}

/// Reads common fields off a listed entry
pub mod entries {
    use serde_json::Value;

    pub fn dates(entries: &[Value]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|entry| entry["date"].as_str().map(str::to_string))
            .collect()
    }

    pub fn is_head(entry: &Value) -> bool {
        entry["kind"] == "head"
    }
}
