//! Git integration for the dataset
//!
//! Reads the previously committed dataset (the baseline for new-tool
//! detection) and commits/pushes the refreshed one.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use crate::baseline::BaselineSource;

/// Who commits, and where to push, when running under CI
#[derive(Debug, Clone, Default)]
pub struct CommitIdentity {
    pub actor: Option<String>,
    pub token: Option<String>,
    pub repository: Option<String>,
}

impl CommitIdentity {
    pub fn from_env() -> Self {
        Self {
            actor: env::var("GITHUB_ACTOR").ok().filter(|s| !s.is_empty()),
            token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
            repository: env::var("GITHUB_REPOSITORY").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Git working tree rooted at the data root
pub struct GitRepo {
    workdir: PathBuf,
}

impl GitRepo {
    /// Validate input to prevent git argument injection
    fn validate_input(input: &str, name: &str) -> Result<()> {
        if input.starts_with('-') {
            return Err(anyhow!("Invalid {}: cannot start with '-'", name));
        }
        if input.contains('\0') {
            return Err(anyhow!("Invalid {}: cannot contain null bytes", name));
        }
        Ok(())
    }

    /// Handle for `workdir`; commands run there and paths are relative to it
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))
    }

    fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args)?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), err.trim()));
        }
        Ok(output)
    }

    pub fn is_repository(&self) -> bool {
        matches!(self.git(&["rev-parse", "--git-dir"]), Ok(out) if out.status.success())
    }

    /// Contents of `path` at `revision`
    pub fn show_file(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        Self::validate_input(revision, "revision")?;
        Self::validate_input(path, "path")?;

        // "./" makes the path relative to the working directory, not the repo top
        let spec = format!("{}:./{}", revision, path);
        let output = self.git_checked(&["show", &spec])?;
        Ok(output.stdout)
    }

    /// Whether `path` has uncommitted changes (including being untracked)
    pub fn has_changes(&self, path: &str) -> Result<bool> {
        Self::validate_input(path, "path")?;
        let output = self.git_checked(&["status", "--porcelain", "--", path])?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    /// Commit `path` and push.
    ///
    /// Returns `false` without failing when there is nothing to do or any git
    /// step fails; the reason is logged.
    pub fn commit_dataset(&self, path: &str, identity: &CommitIdentity) -> bool {
        if !self.is_repository() {
            info!("Not in a git repository. Skipping commit.");
            return false;
        }

        match self.has_changes(path) {
            Ok(false) => {
                info!("No changes to commit.");
                return false;
            }
            Ok(true) => {}
            Err(e) => {
                warn!("Git status failed: {}", e);
                return false;
            }
        }

        match self.commit_and_push(path, identity) {
            Ok(()) => {
                info!("Changes committed and pushed to repository");
                true
            }
            Err(e) => {
                warn!("Git operation failed: {}", e);
                false
            }
        }
    }

    fn commit_and_push(&self, path: &str, identity: &CommitIdentity) -> Result<()> {
        if let Some(ref actor) = identity.actor {
            let email = format!("{}@users.noreply.github.com", actor);
            if let Err(e) = self.git_checked(&["config", "user.name", actor]) {
                warn!("{}", e);
            }
            if let Err(e) = self.git_checked(&["config", "user.email", &email]) {
                warn!("{}", e);
            }
        }

        self.git_checked(&["add", "--", path])?;

        let message = format!(
            "Update AI tools database - {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.git_checked(&["commit", "-m", &message])?;

        if let (Some(token), Some(repo)) = (&identity.token, &identity.repository) {
            let remote_url = format!("https://{}@github.com/{}.git", token, repo);
            if let Err(e) = self.git_checked(&["remote", "set-url", "origin", &remote_url]) {
                // The error text would echo the token back
                debug!("Could not rewrite origin URL: {}", e.to_string().replace(token.as_str(), "***"));
            }
        }

        self.git_checked(&["push"])?;
        Ok(())
    }
}

impl BaselineSource for GitRepo {
    fn fetch_prior_version(&self, path: &str) -> Option<Vec<u8>> {
        match self.show_file("HEAD", path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("No committed version of {}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn init_repo(dir: &Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Test"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "commit.gpgsign", "false"],
        ] {
            let status = Command::new("git").args(&args).current_dir(dir).status().unwrap();
            assert!(status.success());
        }
    }

    #[test]
    fn test_validate_input_rejects_options() {
        assert!(GitRepo::validate_input("--output=/tmp/x", "path").is_err());
        assert!(GitRepo::validate_input("data/tools.csv", "path").is_ok());
    }

    #[test]
    fn test_not_a_repository_has_no_baseline() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let repo = GitRepo::new(dir.path());
        assert!(!repo.is_repository());
        assert!(repo.fetch_prior_version("data/tools.csv").is_none());
        assert!(!repo.commit_dataset("data/tools.csv", &CommitIdentity::default()));
    }

    #[test]
    fn test_prior_version_comes_from_head() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/tools.csv"), "id,url\n1,https://a.example\n").unwrap();

        let repo = GitRepo::new(dir.path());
        // Nothing committed yet
        assert!(repo.fetch_prior_version("data/tools.csv").is_none());
        assert!(repo.has_changes("data/tools.csv").unwrap());

        repo.git_checked(&["add", "data/tools.csv"]).unwrap();
        repo.git_checked(&["commit", "-q", "-m", "seed"]).unwrap();
        fs::write(dir.path().join("data/tools.csv"), "id,url\n2,https://b.example\n").unwrap();

        let prior = repo.fetch_prior_version("data/tools.csv").unwrap();
        assert_eq!(String::from_utf8(prior).unwrap(), "id,url\n1,https://a.example\n");
        assert!(repo.has_changes("data/tools.csv").unwrap());
    }

    #[test]
    fn test_commit_without_changes_is_skipped() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("tools.csv"), "id\n").unwrap();

        let repo = GitRepo::new(dir.path());
        repo.git_checked(&["add", "tools.csv"]).unwrap();
        repo.git_checked(&["commit", "-q", "-m", "seed"]).unwrap();

        assert!(!repo.has_changes("tools.csv").unwrap());
        assert!(!repo.commit_dataset("tools.csv", &CommitIdentity::default()));
    }
}
