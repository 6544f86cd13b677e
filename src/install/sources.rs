//! Source fetching for the engine, connector, and rule set using `git2`.

use git2::{build::RepoBuilder, FetchOptions, Repository};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upstream repository of the ModSecurity v3 engine.
pub const ENGINE_REPO: &str = "https://github.com/owasp-modsecurity/ModSecurity.git";

/// Upstream repository of the nginx connector module.
pub const CONNECTOR_REPO: &str = "https://github.com/owasp-modsecurity/ModSecurity-nginx.git";

/// Upstream repository of the OWASP Core Rule Set.
pub const CRS_REPO: &str = "https://github.com/coreruleset/coreruleset.git";

/// Errors that can occur during source fetching.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Clone error for {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("Submodule init error: {0}")]
    Submodule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Local checkouts produced by [`fetch_all`].
#[derive(Debug, Clone)]
pub struct FetchedSources {
    pub engine_dir: PathBuf,
    pub connector_dir: PathBuf,
    pub crs_dir: PathBuf,
}

/// Clone the engine, connector, and CRS into `build_dir`.
///
/// Existing checkouts are reused rather than re-cloned, so repeated install
/// runs converge instead of duplicating work.
pub fn fetch_all(build_dir: &Path) -> Result<FetchedSources, SourceError> {
    std::fs::create_dir_all(build_dir)?;

    let engine_dir = build_dir.join("ModSecurity");
    let connector_dir = build_dir.join("ModSecurity-nginx");
    let crs_dir = build_dir.join("coreruleset");

    // The engine needs its submodules (bindings, test suites); the connector
    // and CRS are flat and can be shallow.
    let engine = clone_or_open(ENGINE_REPO, &engine_dir, None)?;
    init_submodules(&engine)?;

    clone_or_open(CONNECTOR_REPO, &connector_dir, Some(1))?;
    clone_or_open(CRS_REPO, &crs_dir, Some(1))?;

    Ok(FetchedSources {
        engine_dir,
        connector_dir,
        crs_dir,
    })
}

/// Clone `url` into `dest`, or open the checkout already there.
fn clone_or_open(url: &str, dest: &Path, depth: Option<i32>) -> Result<Repository, SourceError> {
    if dest.join(".git").exists() {
        log::info!("[Sources] Reusing existing checkout at {}", dest.display());
        return Repository::open(dest).map_err(SourceError::Git2);
    }

    log::info!("[Sources] Cloning {} into {}", url, dest.display());

    let mut fetch_options = FetchOptions::new();
    if let Some(depth) = depth {
        fetch_options.depth(depth);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    builder.clone(url, dest).map_err(|e| SourceError::Clone {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Initialize and check out all submodules of `repo`.
fn init_submodules(repo: &Repository) -> Result<(), SourceError> {
    let submodules = repo
        .submodules()
        .map_err(|e| SourceError::Submodule(e.to_string()))?;

    for mut submodule in submodules {
        let name = submodule
            .name()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "<unnamed>".to_string());
        log::info!("[Sources] Updating submodule {}", name);
        submodule
            .update(true, None)
            .map_err(|e| SourceError::Submodule(format!("{}: {}", name, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clone_or_open_reuses_existing_repo() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("repo");

        // Seed a local repository; clone_or_open must open it instead of
        // touching the network.
        Repository::init(&dest).unwrap();
        let repo = clone_or_open("https://example.invalid/repo.git", &dest, None).unwrap();
        assert!(repo.path().ends_with(".git"));
    }

    #[test]
    fn test_init_submodules_on_repo_without_submodules() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        assert!(init_submodules(&repo).is_ok());
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Clone {
            url: ENGINE_REPO.to_string(),
            reason: "network unreachable".to_string(),
        };
        assert!(err.to_string().contains("ModSecurity.git"));
        assert!(err.to_string().contains("network unreachable"));
    }
}
