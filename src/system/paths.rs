//! Well-known host paths and preflight existence checks.

use crate::error::PreconditionError;
use std::path::Path;

/// Name of the compiled dynamic connector module.
pub const MODULE_FILE_NAME: &str = "ngx_http_modsecurity_module.so";

/// Name of the top-level rules file included from nginx.conf.
pub const MAIN_CONF_NAME: &str = "main.conf";

/// Require an existing directory, with a distinct error naming the path.
pub fn require_dir(path: &Path) -> Result<(), PreconditionError> {
    if !path.exists() {
        return Err(PreconditionError::MissingDirectory(
            path.display().to_string(),
        ));
    }
    if !path.is_dir() {
        return Err(PreconditionError::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Require an existing regular file.
pub fn require_file(path: &Path) -> Result<(), PreconditionError> {
    if !path.is_file() {
        return Err(PreconditionError::MissingFile(path.display().to_string()));
    }
    Ok(())
}

/// Require a binary resolvable through PATH.
pub fn require_binary(name: &str) -> Result<(), PreconditionError> {
    which::which(name)
        .map(|_| ())
        .map_err(|_| PreconditionError::MissingBinary(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_require_dir_missing_names_path() {
        let err = require_dir(Path::new("/no/such/dir/here")).unwrap_err();
        assert!(err.to_string().contains("/no/such/dir/here"));
    }

    #[test]
    fn test_require_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.conf");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            require_dir(&file),
            Err(PreconditionError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_require_binary() {
        assert!(require_binary("sh").is_ok());
        assert!(matches!(
            require_binary("definitely-not-a-real-binary-xyz"),
            Err(PreconditionError::MissingBinary(_))
        ));
    }
}
