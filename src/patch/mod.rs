//! Idempotent structural patching of line-oriented config files.
//!
//! Config files are never fully parsed. Each patch carries a marker substring
//! that uniquely identifies its content; the patch is applied only when the
//! marker is absent, so running the same patch twice converges to the same
//! file instead of duplicating insertions. Insertion points are structural
//! (start of file, first line inside a named block), never line numbers.

use crate::error::PatchError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

// Matches the detection-only form of the engine toggle on its own line.
static RULE_ENGINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*SecRuleEngine\s+DetectionOnly\s*$")
        .expect("Invalid SecRuleEngine regex")
});

/// Where a patch is inserted when its marker is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// First line of the file.
    FileStart,
    /// First line inside the named `name { ... }` block.
    InsideBlock(String),
}

/// Result of applying a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Inserted,
    AlreadyPresent,
}

/// A single idempotent insertion: {marker predicate, insertion point, content}.
#[derive(Debug, Clone)]
pub struct PatchDirective {
    /// Substring whose presence means the patch has already been applied.
    pub marker: String,
    pub anchor: Anchor,
    /// Text inserted when the marker is absent. A trailing newline is added
    /// if missing.
    pub content: String,
}

impl PatchDirective {
    pub fn new(marker: impl Into<String>, anchor: Anchor, content: impl Into<String>) -> Self {
        PatchDirective {
            marker: marker.into(),
            anchor,
            content: content.into(),
        }
    }

    /// Apply this patch to the file at `path`.
    pub fn apply(&self, path: &Path) -> Result<PatchOutcome, PatchError> {
        if !path.is_file() {
            return Err(PatchError::FileNotFound(path.display().to_string()));
        }

        let text = fs::read_to_string(path)?;
        match self.apply_to_text(&text)? {
            Some(patched) => {
                fs::write(path, patched)?;
                log::info!(
                    "[Patch] Inserted '{}' into {}",
                    self.marker,
                    path.display()
                );
                Ok(PatchOutcome::Inserted)
            }
            None => {
                log::info!(
                    "[Patch] Marker '{}' already present in {}, skipping",
                    self.marker,
                    path.display()
                );
                Ok(PatchOutcome::AlreadyPresent)
            }
        }
    }

    /// Pure patching core. Returns `None` when the marker is already present.
    pub fn apply_to_text(&self, text: &str) -> Result<Option<String>, PatchError> {
        if text.contains(&self.marker) {
            return Ok(None);
        }

        let mut content = self.content.clone();
        if !content.ends_with('\n') {
            content.push('\n');
        }

        match &self.anchor {
            Anchor::FileStart => Ok(Some(format!("{}{}", content, text))),
            Anchor::InsideBlock(name) => {
                let pattern = format!(r"(?m)^\s*{}\s*\{{", regex::escape(name));
                let block_open = Regex::new(&pattern)
                    .map_err(|e| PatchError::RegexInvalid(e.to_string()))?;

                let m = block_open.find(text).ok_or_else(|| {
                    PatchError::AnchorNotFound(format!("block '{} {{' not found", name))
                })?;

                // Insert after the end of the block-opening line.
                let insert_at = match text[m.end()..].find('\n') {
                    Some(offset) => m.end() + offset + 1,
                    None => text.len(),
                };

                let mut patched = String::with_capacity(text.len() + content.len() + 1);
                patched.push_str(&text[..insert_at]);
                if !patched.ends_with('\n') {
                    patched.push('\n');
                }
                patched.push_str(&content);
                patched.push_str(&text[insert_at..]);
                Ok(Some(patched))
            }
        }
    }
}

/// The `load_module` line nginx needs before the WAF module can be enabled.
/// Must sit at the top of the main config, outside every block.
pub fn load_module_directive(module_name: &str) -> PatchDirective {
    let line = format!("load_module modules/{};", module_name);
    PatchDirective::new(line.clone(), Anchor::FileStart, line)
}

/// The directives enabling the WAF inside the `http` block.
pub fn http_enable_directives(rules_file: &Path) -> Vec<PatchDirective> {
    vec![
        PatchDirective::new(
            "modsecurity on;",
            Anchor::InsideBlock("http".to_string()),
            "    modsecurity on;",
        ),
        PatchDirective::new(
            "modsecurity_rules_file",
            Anchor::InsideBlock("http".to_string()),
            format!("    modsecurity_rules_file {};", rules_file.display()),
        ),
    ]
}

/// Flip `SecRuleEngine DetectionOnly` to `SecRuleEngine On` in the engine
/// config. Idempotent: a file already switched on is left unchanged.
pub fn set_rule_engine_on(path: &Path) -> Result<PatchOutcome, PatchError> {
    if !path.is_file() {
        return Err(PatchError::FileNotFound(path.display().to_string()));
    }

    let text = fs::read_to_string(path)?;
    if !RULE_ENGINE_REGEX.is_match(&text) {
        log::info!(
            "[Patch] No 'SecRuleEngine DetectionOnly' line in {}, leaving as-is",
            path.display()
        );
        return Ok(PatchOutcome::AlreadyPresent);
    }

    let patched = RULE_ENGINE_REGEX.replace(&text, "SecRuleEngine On");
    fs::write(path, patched.as_ref())?;
    log::info!("[Patch] Enabled rule engine in {}", path.display());
    Ok(PatchOutcome::Inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const NGINX_CONF: &str = "\
user www-data;
worker_processes auto;

events {
    worker_connections 768;
}

http {
    sendfile on;
    include /etc/nginx/sites-enabled/*;
}
";

    #[test]
    fn test_file_start_insertion() {
        let patch = load_module_directive("ngx_http_modsecurity_module.so");
        let patched = patch.apply_to_text(NGINX_CONF).unwrap().unwrap();
        assert!(patched.starts_with("load_module modules/ngx_http_modsecurity_module.so;\n"));
        assert!(patched.contains("user www-data;"));
    }

    #[test]
    fn test_inside_block_insertion() {
        let patches = http_enable_directives(&PathBuf::from("/etc/nginx/modsec/main.conf"));
        let patched = patches[0].apply_to_text(NGINX_CONF).unwrap().unwrap();

        let http_pos = patched.find("http {").unwrap();
        let modsec_pos = patched.find("modsecurity on;").unwrap();
        let sendfile_pos = patched.find("sendfile on;").unwrap();
        assert!(http_pos < modsec_pos);
        assert!(modsec_pos < sendfile_pos);
    }

    #[test]
    fn test_applying_twice_equals_applying_once() {
        let patch = load_module_directive("ngx_http_modsecurity_module.so");
        let once = patch.apply_to_text(NGINX_CONF).unwrap().unwrap();
        assert!(patch.apply_to_text(&once).unwrap().is_none());
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let patch = PatchDirective::new(
            "modsecurity on;",
            Anchor::InsideBlock("stream".to_string()),
            "    modsecurity on;",
        );
        let result = patch.apply_to_text(NGINX_CONF);
        assert!(matches!(result, Err(PatchError::AnchorNotFound(_))));
    }

    #[test]
    fn test_apply_on_disk_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let conf = temp.path().join("nginx.conf");
        fs::write(&conf, NGINX_CONF).unwrap();

        let patch = load_module_directive("ngx_http_modsecurity_module.so");
        assert_eq!(patch.apply(&conf).unwrap(), PatchOutcome::Inserted);
        let after_first = fs::read_to_string(&conf).unwrap();

        assert_eq!(patch.apply(&conf).unwrap(), PatchOutcome::AlreadyPresent);
        let after_second = fs::read_to_string(&conf).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_apply_missing_file_errors() {
        let patch = load_module_directive("ngx_http_modsecurity_module.so");
        let result = patch.apply(Path::new("/nonexistent/nginx.conf"));
        assert!(matches!(result, Err(PatchError::FileNotFound(_))));
    }

    #[test]
    fn test_set_rule_engine_on_flips_detection_only() {
        let temp = TempDir::new().unwrap();
        let conf = temp.path().join("modsecurity.conf");
        fs::write(&conf, "SecRuleEngine DetectionOnly\nSecRequestBodyAccess On\n").unwrap();

        assert_eq!(set_rule_engine_on(&conf).unwrap(), PatchOutcome::Inserted);
        let text = fs::read_to_string(&conf).unwrap();
        assert!(text.contains("SecRuleEngine On"));
        assert!(!text.contains("DetectionOnly"));

        // Second run converges.
        assert_eq!(
            set_rule_engine_on(&conf).unwrap(),
            PatchOutcome::AlreadyPresent
        );
    }
}
