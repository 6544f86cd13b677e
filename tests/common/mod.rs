//! Shared fixtures for integration tests.

use modsec_provision::error::CommandError;
use modsec_provision::system::HostCommands;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scriptable host stub recording which operations ran.
pub struct StubHost {
    pub test_ok: bool,
    pub test_called: Cell<bool>,
    pub reload_called: Cell<bool>,
}

impl StubHost {
    pub fn passing() -> Self {
        StubHost {
            test_ok: true,
            test_called: Cell::new(false),
            reload_called: Cell::new(false),
        }
    }

    pub fn failing() -> Self {
        StubHost {
            test_ok: false,
            test_called: Cell::new(false),
            reload_called: Cell::new(false),
        }
    }
}

impl HostCommands for StubHost {
    fn config_test(&self) -> Result<(), CommandError> {
        self.test_called.set(true);
        if self.test_ok {
            Ok(())
        } else {
            Err(CommandError::ExitFailure {
                cmd: "nginx -t".to_string(),
                code: Some(1),
                stderr: "nginx: configuration file test failed".to_string(),
            })
        }
    }

    fn reload(&self) -> Result<(), CommandError> {
        self.reload_called.set(true);
        Ok(())
    }
}

/// Flatten a directory tree into relative-path -> contents.
pub fn tree_contents(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut map = BTreeMap::new();
    collect(root, root, &mut map);
    map
}

fn collect(root: &Path, dir: &Path, map: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read_dir failed") {
        let entry = entry.expect("dir entry failed");
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, map);
        } else {
            let rel = path.strip_prefix(root).expect("strip_prefix failed");
            map.insert(rel.to_path_buf(), fs::read(&path).expect("read failed"));
        }
    }
}

/// Assert two directory trees are byte-identical.
pub fn assert_trees_identical(a: &Path, b: &Path) {
    assert_eq!(
        tree_contents(a),
        tree_contents(b),
        "trees differ: {} vs {}",
        a.display(),
        b.display()
    );
}

/// Find the single snapshot directory created next to `target`.
pub fn find_snapshot(target: &Path) -> Option<PathBuf> {
    let parent = target.parent()?;
    let prefix = format!("{}.bak-", target.file_name()?.to_string_lossy());
    let mut snapshots: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    snapshots.sort();
    snapshots.pop()
}
