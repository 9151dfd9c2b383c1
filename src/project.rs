#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Conventional locations inside a student project.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Name of the declared-dependencies manifest.
pub const REQUIREMENTS_FILENAME: &str = "requirements.txt";

/// Directory names that are never treated as project sources.
const SKIP_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "__pycache__",
    "build",
    "dist",
    "node_modules",
];

/// Candidate names for the tests directory, in lookup order.
const TEST_DIR_NAMES: &[&str] = &["tests", "test"];

/// Standard paths for a Python project under evaluation.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Root directory of the project.
    root_dir:        PathBuf,
    /// Virtual environment the grader provisions.
    venv_dir:        PathBuf,
    /// Alternate environment location some students commit.
    legacy_venv_dir: PathBuf,
}

impl ProjectPaths {
    /// Creates the paths rooted at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            venv_dir: root_dir.join(".venv"),
            legacy_venv_dir: root_dir.join("venv"),
            root_dir,
        }
    }

    /// Root directory for the project.
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Virtual environment directory.
    pub fn venv_dir(&self) -> &Path {
        self.venv_dir.as_path()
    }

    /// Every location an environment may already exist at.
    pub fn venv_candidates(&self) -> [&Path; 2] {
        [self.legacy_venv_dir.as_path(), self.venv_dir.as_path()]
    }

    /// Path of the project's `requirements.txt`.
    pub fn requirements_file(&self) -> PathBuf {
        self.root_dir.join(REQUIREMENTS_FILENAME)
    }

    /// First existing tests directory, if any.
    pub fn test_dir(&self) -> Option<PathBuf> {
        TEST_DIR_NAMES
            .iter()
            .map(|name| self.root_dir.join(name))
            .find(|dir| dir.is_dir())
    }

    /// Path of an executable installed into the virtual environment.
    pub fn venv_executable(&self, tool: &str) -> PathBuf {
        venv_executable(&self.venv_dir, tool)
    }
}

/// Path of `tool` inside the environment rooted at `venv_dir`.
pub fn venv_executable(venv_dir: &Path, tool: &str) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join(format!("{tool}.exe"))
    } else {
        venv_dir.join("bin").join(tool)
    }
}

/// Resolves the program to run for `tool`.
///
/// Isolated checks always use the copy installed in the project's virtual
/// environment; everything else looks the tool up on `PATH` and falls back to
/// the bare name.
pub fn tool_path(paths: &ProjectPaths, tool: &str, isolated: bool) -> PathBuf {
    if isolated {
        return paths.venv_executable(tool);
    }
    which::which(tool).unwrap_or_else(|_| PathBuf::from(tool))
}

/// Returns true for entries the source walk should not descend into.
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref())
}

/// Collects every `.py` file under `root`, sorted, skipping environments,
/// caches and hidden directories.
pub fn python_sources(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
        .collect();
    files.sort();
    files
}

/// Like [`python_sources`], but also drops files under the tests directory
/// and files named like test modules.
pub fn non_test_sources(paths: &ProjectPaths) -> Vec<PathBuf> {
    let test_dir = paths.test_dir();
    python_sources(paths.root_dir())
        .into_iter()
        .filter(|p| test_dir.as_ref().is_none_or(|dir| !p.starts_with(dir)))
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_none_or(|n| !(n.starts_with("test_") || n.ends_with("_test.py")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venv_executable_uses_platform_layout() {
        let paths = ProjectPaths::new("/proj");
        let pip = paths.venv_executable("pip");
        if cfg!(windows) {
            assert!(pip.ends_with("Scripts/pip.exe"));
        } else {
            assert_eq!(pip, PathBuf::from("/proj/.venv/bin/pip"));
        }
    }

    #[test]
    fn isolated_tools_come_from_the_venv() {
        let paths = ProjectPaths::new("/proj");
        assert_eq!(
            tool_path(&paths, "coverage", true),
            paths.venv_executable("coverage")
        );
    }

    #[test]
    fn legacy_venv_is_a_candidate() {
        let paths = ProjectPaths::new("/proj");
        let candidates = paths.venv_candidates();
        assert!(candidates.contains(&Path::new("/proj/venv")));
        assert!(candidates.contains(&Path::new("/proj/.venv")));
    }
}
