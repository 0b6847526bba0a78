//! Short-circuit policy
//!
//! Decides whether graph-based selection can be trusted for a given
//! changed-file set, or whether every target must be treated as impacted.
//! Three triggers, checked in order:
//!
//! 1. a changed file is a dependency/build manifest whose effect cannot be
//!    attributed through the import graph;
//! 2. a changed file is itself a fixture-declaration file (`conftest.py`),
//!    which affects visibility implicitly, not via explicit imports;
//! 3. a fixture-declaration file is found impacted by running the selector
//!    with the fixture files as the target set (a nested selection pass).
//!
//! Graceful degradation lives here, not in the selector: the policy errs
//! on the side of "run everything" whenever the graph-based answer would
//! be built on shaky ground.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use crate::errors::Result;
use crate::selector::ImpactSelector;

/// Dependency/build manifests that short-circuit selection when changed
pub const RISK_FILES: &[&str] = &[
    "pyproject.toml",
    "requirements.txt",
    "poetry.lock",
    "uv.lock",
    "pylock.toml",
    "Pipfile.lock",
    "Pipfile",
    "pdm.lock",
    "setup.cfg",
    "setup.py",
    "requirements.in",
    "pytest.ini",
];

/// Shared-setup files scoped to a directory subtree
pub const FIXTURE_FILE_NAME: &str = "conftest.py";

/// Why selection was bypassed
///
/// Surfaced to the caller instead of a selection result; the `Display`
/// form is a ready-made report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShortCircuitReason {
    /// Changed files whose effect the import graph cannot attribute
    RiskFilesChanged { files: Vec<PathBuf> },

    /// Fixture-declaration files changed directly
    FixtureFilesChanged { files: Vec<PathBuf> },

    /// Fixture-declaration files impacted through the import graph
    FixtureFilesImpacted { files: Vec<PathBuf> },
}

impl ShortCircuitReason {
    fn file_list(files: &[PathBuf]) -> String {
        let mut names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        names.sort();
        names.join(", ")
    }
}

impl std::fmt::Display for ShortCircuitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortCircuitReason::RiskFilesChanged { files } => write!(
                f,
                "selection skipped: these files ({}) may declare external dependencies",
                Self::file_list(files)
            ),
            ShortCircuitReason::FixtureFilesChanged { files } => write!(
                f,
                "selection skipped: changes inside ({}) cannot be attributed through imports",
                Self::file_list(files)
            ),
            ShortCircuitReason::FixtureFilesImpacted { files } => write!(
                f,
                "selection skipped: fixture files ({}) are affected by dependency changes",
                Self::file_list(files)
            ),
        }
    }
}

/// Policy gating whether the selector runs at all
pub struct ShortCircuitPolicy {
    risk_files: FxHashSet<PathBuf>,

    /// User-registered glob patterns, consulted only when the default risk
    /// set produced no match
    custom_patterns: Option<GlobSet>,
}

impl ShortCircuitPolicy {
    /// Policy with the default risk-file set and no custom patterns
    pub fn new() -> Self {
        Self {
            risk_files: RISK_FILES.iter().map(PathBuf::from).collect(),
            custom_patterns: None,
        }
    }

    /// Register additional project-relative glob patterns
    pub fn with_custom_patterns<I, S>(mut self, patterns: I) -> std::result::Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        self.custom_patterns = Some(builder.build()?);
        Ok(self)
    }

    /// Evaluate the triggers against a changed-file set
    ///
    /// Returns `Some(reason)` when selection must be bypassed. The nested
    /// fixture pass runs the provided selector with every `conftest.py`
    /// under `root` as the target set.
    pub fn evaluate(
        &self,
        root: &Path,
        changed_files: &FxHashSet<PathBuf>,
        selector: &ImpactSelector<'_>,
    ) -> Result<Option<ShortCircuitReason>> {
        let mut risky: Vec<PathBuf> = changed_files
            .iter()
            .filter(|f| self.risk_files.contains(*f))
            .cloned()
            .collect();

        if risky.is_empty() {
            if let Some(patterns) = &self.custom_patterns {
                risky = changed_files
                    .iter()
                    .filter(|f| patterns.is_match(f))
                    .cloned()
                    .collect();
            }
        }

        if !risky.is_empty() {
            info!(count = risky.len(), "risk files changed, short-circuiting");
            return Ok(Some(ShortCircuitReason::RiskFilesChanged { files: risky }));
        }

        let changed_fixtures: Vec<PathBuf> = changed_files
            .iter()
            .filter(|f| f.file_name().is_some_and(|n| n == FIXTURE_FILE_NAME))
            .cloned()
            .collect();

        if !changed_fixtures.is_empty() {
            info!(
                count = changed_fixtures.len(),
                "fixture files changed, short-circuiting"
            );
            return Ok(Some(ShortCircuitReason::FixtureFilesChanged {
                files: changed_fixtures,
            }));
        }

        let fixture_files = discover_fixture_files(root);
        if !fixture_files.is_empty() {
            let impacted = selector.select(&fixture_files, changed_files)?;
            if !impacted.is_empty() {
                info!(
                    count = impacted.len(),
                    "fixture files impacted, short-circuiting"
                );
                return Ok(Some(ShortCircuitReason::FixtureFilesImpacted {
                    files: impacted.into_iter().collect(),
                }));
            }
        }

        Ok(None)
    }
}

impl Default for ShortCircuitPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// All fixture-declaration files under the root, as project-relative paths
fn discover_fixture_files(root: &Path) -> FxHashSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name() == FIXTURE_FILE_NAME)
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::extractor::DependencyExtractor;
    use crate::registry::{FsModuleResolver, ModuleRegistry};

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, contents).unwrap();
        }
        dir
    }

    fn changed(names: &[&str]) -> FxHashSet<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn evaluate(
        policy: &ShortCircuitPolicy,
        root: &Path,
        changed_files: &FxHashSet<PathBuf>,
    ) -> Option<ShortCircuitReason> {
        let resolver = FsModuleResolver::new(root);
        let registry = ModuleRegistry::from_snapshot(root, vec![], &resolver);
        let extractor = DependencyExtractor::new(root);
        let selector = ImpactSelector::new(&registry, &extractor);
        policy.evaluate(root, changed_files, &selector).unwrap()
    }

    #[test]
    fn test_risk_file_triggers() {
        let dir = project(&[]);
        let policy = ShortCircuitPolicy::new();

        let reason = evaluate(&policy, dir.path(), &changed(&["pyproject.toml", "app.py"]));
        assert_eq!(
            reason,
            Some(ShortCircuitReason::RiskFilesChanged {
                files: vec![PathBuf::from("pyproject.toml")],
            })
        );
    }

    #[test]
    fn test_custom_patterns_only_when_defaults_miss() {
        let dir = project(&[]);
        let policy = ShortCircuitPolicy::new()
            .with_custom_patterns(["deps/*.lock"])
            .unwrap();

        let reason = evaluate(&policy, dir.path(), &changed(&["deps/vendor.lock"]));
        assert_eq!(
            reason,
            Some(ShortCircuitReason::RiskFilesChanged {
                files: vec![PathBuf::from("deps/vendor.lock")],
            })
        );
    }

    #[test]
    fn test_changed_fixture_file_triggers() {
        let dir = project(&[]);
        let policy = ShortCircuitPolicy::new();

        let reason = evaluate(&policy, dir.path(), &changed(&["tests/conftest.py"]));
        assert_eq!(
            reason,
            Some(ShortCircuitReason::FixtureFilesChanged {
                files: vec![PathBuf::from("tests/conftest.py")],
            })
        );
    }

    #[test]
    fn test_impacted_fixture_file_triggers() {
        // conftest.py imports helpers; helpers changed
        let dir = project(&[
            ("tests/conftest.py", "import helpers\n"),
            ("helpers.py", ""),
        ]);
        let policy = ShortCircuitPolicy::new();

        let reason = evaluate(&policy, dir.path(), &changed(&["helpers.py"]));
        assert_eq!(
            reason,
            Some(ShortCircuitReason::FixtureFilesImpacted {
                files: vec![PathBuf::from("tests/conftest.py")],
            })
        );
    }

    #[test]
    fn test_no_trigger_for_plain_source_change() {
        let dir = project(&[
            ("tests/conftest.py", "import os\n"),
            ("app.py", ""),
        ]);
        let policy = ShortCircuitPolicy::new();

        assert_eq!(evaluate(&policy, dir.path(), &changed(&["app.py"])), None);
    }

    #[test]
    fn test_reason_display_lists_files_sorted() {
        let reason = ShortCircuitReason::RiskFilesChanged {
            files: vec![PathBuf::from("uv.lock"), PathBuf::from("Pipfile")],
        };
        assert_eq!(
            reason.to_string(),
            "selection skipped: these files (Pipfile, uv.lock) may declare external dependencies"
        );
    }

    #[test]
    fn test_reason_serializes() {
        let reason = ShortCircuitReason::FixtureFilesChanged {
            files: vec![PathBuf::from("conftest.py")],
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(
            json["FixtureFilesChanged"]["files"][0],
            serde_json::json!("conftest.py")
        );
    }
}
