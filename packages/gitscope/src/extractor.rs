//! Dependency extraction
//!
//! Computes the one-hop import set of a Python file: every dotted
//! identifier the file imports, plus every strict dotted prefix of those
//! identifiers, because loading `a.b.c` necessarily loads `a.b` and `a`.
//!
//! Results are memoized by `(file, package-context)` for the lifetime of
//! the run; source files are assumed immutable while a selection runs.

use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::errors::{Result, SelectError};
use crate::imports::{collect_imports, parse_module};

/// Memoized one-hop import extractor
pub struct DependencyExtractor {
    root: PathBuf,
    cache: DashMap<(PathBuf, Option<String>), FxHashSet<String>>,
}

impl DependencyExtractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: DashMap::new(),
        }
    }

    /// Dotted identifiers directly imported by `file`
    ///
    /// `package` is the dotted name of the declaring package, used to
    /// anchor relative imports. When absent it is approximated from the
    /// file's own path segments — good enough for standard layouts, and a
    /// documented limitation for non-standard ones.
    ///
    /// Unreadable or unparsable source is a hard error, never an empty
    /// set: a file we cannot analyze must not silently drop out of the
    /// impact graph.
    pub fn list_dependencies(
        &self,
        file: &Path,
        package: Option<&str>,
    ) -> Result<FxHashSet<String>> {
        let key = (file.to_path_buf(), package.map(str::to_string));
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let parts: Vec<String> = match package {
            Some(name) => name.split('.').map(str::to_string).collect(),
            // Relative to the project root, so the path segments are a
            // safe approximation of the dotted package path
            None => package_parts_from_path(file),
        };

        let source = fs::read_to_string(self.root.join(file))?;
        let tree = parse_module(file, &source)?;

        let mut dependencies: FxHashSet<String> = FxHashSet::default();
        for import in collect_imports(&tree, &source) {
            if !import.is_from {
                dependencies.insert(import.module);
                continue;
            }

            let prefix = if import.relative_level > 0 {
                let level = import.relative_level as usize;
                if parts.len() < level {
                    return Err(SelectError::RelativeImport {
                        file: file.to_path_buf(),
                        level: import.relative_level,
                    });
                }
                let anchor = parts[parts.len() - level..].join(".");
                if import.module.is_empty() {
                    anchor
                } else {
                    format!("{}.{}", anchor, import.module)
                }
            } else {
                import.module
            };

            for name in import.names {
                dependencies.insert(format!("{}.{}", prefix, name));
            }
        }

        // Every strict dotted prefix is an implied dependency
        let expanded: Vec<String> = dependencies
            .iter()
            .flat_map(|dep| ancestor_prefixes(dep))
            .collect();
        dependencies.extend(expanded);

        trace!(file = %file.display(), count = dependencies.len(), "extracted dependencies");
        self.cache.insert(key, dependencies.clone());
        Ok(dependencies)
    }

    /// Number of memoized (file, package) entries
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// `"a.b.c"` → `["a.b", "a"]`
fn ancestor_prefixes(name: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut rest = name;
    while let Some(idx) = rest.rfind('.') {
        rest = &rest[..idx];
        prefixes.push(rest.to_string());
    }
    prefixes
}

/// Approximate a dotted package path from a project-relative file path
fn package_parts_from_path(file: &Path) -> Vec<String> {
    file.with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}
