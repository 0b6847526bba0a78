//! Module registry
//!
//! Bidirectional lookup between dotted module names and project-relative
//! file paths. Seeded once per selection run from a host-supplied snapshot
//! of known modules, extended lazily through a [`ModuleResolver`] when an
//! unknown name is queried. Both positive and negative resolutions are
//! cached for the lifetime of the run and never re-resolved.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Metadata-only module lookup
///
/// Locates the file backing a dotted module name without executing any
/// code. A reflective host can back this with runtime introspection; the
/// default [`FsModuleResolver`] walks the standard filesystem layout.
pub trait ModuleResolver: Send + Sync {
    /// Absolute path of the file defining `name`, if any
    fn find_module(&self, name: &str) -> Option<PathBuf>;
}

/// Filesystem-backed resolver
///
/// `a.b.c` resolves to `root/a/b/c.py`, or `root/a/b/c/__init__.py` for
/// packages.
pub struct FsModuleResolver {
    root: PathBuf,
}

impl FsModuleResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModuleResolver for FsModuleResolver {
    fn find_module(&self, name: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in name.split('.') {
            path.push(segment);
        }

        let module_file = path.with_extension("py");
        if module_file.is_file() {
            return Some(module_file);
        }

        let package_init = path.join("__init__.py");
        if package_init.is_file() {
            return Some(package_init);
        }

        None
    }
}

/// Name ↔ file registry for one selection run
///
/// `None` entries mean "looked up, known to be external or unresolvable";
/// they are as much a cache hit as a resolved path.
pub struct ModuleRegistry<'a> {
    root: PathBuf,

    /// Dotted name → project-relative path (or cached negative outcome)
    by_name: DashMap<String, Option<PathBuf>>,

    /// Inverse of the seed snapshot only: project-relative path → name.
    /// Lazily resolved names do not extend this map; a file the host never
    /// saw as a loaded module simply has no registered name.
    by_file: FxHashMap<PathBuf, String>,

    resolver: &'a dyn ModuleResolver,
}

impl<'a> ModuleRegistry<'a> {
    /// Build from a snapshot of currently-known modules
    ///
    /// `snapshot` maps dotted names to the absolute file paths the host
    /// observed. Entries outside the project root are recorded as
    /// unresolvable rather than dropped, so they are never re-resolved.
    pub fn from_snapshot(
        root: impl Into<PathBuf>,
        snapshot: impl IntoIterator<Item = (String, Option<PathBuf>)>,
        resolver: &'a dyn ModuleResolver,
    ) -> Self {
        let root = root.into();
        let by_name = DashMap::new();
        let mut by_file = FxHashMap::default();

        for (name, path) in snapshot {
            let relative = path.and_then(|p| p.strip_prefix(&root).ok().map(Path::to_path_buf));
            if let Some(ref rel) = relative {
                by_file.insert(rel.clone(), name.clone());
            }
            by_name.insert(name, relative);
        }

        Self {
            root,
            by_name,
            by_file,
            resolver,
        }
    }

    /// Project root this registry is scoped to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registered name of a project file, if the host ever loaded it
    pub fn get_name(&self, file: &Path) -> Option<&str> {
        self.by_file.get(file).map(String::as_str)
    }

    /// Resolve a dotted name to a project-relative file
    ///
    /// Cache-first; on a miss, falls back to the injected resolver and
    /// caches the outcome either way. Paths outside the project root
    /// resolve to `None` (external).
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Some(cached) = self.by_name.get(name) {
            return cached.clone();
        }

        let resolved = self
            .resolver
            .find_module(name)
            .and_then(|abs| abs.strip_prefix(&self.root).ok().map(Path::to_path_buf));

        debug!(name, hit = resolved.is_some(), "registry fallback lookup");
        self.by_name.insert(name.to_string(), resolved.clone());
        resolved
    }

    /// Number of cached name entries (seed + lazily resolved)
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
