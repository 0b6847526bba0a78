//! End-to-end selection runs against real on-disk project trees

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rustc_hash::FxHashSet;
use tempfile::TempDir;

use gitscope::{
    DependencyExtractor, FsModuleResolver, ModuleRegistry, SelectionEngine, SelectionOutcome,
};

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

fn paths(names: &[&str]) -> FxHashSet<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn run(root: &Path, targets: &[&str], changed: &[&str]) -> SelectionOutcome {
    run_seeded(root, &[], targets, changed)
}

fn run_seeded(
    root: &Path,
    snapshot: &[(&str, &str)],
    targets: &[&str],
    changed: &[&str],
) -> SelectionOutcome {
    let resolver = FsModuleResolver::new(root);
    let seed: Vec<(String, Option<PathBuf>)> = snapshot
        .iter()
        .map(|(name, rel)| (name.to_string(), Some(root.join(rel))))
        .collect();
    let registry = ModuleRegistry::from_snapshot(root, seed, &resolver);
    let extractor = DependencyExtractor::new(root);
    let engine = SelectionEngine::new(&registry, &extractor);
    engine.run(&paths(targets), &paths(changed)).unwrap()
}

#[test]
fn selects_only_tests_reaching_the_change() {
    let dir = project(&[
        ("app/__init__.py", ""),
        ("app/db.py", ""),
        ("app/models.py", "import app.db\n"),
        ("app/api.py", "import app.models\n"),
        ("tests/test_api.py", "import app.api\n"),
        ("tests/test_models.py", "import app.models\n"),
        ("tests/test_db.py", "import app.db\n"),
        ("tests/test_unrelated.py", "import json\n"),
    ]);

    let outcome = run(
        dir.path(),
        &[
            "tests/test_api.py",
            "tests/test_models.py",
            "tests/test_db.py",
            "tests/test_unrelated.py",
        ],
        &["app/db.py"],
    );

    // Everything that transitively reaches app.db, nothing else
    assert_eq!(
        outcome,
        SelectionOutcome::Selected(paths(&[
            "tests/test_api.py",
            "tests/test_models.py",
            "tests/test_db.py",
        ]))
    );
}

#[test]
fn seeded_name_anchors_relative_imports() {
    // The host snapshot names pkg/__init__.py "pkg", so its `from . import
    // util` resolves inside the package instead of being guessed from the
    // path (which would anchor at "__init__")
    let dir = project(&[
        ("pkg/__init__.py", "from . import util\n"),
        ("pkg/util.py", ""),
    ]);

    let outcome = run_seeded(
        dir.path(),
        &[("pkg", "pkg/__init__.py")],
        &["pkg/__init__.py"],
        &["pkg/util.py"],
    );
    assert_eq!(
        outcome,
        SelectionOutcome::Selected(paths(&["pkg/__init__.py"]))
    );
}

#[test]
fn empty_changed_set_selects_nothing() {
    let dir = project(&[("tests/test_app.py", "import app\n"), ("app.py", "")]);

    let outcome = run(dir.path(), &["tests/test_app.py"], &[]);
    assert_eq!(outcome, SelectionOutcome::Selected(paths(&[])));
}

#[test]
fn external_only_imports_select_nothing() {
    let dir = project(&[
        ("tests/test_app.py", "import os\nfrom collections import deque\n"),
        ("app.py", ""),
    ]);

    let outcome = run(dir.path(), &["tests/test_app.py"], &["app.py"]);
    assert_eq!(outcome, SelectionOutcome::Selected(paths(&[])));
}

#[test]
fn identical_runs_yield_identical_selections() {
    let dir = project(&[
        ("t1.py", "import a\n"),
        ("t2.py", "import b\n"),
        ("a.py", "import b\n"),
        ("b.py", ""),
    ]);

    let first = run(dir.path(), &["t1.py", "t2.py"], &["b.py"]);
    let second = run(dir.path(), &["t1.py", "t2.py"], &["b.py"]);
    assert_eq!(first, second);
    assert_eq!(
        first,
        SelectionOutcome::Selected(paths(&["t1.py", "t2.py"]))
    );
}

#[test]
fn growing_the_changed_set_grows_the_selection() {
    let dir = project(&[
        ("t1.py", "import a\n"),
        ("t2.py", "import b\n"),
        ("a.py", ""),
        ("b.py", ""),
    ]);
    let targets = ["t1.py", "t2.py"];

    let small = match run(dir.path(), &targets, &["a.py"]) {
        SelectionOutcome::Selected(s) => s,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let large = match run(dir.path(), &targets, &["a.py", "b.py"]) {
        SelectionOutcome::Selected(s) => s,
        other => panic!("unexpected outcome: {other:?}"),
    };

    assert!(small.is_subset(&large));
    assert_eq!(large, paths(&["t1.py", "t2.py"]));
}

#[test]
fn outcome_serializes_for_host_reporting() {
    let dir = project(&[("t1.py", "import a\n"), ("a.py", "")]);

    let outcome = run(dir.path(), &["t1.py"], &["a.py"]);
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["Selected"][0], serde_json::json!("t1.py"));
}
