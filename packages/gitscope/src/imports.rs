//! Python import statement extraction
//!
//! Walks a tree-sitter AST and collects raw import statements:
//! - `import module`, `import module as alias`, `import a, b`
//! - `from module import name [as alias]`
//! - `from module import (a, b)`
//! - `from module import *`
//! - `from .[.…][module] import name` (relative imports)
//!
//! Aliases are parsed but discarded: impact analysis only cares about the
//! imported module/name identifiers, never about local bindings.
//!
//! Dynamic and conditional imports (`importlib`, `__import__`, imports built
//! from strings) are invisible to this analysis. Imports nested inside
//! functions or classes ARE collected, since the tree walk visits every node.

use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{Result, SelectError};

/// One raw import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonImport {
    /// Module part: `"os.path"` for `import os.path` or `from os.path
    /// import x`; empty for `from . import x`
    pub module: String,

    /// Imported names, for `from` imports (`"*"` for star imports);
    /// empty for plain imports
    pub names: Vec<String>,

    /// Relative import level (0 = absolute, 1 = `.`, 2 = `..`, ...)
    pub relative_level: u32,

    /// Is this a `from` import?
    pub is_from: bool,
}

/// Parse Python source into a syntax tree
///
/// Fails hard on unparsable source; callers must never downgrade this to
/// "no dependencies".
pub fn parse_module(file: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| SelectError::parse(file, e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SelectError::parse(file, "parser returned no tree"))?;

    if tree.root_node().has_error() {
        return Err(SelectError::parse(file, "syntax error"));
    }

    Ok(tree)
}

/// Collect every import statement in the tree
pub fn collect_imports(tree: &Tree, source: &str) -> Vec<PythonImport> {
    let mut imports = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => extract_plain_import(&node, source, &mut imports),
            "import_from_statement" => {
                imports.push(extract_from_import(&node, source));
            }
            _ => {
                for i in 0..node.child_count() {
                    if let Some(child) = node.child(i) {
                        stack.push(child);
                    }
                }
            }
        }
    }

    imports
}

/// Handle `import a.b, c as d` — one entry per module
fn extract_plain_import(node: &Node, source: &str, out: &mut Vec<PythonImport>) {
    let mut cursor = node.walk();
    for name_node in node.children_by_field_name("name", &mut cursor) {
        let module = match name_node.kind() {
            "dotted_name" => node_text(&name_node, source),
            "aliased_import" => match name_node.child_by_field_name("name") {
                Some(inner) => node_text(&inner, source),
                None => continue,
            },
            _ => continue,
        };

        out.push(PythonImport {
            module,
            names: Vec::new(),
            relative_level: 0,
            is_from: false,
        });
    }
}

/// Handle `from [.…][module] import names`
fn extract_from_import(node: &Node, source: &str) -> PythonImport {
    let mut module = String::new();
    let mut relative_level = 0u32;

    // Module part: either a plain dotted_name or a relative_import
    // wrapping an import_prefix (the dots) and an optional dotted_name.
    if let Some(module_node) = node.child_by_field_name("module_name") {
        match module_node.kind() {
            "dotted_name" => module = node_text(&module_node, source),
            "relative_import" => {
                for i in 0..module_node.child_count() {
                    if let Some(part) = module_node.child(i) {
                        match part.kind() {
                            "import_prefix" => {
                                relative_level +=
                                    node_text(&part, source).matches('.').count() as u32;
                            }
                            "dotted_name" => module = node_text(&part, source),
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for name_node in node.children_by_field_name("name", &mut cursor) {
        match name_node.kind() {
            "dotted_name" => names.push(node_text(&name_node, source)),
            "aliased_import" => {
                if let Some(inner) = name_node.child_by_field_name("name") {
                    names.push(node_text(&inner, source));
                }
            }
            _ => {}
        }
    }

    // Star imports carry no "name" field
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "wildcard_import" {
                names.push("*".to_string());
            }
        }
    }

    PythonImport {
        module,
        names,
        relative_level,
        is_from: true,
    }
}

fn node_text(node: &Node, source: &str) -> String {
    source[node.start_byte()..node.end_byte()].to_string()
}
