//! Impact selector
//!
//! The fixed-point propagation algorithm: given target files, changed
//! files, a registry and an extractor, compute the subset of targets
//! transitively impacted through the static import graph.
//!
//! Cycles and diamonds are handled with an explicit per-target frontier
//! plus explored-set worklist rather than recursion, so depth is bounded
//! by [`MAX_ROUNDS`] instead of the call stack. The cap is a defensive
//! ceiling, not an expected code path: realistic import graphs converge in
//! a handful of rounds.
//!
//! Targets are independent, so each expansion pass runs under rayon; the
//! caches behind the registry and extractor are lock-free. Every target's
//! decision is fully settled before the result set is returned.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::errors::{Result, SelectError};
use crate::extractor::DependencyExtractor;
use crate::registry::ModuleRegistry;

/// Defensive ceiling on fixed-point rounds
///
/// Exceeding it fails fatally rather than returning a partial answer.
pub const MAX_ROUNDS: usize = 100;

/// Unexpanded dependency edges plus already-expanded files for one target
struct TargetState {
    frontier: FxHashSet<(String, PathBuf)>,
    explored: FxHashSet<PathBuf>,
}

/// Outcome of expanding one target for one round
enum Expansion {
    /// A dependency resolved to a changed file
    Selected,
    /// No hit this round; carry the new frontier forward
    Pending(TargetState),
}

/// Fixed-point impact propagation over the import graph
pub struct ImpactSelector<'a> {
    registry: &'a ModuleRegistry<'a>,
    extractor: &'a DependencyExtractor,
}

impl<'a> ImpactSelector<'a> {
    pub fn new(registry: &'a ModuleRegistry<'a>, extractor: &'a DependencyExtractor) -> Self {
        Self {
            registry,
            extractor,
        }
    }

    /// Impacted subset of `target_files`
    ///
    /// A target in the changed set is selected immediately; the rest are
    /// expanded until a changed file is reached, their frontier empties
    /// (permanently unaffected), or the round cap trips.
    pub fn select(
        &self,
        target_files: &FxHashSet<PathBuf>,
        changed_files: &FxHashSet<PathBuf>,
    ) -> Result<FxHashSet<PathBuf>> {
        // Direct hits: self-change always implies impact
        let mut selection: FxHashSet<PathBuf> = target_files
            .intersection(changed_files)
            .cloned()
            .collect();
        let remaining: Vec<PathBuf> = target_files.difference(&selection).cloned().collect();

        if remaining.is_empty() {
            return Ok(selection);
        }

        // First expansion: classify each target's direct imports
        let first_pass: Vec<(PathBuf, Expansion)> = remaining
            .into_par_iter()
            .map(|target| {
                let expansion = self.expand_target(&target, changed_files)?;
                Ok((target, expansion))
            })
            .collect::<Result<_>>()?;

        let mut queued: FxHashMap<PathBuf, TargetState> = FxHashMap::default();
        for (target, expansion) in first_pass {
            match expansion {
                Expansion::Selected => {
                    selection.insert(target);
                }
                Expansion::Pending(state) => {
                    // An empty frontier and no hit means permanently
                    // unaffected
                    if !state.frontier.is_empty() {
                        queued.insert(target, state);
                    }
                }
            }
        }

        // Iterative fixed point
        for round in 0..MAX_ROUNDS {
            if queued.is_empty() {
                debug!(round, selected = selection.len(), "fixed point reached");
                return Ok(selection);
            }

            let batch: Vec<(PathBuf, TargetState)> =
                std::mem::take(&mut queued).into_iter().collect();
            debug!(round, pending = batch.len(), "expanding frontier");

            let results: Vec<(PathBuf, Expansion)> = batch
                .into_par_iter()
                .map(|(target, state)| {
                    let expansion = self.expand_frontier(state, changed_files)?;
                    Ok((target, expansion))
                })
                .collect::<Result<_>>()?;

            for (target, expansion) in results {
                match expansion {
                    Expansion::Selected => {
                        selection.insert(target);
                    }
                    Expansion::Pending(state) => {
                        if !state.frontier.is_empty() {
                            queued.insert(target, state);
                        }
                    }
                }
            }
        }

        if queued.is_empty() {
            Ok(selection)
        } else {
            Err(SelectError::RecursionLimit { rounds: MAX_ROUNDS })
        }
    }

    /// Resolve a target's own direct imports
    fn expand_target(
        &self,
        target: &Path,
        changed_files: &FxHashSet<PathBuf>,
    ) -> Result<Expansion> {
        let package = self.registry.get_name(target);
        let mut frontier = FxHashSet::default();

        for dep_name in self.extractor.list_dependencies(target, package)? {
            match self.registry.resolve(&dep_name) {
                Some(dep_file) if changed_files.contains(&dep_file) => {
                    return Ok(Expansion::Selected);
                }
                Some(dep_file) => {
                    frontier.insert((dep_name, dep_file));
                }
                // External or unresolvable: cannot be impacted by
                // in-project changes
                None => {}
            }
        }

        Ok(Expansion::Pending(TargetState {
            frontier,
            explored: FxHashSet::default(),
        }))
    }

    /// Expand one round of a target's frontier
    fn expand_frontier(
        &self,
        state: TargetState,
        changed_files: &FxHashSet<PathBuf>,
    ) -> Result<Expansion> {
        let TargetState {
            frontier,
            mut explored,
        } = state;
        let mut next = FxHashSet::default();

        for (dep_name, dep_file) in frontier {
            if explored.contains(&dep_file) {
                continue;
            }

            for sub_name in self.extractor.list_dependencies(&dep_file, Some(&dep_name))? {
                if let Some(sub_file) = self.registry.resolve(&sub_name) {
                    if changed_files.contains(&sub_file) {
                        return Ok(Expansion::Selected);
                    }
                    if !explored.contains(&sub_file) {
                        next.insert((sub_name, sub_file));
                    }
                }
            }

            explored.insert(dep_file);
        }

        Ok(Expansion::Pending(TargetState {
            frontier: next,
            explored,
        }))
    }
}
