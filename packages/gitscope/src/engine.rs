//! Selection engine
//!
//! One-shot orchestration of a selection run: apply the short-circuit
//! policy, then the impact selector. A pure function of its inputs and the
//! current filesystem content; no state persists between runs.

use std::path::PathBuf;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::info;

use crate::errors::Result;
use crate::extractor::DependencyExtractor;
use crate::policy::{ShortCircuitPolicy, ShortCircuitReason};
use crate::registry::ModuleRegistry;
use crate::selector::ImpactSelector;

/// Result of one selection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectionOutcome {
    /// The impacted subset of the target set; everything else is safe to
    /// skip
    Selected(FxHashSet<PathBuf>),

    /// Selection was bypassed; treat every target as impacted
    ShortCircuited(ShortCircuitReason),
}

/// Policy + selector wired together for one project root
pub struct SelectionEngine<'a> {
    registry: &'a ModuleRegistry<'a>,
    extractor: &'a DependencyExtractor,
    policy: ShortCircuitPolicy,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(registry: &'a ModuleRegistry<'a>, extractor: &'a DependencyExtractor) -> Self {
        Self {
            registry,
            extractor,
            policy: ShortCircuitPolicy::new(),
        }
    }

    pub fn with_policy(mut self, policy: ShortCircuitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run policy then selection
    ///
    /// The returned outcome is fully settled: every target's expansion is
    /// exhausted (or the run short-circuited) before the caller may use it
    /// to filter the target list.
    pub fn run(
        &self,
        target_files: &FxHashSet<PathBuf>,
        changed_files: &FxHashSet<PathBuf>,
    ) -> Result<SelectionOutcome> {
        let selector = ImpactSelector::new(self.registry, self.extractor);

        if let Some(reason) =
            self.policy
                .evaluate(self.registry.root(), changed_files, &selector)?
        {
            info!(%reason, "selection short-circuited");
            return Ok(SelectionOutcome::ShortCircuited(reason));
        }

        let selected = selector.select(target_files, changed_files)?;
        info!(
            targets = target_files.len(),
            selected = selected.len(),
            "selection complete"
        );
        Ok(SelectionOutcome::Selected(selected))
    }
}
