//! Execution orchestrator
//!
//! Runs an [`OperationPlan`] over a batch of root objects:
//! 1. breadth-first disassembly collects every reachable object per configuration
//! 2. each configuration group cuts its sorted assemble operations into
//!    consecutive runs sharing a container
//! 3. each run is one container call over the whole group
//!
//! A `(object, configuration)` pair is collected at most once, so cyclic
//! object graphs terminate.

use crate::container::{ContainerId, FetchFailure, ProcessOutcome};
use crate::error::EnrichResult;
use crate::operation::{AssembleOperation, ConfigId, OperationConfiguration, OperationPlan};
use crate::value::ObjectRef;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::{HashSet, VecDeque};

/// Summary of one enrichment run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Distinct objects collected (roots included)
    pub objects: usize,
    /// Configuration groups with at least one object
    pub groups: usize,
    /// `Container::process` calls
    pub container_calls: usize,
    /// Assembler executions with a fetched value
    pub applied: usize,
    /// Namespace fetches performed
    pub fetches: usize,
    /// Namespace fetches that returned no data
    pub empty_fetches: usize,
    /// Namespace fetches that failed
    pub failures: Vec<FetchFailure>,
}

impl EnrichReport {
    /// Check if no fetch failed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, outcome: ProcessOutcome) {
        self.container_calls += 1;
        self.applied += outcome.applied;
        self.fetches += outcome.fetches;
        self.empty_fetches += outcome.empty_fetches;
        self.failures.extend(outcome.failures);
    }
}

/// Drives disassembly and batched assembly
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationExecutor {
    parallel: bool,
}

impl OperationExecutor {
    /// Create sequential executor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run configuration groups on the rayon pool
    #[inline]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check if groups run in parallel
    #[inline]
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Enrich `roots` according to `plan`
    ///
    /// # Errors
    ///
    /// Returns [`crate::EnrichError::TypeMismatch`] when an object does not
    /// match the type of the configuration it was collected for.
    pub fn execute(&self, roots: &[ObjectRef], plan: &OperationPlan) -> EnrichResult<EnrichReport> {
        let groups = Self::collect(roots, plan);
        let mut report = EnrichReport {
            objects: groups.values().map(Vec::len).sum(),
            groups: groups.len(),
            ..EnrichReport::default()
        };

        let work: Vec<(&OperationConfiguration, &[ObjectRef])> = groups
            .iter()
            .filter_map(|(id, objects)| plan.get(*id).map(|config| (config, objects.as_slice())))
            .filter(|(config, _)| !config.assemble_operations().is_empty())
            .collect();

        let outcomes: Vec<Vec<ProcessOutcome>> = if self.parallel {
            work.par_iter()
                .map(|(config, objects)| Self::assemble_group(config, objects))
                .collect::<EnrichResult<_>>()?
        } else {
            work.iter()
                .map(|(config, objects)| Self::assemble_group(config, objects))
                .collect::<EnrichResult<_>>()?
        };
        for outcome in outcomes.into_iter().flatten() {
            report.absorb(outcome);
        }

        tracing::info!(
            objects = report.objects,
            groups = report.groups,
            container_calls = report.container_calls,
            applied = report.applied,
            failures = report.failures.len(),
            "enrichment complete"
        );
        Ok(report)
    }

    /// Breadth-first disassembly, grouping objects by configuration
    fn collect(roots: &[ObjectRef], plan: &OperationPlan) -> IndexMap<ConfigId, Vec<ObjectRef>> {
        let mut groups: IndexMap<ConfigId, Vec<ObjectRef>> = IndexMap::new();
        let mut seen: HashSet<(usize, ConfigId)> = HashSet::new();
        let mut frontier: VecDeque<(ObjectRef, ConfigId)> =
            roots.iter().map(|root| (root.clone(), plan.root())).collect();

        while let Some((object, id)) = frontier.pop_front() {
            if !seen.insert((object.identity(), id)) {
                continue;
            }
            let Some(config) = plan.get(id) else {
                continue;
            };
            for operation in config.disassemble_operations() {
                frontier.extend(operation.disassembler().expand(&object, operation));
            }
            groups.entry(id).or_default().push(object);
        }
        groups
    }

    /// Hand one configuration group to its containers, in priority order
    ///
    /// Consecutive operations sharing a container form one run and one
    /// `process` call. A container reappearing after another one starts a
    /// new run.
    fn assemble_group(config: &OperationConfiguration, objects: &[ObjectRef]) -> EnrichResult<Vec<ProcessOutcome>> {
        let mut runs: Vec<(ContainerId, Vec<&AssembleOperation>)> = Vec::new();
        for operation in config.assemble_operations() {
            match runs.last_mut() {
                Some((id, operations)) if *id == operation.container_id() => operations.push(operation),
                _ => runs.push((operation.container_id(), vec![operation])),
            }
        }

        let mut outcomes = Vec::with_capacity(runs.len());
        for (_, operations) in &runs {
            let Some(first) = operations.first() else {
                continue;
            };
            let container = first.container();
            tracing::debug!(
                type_name = %config.target_type(),
                container = container.name(),
                operations = operations.len(),
                objects = objects.len(),
                "processing run"
            );
            outcomes.push(container.process(objects, operations)?);
        }
        Ok(outcomes)
    }
}
