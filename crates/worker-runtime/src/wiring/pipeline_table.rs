//! # Pipeline Table
//!
//! Event label → `{main, finally}` processor lists, built once at start-up
//! from the `pipelines` configuration and the resolved macros. Immutable
//! afterwards.

use crate::container::{MacroElement, PipelineSpec};
use crate::processors::{FinallyProcessor, Processor, ProcessorHandle, Stage};
use crate::wiring::macro_resolver::MacroResolver;
use shared_types::codes;
use shared_types::{DopError, DopResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// Processors bound to one event label.
#[derive(Clone, Default)]
pub struct PipelineEntry {
    /// Transactional stage, in order.
    pub main: Vec<Arc<dyn Processor>>,
    /// Stage that always runs after `main`, in order.
    pub finally: Vec<Arc<dyn FinallyProcessor>>,
}

impl std::fmt::Debug for PipelineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let main: Vec<&str> = self.main.iter().map(|p| p.name()).collect();
        let finally: Vec<&str> = self.finally.iter().map(|p| p.name()).collect();
        f.debug_struct("PipelineEntry")
            .field("main", &main)
            .field("finally", &finally)
            .finish()
    }
}

/// Label to pipeline table.
#[derive(Debug, Default)]
pub struct PipelineTable {
    entries: HashMap<String, PipelineEntry>,
    processors: Vec<ProcessorHandle>,
}

fn wrong_stage(label: &str, handle: &ProcessorHandle, wanted: Stage) -> DopError {
    DopError::from(codes::ERR_LOAD_PROCESSOR).rip().caused_by(DopError::new(
        0,
        format!("{label}: {} is not a {wanted:?} processor", handle.name()),
    ))
}

fn unknown_macro(label: &str, reference: &str) -> DopError {
    DopError::from(codes::ERR_LOAD_PROCESSOR)
        .rip()
        .caused_by(DopError::new(0, format!("{label}: undefined macro {reference}")))
}

impl PipelineTable {
    /// Build the table. Inline specs are created through the resolver's
    /// registry; `$Name` elements reuse the resolved macro handles.
    ///
    /// # Errors
    ///
    /// 24215 for an undefined macro, an unknown processor or a processor
    /// listed in the wrong stage; 24216 for an `init` failure.
    pub fn build(
        pipelines: &BTreeMap<String, PipelineSpec>,
        resolver: &MacroResolver<'_>,
    ) -> DopResult<Self> {
        let mut table = Self::default();
        for (label, spec) in pipelines {
            let mut entry = PipelineEntry::default();
            for handle in table.expand(label, &spec.main, resolver)? {
                match handle {
                    ProcessorHandle::Main(p) => entry.main.push(p),
                    other => return Err(wrong_stage(label, &other, Stage::Main)),
                }
            }
            for handle in table.expand(label, &spec.finally, resolver)? {
                match handle {
                    ProcessorHandle::Finally(p) => entry.finally.push(p),
                    other => return Err(wrong_stage(label, &other, Stage::Finally)),
                }
            }
            table.entries.insert(label.clone(), entry);
        }
        info!(
            "[Pipelines] {} pipelines, {} distinct processors",
            table.entries.len(),
            table.processors.len()
        );
        Ok(table)
    }

    fn expand(
        &mut self,
        label: &str,
        elements: &[MacroElement],
        resolver: &MacroResolver<'_>,
    ) -> DopResult<Vec<ProcessorHandle>> {
        let mut out = Vec::new();
        for element in elements {
            match element {
                MacroElement::Processor(spec) => out.push(resolver.registry().create(spec)?),
                MacroElement::Reference(r) => {
                    let handles = element
                        .macro_name()
                        .and_then(|name| resolver.get(name))
                        .ok_or_else(|| unknown_macro(label, r))?;
                    out.extend(handles.iter().cloned());
                }
            }
        }
        for handle in &out {
            self.track(handle);
        }
        Ok(out)
    }

    fn track(&mut self, handle: &ProcessorHandle) {
        if !self.processors.iter().any(|h| h.ptr_eq(handle)) {
            self.processors.push(handle.clone());
        }
    }

    /// Pipeline bound to `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&PipelineEntry> {
        self.entries.get(label)
    }

    /// Bound labels, sorted.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Every processor instance used by a pipeline, once, in first-use order.
    #[must_use]
    pub fn distinct_processors(&self) -> &[ProcessorHandle] {
        &self.processors
    }

    /// Number of pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pipeline is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
