//! # Macro Resolver
//!
//! Expands the macro graph into flat processor lists in two passes.
//!
//! ```text
//! pass 1: validate   DFS, white/gray/black. A back edge to a gray node or a
//!                    reference to an undefined macro fails with 199 before
//!                    any processor is built.
//! pass 2: load       per macro, in element order:
//!                      {processor spec} → registry.create(spec)
//!                      "$Other"         → resolve Other (memoized), append
//!                                         the SAME handles
//! ```
//!
//! A processor reached through two macros is one instance. A failed load
//! discards everything the attempt built: the memo table is cleared.

use crate::container::{MacroElement, MacroGraph};
use crate::processors::ProcessorHandle;
use crate::registry::ProcessorRegistry;
use shared_types::codes;
use shared_types::{DopError, DopResult};
use std::collections::HashMap;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Gray,
    Black,
}

fn invalid(detail: String) -> DopError {
    DopError::from(codes::ERR_INVALID_MACROS)
        .rip()
        .caused_by(DopError::new(0, detail))
}

/// Check `graph` for cycles and undefined references.
///
/// # Errors
///
/// 199 naming the offending macro.
pub fn validate(graph: &MacroGraph) -> DopResult<()> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for name in graph.keys() {
        visit(graph, name, &mut marks)?;
    }
    Ok(())
}

fn visit<'g>(graph: &'g MacroGraph, name: &'g str, marks: &mut HashMap<&'g str, Mark>) -> DopResult<()> {
    match marks.get(name) {
        Some(Mark::Black) => return Ok(()),
        Some(Mark::Gray) => return Err(invalid(format!("circular dependency through ${name}"))),
        None => {}
    }
    let elements = graph
        .get(name)
        .ok_or_else(|| invalid(format!("undefined macro ${name}")))?;
    marks.insert(name, Mark::Gray);
    for element in elements {
        match element {
            MacroElement::Processor(_) => {}
            MacroElement::Reference(r) => {
                let target = element
                    .macro_name()
                    .ok_or_else(|| invalid(format!("${name}: reference {r} must start with $")))?;
                visit(graph, target, marks)?;
            }
        }
    }
    marks.insert(name, Mark::Black);
    Ok(())
}

/// Owner of the memo table of resolved macros.
pub struct MacroResolver<'r> {
    registry: &'r ProcessorRegistry,
    loaded: HashMap<String, Vec<ProcessorHandle>>,
}

impl<'r> MacroResolver<'r> {
    /// Resolver creating processors through `registry`.
    #[must_use]
    pub fn new(registry: &'r ProcessorRegistry) -> Self {
        Self {
            registry,
            loaded: HashMap::new(),
        }
    }

    /// Validate then load every macro of `graph`.
    ///
    /// # Errors
    ///
    /// 199 when validation fails (nothing is built), otherwise the first
    /// load error (the memo table is cleared).
    pub fn resolve(&mut self, graph: &MacroGraph) -> DopResult<()> {
        validate(graph)?;
        for name in graph.keys() {
            if let Err(e) = self.load(graph, name) {
                error!(code = e.code, "[Macros] Loading ${} failed, discarding {} resolved macros", name, self.loaded.len());
                self.loaded.clear();
                return Err(e);
            }
        }
        info!("[Macros] {} macros resolved", self.loaded.len());
        Ok(())
    }

    fn load(&mut self, graph: &MacroGraph, name: &str) -> DopResult<Vec<ProcessorHandle>> {
        if let Some(done) = self.loaded.get(name) {
            return Ok(done.clone());
        }
        let elements = graph
            .get(name)
            .ok_or_else(|| invalid(format!("undefined macro ${name}")))?;
        let mut handles = Vec::new();
        for element in elements {
            match element {
                MacroElement::Processor(spec) => handles.push(self.registry.create(spec)?),
                MacroElement::Reference(r) => {
                    let target = element
                        .macro_name()
                        .ok_or_else(|| invalid(format!("${name}: reference {r} must start with $")))?;
                    handles.extend(self.load(graph, target)?);
                }
            }
        }
        debug!("[Macros] ${} resolved to {} processors", name, handles.len());
        self.loaded.insert(name.to_string(), handles.clone());
        Ok(handles)
    }

    /// Handles of a resolved macro.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[ProcessorHandle]> {
        self.loaded.get(name).map(Vec::as_slice)
    }

    /// Number of resolved macros.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether nothing is resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Registry used for inline specs.
    #[must_use]
    pub fn registry(&self) -> &'r ProcessorRegistry {
        self.registry
    }
}
