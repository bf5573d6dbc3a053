//! # Wiring
//!
//! Start-up assembly: configuration names to provider values, macro graph
//! to shared processor lists, pipelines to the label table.
//!
//! ```text
//! WorkerConfig ──→ providers::load_*    transports, managers, crypto
//!        │
//!        ├──→ macro_resolver::validate   (199 on cycles)
//!        └──→ MacroResolver::resolve ──→ PipelineTable::build
//! ```

pub mod macro_resolver;
pub mod pipeline_table;
pub mod providers;

pub use macro_resolver::{validate as validate_macros, MacroResolver};
pub use pipeline_table::{PipelineEntry, PipelineTable};
pub use providers::LoadedInput;
