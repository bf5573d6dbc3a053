//! # Macro Resolution
//!
//! Macro graphs as the worker sees them at start-up: cycles are refused
//! before anything is built, and a processor reached through several
//! macros is a single instance.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use shared_types::{DopResult, Event, Provider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use worker_runtime::container::ProcessorEnv;
    use worker_runtime::processors::{Processor, ProcessorHandle};
    use worker_runtime::{ProcessorRegistry, WorkerBuilder};

    struct Marker;

    impl Provider for Marker {}

    impl Processor for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn handle_event(&self, _event: &Event, _env: &mut ProcessorEnv) -> DopResult<()> {
            Ok(())
        }
    }

    fn counting_registry() -> (ProcessorRegistry, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let registry = ProcessorRegistry::with_builtins();
        let b = Arc::clone(&built);
        registry.register("marker", move || {
            b.fetch_add(1, Ordering::SeqCst);
            ProcessorHandle::Main(Arc::new(Marker))
        });
        (registry, built)
    }

    const MARKER: &str = r#"{"processor": "marker", "configuration": ""}"#;

    #[test]
    fn test_cycle_fails_before_instantiation() {
        let (registry, built) = counting_registry();
        let macros = format!(r#"{{"A": [{MARKER}, "$B"], "B": [{MARKER}, "$C"], "C": ["$A"]}}"#);
        let result = WorkerBuilder::new(config(&macros, "{}")).with_registry(registry).start();

        let err = result.unwrap_err();
        assert_eq!(err.code, 199);
        assert!(!err.recoverable);
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_undefined_macro_in_graph() {
        let err = WorkerBuilder::new(config(r#"{"A": ["$MISSING"]}"#, "{}"))
            .start()
            .unwrap_err();
        assert_eq!(err.code, 199);
    }

    #[test]
    fn test_undefined_macro_in_pipeline() {
        let pipelines = r#"{"x": {"main": ["$MISSING"], "finally": []}}"#;
        let err = WorkerBuilder::new(config("{}", pipelines)).start().unwrap_err();
        assert_eq!(err.code, 24215);
    }

    #[test]
    fn test_unknown_processor_name() {
        let pipelines = r#"{"x": {"main": [{"processor": "nope", "configuration": ""}], "finally": []}}"#;
        let err = WorkerBuilder::new(config("{}", pipelines)).start().unwrap_err();
        assert_eq!(err.code, 24215);
    }

    #[test]
    fn test_shared_instance_across_pipelines() {
        let (registry, built) = counting_registry();
        let macros = format!(r#"{{"P": [{MARKER}], "OUTER": ["$P"]}}"#);
        let pipelines = r#"{
            "one": {"main": ["$P"], "finally": []},
            "two": {"main": ["$OUTER", {"processor": "client_ready", "configuration": ""}], "finally": []}
        }"#;
        let worker = TestWorker::start_with(config(&macros, pipelines), registry);
        assert_eq!(built.load(Ordering::SeqCst), 1);

        let table = worker.runtime.dispatcher().table();
        let one = &table.get("one").unwrap().main;
        let two = &table.get("two").unwrap().main;
        assert_eq!(two.len(), 2);
        assert!(std::ptr::addr_eq(Arc::as_ptr(&one[0]), Arc::as_ptr(&two[0])));
        assert_eq!(two[1].name(), "client_ready");
        // marker, client_ready
        assert_eq!(table.distinct_processors().len(), 2);
    }

    #[test]
    fn test_nested_expansion_keeps_order() {
        let worker = TestWorker::start(config(STANDARD_MACROS, STANDARD_PIPELINES));
        let entry = worker.runtime.dispatcher().table().get("dop_client_ready").unwrap();
        let names: Vec<&str> = entry.main.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["authentication_check", "update_session", "find_sessions_mle", "client_ready"]
        );
        assert_eq!(entry.finally[0].name(), "event_multiplication_mle");
    }
}
