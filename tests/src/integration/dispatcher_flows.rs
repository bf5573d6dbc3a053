//! # Dispatcher Flows
//!
//! Routing, transaction boundaries and error events, observed from the
//! outside of a started worker.
//!
//! | Scenario | Expected |
//! |----------|----------|
//! | unknown label | nothing written, no transaction |
//! | main failure | one rollback per manager, later processors skipped |
//! | finally | runs after a failed main |
//! | duplicate session | 504 error event to the caller |
//! | missing token | 825 error event, `werr` slot |

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use serde_json::json;
    use shared_types::{DopResult, Event, Provider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use worker_runtime::container::{PipelineStacks, ProcessorEnv, Providers};
    use worker_runtime::processors::{FinallyProcessor, Processor, ProcessorHandle};
    use worker_runtime::{Outcome, ProcessorRegistry};

    // =========================================================================
    // TEST DOUBLES
    // =========================================================================

    struct Counted {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Provider for Counted {}

    impl Processor for Counted {
        fn name(&self) -> &str {
            self.name
        }

        fn handle_event(&self, _event: &Event, _env: &mut ProcessorEnv) -> DopResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountedFinally {
        calls: Arc<AtomicUsize>,
    }

    impl Provider for CountedFinally {}

    impl FinallyProcessor for CountedFinally {
        fn name(&self) -> &str {
            "counted_finally"
        }

        fn handle_pipeline_stack(&self, _stacks: &mut PipelineStacks, _providers: &Providers) -> DopResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Worker with `authentication_check → after` in main and a counting
    /// finally processor.
    fn guarded_worker() -> (TestWorker, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let after = Arc::new(AtomicUsize::new(0));
        let finally = Arc::new(AtomicUsize::new(0));
        let registry = ProcessorRegistry::with_builtins();
        let a = Arc::clone(&after);
        registry.register("after", move || {
            ProcessorHandle::Main(Arc::new(Counted {
                name: "after",
                calls: Arc::clone(&a),
            }))
        });
        let f = Arc::clone(&finally);
        registry.register("counted_finally", move || {
            ProcessorHandle::Finally(Arc::new(CountedFinally { calls: Arc::clone(&f) }))
        });

        let pipelines = r#"{
            "start_session": {
                "main": [{"processor": "start_session", "configuration": ""}],
                "finally": []
            },
            "guarded": {
                "main": [
                    {"processor": "authentication_check", "configuration": ""},
                    {"processor": "after", "configuration": ""}
                ],
                "finally": [{"processor": "counted_finally", "configuration": ""}]
            }
        }"#;
        let worker = TestWorker::start_with(config("{}", pipelines), registry);
        worker.store.insert_user(1, SUBJECT);
        (worker, after, finally)
    }

    // =========================================================================
    // ROUTING
    // =========================================================================

    #[test]
    fn test_unknown_event_gives_no_output() {
        let mut worker = TestWorker::standard();
        let report = worker.send(&message(SESSION_A, "no_such_event", json!({"auth_token": TOKEN})));

        let Outcome::Unrouted { label, error } = report.outcome else {
            panic!("expected an unrouted event, got {:?}", report.outcome);
        };
        assert_eq!(label, "no_such_event");
        assert!(worker.output.sent().is_empty());
        assert_eq!(worker.ledger.begins(), 0);
        assert_eq!(error.code, 824);
        assert!(!error.notifiable);
    }

    #[test]
    fn test_unknown_event_with_open_session_stays_silent() {
        let mut worker = TestWorker::standard();
        worker.open_session("deadbeef");
        worker.output.take();

        let raw = r#"{"session":"deadbeef","task":"1","event":"unknown_event","params":{"auth_token":"1a2b"}}"#;
        let report = worker.send(raw);

        assert_eq!(report.sent, 0);
        assert!(matches!(
            report.outcome,
            Outcome::Unrouted { ref error, .. } if error.code == 824 && !error.notifiable
        ));
        assert!(worker.bodies_to("deadbeef").is_empty());
        assert_eq!(worker.store.counters().begins(), 1);
    }

    #[test]
    fn test_start_session_replies_to_caller() {
        let mut worker = TestWorker::standard();
        let report = worker.open_session(SESSION_A);

        assert!(report.is_success());
        assert_eq!(worker.store.session_count(), 1);
        assert_eq!(worker.ledger.commits(), 1);

        let bodies = worker.bodies_to(SESSION_A);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["event"], "start_session");
        assert_eq!(bodies[0]["params"]["err"], 0);
        assert_eq!(bodies[0]["params"]["msg_id"], 14);
        assert!(bodies[0].get("session").is_none());
    }

    #[test]
    fn test_unknown_subject_is_a_plain_reply() {
        let mut worker = TestWorker::standard();
        let raw = message(SESSION_A, "start_session", json!({"subject": "bob@example.com", "auth_token": TOKEN}));
        let report = worker.send(&raw);

        assert!(report.is_success());
        assert_eq!(worker.store.session_count(), 0);
        assert_eq!(worker.bodies_to(SESSION_A)[0]["params"]["err"], 503);
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    #[test]
    fn test_main_failure_rolls_back_once_and_stops() {
        let (mut worker, after, finally) = guarded_worker();
        worker.open_session(SESSION_A);
        worker.output.take();

        let report = worker.send(&message(SESSION_A, "guarded", json!({"auth_token": "0bad"})));

        let Outcome::Handled { main: Some(err), finally: None, .. } = report.outcome else {
            panic!("expected a main failure, got {:?}", report.outcome);
        };
        assert_eq!(err.code, 523);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(worker.ledger.rollbacks(), 1);
        assert_eq!(worker.store.counters().rollbacks(), 1);
        // 523 is logged only.
        assert!(worker.output.sent().is_empty());
        assert_eq!(finally.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finally_runs_after_success_too() {
        let (mut worker, after, finally) = guarded_worker();
        worker.open_session(SESSION_A);

        let report = worker.send(&message(SESSION_A, "guarded", json!({"auth_token": TOKEN})));

        assert!(report.is_success());
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(finally.load(Ordering::SeqCst), 1);
        assert_eq!(worker.ledger.commits(), 2);
    }

    #[test]
    fn test_duplicate_session_is_an_error_event() {
        let mut worker = TestWorker::standard();
        worker.open_session(SESSION_A);
        worker.output.take();

        let report = worker.open_session(SESSION_A);

        let Outcome::Handled { main: Some(err), .. } = report.outcome else {
            panic!("expected a main failure");
        };
        assert_eq!(err.code, 504);
        assert_eq!(worker.store.session_count(), 1);

        let bodies = worker.bodies_to(SESSION_A);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["event"], "error");
        assert_eq!(bodies[0]["params"]["err"], 504);
        assert_eq!(bodies[0]["params"]["werr"], 0);
        assert_eq!(bodies[0]["params"]["input_event"], "start_session");
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    #[test]
    fn test_missing_token_notifies_session() {
        let mut worker = TestWorker::standard();
        let report = worker.send(&message(SESSION_A, "dop_client_ready", json!({})));

        assert!(matches!(report.outcome, Outcome::Rejected(ref e) if e.code == 825));
        let bodies = worker.bodies_to(SESSION_A);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["params"]["werr"], 825);
        assert_eq!(bodies[0]["params"]["err"], 0);
        assert_eq!(worker.ledger.begins(), 0);
    }

    #[test]
    fn test_silent_rejections() {
        let mut worker = TestWorker::standard();
        for raw in [
            "{{not json",
            r#"{"session":"zz","task":"1","event":"dop_client_ready"}"#,
            r#"{"session":"aa01","task":"1"}"#,
            r#"{"session":"aa01","task":"1","event":"dop_client_ready"}"#,
            r#"{"session":"aa01","task":"1","event":"dop_client_ready","params":{"auth_token":"xyz"}}"#,
        ] {
            let report = worker.send(raw);
            assert!(matches!(report.outcome, Outcome::Rejected(ref e) if !e.notifiable), "{raw}");
        }
        assert!(worker.output.sent().is_empty());
    }

    #[test]
    fn test_single_quoted_message_is_accepted() {
        let mut worker = TestWorker::standard();
        let raw = "{'session':'aa01','task':'1','event':'start_session','params':{'subject':'alice@example.com','auth_token':'beef'}}";
        assert!(worker.send(raw).is_success());
        assert_eq!(worker.store.session_count(), 1);
    }
}
