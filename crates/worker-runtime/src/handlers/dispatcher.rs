//! # Dispatcher
//!
//! Runs one inbound message through its pipeline.
//!
//! ```text
//! raw ──→ validate ──✗──→ error event (if notifiable) ──────────────┐
//!            │                                                      │
//!            ▼                                                      │
//!        table.get(label) ──✗── (824, logged) ──────────────────────┤
//!            │                                                      │
//!            ▼                                                      │
//!   ┌─ main ──────────────────────────────────────┐                 │
//!   │ empty stacks, begin db, begin blk           │                 │
//!   │ p1 → p2 → ... (first error stops the list)  │                 │
//!   │ ok: commit db, commit blk                   │                 │
//!   │ err: rollback db, rollback blk, error event │                 │
//!   └─────────────────────────────────────────────┘                 │
//!            │                                                      │
//!            ▼                                                      │
//!   ┌─ finally ─────────────────┐                                   │
//!   │ f1 → f2 → ... (always)    │                                   │
//!   │ err: drop events,         │                                   │
//!   │      error event          │                                   │
//!   └───────────────────────────┘                                   │
//!            │                                                      │
//!            ▼                                                      │
//!        notify: pop every key, write_to_endpoint(json, key) ◄──────┘
//! ```
//!
//! A processor that panics is treated like one that returned 818.

use super::validation::{self, Rejection};
use crate::adapters::ports::ResourceManager;
use crate::container::ProcessorEnv;
use crate::logger::WorkerLog;
use crate::wiring::pipeline_table::{PipelineEntry, PipelineTable};
use serde_json::{json, Map, Value};
use shared_bus::OutputProvider;
use shared_types::codes::{self, log as log_codes};
use shared_types::{DopError, DopResult, Event, EventHeader, ERROR_EVENT};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// How a message ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Refused by validation.
    Rejected(DopError),
    /// Valid, but no pipeline is bound to the label. The error is the
    /// logged-only 824.
    Unrouted {
        /// Label of the inbound event.
        label: String,
        /// Why nothing ran.
        error: DopError,
    },
    /// Both pipelines ran. Either may have failed.
    Handled {
        /// Label of the inbound event.
        label: String,
        /// Error that stopped `main`.
        main: Option<DopError>,
        /// Error that stopped `finally`.
        finally: Option<DopError>,
    },
}

/// Result of one [`Dispatcher::handle_message`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// How the message ended.
    pub outcome: Outcome,
    /// Events written to the output transport.
    pub sent: usize,
}

impl DispatchReport {
    /// Whether every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Handled {
                main: None,
                finally: None,
                ..
            }
        )
    }
}

/// Build the `error` event sent back for `err`.
///
/// `werr` selects the payload slot: `werr` for worker-side failures
/// (validation), `err` for pipeline failures. `perr` carries the cause
/// code. Entries of `params` are merged last.
#[must_use]
pub fn eventify_err(header: &EventHeader, err: &DopError, params: Map<String, Value>, werr: bool) -> Event {
    let mut payload = Map::new();
    payload.insert("werr".into(), json!(if werr { err.code } else { 0 }));
    payload.insert("err".into(), json!(if werr { 0 } else { err.code }));
    payload.insert("perr".into(), json!(err.cause_code()));
    payload.insert("msg".into(), json!(err.msg));
    payload.extend(params);
    Event::new(
        EventHeader::new(header.session.clone(), header.task.clone(), ERROR_EVENT),
        payload,
    )
}

fn input_event(label: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("input_event".into(), json!(label));
    params
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "processor panicked".to_string())
}

/// Run `f`, turning a panic into 818.
fn guarded<F>(f: F) -> DopResult<()>
where
    F: FnOnce() -> DopResult<()>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(DopError::from(codes::ERR_REQ_PROCESSING)
            .caused_by(DopError::new(0, panic_message(payload.as_ref()))))
    })
}

fn processing_error(cause: DopError) -> DopError {
    DopError::from(codes::ERR_REQ_PROCESSING).caused_by(cause)
}

/// Single-threaded event dispatcher. Owns the processor environment.
pub struct Dispatcher {
    output: Arc<dyn OutputProvider>,
    table: Arc<PipelineTable>,
    env: ProcessorEnv,
    log: WorkerLog,
}

impl Dispatcher {
    /// Dispatcher writing to `output`. The logger is taken from the
    /// environment's providers when set.
    #[must_use]
    pub fn new(output: Arc<dyn OutputProvider>, table: Arc<PipelineTable>, env: ProcessorEnv) -> Self {
        let log = env.providers.logger().cloned().unwrap_or_default();
        Self {
            output,
            table,
            env,
            log,
        }
    }

    /// Processor environment.
    #[must_use]
    pub fn env(&self) -> &ProcessorEnv {
        &self.env
    }

    /// Processor environment, mutably.
    pub fn env_mut(&mut self) -> &mut ProcessorEnv {
        &mut self.env
    }

    /// Pipeline table.
    #[must_use]
    pub fn table(&self) -> &PipelineTable {
        &self.table
    }

    /// Handle one raw inbound message end to end.
    pub fn handle_message(&mut self, raw: &str) -> DispatchReport {
        let event = match validation::validate(raw) {
            Ok(event) => event,
            Err(rejection) => return self.reject(raw, rejection),
        };
        self.log.debug(log_codes::NEW_EVENT, &event.to_value());

        let table = Arc::clone(&self.table);
        let Some(entry) = table.get(event.label()) else {
            let err = DopError::from(codes::ERR_UNRECOGNIZED_EVENT).silent();
            self.log.debug(err.log_code(), &json!({"event": event.label()}));
            let sent = self.notify();
            return DispatchReport {
                outcome: Outcome::Unrouted {
                    label: event.label().to_string(),
                    error: err,
                },
                sent,
            };
        };

        let main = self.execute_main(entry, &event).err();
        if let Some(err) = &main {
            self.env.stacks.empty_events();
            if err.notifiable {
                let out = eventify_err(&event.header, err, input_event(event.label()), false);
                self.env.stacks.events.push(ERROR_EVENT, out);
            }
        }

        let finally = self.execute_finally(entry).err();
        if let Some(err) = &finally {
            self.env.stacks.empty_events();
            if err.notifiable {
                let out = eventify_err(&event.header, err, input_event(event.label()), false);
                self.env.stacks.events.push(&event.header.session, out);
            }
        }

        let sent = self.notify();
        DispatchReport {
            outcome: Outcome::Handled {
                label: event.header.event,
                main,
                finally,
            },
            sent,
        }
    }

    fn reject(&mut self, raw: &str, rejection: Rejection) -> DispatchReport {
        let Rejection { error: err, header } = rejection;
        self.log.debug(
            err.log_code(),
            &json!({"msg": err.msg, "notifiable": err.notifiable, "raw": raw}),
        );
        self.env.stacks.empty_events();
        if let (true, Some(header)) = (err.notifiable, header) {
            let out = eventify_err(&header, &err, input_event(&header.event), true);
            self.env.stacks.events.push(&header.session, out);
        }
        let sent = self.notify();
        DispatchReport {
            outcome: Outcome::Rejected(err),
            sent,
        }
    }

    /// Run the `main` list inside a transaction on both managers.
    ///
    /// # Errors
    ///
    /// The first processor error, or 818 wrapping a transaction failure.
    pub fn execute_main(&mut self, entry: &PipelineEntry, event: &Event) -> DopResult<()> {
        self.env.stacks.empty_events();
        self.env.stacks.empty_data();
        self.log.info(
            log_codes::LOOKUP_OK,
            &json!({"event": event.label(), "processors": entry.main.len()}),
        );

        let db = Arc::clone(self.env.db()?);
        let blk = Arc::clone(self.env.blk()?);

        db.begin_transaction().map_err(processing_error)?;
        if let Err(e) = blk.begin_transaction() {
            rollback(&*db, "db");
            return Err(processing_error(e));
        }

        for processor in &entry.main {
            let env = &mut self.env;
            match guarded(|| processor.handle_event(event, env)) {
                Ok(()) => self.log.debug(
                    log_codes::PROCESSOR_HANDLED,
                    &json!({"processor": processor.name(), "event": event.label()}),
                ),
                Err(err) => {
                    self.log.error(
                        err.code,
                        &json!({"processor": processor.name(), "msg": err.msg, "perr": err.cause_code()}),
                    );
                    rollback(&*db, "db");
                    rollback(&*blk, "blk");
                    return Err(err);
                }
            }
        }

        if let Err(e) = db.commit() {
            rollback(&*db, "db");
            rollback(&*blk, "blk");
            return Err(processing_error(e));
        }
        if let Err(e) = blk.commit() {
            error!(code = e.code, "[Dispatcher] Blockchain commit failed after database commit: {}", e.msg);
            rollback(&*blk, "blk");
            return Err(processing_error(e));
        }
        Ok(())
    }

    /// Run the `finally` list. The first error stops the list.
    ///
    /// # Errors
    ///
    /// The failing processor's error, 818 on panic.
    pub fn execute_finally(&mut self, entry: &PipelineEntry) -> DopResult<()> {
        for processor in &entry.finally {
            let stacks = &mut self.env.stacks;
            let providers = &self.env.providers;
            match guarded(|| processor.handle_pipeline_stack(stacks, providers)) {
                Ok(()) => self.log.debug(
                    log_codes::PROCESSOR_HANDLED,
                    &json!({"processor": processor.name()}),
                ),
                Err(err) => {
                    self.log.error(
                        err.code,
                        &json!({"processor": processor.name(), "msg": err.msg, "perr": err.cause_code()}),
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Pop every key of the events stack and write each event to the
    /// endpoint named by its key. Write failures are logged only.
    pub fn notify(&mut self) -> usize {
        let mut sent = 0;
        for key in self.env.stacks.events.properties() {
            for event in self.env.stacks.events.pop(&key) {
                let text = event.to_json();
                self.log.debug(log_codes::EVENT_TO_SEND, &json!({"to": key, "event": text}));
                match self.output.write_to_endpoint(&text, &key) {
                    Ok(()) => sent += 1,
                    Err(e) => warn!(code = e.code, destination = %key, "[Dispatcher] Write failed: {}", e.msg),
                }
            }
        }
        debug!(sent, "[Dispatcher] Notify done");
        sent
    }
}

fn rollback<M: ResourceManager + ?Sized>(manager: &M, which: &str) {
    if let Err(e) = manager.rollback() {
        error!(code = e.code, "[Dispatcher] Rollback of {} failed: {}", which, e.msg);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pipelines", &self.table.labels())
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
