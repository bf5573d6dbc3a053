//! # Handlers
//!
//! Inbound message handling: [`validation`] turns raw text into an
//! [`Event`](shared_types::Event), [`dispatcher`] runs it through its
//! pipeline and hands the results to the output transport.

pub mod dispatcher;
pub mod validation;

pub use dispatcher::{eventify_err, DispatchReport, Dispatcher, Outcome};
pub use validation::{validate, Rejection};
