//! The classification-validation-reinjection pipeline.
//!
//! Every operation here is a pure, synchronous computation over
//! already-materialized inputs (folder listings, the order manifest, the
//! historical reinject list). Nothing blocks on I/O and no state outlives a
//! single processing pass, so a whole batch can be re-run at any time and
//! will reach the same conclusions.

pub mod batch;
pub mod processors;
pub mod resolver;
pub mod validator;

pub use batch::{process_batch, BatchReport, FileReport};
pub use processors::{group_by_order, process_order, GroupedRecords, OrderOutcome};
pub use resolver::resolve;
pub use validator::{validate, ValidationReport};
