//! # tagger-sync
//!
//! Reconciliation and error accounting for the branch tagger.
//!
//! Call [`pipeline::run`] with the remote [`pipeline::Sources`] and an
//! [`ErrorLedger`]; flush and summarize the ledger when it returns.

pub mod branch;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod pipeline;
pub mod reconcile;

pub use error::{BranchError, FatalError, LedgerError, MissingOwner};
pub use ledger::{ErrorLedger, ErrorRecord, Summary};
pub use pipeline::{run, RunOptions, RunReport, Sources, TagValue, Totals};
pub use reconcile::{Decision, FailReason, Reconciler};
