//! Session cache reconciliation for Mango.
//!
//! Every stored session carries a cached profile and guild list. This crate
//! keeps those caches fresh in bulk, one upstream round trip per *identity*
//! rather than per session, without ever letting a failure for one user
//! affect another.
//!
//! # Key types
//!
//! - [`Reconciler`]: performs one reconciliation run on demand
//! - [`ReconcileTask`]: owned background task running the reconciler on a
//!   fixed interval, with trigger and stop
//! - [`ReconcileConfig`]: interval, concurrency bound, missed-tick policy
//! - [`ReconcileReport`]: counters describing what one run did
//!
//! # Integration
//!
//! ```ignore
//! let reconciler = Arc::new(Reconciler::new(store, client));
//! let task = ReconcileTask::start(reconciler, ReconcileConfig::default());
//! // ... serve requests ...
//! task.stop().await;
//! ```

mod config;
mod reconciler;
mod report;
mod task;

pub use config::{MissedTick, ReconcileConfig};
pub use reconciler::Reconciler;
pub use report::ReconcileReport;
pub use task::ReconcileTask;
