//! Bulk tokenize and bulk register pipelines.
//!
//! Both pipelines count one `bulk` use per call through the [`QuotaGate`](crate::quota::QuotaGate)
//! before touching the catalog. [`Classifier`] only reads; [`Registrar`] writes inside one
//! transaction that holds the user's registration lock.

mod classify;
mod register;

pub use classify::Classifier;
pub use register::{RegisterLimits, Registrar};
