//! Client side of the finance REST API: wire types, the backend seam and its
//! reqwest implementation.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::{Caller, FinanceBackend};
pub use client::HttpFinanceBackend;
pub use error::{FinanceError, FinanceResult};
