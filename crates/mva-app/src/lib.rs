//! Shared application service layer for the MVA tools.
//!
//! Front ends load, validate and solve models through this crate, store and
//! look up reports, and solve batches of independent models in parallel.

pub mod batch;
pub mod error;
pub mod model_service;
pub mod solve_service;

pub use batch::{BatchItem, solve_batch};
pub use error::{AppError, AppResult};
pub use model_service::{ChainSummary, list_chains, load_model, validate_model};
pub use solve_service::{
    OPEN_SOLVER, SolveOptions, SolveRequest, SolveResponse, ensure_run, list_runs, load_run,
    solve_model,
};
