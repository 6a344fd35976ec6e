//! mva-solver: Mean Value Analysis of closed and mixed product-form networks.
//!
//! Provides:
//! - `Mva`, the fixed-point engine (steps, queue-length sums, result accessors)
//! - the closed solvers: exact MVA, Bard-Schweitzer, Linearizer, Fast Linearizer
//!   and their one-step variants, all behind the `Solver` trait
//! - `OpenModel` and `Mva::solve_mixed` for open and mixed networks
//! - `MvaConfig`, `SolveStatus` and the floating-point fault monitor
//!
//! # Example
//!
//! ```
//! use mva_pop::Population;
//! use mva_solver::{MvaConfig, Network, SolverKind};
//! use mva_station::{Station, StationKind};
//!
//! let mut terminals = Station::new(StationKind::Infinite, 1, 1);
//! terminals.set_service(0, 0, 1, 4.0).unwrap();
//! terminals.set_visits(0, 0, 1, 1.0).unwrap();
//! let mut disk = Station::new(StationKind::Fcfs, 1, 1);
//! disk.set_service(0, 0, 1, 1.0).unwrap();
//! disk.set_visits(0, 0, 1, 1.0).unwrap();
//!
//! let network = Network::new(vec![terminals, disk], Population::from(vec![1]));
//! let mut solver = SolverKind::Exact.build(network, MvaConfig::default()).unwrap();
//! let status = solver.solve().unwrap();
//!
//! assert!(status.converged);
//! assert!((solver.mva().throughput(0) - 0.2).abs() < 1e-12);
//! ```

pub mod config;
pub mod error;
mod estimate;
pub mod exact;
pub mod fpe;
pub mod linearizer;
mod marginal;
pub mod mva;
pub mod network;
pub mod open;
pub mod schweitzer;
pub mod solver;
pub mod status;
mod table;
mod view;

// Re-exports for ergonomics
pub use config::{FpPolicy, MvaConfig, Phase2Correction};
pub use error::{SolverError, SolverResult};
pub use exact::ExactMva;
pub use fpe::FpMonitor;
pub use linearizer::{FastLinearizer, Linearizer, OneStepLinearizer};
pub use mva::Mva;
pub use network::Network;
pub use open::OpenModel;
pub use schweitzer::{OneStepSchweitzer, Schweitzer};
pub use solver::{Solver, SolverKind};
pub use status::SolveStatus;
