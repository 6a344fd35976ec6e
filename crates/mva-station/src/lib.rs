//! mva-station: stations and their waiting-time expressions.
//!
//! Provides:
//! - `Station`, the per-entry, per-class, per-phase service parameters
//! - `StationKind`, the closed set of scheduling disciplines and approximations
//! - the closed-class wait formulas (`Station::wait`), evaluated against a
//!   `QueueContext` supplied by the solver
//! - open and mixed-network waits plus the alpha conversion factor
//!
//! # Example
//!
//! ```
//! use mva_station::{Station, StationKind};
//!
//! let mut cpu = Station::new(StationKind::Fcfs, 1, 2).with_name("cpu");
//! cpu.set_service(0, 0, 1, 0.5).unwrap();
//! cpu.set_visits(0, 0, 1, 2.0).unwrap();
//!
//! assert_eq!(cpu.class_visits(0), 2.0);
//! assert_eq!(cpu.class_service(1), 0.0);
//! assert!(cpu.set_service(0, 1, 1, -1.0).is_err());
//! ```

pub mod context;
pub mod error;
pub mod kind;
pub mod multiserver;
pub mod open;
pub mod phased;
pub mod station;
pub mod wait;

// Re-exports for ergonomics
pub use context::{Phase2Correction, QueueContext};
pub use error::{StationError, StationResult};
pub use kind::{Marginals, StationKind};
pub use open::OpenWaits;
pub use station::{MAX_PHASES, Overtaking, PhaseVec, Station};
pub use wait::Waits;
