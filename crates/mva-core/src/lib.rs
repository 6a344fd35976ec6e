//! Shared vocabulary of the MVA crates: the scalar type, chain and station
//! ids, the factorial table used by the multi-server stations, and the
//! error every lower-level error converts into.

pub mod error;
pub mod factorial;
pub mod ids;
pub mod numeric;

pub use error::{MvaError, MvaResult};
pub use factorial::FactorialTable;
pub use ids::*;
pub use numeric::*;
