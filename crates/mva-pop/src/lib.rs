//! mva-pop: population lattice for the MVA solvers.
//!
//! Provides:
//! - `Population`, the per-chain customer count vector
//! - odometer iteration over the lattice `0 ..= N`
//! - offset maps that address the memoized result arena
//!   (full lattice, Linearizer neighbourhood, single point)
//!
//! # Example
//!
//! ```
//! use mva_pop::{FullMap, Population, PopulationIter, PopulationMap};
//!
//! let bound = Population::from(vec![2, 1]);
//! let map = FullMap::new(&bound).unwrap();
//! let offsets: Vec<usize> = PopulationIter::new(&bound)
//!     .map(|n| map.offset(&n).unwrap())
//!     .collect();
//!
//! assert_eq!(map.len(), 6);
//! assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
//! ```

pub mod error;
pub mod iter;
pub mod map;
pub mod population;

// Re-exports for ergonomics
pub use error::{PopError, PopResult};
pub use iter::{BoundedIter, PopulationIter};
pub use map::{FullMap, PartialMap, PopulationMap, SingleMap, lattice_size};
pub use population::Population;
