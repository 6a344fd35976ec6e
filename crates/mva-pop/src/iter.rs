//! Odometer iteration over the population lattice.

use crate::error::PopResult;
use crate::map::{FullMap, PopulationMap};
use crate::population::Population;

/// Enumerates every population `0 ..= max`, last class varying fastest.
///
/// The order matches increasing `FullMap` offsets, so every `N - e_k` is produced
/// before `N`. Classes whose bound is zero stay at zero.
#[derive(Clone, Debug)]
pub struct PopulationIter {
    max: Population,
    next: Option<Population>,
}

impl PopulationIter {
    pub fn new(max: &Population) -> Self {
        Self {
            max: max.clone(),
            next: Some(Population::zeros(max.classes())),
        }
    }

    /// Restart from the zero vector.
    pub fn reset(&mut self) {
        self.next = Some(Population::zeros(self.max.classes()));
    }

    fn advance(&self, current: &Population) -> Option<Population> {
        let mut n = current.clone();
        for j in (0..n.classes()).rev() {
            if n[j] < self.max[j] {
                n[j] += 1;
                return Some(n);
            }
            n[j] = 0;
        }
        None
    }
}

impl Iterator for PopulationIter {
    type Item = Population;

    fn next(&mut self) -> Option<Population> {
        let current = self.next.take()?;
        self.next = self.advance(&current);
        Some(current)
    }
}

/// Every non-zero `I <= limit` paired with its offset in the lattice of `bound`.
///
/// Vector-probability stations keep one probability per population of the full
/// lattice and walk sub-lattices of it with this iterator.
#[derive(Clone, Debug)]
pub struct BoundedIter {
    map: FullMap,
    inner: PopulationIter,
}

impl BoundedIter {
    /// `limit` must be element-wise bounded by `bound`; larger components are clipped.
    pub fn new(bound: &Population, limit: &Population) -> PopResult<Self> {
        let clipped: Vec<u32> = (0..bound.classes())
            .map(|k| limit.get(k).min(bound[k]))
            .collect();
        let mut inner = PopulationIter::new(&Population::from(clipped));
        // skip the zero vector
        inner.next();
        Ok(Self {
            map: FullMap::new(bound)?,
            inner,
        })
    }

    /// Size of the lattice of `bound`, i.e. one past the largest offset.
    pub fn max_offset(&self) -> usize {
        self.map.len()
    }

    /// Offset distance of one class `k` customer.
    pub fn stride(&self, k: usize) -> usize {
        self.map.stride(k)
    }
}

impl Iterator for BoundedIter {
    type Item = (Population, usize);

    fn next(&mut self) -> Option<(Population, usize)> {
        let n = self.inner.next()?;
        let offset = self.map.encode(&n);
        Some((n, offset))
    }
}
