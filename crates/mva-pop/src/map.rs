//! Offset maps: population vector -> dense index into the result arena.
//!
//! Three layouts exist. `FullMap` addresses every point of the lattice and is used
//! by exact MVA. `PartialMap` holds only the Linearizer neighbourhood of the
//! bound (`N`, `N - e_c`, `N - e_c - e_j`). `SingleMap` holds `N` and the `K`
//! points `N - e_j` estimated by Bard-Schweitzer.

use crate::error::{PopError, PopResult};
use crate::population::Population;
use std::fmt;

pub trait PopulationMap: fmt::Debug + Send + Sync {
    /// Number of slots the arena must allocate.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot holding population `n`.
    fn offset(&self, n: &Population) -> PopResult<usize>;

    /// Slot holding population `n - e_j`.
    fn offset_e_j(&self, n: &Population, j: usize) -> PopResult<usize>;
}

fn check_class(n: &Population, j: usize) -> PopResult<()> {
    if j >= n.classes() {
        Err(PopError::NoSuchClass {
            class: j,
            classes: n.classes(),
        })
    } else if n[j] == 0 {
        Err(PopError::EmptyClass { class: j })
    } else {
        Ok(())
    }
}

/// Number of points of the lattice `0 ..= bound`, `prod (N_k + 1)`.
pub fn lattice_size(bound: &Population) -> PopResult<usize> {
    bound
        .iter()
        .try_fold(1usize, |product, n| product.checked_mul(n as usize + 1))
        .ok_or_else(|| PopError::LatticeTooLarge {
            population: bound.to_string(),
        })
}

/// Mixed-radix encoding of the full lattice `0 ..= bound`, last class fastest.
#[derive(Clone, Debug)]
pub struct FullMap {
    bound: Population,
    stride: Vec<usize>,
    len: usize,
}

impl FullMap {
    /// Fails when the lattice cannot be addressed by a `usize`.
    pub fn new(bound: &Population) -> PopResult<Self> {
        let len = lattice_size(bound)?;
        let classes = bound.classes();
        let mut stride = vec![0; classes];
        let mut product = 1usize;
        for j in (0..classes).rev() {
            stride[j] = product;
            // bounded by `len`, cannot overflow
            product *= bound[j] as usize + 1;
        }
        Ok(Self {
            bound: bound.clone(),
            stride,
            len,
        })
    }

    pub fn bound(&self) -> &Population {
        &self.bound
    }

    pub fn stride(&self, j: usize) -> usize {
        self.stride.get(j).copied().unwrap_or(0)
    }

    /// Offset without bound checking; callers guarantee `n <= bound`.
    pub(crate) fn encode(&self, n: &Population) -> usize {
        n.iter()
            .zip(&self.stride)
            .map(|(c, s)| c as usize * s)
            .sum()
    }
}

impl PopulationMap for FullMap {
    fn len(&self) -> usize {
        self.len
    }

    fn offset(&self, n: &Population) -> PopResult<usize> {
        n.check_bound(&self.bound)?;
        Ok(self.encode(n))
    }

    fn offset_e_j(&self, n: &Population, j: usize) -> PopResult<usize> {
        check_class(n, j)?;
        Ok(self.offset(n)? - self.stride[j])
    }
}

/// The Linearizer neighbourhood of a bound population.
///
/// Slots are addressed by a pair `(c, j)` of optional classes meaning
/// `bound - e_c - e_j`; the pair is unordered so `(c, j)` and `(j, c)` share a slot.
#[derive(Clone, Debug)]
pub struct PartialMap {
    bound: Population,
    stride: Vec<usize>,
    len: usize,
}

impl PartialMap {
    pub fn new(bound: &Population) -> Self {
        let classes = bound.classes();
        // 1-based block layout: class j owns slots for partners none, 1, .., j.
        let mut stride = vec![0; classes + 1];
        let mut total = 0usize;
        for j in (1..=classes).rev() {
            stride[j] = total;
            total += j + 1;
        }
        Self {
            bound: bound.clone(),
            stride,
            len: total + 1,
        }
    }

    pub fn bound(&self) -> &Population {
        &self.bound
    }

    /// Slot of `bound - e_c - e_j`. `None` means "no class removed".
    pub fn address(&self, c: Option<usize>, j: Option<usize>) -> usize {
        let c = c.map_or(0, |c| c + 1);
        let j = j.map_or(0, |j| j + 1);
        if c == 0 && j == 0 {
            self.len - 1
        } else if c < j {
            self.stride[j] + c
        } else {
            self.stride[c] + j
        }
    }

    fn not_addressable(n: &Population) -> PopError {
        PopError::NotInNeighbourhood {
            population: n.to_string(),
        }
    }
}

impl PopulationMap for PartialMap {
    fn len(&self) -> usize {
        self.len
    }

    fn offset(&self, n: &Population) -> PopResult<usize> {
        n.check_bound(&self.bound)?;
        let mut removed = Vec::with_capacity(2);
        for i in 0..n.classes() {
            let diff = self.bound[i] - n[i];
            for _ in 0..diff {
                removed.push(i);
            }
            if removed.len() > 2 {
                return Err(Self::not_addressable(n));
            }
        }
        Ok(self.address(removed.first().copied(), removed.get(1).copied()))
    }

    fn offset_e_j(&self, n: &Population, j: usize) -> PopResult<usize> {
        check_class(n, j)?;
        n.check_bound(&self.bound)?;
        let mut removed = None;
        for i in 0..n.classes() {
            match self.bound[i] - n[i] {
                0 => {}
                1 if removed.is_none() => removed = Some(i),
                _ => return Err(Self::not_addressable(n)),
            }
        }
        Ok(self.address(removed, Some(j)))
    }
}

/// Bard-Schweitzer layout: slot 0 is `N`, slot `j + 1` is the estimate of `N - e_j`.
#[derive(Clone, Debug)]
pub struct SingleMap {
    classes: usize,
}

impl SingleMap {
    pub fn new(bound: &Population) -> Self {
        Self {
            classes: bound.classes(),
        }
    }
}

impl PopulationMap for SingleMap {
    fn len(&self) -> usize {
        self.classes + 1
    }

    fn offset(&self, _n: &Population) -> PopResult<usize> {
        Ok(0)
    }

    fn offset_e_j(&self, n: &Population, j: usize) -> PopResult<usize> {
        check_class(n, j)?;
        Ok(j + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_map_strides() {
        let bound = Population::from(vec![9, 7, 4, 6]);
        let map = FullMap::new(&bound).unwrap();
        assert_eq!(map.len(), 10 * 8 * 5 * 7);
        assert_eq!(map.offset(&bound).unwrap(), map.len() - 1);
        let n = Population::from(vec![1, 0, 0, 0]);
        assert_eq!(map.offset(&n).unwrap(), 8 * 5 * 7);
        assert_eq!(map.offset_e_j(&n, 0).unwrap(), 0);
        assert!(map.offset_e_j(&n, 1).is_err());
        assert!(map.offset(&Population::from(vec![10, 0, 0, 0])).is_err());
    }

    #[test]
    fn oversized_lattice_is_an_error() {
        let bound = Population::from(vec![1000; 8]);
        assert!(matches!(
            lattice_size(&bound),
            Err(PopError::LatticeTooLarge { .. })
        ));
        assert!(matches!(
            FullMap::new(&bound),
            Err(PopError::LatticeTooLarge { .. })
        ));
        // The neighbourhood maps stay small whatever the bound.
        assert_eq!(SingleMap::new(&bound).len(), 9);
        assert_eq!(lattice_size(&Population::from(vec![2, 3])), Ok(12));
    }

    #[test]
    fn partial_map_slots_are_distinct() {
        let bound = Population::from(vec![2, 1, 3]);
        let map = PartialMap::new(&bound);
        let classes: Vec<Option<usize>> = vec![None, Some(0), Some(1), Some(2)];
        let mut seen = std::collections::HashSet::new();
        for (a, &c) in classes.iter().enumerate() {
            for &j in &classes[a..] {
                assert!(seen.insert(map.address(c, j)), "slot reused for {c:?} {j:?}");
            }
        }
        assert_eq!(seen.len(), map.len());
        assert_eq!(map.address(Some(2), Some(0)), map.address(Some(0), Some(2)));
    }

    #[test]
    fn partial_map_offsets_agree_with_addresses() {
        let bound = Population::from(vec![2, 1, 3]);
        let map = PartialMap::new(&bound);
        assert_eq!(map.offset(&bound).unwrap(), map.address(None, None));

        let n_c = bound.decremented(2).unwrap();
        assert_eq!(map.offset(&n_c).unwrap(), map.address(Some(2), None));
        assert_eq!(map.offset_e_j(&n_c, 0).unwrap(), map.address(Some(2), Some(0)));
        assert_eq!(
            map.offset(&n_c.decremented(0).unwrap()).unwrap(),
            map.address(Some(0), Some(2))
        );
        assert_eq!(
            map.offset(&bound.decremented(0).unwrap().decremented(0).unwrap())
                .unwrap(),
            map.address(Some(0), Some(0))
        );
        assert_eq!(map.offset_e_j(&bound, 1).unwrap(), map.address(None, Some(1)));

        let far = Population::from(vec![0, 1, 2]);
        assert!(matches!(
            map.offset(&far),
            Err(PopError::NotInNeighbourhood { .. })
        ));
    }

    #[test]
    fn single_map_layout() {
        let bound = Population::from(vec![3, 1]);
        let map = SingleMap::new(&bound);
        assert_eq!(map.len(), 3);
        assert_eq!(map.offset(&bound).unwrap(), 0);
        assert_eq!(map.offset_e_j(&bound, 1).unwrap(), 2);
        assert_eq!(
            map.offset_e_j(&Population::from(vec![3, 0]), 1),
            Err(PopError::EmptyClass { class: 1 })
        );
    }
}
