//! Customer count vector over the closed chains.

use crate::error::{PopError, PopResult};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of customers per closed chain, indexed by class `0..K`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Population(Vec<u32>);

impl Population {
    /// The zero vector over `classes` chains.
    pub fn zeros(classes: usize) -> Self {
        Self(vec![0; classes])
    }

    pub fn classes(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, k: usize) -> u32 {
        self.0.get(k).copied().unwrap_or(0)
    }

    pub fn set(&mut self, k: usize, value: u32) -> PopResult<()> {
        let classes = self.0.len();
        let slot = self
            .0
            .get_mut(k)
            .ok_or(PopError::NoSuchClass { class: k, classes })?;
        *slot = value;
        Ok(())
    }

    /// Total number of customers `|N|`.
    pub fn sum(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// `N - e_k`: the same population with one fewer class `k` customer.
    pub fn decremented(&self, k: usize) -> PopResult<Population> {
        let mut out = self.clone();
        out.decrement(k)?;
        Ok(out)
    }

    pub fn decrement(&mut self, k: usize) -> PopResult<()> {
        let classes = self.0.len();
        match self.0.get_mut(k) {
            None => Err(PopError::NoSuchClass { class: k, classes }),
            Some(0) => Err(PopError::EmptyClass { class: k }),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }

    /// Element-wise `self <= bound`.
    pub fn is_bounded_by(&self, bound: &Population) -> bool {
        self.0.len() == bound.0.len() && self.0.iter().zip(&bound.0).all(|(n, b)| n <= b)
    }

    pub(crate) fn check_bound(&self, bound: &Population) -> PopResult<()> {
        if self.0.len() != bound.0.len() {
            return Err(PopError::ClassCount {
                expected: bound.0.len(),
                actual: self.0.len(),
            });
        }
        for (class, (&value, &b)) in self.0.iter().zip(&bound.0).enumerate() {
            if value > b {
                return Err(PopError::OutOfBounds {
                    class,
                    value,
                    bound: b,
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<u32>> for Population {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

impl Index<usize> for Population {
    type Output = u32;

    fn index(&self, k: usize) -> &u32 {
        &self.0[k]
    }
}

impl IndexMut<usize> for Population {
    fn index_mut(&mut self, k: usize) -> &mut u32 {
        &mut self.0[k]
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_empty_class_is_an_error() {
        let n = Population::from(vec![1, 0]);
        assert_eq!(n.decremented(0).unwrap(), Population::from(vec![0, 0]));
        assert_eq!(n.decremented(1), Err(PopError::EmptyClass { class: 1 }));
        assert!(matches!(
            n.decremented(2),
            Err(PopError::NoSuchClass { class: 2, .. })
        ));
    }

    #[test]
    fn display_and_sum() {
        let n = Population::from(vec![3, 0, 2]);
        assert_eq!(n.to_string(), "(3, 0, 2)");
        assert_eq!(n.sum(), 5);
        assert!(!n.is_zero());
        assert!(Population::zeros(2).is_zero());
    }

    #[test]
    fn bound_check() {
        let bound = Population::from(vec![2, 2]);
        assert!(Population::from(vec![2, 0]).is_bounded_by(&bound));
        assert!(!Population::from(vec![3, 0]).is_bounded_by(&bound));
        assert!(!Population::from(vec![1]).is_bounded_by(&bound));
    }
}
