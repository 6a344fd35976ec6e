//! Factorial and log-factorial values owned by whoever needs them.
//!
//! A table is sized once (typically to the number of servers of a multi-server
//! station); lookups beyond the table are computed on demand and not cached, so a
//! table can be shared immutably by the waiting-time formulas.

use crate::Real;

#[derive(Clone, Debug)]
pub struct FactorialTable {
    factorial: Vec<Real>,
    log_factorial: Vec<Real>,
}

impl FactorialTable {
    /// Precompute `0! ..= max!`.
    pub fn new(max: usize) -> Self {
        let mut factorial = Vec::with_capacity(max + 1);
        let mut log_factorial = Vec::with_capacity(max + 1);
        let mut f = 1.0;
        let mut lf = 0.0;
        factorial.push(f);
        log_factorial.push(lf);
        for i in 1..=max {
            f *= i as Real;
            lf += (i as Real).ln();
            factorial.push(f);
            log_factorial.push(lf);
        }
        Self {
            factorial,
            log_factorial,
        }
    }

    pub fn len(&self) -> usize {
        self.factorial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factorial.is_empty()
    }

    pub fn factorial(&self, n: usize) -> Real {
        match self.factorial.get(n) {
            Some(&f) => f,
            None => (1..=n).fold(1.0, |acc, i| acc * i as Real),
        }
    }

    pub fn log_factorial(&self, n: usize) -> Real {
        match self.log_factorial.get(n) {
            Some(&f) => f,
            None => (1..=n).map(|i| (i as Real).ln()).sum(),
        }
    }

    /// Binomial coefficient `n choose k`, zero when `k > n`.
    pub fn binomial(&self, n: usize, k: usize) -> Real {
        if k > n {
            return 0.0;
        }
        (self.log_factorial(n) - self.log_factorial(k) - self.log_factorial(n - k))
            .exp()
            .round()
    }
}

impl Default for FactorialTable {
    fn default() -> Self {
        Self::new(20)
    }
}
