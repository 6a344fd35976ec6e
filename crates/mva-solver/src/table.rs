//! Result arena indexed by population offset.

use nalgebra::DMatrix;

/// Results for one population: throughputs, and per station the E x K queue
/// lengths and utilizations plus the marginal probabilities.
#[derive(Clone, Debug)]
pub struct Slot {
    pub x: Vec<f64>,
    pub l: Vec<DMatrix<f64>>,
    pub u: Vec<DMatrix<f64>>,
    pub p: Vec<Vec<f64>>,
    pub solved: bool,
}

/// Shape of one station in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationShape {
    pub entries: usize,
    /// Length of the marginal probability vector, 0 when none is kept
    pub marginals: usize,
}

impl Slot {
    fn new(classes: usize, shapes: &[StationShape]) -> Self {
        Self {
            x: vec![0.0; classes],
            l: shapes
                .iter()
                .map(|s| DMatrix::zeros(s.entries, classes))
                .collect(),
            u: shapes
                .iter()
                .map(|s| DMatrix::zeros(s.entries, classes))
                .collect(),
            p: shapes.iter().map(|s| Self::initial_marginals(s.marginals)).collect(),
            solved: false,
        }
    }

    fn initial_marginals(len: usize) -> Vec<f64> {
        let mut p = vec![0.0; len];
        if let Some(p0) = p.first_mut() {
            *p0 = 1.0;
        }
        p
    }

    /// Total queue length of station `m`.
    pub fn queue_length(&self, m: usize) -> f64 {
        self.l[m].sum()
    }

    /// Queue length of class `k` at station `m`.
    pub fn class_queue_length(&self, m: usize, k: usize) -> f64 {
        self.l[m].column(k).sum()
    }

    pub fn utilization(&self, m: usize) -> f64 {
        self.u[m].sum()
    }

    pub fn class_utilization(&self, m: usize, k: usize) -> f64 {
        self.u[m].column(k).sum()
    }

    /// Every value held by the slot, for fault scanning.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.x
            .iter()
            .copied()
            .chain(self.l.iter().flat_map(|l| l.iter().copied()))
            .chain(self.u.iter().flat_map(|u| u.iter().copied()))
    }
}

#[derive(Clone, Debug)]
pub struct Table {
    slots: Vec<Slot>,
}

impl Table {
    pub fn new(len: usize, classes: usize, shapes: &[StationShape]) -> Self {
        Self {
            slots: (0..len).map(|_| Slot::new(classes, shapes)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, n: usize) -> &Slot {
        &self.slots[n]
    }

    pub fn slot_mut(&mut self, n: usize) -> &mut Slot {
        &mut self.slots[n]
    }

    /// Overwrite slot `n`, used to restore saved estimates.
    pub fn replace(&mut self, n: usize, slot: Slot) {
        self.slots[n] = slot;
    }

    /// Copy the marginals of every station from slot `from` to slot `to`.
    pub fn copy_marginals(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let p = self.slots[from].p.clone();
        self.slots[to].p = p;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_empty_with_p0_one() {
        let shapes = [
            StationShape {
                entries: 2,
                marginals: 0,
            },
            StationShape {
                entries: 1,
                marginals: 3,
            },
        ];
        let table = Table::new(4, 3, &shapes);
        assert_eq!(table.len(), 4);
        let slot = table.slot(2);
        assert!(!slot.solved);
        assert_eq!(slot.l[0].shape(), (2, 3));
        assert!(slot.p[0].is_empty());
        assert_eq!(slot.p[1], vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn class_sums() {
        let shapes = [StationShape {
            entries: 2,
            marginals: 0,
        }];
        let mut table = Table::new(1, 2, &shapes);
        let slot = table.slot_mut(0);
        slot.l[0][(0, 1)] = 1.5;
        slot.l[0][(1, 1)] = 0.5;
        slot.l[0][(1, 0)] = 2.0;
        assert_eq!(slot.class_queue_length(0, 1), 2.0);
        assert_eq!(slot.queue_length(0), 4.0);
    }
}
