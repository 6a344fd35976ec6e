//! Conservation laws and solver agreement on random small networks.

use mva_core::Real;
use mva_pop::Population;
use mva_solver::{MvaConfig, Network, SolverKind};
use mva_station::{Station, StationKind};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct Shape {
    kinds: Vec<StationKind>,
    /// `service[m][k]`, visits are one
    service: Vec<Vec<Real>>,
    population: Vec<u32>,
    think: Vec<Real>,
}

impl Shape {
    fn network(&self) -> Network {
        let classes = self.population.len();
        let stations = self
            .kinds
            .iter()
            .zip(&self.service)
            .map(|(&kind, service)| {
                let mut st = Station::new(kind, 1, classes);
                for (k, &s) in service.iter().enumerate() {
                    st.set_service(0, k, 1, s).unwrap();
                    st.set_visits(0, k, 1, 1.0).unwrap();
                }
                st
            })
            .collect();
        Network::new(stations, Population::from(self.population.clone()))
            .with_think_times(self.think.clone())
    }
}

fn networks() -> impl Strategy<Value = Shape> {
    (1usize..=2, 2usize..=3).prop_flat_map(|(classes, stations)| {
        (
            prop::collection::vec(
                prop_oneof![
                    Just(StationKind::Fcfs),
                    Just(StationKind::Ps),
                    Just(StationKind::Infinite),
                ],
                stations,
            ),
            prop::collection::vec(prop::collection::vec(0.1f64..5.0, classes), stations),
            prop::collection::vec(1u32..=4, classes),
            prop::collection::vec(0.0f64..10.0, classes),
        )
            .prop_map(|(kinds, service, population, think)| Shape {
                kinds,
                service,
                population,
                think,
            })
    })
}

/// FCFS needs class-independent service times to stay product form.
fn product_form(mut shape: Shape) -> Shape {
    for (kind, s) in shape.kinds.iter().zip(shape.service.iter_mut()) {
        if *kind == StationKind::Fcfs {
            let first = s[0];
            s.iter_mut().for_each(|x| *x = first);
        }
    }
    shape
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn customers_are_conserved(shape in networks()) {
        for kind in [
            SolverKind::Exact,
            SolverKind::Schweitzer,
            SolverKind::Linearizer,
            SolverKind::FastLinearizer,
        ] {
            let mut solver = kind.build(shape.network(), MvaConfig::default()).unwrap();
            solver.solve().unwrap();
            let mva = solver.mva();
            for (k, &n) in shape.population.iter().enumerate() {
                let x = mva.throughput(k);
                let queued: Real = (0..shape.kinds.len()).map(|m| mva.queue_length_class(m, k)).sum();
                // Little's law over the whole chain, think time included
                prop_assert!((queued + x * shape.think[k] - n as Real).abs() < 1e-4,
                    "{kind}: class {k} holds {queued} + {} of {n}", x * shape.think[k]);
                prop_assert!((x * (shape.think[k] + mva.response_time(k)) - n as Real).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn littles_law_holds_per_station_and_class(shape in networks()) {
        for kind in [
            SolverKind::Exact,
            SolverKind::Schweitzer,
            SolverKind::Linearizer,
            SolverKind::FastLinearizer,
        ] {
            let mut solver = kind.build(shape.network(), MvaConfig::default()).unwrap();
            solver.solve().unwrap();
            let mva = solver.mva();
            for m in 0..shape.kinds.len() {
                for k in 0..shape.population.len() {
                    let l = mva.queue_length_class(m, k);
                    let xr = mva.throughput(k) * mva.residence_time(m, k);
                    prop_assert!((l - xr).abs() <= 1e-9 * (1.0 + l),
                        "{kind}: L[{m}][{k}] = {l}, X R = {xr}");
                }
            }
        }
    }

    #[test]
    fn single_servers_are_not_overloaded(shape in networks()) {
        let mut solver = SolverKind::Exact.build(shape.network(), MvaConfig::default()).unwrap();
        solver.solve().unwrap();
        for (m, kind) in shape.kinds.iter().enumerate() {
            if *kind != StationKind::Infinite {
                let u = solver.mva().utilization(m);
                prop_assert!((0.0..=1.0 + 1e-9).contains(&u), "U[{m}] = {u}");
            }
        }
    }

    #[test]
    fn exact_throughput_grows_with_population(mut shape in networks()) {
        shape.population.truncate(1);
        shape.think.truncate(1);
        shape.service.iter_mut().for_each(|s| s.truncate(1));
        let mut last = 0.0;
        for n in 1..=5 {
            shape.population[0] = n;
            let mut solver = SolverKind::Exact.build(shape.network(), MvaConfig::default()).unwrap();
            solver.solve().unwrap();
            let x = solver.mva().throughput(0);
            prop_assert!(x >= last - 1e-12, "X({n}) = {x} < {last}");
            last = x;
        }
    }

    #[test]
    fn exact_queue_lengths_grow_with_population(mut shape in networks()) {
        shape.population.truncate(1);
        shape.think.truncate(1);
        shape.service.iter_mut().for_each(|s| s.truncate(1));
        let stations = shape.kinds.len();
        let mut last: Vec<Real> = vec![0.0; stations];
        for n in 1..=5 {
            shape.population[0] = n;
            let mut solver = SolverKind::Exact.build(shape.network(), MvaConfig::default()).unwrap();
            solver.solve().unwrap();
            for (m, prev) in last.iter_mut().enumerate() {
                let l: Real = solver.mva().queue_length_class(m, 0);
                prop_assert!(l >= *prev - 1e-12, "L[{m}]({n}) = {l} < {prev}");
                *prev = l;
            }
        }
    }

    #[test]
    fn fast_linearizer_agrees_with_linearizer(shape in networks()) {
        let mut slow = SolverKind::Linearizer.build(shape.network(), MvaConfig::default()).unwrap();
        let mut fast = SolverKind::FastLinearizer.build(shape.network(), MvaConfig::default()).unwrap();
        slow.solve().unwrap();
        fast.solve().unwrap();
        for k in 0..shape.population.len() {
            let (a, b) = (fast.mva().throughput(k), slow.mva().throughput(k));
            prop_assert!((a - b).abs() <= 1e-3 * b, "X[{k}]: fast {a}, linearizer {b}");
            for m in 0..shape.kinds.len() {
                let (a, b) = (fast.mva().queue_length_class(m, k), slow.mva().queue_length_class(m, k));
                prop_assert!((a - b).abs() <= 1e-3 * b + 1e-9, "L[{m}][{k}]: fast {a}, linearizer {b}");
            }
        }
    }

    #[test]
    fn solving_twice_gives_the_same_answer(shape in networks()) {
        for kind in [SolverKind::Exact, SolverKind::Schweitzer] {
            let mut solver = kind.build(shape.network(), MvaConfig::default()).unwrap();
            solver.solve().unwrap();
            let first: Vec<Real> = (0..shape.kinds.len()).map(|m| solver.mva().queue_length(m)).collect();
            solver.solve().unwrap();
            for (m, l) in first.iter().enumerate() {
                prop_assert!((solver.mva().queue_length(m) - l).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn approximations_stay_near_exact(shape in networks().prop_map(product_form)) {
        let mut exact = SolverKind::Exact.build(shape.network(), MvaConfig::default()).unwrap();
        exact.solve().unwrap();
        for (kind, bound) in [(SolverKind::Schweitzer, 0.35), (SolverKind::Linearizer, 0.05)] {
            let mut approx = kind.build(shape.network(), MvaConfig::default()).unwrap();
            approx.solve().unwrap();
            for k in 0..shape.population.len() {
                let (a, e) = (approx.mva().throughput(k), exact.mva().throughput(k));
                prop_assert!((a - e).abs() <= bound * e, "{kind}: X[{k}] = {a}, exact {e}");
            }
        }
    }
}
