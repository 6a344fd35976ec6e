//! Small closed networks with known queue lengths.

use mva_core::Real;
use mva_pop::Population;
use mva_solver::{MvaConfig, Network, Solver, SolverError, SolverKind};
use mva_station::{Station, StationKind};

const EXACT_TOL: Real = 1e-3;
const APPROX_TOL: Real = 5e-3;

/// One-entry station; `demands[k] = (service, visits)`.
fn station(kind: StationKind, copies: u32, demands: &[(Real, Real)]) -> Station {
    let mut st = Station::new(kind, 1, demands.len())
        .with_copies(copies)
        .unwrap();
    for (k, &(s, v)) in demands.iter().enumerate() {
        st.set_service(0, k, 1, s).unwrap();
        st.set_visits(0, k, 1, v).unwrap();
    }
    st
}

fn solve(kind: SolverKind, network: Network) -> Box<dyn Solver> {
    let mut solver = kind.build(network, MvaConfig::default()).unwrap();
    let status = solver.solve().unwrap();
    assert!(status.converged, "{kind} did not converge: {status}");
    solver
}

/// `[L(0,0), L(0,1), L(1,0), L(1,1)]` for two stations and two classes.
fn queues(solver: &dyn Solver) -> Vec<Real> {
    let mva = solver.mva();
    (0..2)
        .flat_map(|m| (0..2).map(move |k| (m, k)))
        .map(|(m, k)| mva.queue_length_class(m, k))
        .collect()
}

fn assert_close(actual: &[Real], expected: &[Real], tol: Real, what: &str) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < tol,
            "{what}[{i}]: got {a}, expected {e} (all: {actual:?})"
        );
    }
}

fn delay_and_fcfs() -> Network {
    Network::new(
        vec![
            station(StationKind::Infinite, 1, &[(8.0, 1.0), (0.0, 1.0)]),
            station(StationKind::Fcfs, 1, &[(1.0, 1.0), (1.0, 1.0)]),
        ],
        Population::from(vec![8, 1]),
    )
}

#[test]
fn test_delay_and_fcfs() {
    let cases = [
        (SolverKind::Exact, [5.2266, 0.0, 2.7734, 1.0], EXACT_TOL),
        (SolverKind::Linearizer, [5.2307, 0.0, 2.7693, 1.0], APPROX_TOL),
        (SolverKind::FastLinearizer, [5.2307, 0.0, 2.7693, 1.0], APPROX_TOL),
        (SolverKind::Schweitzer, [5.108, 0.0, 2.892, 1.0], APPROX_TOL),
    ];
    for (kind, expected, tol) in cases {
        let solver = solve(kind, delay_and_fcfs());
        assert_close(&queues(solver.as_ref()), &expected, tol, kind.name());
    }
}

#[test]
fn test_single_customer_is_exact_for_every_solver() {
    let demands = [(2.0, 1.0), (1.0, 3.0), (1.0, 3.0), (1.0, 3.0)];
    for kind in [
        SolverKind::Exact,
        SolverKind::Linearizer,
        SolverKind::FastLinearizer,
        SolverKind::Schweitzer,
    ] {
        let stations = demands
            .iter()
            .map(|&d| station(StationKind::Fcfs, 1, &[d]))
            .collect();
        let solver = solve(kind, Network::new(stations, Population::from(vec![1])));
        let mva = solver.mva();
        assert!((mva.queue_length(0) - 2.0 / 11.0).abs() < 1e-6, "{kind}");
        for m in 1..4 {
            assert!((mva.queue_length(m) - 3.0 / 11.0).abs() < 1e-6, "{kind}");
        }
        assert!((mva.throughput(0) - 1.0 / 11.0).abs() < 1e-6, "{kind}");
    }
}

fn rolia(visits: Real) -> Network {
    Network::new(
        vec![
            station(StationKind::Infinite, 1, &[(6.0, 1.0), (3.0, 1.0)]),
            station(StationKind::Rolia, 2, &[(1.0, 1.0), (1.0, visits)]),
        ],
        Population::from(vec![5, 2]),
    )
}

#[test]
fn test_rolia_multiserver() {
    let table: [(Real, [Real; 4], [Real; 4], [Real; 4]); 5] = [
        (
            1.0,
            [4.1903, 1.4579, 0.8097, 0.5421],
            [4.1985, 1.4636, 0.8015, 0.5364],
            [4.1892, 1.4565, 0.8108, 0.5435],
        ),
        (
            2.0,
            [4.0910, 1.1197, 0.9090, 0.8803],
            [4.1094, 1.1379, 0.8906, 0.8621],
            [4.0910, 1.1164, 0.9090, 0.8836],
        ),
        (
            5.0,
            [3.8869, 0.6274, 1.1131, 1.3726],
            [3.9137, 0.6696, 1.0863, 1.3304],
            [3.9010, 0.6292, 1.0990, 1.3708],
        ),
        (
            11.0,
            [3.7448, 0.3184, 1.2552, 1.6816],
            [3.7450, 0.3603, 1.2550, 1.6397],
            [3.7667, 0.3279, 1.2333, 1.6721],
        ),
        (
            20.0,
            [3.6869, 0.1798, 1.3131, 1.8202],
            [3.6583, 0.2108, 1.3417, 1.7892],
            [3.7034, 0.1899, 1.2966, 1.8101],
        ),
    ];
    for (v, exact, linearizer, schweitzer) in table {
        let what = format!("v = {v}");
        let solver = solve(SolverKind::Exact, rolia(v));
        assert_close(&queues(solver.as_ref()), &exact, EXACT_TOL, &what);
        for kind in [SolverKind::Linearizer, SolverKind::FastLinearizer] {
            let solver = solve(kind, rolia(v));
            assert_close(&queues(solver.as_ref()), &linearizer, APPROX_TOL, &what);
        }
        let solver = solve(SolverKind::Schweitzer, rolia(v));
        assert_close(&queues(solver.as_ref()), &schweitzer, APPROX_TOL, &what);
    }
}

fn priority(kind: StationKind) -> Network {
    Network::new(
        vec![
            station(StationKind::Infinite, 1, &[(2.0, 1.0), (2.0, 1.0)]),
            station(kind, 1, &[(1.0, 1.0), (1.0, 1.0)]),
        ],
        Population::from(vec![3, 3]),
    )
    .with_priorities(vec![2, 1])
}

#[test]
fn test_priority_lowers_high_priority_queue() {
    let cases = [
        (StationKind::Fcfs, [0.9879, 0.9879, 2.0121, 2.0121]),
        (StationKind::HolFcfs, [1.3237, 0.7967, 1.6763, 2.2033]),
        (StationKind::PrFcfs, [1.5789, 0.6207, 1.4211, 2.3793]),
    ];
    for (kind, expected) in cases {
        let solver = solve(SolverKind::Exact, priority(kind));
        let l = queues(solver.as_ref());
        assert_close(&l, &expected, EXACT_TOL, kind.name());
        assert!(l[2] <= l[3] + 1e-9, "{kind:?}: {l:?}");
    }

    // Preemption helps the high class more than head-of-line
    let hol = queues(solve(SolverKind::Exact, priority(StationKind::HolFcfs)).as_ref());
    let pr = queues(solve(SolverKind::Exact, priority(StationKind::PrFcfs)).as_ref());
    assert!(pr[2] < hol[2]);

    let schweitzer = queues(solve(SolverKind::Schweitzer, priority(StationKind::HolFcfs)).as_ref());
    assert_close(&schweitzer, &[1.3277, 0.8068, 1.6723, 2.1932], APPROX_TOL, "hol");
}

#[test]
fn test_accessors_are_consistent() {
    let solver = solve(SolverKind::Exact, delay_and_fcfs());
    let mva = solver.mva();
    for k in 0..2 {
        let x = mva.throughput(k);
        // Little's law on the whole chain
        let customers: Real = (0..2).map(|m| mva.queue_length_class(m, k)).sum();
        assert!((x * mva.response_time(k) - customers).abs() < 1e-9);
        assert!((customers - mva.population()[k] as Real).abs() < 1e-9);
        assert!((mva.station_class_throughput(1, k) - x).abs() < 1e-12);
    }
    assert!(mva.utilization(1) <= 1.0 + 1e-9);
    assert!((mva.utilization(1) - mva.throughput(0) - mva.throughput(1)).abs() < 1e-9);
    assert_eq!(mva.iterations(), 18);
    assert_eq!(mva.faults(), 0);
    assert!(mva.station(2).is_err());
}

#[test]
fn test_one_step_solvers_approach_the_fixed_point() {
    // The one-step Linearizer keeps refining its corrections past the two passes
    // of the full solver, so it only lands near it.
    for (one_step, full, tol) in [
        (SolverKind::OneStep, SolverKind::Schweitzer, 1e-2),
        (SolverKind::OneStepLinearizer, SolverKind::Linearizer, 5e-2),
    ] {
        let mut solver = one_step.build(delay_and_fcfs(), MvaConfig::default()).unwrap();
        for _ in 0..200 {
            solver.solve().unwrap();
        }
        let target = queues(solve(full, delay_and_fcfs()).as_ref());
        let l = queues(solver.as_ref());
        assert_close(&l, &target, tol, one_step.name());
        assert!((l[0] + l[2] - 8.0).abs() < 1e-9);
        assert!((l[1] + l[3] - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_repeated_solves_agree() {
    for kind in [SolverKind::Exact, SolverKind::Schweitzer] {
        let mut solver = kind.build(rolia(5.0), MvaConfig::default()).unwrap();
        solver.solve().unwrap();
        let first = queues(solver.as_ref());
        solver.solve().unwrap();
        assert_close(&queues(solver.as_ref()), &first, 1e-3, kind.name());
    }
}

#[test]
fn test_iteration_limit_reports_divergence() {
    let config = MvaConfig {
        max_iterations: 1,
        termination: Some(1e-15),
        ..Default::default()
    };
    let mut solver = SolverKind::Schweitzer.build(rolia(5.0), config).unwrap();
    let status = solver.solve().unwrap();
    assert!(!status.converged);
    assert!(status.faults >= 1);
    assert!(solver.mva().queue_length(1).is_finite());
}

#[test]
fn exact_lattice_too_large_is_a_setup_error() {
    let classes = 8;
    let demands = vec![(1.0, 1.0); classes];
    let network = || {
        Network::new(
            vec![
                station(StationKind::Infinite, 1, &demands),
                station(StationKind::Fcfs, 1, &demands),
            ],
            Population::from(vec![1000; classes]),
        )
    };

    let err = SolverKind::Exact
        .build(network(), MvaConfig::default())
        .unwrap_err();
    assert!(matches!(err, SolverError::ProblemSetup { .. }), "{err}");

    // The approximate solvers only keep a neighbourhood of N.
    assert!(SolverKind::Schweitzer.build(network(), MvaConfig::default()).is_ok());
    assert!(SolverKind::Linearizer.build(network(), MvaConfig::default()).is_ok());

    let mut bruell = network();
    bruell.stations[1] = station(StationKind::Bruell, 2, &demands);
    assert!(matches!(
        SolverKind::Schweitzer.build(bruell, MvaConfig::default()),
        Err(SolverError::ProblemSetup { .. })
    ));
}

fn one_customer() -> Box<dyn Solver> {
    let network = Network::new(
        vec![
            station(StationKind::Infinite, 1, &[(4.0, 1.0)]),
            station(StationKind::Fcfs, 1, &[(1.0, 1.0)]),
        ],
        Population::from(vec![1]),
    );
    solve(SolverKind::Exact, network)
}

#[test]
fn station_lookup_is_checked() {
    let solver = one_customer();
    let mva = solver.mva();
    assert!(mva.station(1).is_ok());
    assert!(matches!(
        mva.station(2),
        Err(SolverError::OutOfRange { index: 2, limit: 2, .. })
    ));
    assert!(mva.queue_length_at(0, &Population::from(vec![3])).is_err());
}

#[test]
#[should_panic]
fn chain_index_out_of_range_panics() {
    let solver = one_customer();
    let _ = solver.mva().throughput(1);
}
