//! Complex-arithmetic paths: AC analysis of a small two-port, vector
//! layouts, the transposed solve, and equivalence with the real path.

use num_complex::Complex64;
use sim_sparse::{Config, Matrix};

const TWO_PI: f64 = std::f64::consts::TAU;

/// Doubly terminated attenuator with shunt capacitors: 50 Ω terminations
/// (with 1 µF to ground) at both nodes, 200 Ω between them, driven by the
/// Norton equivalent of 0.5 V behind the source termination.
fn stamp_attenuator(m: &mut Matrix, omega: f64) {
    let y_term = Complex64::new(1.0 / 50.0, omega * 1e-6);
    let y_series = 1.0 / 200.0;

    let q10 = m.get_admittance(1, 0).unwrap();
    m.add_quad_complex(&q10, y_term);
    let q12 = m.get_admittance(1, 2).unwrap();
    m.add_quad_real(&q12, y_series);
    let q20 = m.get_admittance(2, 0).unwrap();
    m.add_quad_complex(&q20, y_term);
}

/// |v2| at dc: 0.5 V through the 50/200/50 divider.
const DC_MAG: f64 = 0.5 * 50.0 / (50.0 + 200.0 + 50.0);

#[test]
fn attenuator_dc_gain_separated_vectors() {
    let cfg = Config {
        separated_complex_vectors: true,
        ..Config::default()
    };
    let mut m = Matrix::new(2, cfg).unwrap();
    stamp_attenuator(&mut m, 0.0);

    let b = [0.0, 0.5 / 50.0, 0.0];
    let ib = [0.0, 0.0, 0.0];
    m.order_and_factor(None, 0.001, 0.0, true).unwrap();
    let (re, im) = m.solve_complex(&b, &ib).unwrap();

    let mag = (re[2] * re[2] + im[2] * im[2]).sqrt();
    assert!((mag - DC_MAG).abs() < 1e-12, "|v2| = {}", mag);
}

#[test]
fn attenuator_rolls_off_interleaved_vectors() {
    let solve_at = |omega: f64| -> f64 {
        let mut m = Matrix::new(2, Config::default()).unwrap();
        stamp_attenuator(&mut m, omega);

        let mut b = vec![0.0; 6];
        b[2] = 0.5 / 50.0;
        m.order_and_factor(None, 0.001, 0.0, true).unwrap();
        let (x, ix) = m.solve_complex(&b, &[]).unwrap();
        assert!(ix.is_empty());
        (x[4] * x[4] + x[5] * x[5]).sqrt()
    };

    let dc = solve_at(0.0);
    let khz = solve_at(TWO_PI * 1000.0);

    assert!((dc - DC_MAG).abs() < 1e-12, "dc |v2| = {}", dc);
    assert!(khz < dc, "low-pass response expected: {} vs {}", khz, dc);
}

#[test]
fn complex_with_zero_imag_matches_real_solve() {
    let entries = [
        (1, 1, 4.0),
        (1, 2, -2.0),
        (2, 1, 2.0),
        (2, 2, 3.0),
        (2, 3, -1.0),
        (3, 2, 1.0),
        (3, 3, 5.0),
    ];
    let b = [0.0, 1.0, 2.0, 3.0];

    let mut real = Matrix::new(3, Config::real_only()).unwrap();
    for &(r, c, v) in &entries {
        let id = real.get_element(r, c).unwrap();
        real.add_real(id, v);
    }
    real.order_and_factor(None, 0.001, 0.0, true).unwrap();
    let x_real = real.solve(&b).unwrap();

    let cfg = Config {
        separated_complex_vectors: true,
        ..Config::default()
    };
    let mut cplx = Matrix::new(3, cfg).unwrap();
    for &(r, c, v) in &entries {
        let id = cplx.get_element(r, c).unwrap();
        cplx.add_real(id, v);
    }
    cplx.order_and_factor(None, 0.001, 0.0, true).unwrap();
    let ib = [0.0; 4];
    let (re, im) = cplx.solve_complex(&b, &ib).unwrap();

    for i in 1..=3 {
        assert!(
            (re[i] - x_real[i]).abs() < 1e-12,
            "real part differs at {}: {} vs {}",
            i,
            re[i],
            x_real[i]
        );
        assert!(im[i].abs() < 1e-14, "imaginary residue at {}: {}", i, im[i]);
    }
}

#[test]
fn transposed_solve_agrees_on_symmetric_matrix() {
    let cfg = Config {
        separated_complex_vectors: true,
        ..Config::default()
    };
    let mut m = Matrix::new(2, cfg).unwrap();
    stamp_attenuator(&mut m, TWO_PI * 1000.0);
    m.order_and_factor(None, 0.001, 0.0, true).unwrap();

    let b = [0.0, 0.01, 0.0];
    let ib = [0.0, 0.0, 0.005];
    let (re, im) = m.solve_complex(&b, &ib).unwrap();
    let (re_t, im_t) = m.solve_complex_transposed(&b, &ib).unwrap();

    // The admittance matrix is symmetric, so A and Aᵀ solves coincide.
    for i in 1..=2 {
        assert!((re[i] - re_t[i]).abs() < 1e-12);
        assert!((im[i] - im_t[i]).abs() < 1e-12);
    }
}

#[test]
fn residual_with_out_of_order_node_numbering() {
    // Touch node 2 before node 1 so the first-seen translation maps
    // ext 2 -> int 1 and ext 1 -> int 2. The residual comparison must stay
    // in external index space on both sides of the difference.
    let cfg = Config {
        separated_complex_vectors: true,
        initialize: true,
        ..Config::default()
    };
    let mut m = Matrix::new(2, cfg).unwrap();

    let omega = TWO_PI * 1000.0;
    let y_term = Complex64::new(1.0 / 50.0, omega * 1e-6);
    let q20 = m.get_admittance(2, 0).unwrap();
    m.add_quad_complex(&q20, y_term);
    let q21 = m.get_admittance(2, 1).unwrap();
    m.add_quad_real(&q21, 1.0 / 200.0);
    let q10 = m.get_admittance(1, 0).unwrap();
    m.add_quad_complex(&q10, y_term);

    for node1 in [1, 2] {
        for node2 in [1, 2] {
            let id = m.get_element(node1, node2).unwrap();
            let v = m.value(id);
            m.set_init_info(id, v.re, v.im);
        }
    }

    let b = [0.0, 0.01, 0.0];
    let ib = [0.0, 0.0, 0.0];
    m.order_and_factor(None, 0.001, 0.0, true).unwrap();
    let (re, im) = m.solve_complex(&b, &ib).unwrap();

    let (res, max_b) = m
        .calculate_normalized_residual(&b, &re, Some(&ib), Some(&im))
        .unwrap();
    assert!((max_b - 0.01).abs() < 1e-15);
    assert!(res < 1e-12, "normalized residual = {:e}", res);
}

#[test]
fn residual_verification_round_trip() {
    let cfg = Config {
        separated_complex_vectors: true,
        initialize: true,
        ..Config::default()
    };
    let mut m = Matrix::new(2, cfg).unwrap();
    stamp_attenuator(&mut m, TWO_PI * 1000.0);

    // Record baselines so the residual check can rebuild A after factoring.
    for node1 in [1, 2] {
        for node2 in [1, 2] {
            let id = m.get_element(node1, node2).unwrap();
            let v = m.value(id);
            m.set_init_info(id, v.re, v.im);
        }
    }

    let b = [0.0, 0.01, 0.0];
    let ib = [0.0, 0.0, 0.0];
    m.order_and_factor(None, 0.001, 0.0, true).unwrap();
    let (re, im) = m.solve_complex(&b, &ib).unwrap();

    let (res, max_b) = m
        .calculate_normalized_residual(&b, &re, Some(&ib), Some(&im))
        .unwrap();
    assert!((max_b - 0.01).abs() < 1e-15);
    assert!(res < 1e-12, "normalized residual = {:e}", res);
}
