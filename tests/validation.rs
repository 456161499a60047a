// tests/validation.rs
//
// Integration-style validation tests (physics and sampling sanity checks).
// Run with: cargo test
// Or only these tests: cargo test --test validation

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use plasma_grid::geometry::{Cartesian, RandomSpacing};
use plasma_grid::pusher::{explicit_boris, implicit_boris, zenitani_umeda};
use plasma_grid::topology::detect_is_uniform;
use plasma_grid::units::{Quantity, CENTIMETER, METER, PER_CUBIC_METER, TESLA};
use plasma_grid::vec3::norm;
use plasma_grid::{CartesianGrid, GridError, ParticleBatch, Pusher};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn unit_density_grid(n: usize) -> CartesianGrid {
    let mut grid = CartesianGrid::linspace(Cartesian, METER.of(0.0), METER.of(1.0), n).unwrap();
    grid.add_quantity("rho", Quantity::new(Array3::<f64>::ones((n, n, n)), PER_CUBIC_METER))
        .unwrap();
    grid
}

#[test]
fn unit_density_at_grid_centre_via_both_samplers() {
    let grid = unit_density_grid(10);
    assert!(grid.is_uniform());

    let centre = [0.5, 0.5, 0.5];
    let nn = grid.nearest_neighbor_sample_one(centre, "rho").unwrap();
    let va = grid.volume_averaged_sample_one(centre, "rho").unwrap();

    for (label, q) in [("nearest", &nn), ("volume", &va)] {
        assert_eq!(q.unit(), PER_CUBIC_METER, "{label}: unit not preserved");
        assert_eq!(q.len(), 1);
        assert!(
            approx_eq(q.values()[&[0][..]], 1.0, 1e-12),
            "{label}: expected 1.0, got {}",
            q.values()[&[0][..]]
        );
    }
}

#[test]
fn queries_in_other_length_units_are_converted() {
    let grid = unit_density_grid(10);
    let cm = grid
        .interpolate_indices(([50.0, 50.0, 50.0], CENTIMETER))
        .unwrap();
    let m = grid.interpolate_indices([0.5, 0.5, 0.5]).unwrap();
    assert_eq!(cm, m);
}

#[test]
fn explicit_boris_gyration_conserves_speed() {
    // q/m = 1, B = z_hat (1 T), 1000 steps of 1 us.
    let b = vec![[0.0, 0.0, 1.0]];
    let e = vec![[0.0; 3]];
    let (q, m, dt) = (1.0, 1.0, 1e-6);

    for v_start in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0e4, -2.0e4, 5.0e3]] {
        let mut x = vec![[0.0; 3]];
        let mut v = vec![v_start];
        for _ in 0..1000 {
            explicit_boris(&mut x, &mut v, &b, &e, q, m, dt);
        }

        let s0 = norm(v_start);
        if s0 == 0.0 {
            assert_eq!(v[0], [0.0; 3], "particle at rest must stay at rest");
            assert_eq!(x[0], [0.0; 3]);
        } else {
            let rel = (norm(v[0]) - s0).abs() / s0;
            assert!(rel < 1e-10, "relative |v| change {rel:e} for v0={v_start:?}");
            assert!(approx_eq(v[0][2], v_start[2], 1e-12 * s0), "v_parallel changed");
        }
    }
}

#[test]
fn explicit_boris_many_random_particles_conserve_speed() {
    let mut rng = StdRng::seed_from_u64(2024);
    let n = 5000;
    let mut x: Vec<[f64; 3]> = (0..n).map(|_| [rng.gen(), rng.gen(), rng.gen()]).collect();
    let mut v: Vec<[f64; 3]> = (0..n)
        .map(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
        .collect();
    let b: Vec<[f64; 3]> = (0..n)
        .map(|_| [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)])
        .collect();
    let e = vec![[0.0; 3]; n];
    let speeds: Vec<f64> = v.iter().map(|vi| norm(*vi)).collect();

    for _ in 0..200 {
        explicit_boris(&mut x, &mut v, &b, &e, 1.0, 1.0, 0.01);
    }
    for (vi, s0) in v.iter().zip(&speeds) {
        assert!((norm(*vi) - s0).abs() <= 1e-12 * s0.max(1e-300), "speed drift at |v0|={s0}");
    }
}

#[test]
fn zenitani_without_b_is_a_plain_electric_kick() {
    let mut x = vec![[0.0; 3]; 3];
    let mut v = vec![[0.0; 3], [1.0, 2.0, 3.0], [-5.0, 0.0, 0.5]];
    let v_start = v.clone();
    let e = vec![[0.0, 0.0, 1.0]; 3];
    let b = vec![[0.0; 3]; 3];
    let (q, m, dt) = (2.0, 1.0, 0.25);

    zenitani_umeda(&mut x, &mut v, &b, &e, q, m, dt);

    for i in 0..3 {
        for k in 0..3 {
            let expect = v_start[i][k] + q * e[i][k] * dt / m;
            assert!(v[i][k].is_finite(), "non-finite velocity for particle {i}");
            assert!(
                approx_eq(v[i][k], expect, 1e-12),
                "particle {i} component {k}: got {}, want {}",
                v[i][k],
                expect
            );
            assert!(approx_eq(x[i][k], expect * dt, 1e-12));
        }
    }
}

#[test]
fn pushers_agree_for_small_steps() {
    // Non-relativistic, small dt: implicit Boris and Zenitani-Umeda trace the
    // same E x B drifting orbit.
    let b = vec![[0.0, 0.0, 1.0]];
    let e = vec![[0.0, 1e-3, 0.0]];
    let dt = 1e-4;
    let mut x_imp = vec![[0.0; 3]];
    let mut v_imp = vec![[1.0, 0.0, 0.0]];
    let mut x_zu = x_imp.clone();
    let mut v_zu = v_imp.clone();

    for _ in 0..100 {
        implicit_boris(&mut x_imp, &mut v_imp, &b, &e, 1.0, 1.0, dt);
        zenitani_umeda(&mut x_zu, &mut v_zu, &b, &e, 1.0, 1.0, dt);
    }
    for k in 0..3 {
        assert!(
            approx_eq(v_imp[0][k], v_zu[0][k], 1e-6),
            "component {k}: implicit {} vs zenitani {}",
            v_imp[0][k],
            v_zu[0][k]
        );
    }
}

#[test]
fn checked_push_through_grid_sampled_fields() {
    let n = 6;
    let mut grid = CartesianGrid::linspace(Cartesian, -1.0, 1.0, n).unwrap();
    let zero = Array3::<f64>::zeros((n, n, n));
    grid.add_quantity("B_x", Quantity::new(zero.clone(), TESLA)).unwrap();
    grid.add_quantity("B_y", Quantity::new(zero, TESLA)).unwrap();
    grid.add_quantity("B_z", Quantity::new(Array3::from_elem((n, n, n), 0.5), TESLA))
        .unwrap();

    let mut batch = ParticleBatch::new(vec![[0.1, -0.2, 0.0], [0.3, 0.3, 0.3]], vec![[0.1, 0.0, 0.0]; 2])
        .unwrap();
    let comps = grid
        .volume_averaged_sample(&batch.x, &["B_x", "B_y", "B_z"])
        .unwrap();
    let b: Vec<[f64; 3]> = (0..batch.len())
        .map(|i| [0, 1, 2].map(|c| comps[c].values()[&[i][..]]))
        .collect();
    assert!(b.iter().all(|bi| approx_eq(bi[2], 0.5, 1e-12)));

    let e = vec![[0.0; 3]; batch.len()];
    for _ in 0..100 {
        batch.push_checked(Pusher::ImplicitBorisNoE, &b, &e, 1.0, 1.0, 0.01).unwrap();
    }
    assert!(batch.v.iter().all(|v| approx_eq(norm(*v), 0.1, 1e-12)));

    let err = batch
        .push_checked(Pusher::ExplicitBoris, &b[..1], &e, 1.0, 1.0, 0.01)
        .unwrap_err();
    assert!(matches!(err, GridError::ShapeMismatch { .. }));
}

#[test]
fn vertex_positions_round_trip_through_sampling() {
    // Register each coordinate as a quantity; sampling at every vertex must
    // return the vertex itself.
    let mut grid = CartesianGrid::linspace(Cartesian, [0.0, -1.0, 2.0], [1.0, 1.0, 3.0], [4, 5, 3]).unwrap();
    let [gx, gy, gz] = grid.grids();
    grid.add_quantity("x", gx).unwrap();
    grid.add_quantity("y", gy).unwrap();
    grid.add_quantity("z", gz).unwrap();

    let pts = grid.grid_points();
    let flat: Vec<[f64; 3]> = pts
        .as_standard_layout()
        .into_shape((grid.len(), 3))
        .unwrap()
        .outer_iter()
        .map(|r| [r[0], r[1], r[2]])
        .collect();

    let names = ["x", "y", "z"];
    let nn = grid.nearest_neighbor_sample(&flat, &names).unwrap();
    let va = grid.volume_averaged_sample(&flat, &names).unwrap();
    for (i, p) in flat.iter().enumerate() {
        for c in 0..3 {
            assert_eq!(nn[c].values()[&[i][..]], p[c], "nearest at vertex {p:?}");
            assert!(approx_eq(va[c].values()[&[i][..]], p[c], 1e-12), "volume at vertex {p:?}");
        }
    }
}

#[test]
fn corner_weights_sum_to_one_for_random_points() {
    let grid = unit_density_grid(7);
    let interp = grid.interpolator().unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let p = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
        let corners = interp.corner_weights(p).unwrap();
        let sum: f64 = corners.iter().map(|c| c.weight).sum();
        assert!(approx_eq(sum, 1.0, 1e-12), "weights at {p:?} sum to {sum}");
        assert!(corners.iter().all(|c| c.weight >= 0.0));
    }
}

#[test]
fn volume_average_is_continuous_along_a_line() {
    let n = 6;
    let mut grid = CartesianGrid::linspace(Cartesian, 0.0, 1.0, n).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let f = Array3::from_shape_fn((n, n, n), |_| rng.gen_range(-1.0..1.0));
    grid.add_quantity("f", Quantity::new(f, PER_CUBIC_METER)).unwrap();

    let m = 2001;
    let line: Vec<[f64; 3]> = (0..m)
        .map(|i| {
            let t = i as f64 / (m - 1) as f64;
            [t, 0.3 + 0.4 * t, 0.77]
        })
        .collect();
    let vals = grid.volume_averaged_sample_one(&line, "f").unwrap();
    let v = vals.values();
    // Cell size 0.2, samples every 5e-4: neighbouring values differ by at most
    // slope * spacing with slope <= 2 / 0.2 per unit length.
    for i in 1..m {
        let jump = (v[&[i][..]] - v[&[i - 1][..]]).abs();
        assert!(jump < 0.05, "discontinuity {jump} between samples {} and {}", i - 1, i);
    }
}

#[test]
fn linear_and_perturbed_grids_classify_correctly() {
    let grid = CartesianGrid::linspace(Cartesian, 0.0, 1.0, [5, 6, 7]).unwrap();
    let [p0, p1, p2] = grid.grids();
    let as3 = |q: &Quantity| q.values().clone().into_dimensionality::<ndarray::Ix3>().unwrap();
    assert!(detect_is_uniform(&as3(&p0), &as3(&p1), &as3(&p2), 1e-6).unwrap());

    let mut rng = StdRng::seed_from_u64(17);
    let mut bumped = as3(&p0);
    for v in bumped.iter_mut() {
        *v += rng.gen_range(-1e-3..1e-3);
    }
    assert!(!detect_is_uniform(&bumped, &as3(&p1), &as3(&p2), 1e-6).unwrap());

    let reloaded = CartesianGrid::from_coordinates(
        Cartesian,
        &Quantity::new(bumped, METER),
        &p1,
        &p2,
    )
    .unwrap();
    assert!(!reloaded.is_uniform());
    assert_eq!(reloaded.shape(), vec![5 * 6 * 7]);

    let random = CartesianGrid::from_bounds(Cartesian, 0.0, 1.0, 5, &RandomSpacing::new(1)).unwrap();
    assert!(!random.is_uniform());
}
