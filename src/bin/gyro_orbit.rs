// src/bin/gyro_orbit.rs
//
// Gyro-orbit benchmark: particles in a uniform B along +z sampled from a
// Cartesian grid, advanced with every pusher. Reports the relative drift of
// |v| and the orbit radius against r_L = |v_perp| m / (|q| B).
//
// Run:
//   RUST_LOG=info cargo run --bin gyro_orbit
//   RUST_LOG=info cargo run --bin gyro_orbit -- zenitani_umeda 5000
//
// Args (optional): pusher name, number of steps.

use std::str::FromStr;

use log::{info, warn};

use plasma_grid::config::NumericsConfig;
use plasma_grid::geometry::Cartesian;
use plasma_grid::units::{Quantity, METER, TESLA, VOLT_PER_METER};
use plasma_grid::vec3::norm;
use plasma_grid::{CartesianGrid, GridResult, ParticleBatch, Pusher};

use ndarray::Array3;

fn main() -> GridResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let pushers = match args.first() {
        Some(name) => vec![Pusher::from_str(name)?],
        None => Pusher::ALL.to_vec(),
    };
    let n_steps: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(7000);

    // --- benchmark parameters ---
    let b0 = 1.0_f64; // Tesla
    let q = 1.0_f64;
    let m = 1.0_f64;
    let dt = 1e-3_f64; // s; omega_c dt = 1e-3, ~6283 steps per orbit
    let n_particles = 8;
    // ----------------------------

    info!(
        "numerics: {}",
        NumericsConfig::global()
            .to_json_pretty()
            .unwrap_or_else(|e| format!("<unserialisable: {e}>"))
    );

    let n = 11;
    let mut grid = CartesianGrid::linspace(Cartesian, METER.of(-1.0), METER.of(1.0), n)?;
    let zero = Array3::<f64>::zeros((n, n, n));
    grid.add_quantity("B_x", Quantity::new(zero.clone(), TESLA))?;
    grid.add_quantity("B_y", Quantity::new(zero.clone(), TESLA))?;
    grid.add_quantity("B_z", Quantity::new(Array3::from_elem((n, n, n), b0), TESLA))?;
    grid.add_quantity("E_x", Quantity::new(zero.clone(), VOLT_PER_METER))?;
    grid.add_quantity("E_y", Quantity::new(zero.clone(), VOLT_PER_METER))?;
    grid.add_quantity("E_z", Quantity::new(zero, VOLT_PER_METER))?;

    let x0: Vec<[f64; 3]> = (0..n_particles)
        .map(|i| [0.0, 0.0, -0.5 + i as f64 / n_particles as f64])
        .collect();
    let v0: Vec<[f64; 3]> = (0..n_particles)
        .map(|i| [1e-2 * (1.0 + i as f64), 0.0, 1e-3])
        .collect();

    for pusher in pushers {
        let mut batch = ParticleBatch::new(x0.clone(), v0.clone())?;
        let mut max_drift = 0.0_f64;
        // Extent of particle 0 in the x-y plane.
        let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
        let mut steps_done = 0usize;

        for _ in 0..n_steps {
            let b = sample_vector(&grid, &batch.x, ["B_x", "B_y", "B_z"])?;
            let e = sample_vector(&grid, &batch.x, ["E_x", "E_y", "E_z"])?;
            if b.iter().any(|bi| bi.iter().any(|c| c.is_nan())) {
                warn!("{pusher}: particles left the grid after {steps_done} steps");
                break;
            }
            batch.push_checked(pusher, &b, &e, q, m, dt)?;
            steps_done += 1;

            for (v, v_start) in batch.v.iter().zip(&v0) {
                let rel = (norm(*v) - norm(*v_start)).abs() / norm(*v_start);
                max_drift = max_drift.max(rel);
            }
            for k in 0..2 {
                lo[k] = lo[k].min(batch.x[0][k]);
                hi[k] = hi[k].max(batch.x[0][k]);
            }
        }

        let r_expected = v0[0][0] * m / (q.abs() * b0);
        let r_seen = 0.5 * (hi[0] - lo[0]).max(hi[1] - lo[1]);
        info!(
            "{:<20} steps={} max |dv|/|v|={:.3e} orbit radius={:.4e} m (r_L={:.4e} m)",
            pusher.name(),
            steps_done,
            max_drift,
            r_seen,
            r_expected
        );
    }

    Ok(())
}

/// Volume-averaged vector field at each particle position.
fn sample_vector(
    grid: &CartesianGrid,
    positions: &[[f64; 3]],
    names: [&str; 3],
) -> GridResult<Vec<[f64; 3]>> {
    let comps = grid.volume_averaged_sample(positions, &names)?;
    let (cx, cy, cz) = (comps[0].values(), comps[1].values(), comps[2].values());
    Ok((0..positions.len())
        .map(|i| [cx[&[i][..]], cy[&[i][..]], cz[&[i][..]]])
        .collect())
}
