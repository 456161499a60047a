// src/pusher/zenitani.rs
//
// Zenitani-Umeda relativistic push (Phys. Plasmas 25, 112110, 2018).
//
// Works on the four-velocity u = gamma v:
//   eps   = (q dt / 2m) E
//   u-    = v + eps
//   theta = (q dt / m) |B| / gamma(u-)
//   u+    = u-_par + (u- - u-_par) cos(theta) + (u- x b_hat) sin(theta)
//   v     = (u+ + eps) / gamma(u+ + eps)
//
// The rotation is exact for any theta. |B| is floored at `b_threshold`
// before dividing, so B = 0 degrades to a pure electric kick.

use crate::config::NumericsConfig;
use crate::vec3::{add, cross, dot, norm, scale, sub};

use super::relativity::gamma_from_u;
use super::{drift, for_each_particle, par_threshold};

#[inline]
pub(crate) fn zenitani_velocity(
    v: [f64; 3],
    b: [f64; 3],
    e: [f64; 3],
    c: f64,
    b_threshold: f64,
) -> [f64; 3] {
    let eps = scale(e, 0.5 * c);
    let u_minus = add(v, eps);

    let b_norm = norm(b).max(b_threshold);
    let theta = c * b_norm / gamma_from_u(u_minus);
    let b_hat = scale(b, 1.0 / b_norm);

    let u_par = scale(b_hat, dot(u_minus, b_hat));
    let u_perp = sub(u_minus, u_par);
    let (sin_t, cos_t) = theta.sin_cos();
    let u_plus = add(
        add(u_par, scale(u_perp, cos_t)),
        scale(cross(u_minus, b_hat), sin_t),
    );

    let u = add(u_plus, eps);
    scale(u, 1.0 / gamma_from_u(u))
}

/// Zenitani-Umeda with the process-wide `b_threshold`.
pub fn zenitani_umeda(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    q: f64,
    m: f64,
    dt: f64,
) {
    let threshold = NumericsConfig::global().b_threshold;
    zenitani_umeda_with_threshold(x, v, b, e, q, m, dt, threshold);
}

#[allow(clippy::too_many_arguments)]
pub fn zenitani_umeda_with_threshold(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    q: f64,
    m: f64,
    dt: f64,
    b_threshold: f64,
) {
    let c = q / m * dt;
    for_each_particle(x, v, b, e, par_threshold(), |xi, vi, bi, ei| {
        *vi = zenitani_velocity(*vi, bi, ei, c, b_threshold);
        drift(xi, *vi, dt);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_B_THRESHOLD;
    use crate::pusher::relativity::SPEED_OF_LIGHT;

    #[test]
    fn zero_b_gives_linear_electric_kick() {
        let mut x = vec![[0.0; 3]];
        let mut v = vec![[10.0, 0.0, 0.0]];
        zenitani_umeda_with_threshold(
            &mut x,
            &mut v,
            &[[0.0; 3]],
            &[[0.0, 4.0, 0.0]],
            1.0,
            2.0,
            0.5,
            DEFAULT_B_THRESHOLD,
        );
        // v += q E dt / m; non-relativistic speeds so gamma == 1.
        assert!(v[0].iter().all(|c| c.is_finite()));
        assert!((v[0][0] - 10.0).abs() < 1e-12);
        assert!((v[0][1] - 1.0).abs() < 1e-12);
        assert!((x[0][0] - 5.0).abs() < 1e-12);
        assert!((x[0][1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn slow_gyration_conserves_speed() {
        // Far below c, where gamma rounds to 1.
        let v0 = [3.0, -1.0, 0.5];
        let mut v = v0;
        for _ in 0..10_000 {
            v = zenitani_velocity(v, [0.1, 0.0, 1.0], [0.0; 3], 1e-3, DEFAULT_B_THRESHOLD);
        }
        let rel = (norm(v) - norm(v0)).abs() / norm(v0);
        assert!(rel < 1e-10, "relative speed drift {rel:e}");
    }

    #[test]
    fn strong_field_keeps_speed_below_c() {
        let mut v = [0.0; 3];
        for _ in 0..1000 {
            v = zenitani_velocity(v, [0.0, 0.0, 0.5], [1e9, 0.0, 0.0], 1e-2, DEFAULT_B_THRESHOLD);
            assert!(norm(v) < SPEED_OF_LIGHT, "|v| = {} at or above c", norm(v));
        }
    }

    #[test]
    fn parallel_velocity_passes_through() {
        let v = zenitani_velocity([0.0, 0.0, 7.0], [0.0, 0.0, 3.0], [0.0; 3], 0.2, DEFAULT_B_THRESHOLD);
        assert!((v[2] - 7.0).abs() < 1e-12);
        assert!(v[0].abs() < 1e-15 && v[1].abs() < 1e-15);
    }
}
