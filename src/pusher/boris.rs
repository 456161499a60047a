// src/pusher/boris.rs
//
// Explicit Boris push (Birdsall & Langdon):
//   - half electric kick,
//   - rotation about B,
//   - second half electric kick,
//   - drift.
//
// The rotation vector is t = -B * q dt / (2m). With E = 0 the step is an
// exact rotation, so |v| is conserved to round-off.

use crate::vec3::{add, add_scaled, cross, norm2, scale};

use super::{drift, for_each_particle, par_threshold};

/// New velocity for one particle; `h = q dt / (2m)`.
#[inline]
pub(crate) fn boris_velocity(v: [f64; 3], b: [f64; 3], e: [f64; 3], h: f64) -> [f64; 3] {
    let v_minus = add_scaled(v, e, h);

    let t = scale(b, -h);
    let s = scale(t, 2.0 / (1.0 + norm2(t)));
    let v_prime = add(v_minus, cross(v_minus, t));
    let v_plus = add(v_minus, cross(v_prime, s));

    add_scaled(v_plus, e, h)
}

pub fn explicit_boris(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    q: f64,
    m: f64,
    dt: f64,
) {
    let h = 0.5 * dt * q / m;
    for_each_particle(x, v, b, e, par_threshold(), |xi, vi, bi, ei| {
        *vi = boris_velocity(*vi, bi, ei, h);
        drift(xi, *vi, dt);
    });
}
