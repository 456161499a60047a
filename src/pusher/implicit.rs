// src/pusher/implicit.rs
//
// Implicit (time-centred) Boris pushes.
//
// The velocity update solves the Crank-Nicolson system
//
//     v' - v = C dt (E + (v' + v)/2 x B),    C = q/m
//
// in closed form, expanded symbolically. The coefficients below are those
// rational expressions term for term; do not "simplify" them, the tests
// compare against a direct 3x3 solve.
//
// `implicit_boris_no_e` is the same rotation with E dropped (C = q dt / m).
// It ignores the electric field altogether.

use super::{drift, for_each_particle, par_threshold};

#[inline]
pub(crate) fn implicit_velocity(v: [f64; 3], b: [f64; 3], e: [f64; 3], c: f64, dt: f64) -> [f64; 3] {
    let [bx, by, bz] = b;
    let [vx, vy, vz] = v;
    let [ex, ey, ez] = e;

    let c2 = c * c;
    let c3 = c2 * c;
    let dt2 = dt * dt;
    let dt3 = dt2 * dt;

    let denom_xy = 0.0625 * bx * bx * c2 * dt2
        + 0.0625 * by * by * c2 * dt2
        + 0.0625 * bz * bz * c2 * dt2
        + 0.25;

    let new_x = (0.0625 * bx * bx * c3 * ex * dt3
        + 0.0625 * bx * bx * c2 * dt2 * vx
        + 0.0625 * bx * by * c3 * ey * dt3
        + 0.125 * bx * by * c2 * dt2 * vy
        + 0.0625 * bx * bz * c3 * ez * dt3
        + 0.125 * bx * bz * c2 * dt2 * vz
        - 0.0625 * by * by * c2 * dt2 * vx
        - 0.125 * by * c2 * ez * dt2
        - 0.25 * by * c * dt * vz
        - 0.0625 * bz * bz * c2 * dt2 * vx
        + 0.125 * bz * c2 * ey * dt2
        + 0.25 * bz * c * dt * vy
        + 0.25 * c * ex * dt
        + 0.25 * vx)
        / denom_xy;

    let new_y = (-0.0625 * bx * bx * c2 * dt2 * vy
        + 0.0625 * bx * by * c3 * ex * dt3
        + 0.125 * bx * by * c2 * dt2 * vx
        + 0.125 * bx * c2 * ez * dt2
        + 0.25 * bx * c * dt * vz
        + 0.0625 * by * by * c3 * ey * dt3
        + 0.0625 * by * by * c2 * dt2 * vy
        + 0.0625 * by * bz * c3 * ez * dt3
        + 0.125 * by * bz * c2 * dt2 * vz
        - 0.0625 * bz * bz * c2 * dt2 * vy
        - 0.125 * bz * c2 * ex * dt2
        - 0.25 * bz * c * dt * vx
        + 0.25 * c * ey * dt
        + 0.25 * vy)
        / denom_xy;

    // z comes from back-substitution, hence the different shape.
    let cdt = c * dt;
    let inner_x = -0.5 * by * cdt * vz + 0.5 * bz * cdt * vy + cdt * ex + vx;
    let num_z = -cdt
        * (0.5 * bx - 0.25 * by * bz * cdt)
        * (0.5 * bx * cdt * vz - 0.5 * bz * cdt * vx - 0.5 * bz * cdt * inner_x + cdt * ey + vy)
        + (0.25 * bz * bz * c2 * dt2 + 1.0)
            * (-0.5 * bx * cdt * vy + 0.5 * by * cdt * vx + 0.5 * by * cdt * inner_x + cdt * ez + vz);
    let denom_z = c2 * dt2 * (0.5 * bx - 0.25 * by * bz * cdt) * (0.5 * bx + 0.25 * by * bz * cdt)
        + (0.25 * by * by * c2 * dt2 + 1.0) * (0.25 * bz * bz * c2 * dt2 + 1.0);

    [new_x, new_y, num_z / denom_z]
}

/// Rotation-only implicit update; `c = q dt / m`.
#[inline]
pub(crate) fn implicit_velocity_no_e(v: [f64; 3], b: [f64; 3], c: f64) -> [f64; 3] {
    let [bi, bj, bk] = b;
    let [vi, vj, vk] = v;
    let c2 = c * c;
    let d = bi * bi * c2 + bj * bj * c2 + bk * bk * c2 + 4.0;

    let new_i = 2.0 * c * vj * (bi * bj * c + 2.0 * bk) / d
        + 2.0 * c * vk * (bi * bk * c - 2.0 * bj) / d
        + vi * (bi * bi * c2 - bj * bj * c2 - bk * bk * c2 + 4.0) / d;
    let new_j = 2.0 * c * vi * (bi * bj * c - 2.0 * bk) / d
        + 2.0 * c * vk * (2.0 * bi + bj * bk * c) / d
        + vj * (-(bi * bi) * c2 + bj * bj * c2 - bk * bk * c2 + 4.0) / d;
    let new_k = 2.0 * c * vi * (bi * bk * c + 2.0 * bj) / d
        - 2.0 * c * vj * (2.0 * bi - bj * bk * c) / d
        + vk * (-(bi * bi) * c2 - bj * bj * c2 + bk * bk * c2 + 4.0) / d;

    [new_i, new_j, new_k]
}

pub fn implicit_boris(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    q: f64,
    m: f64,
    dt: f64,
) {
    let c = q / m;
    for_each_particle(x, v, b, e, par_threshold(), |xi, vi, bi, ei| {
        *vi = implicit_velocity(*vi, bi, ei, c, dt);
        drift(xi, *vi, dt);
    });
}

/// Implicit Boris without the electric field. `e` is accepted for a uniform
/// kernel signature and never read.
pub fn implicit_boris_no_e(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    q: f64,
    m: f64,
    dt: f64,
) {
    let c = q / m * dt;
    for_each_particle(x, v, b, e, par_threshold(), |xi, vi, bi, _| {
        *vi = implicit_velocity_no_e(*vi, bi, c);
        drift(xi, *vi, dt);
    });
}
