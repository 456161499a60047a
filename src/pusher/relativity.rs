// src/pusher/relativity.rs

use crate::vec3::norm2;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// `sqrt(1 - |v|^2 / c^2)`, the reciprocal of the usual Lorentz factor.
#[inline]
pub fn gamma_from_velocity(v: [f64; 3]) -> f64 {
    (1.0 - norm2(v) / (SPEED_OF_LIGHT * SPEED_OF_LIGHT)).sqrt()
}

/// Lorentz factor from the four-velocity: `sqrt(1 + |u|^2 / c^2)`.
#[inline]
pub fn gamma_from_u(u: [f64; 3]) -> f64 {
    (1.0 + norm2(u) / (SPEED_OF_LIGHT * SPEED_OF_LIGHT)).sqrt()
}
