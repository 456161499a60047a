// src/pusher/mod.rs
//
// Charged-particle pushers.
//
// Every kernel advances a batch of independent particles by one step:
//   1) update v from the local B and E samples,
//   2) x += v * dt.
// Positions, velocities and field samples are parallel `[f64; 3]` slices of
// equal length, all SI. Kernels do not validate their inputs; go through
// `ParticleBatch::push_checked` for that.
//
// Available kernels:
//  - explicit Boris                (boris.rs)
//  - implicit Boris, with and without E  (implicit.rs)
//  - Zenitani-Umeda, relativistic  (zenitani.rs)

pub mod boris;
pub mod implicit;
pub mod relativity;
pub mod zenitani;

use std::fmt;
use std::str::FromStr;

use log::trace;
use rayon::prelude::*;

use crate::config::NumericsConfig;
use crate::error::{GridError, GridResult};

pub use boris::explicit_boris;
pub use implicit::{implicit_boris, implicit_boris_no_e};
pub use zenitani::{zenitani_umeda, zenitani_umeda_with_threshold};

/// Run `f(x_i, v_i, b_i, e_i)` for every particle; through rayon once the
/// batch reaches `par_threshold`.
pub(crate) fn for_each_particle<F>(
    x: &mut [[f64; 3]],
    v: &mut [[f64; 3]],
    b: &[[f64; 3]],
    e: &[[f64; 3]],
    par_threshold: usize,
    f: F,
) where
    F: Fn(&mut [f64; 3], &mut [f64; 3], [f64; 3], [f64; 3]) + Sync + Send,
{
    debug_assert_eq!(x.len(), v.len());
    debug_assert_eq!(x.len(), b.len());
    debug_assert_eq!(x.len(), e.len());

    if x.len() >= par_threshold {
        x.par_iter_mut()
            .zip(v.par_iter_mut())
            .zip(b.par_iter().zip(e.par_iter()))
            .for_each(|((xi, vi), (bi, ei))| f(xi, vi, *bi, *ei));
    } else {
        for ((xi, vi), (bi, ei)) in x.iter_mut().zip(v.iter_mut()).zip(b.iter().zip(e.iter())) {
            f(xi, vi, *bi, *ei);
        }
    }
}

/// x += v * dt
#[inline]
pub(crate) fn drift(x: &mut [f64; 3], v: [f64; 3], dt: f64) {
    x[0] += v[0] * dt;
    x[1] += v[1] * dt;
    x[2] += v[2] * dt;
}

// -------------------------
// Kernel selection
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pusher {
    ExplicitBoris,
    ImplicitBoris,
    /// Ignores the electric field entirely.
    ImplicitBorisNoE,
    ZenitaniUmeda,
}

impl Pusher {
    pub const ALL: [Pusher; 4] = [
        Pusher::ExplicitBoris,
        Pusher::ImplicitBoris,
        Pusher::ImplicitBorisNoE,
        Pusher::ZenitaniUmeda,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pusher::ExplicitBoris => "explicit_boris",
            Pusher::ImplicitBoris => "implicit_boris",
            Pusher::ImplicitBorisNoE => "implicit_boris_no_e",
            Pusher::ZenitaniUmeda => "zenitani_umeda",
        }
    }

    pub fn handles_electric_field(&self) -> bool {
        !matches!(self, Pusher::ImplicitBorisNoE)
    }

    /// Raw dispatch to the kernel, no validation.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &self,
        x: &mut [[f64; 3]],
        v: &mut [[f64; 3]],
        b: &[[f64; 3]],
        e: &[[f64; 3]],
        q: f64,
        m: f64,
        dt: f64,
    ) {
        trace!("{}: {} particles, dt={:e}", self.name(), x.len(), dt);
        match self {
            Pusher::ExplicitBoris => explicit_boris(x, v, b, e, q, m, dt),
            Pusher::ImplicitBoris => implicit_boris(x, v, b, e, q, m, dt),
            Pusher::ImplicitBorisNoE => implicit_boris_no_e(x, v, b, e, q, m, dt),
            Pusher::ZenitaniUmeda => zenitani_umeda(x, v, b, e, q, m, dt),
        }
    }
}

impl fmt::Display for Pusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pusher {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Pusher::ALL
            .into_iter()
            .find(|p| p.name() == key)
            .ok_or_else(|| {
                GridError::InvalidArgument(format!(
                    "unknown pusher '{}'; expected one of {:?}",
                    s,
                    Pusher::ALL.map(|p| p.name())
                ))
            })
    }
}

// -------------------------
// Checked batch
// -------------------------

/// Particle positions and velocities (SI), advanced in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBatch {
    pub x: Vec<[f64; 3]>,
    pub v: Vec<[f64; 3]>,
}

impl ParticleBatch {
    pub fn new(x: Vec<[f64; 3]>, v: Vec<[f64; 3]>) -> GridResult<Self> {
        if x.len() != v.len() {
            return Err(GridError::shape_mismatch(
                "particle velocities vs positions",
                &[x.len(), 3],
                &[v.len(), 3],
            ));
        }
        Ok(Self { x, v })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Validate and push one step.
    pub fn push_checked(
        &mut self,
        pusher: Pusher,
        b: &[[f64; 3]],
        e: &[[f64; 3]],
        q: f64,
        m: f64,
        dt: f64,
    ) -> GridResult<()> {
        let n = self.x.len();
        for (what, len) in [
            ("velocities", self.v.len()),
            ("magnetic field samples", b.len()),
            ("electric field samples", e.len()),
        ] {
            if len != n {
                return Err(GridError::shape_mismatch(
                    format!("particle {what} vs positions"),
                    &[n, 3],
                    &[len, 3],
                ));
            }
        }
        if !dt.is_finite() {
            return Err(GridError::InvalidArgument(format!("time step must be finite, got {dt}")));
        }
        if m == 0.0 || !m.is_finite() {
            return Err(GridError::InvalidArgument(format!(
                "particle mass must be finite and non-zero, got {m}"
            )));
        }
        if !pusher.handles_electric_field() && e.iter().any(|ei| ei.iter().any(|&c| c != 0.0)) {
            return Err(GridError::UnsupportedOperation(format!(
                "{} ignores the electric field but non-zero E samples were given",
                pusher
            )));
        }

        pusher.push(&mut self.x, &mut self.v, b, e, q, m, dt);
        Ok(())
    }
}

/// Parallel cutoff used by the kernels.
#[inline]
pub(crate) fn par_threshold() -> usize {
    NumericsConfig::global().par_threshold
}
