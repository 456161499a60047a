// src/geometry.rs
//
// Strategies a grid is assembled from:
//  - `CoordinateSystem`: which axis units are acceptable and which sampling
//    schemes make sense (Generic vs Cartesian).
//  - `MeshGenerator`: how a start/stop/count request becomes 1D axis samples
//    (evenly spaced, or sorted random for synthetic non-uniform grids).
//
// Plus the small argument types for start/stop/count construction.

use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GridError, GridResult};
use crate::units::{Scalar, Unit};

// -------------------------
// Coordinate systems
// -------------------------

pub trait CoordinateSystem: Debug + Clone + Send + Sync {
    fn name(&self) -> &'static str;

    /// Accept or reject the three axis units.
    fn validate_units(&self, units: &[Unit; 3]) -> GridResult<()>;

    /// Whether trilinear volume-weighted sampling is meaningful.
    fn supports_volume_average(&self) -> bool;
}

/// No constraints on axis units; nearest-neighbour sampling only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generic;

impl CoordinateSystem for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn validate_units(&self, _units: &[Unit; 3]) -> GridResult<()> {
        Ok(())
    }

    fn supports_volume_average(&self) -> bool {
        false
    }
}

/// All three axes must be lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cartesian;

impl CoordinateSystem for Cartesian {
    fn name(&self) -> &'static str {
        "cartesian"
    }

    fn validate_units(&self, units: &[Unit; 3]) -> GridResult<()> {
        if let Some(bad) = units.iter().position(|u| !u.is_length()) {
            return Err(GridError::UnitMismatch(format!(
                "units of grid are not valid for a Cartesian grid: [{}, {}, {}] (axis {} is not a length)",
                units[0], units[1], units[2], bad
            )));
        }
        Ok(())
    }

    fn supports_volume_average(&self) -> bool {
        true
    }
}

// -------------------------
// Mesh generation
// -------------------------

pub trait MeshGenerator {
    /// `num` samples covering [start, stop] in the axis unit.
    fn axis(&self, start: f64, stop: f64, num: usize) -> Vec<f64>;
}

/// Evenly spaced samples, both endpoints included.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSpacing;

impl MeshGenerator for LinearSpacing {
    fn axis(&self, start: f64, stop: f64, num: usize) -> Vec<f64> {
        match num {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (num - 1) as f64;
                let mut v: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
                // Land exactly on the requested end point.
                v[num - 1] = stop;
                v
            }
        }
    }
}

/// Sorted uniform random samples in [start, stop). Reproducible via `seed`.
#[derive(Debug, Clone, Copy)]
pub struct RandomSpacing {
    pub seed: u64,
}

impl RandomSpacing {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MeshGenerator for RandomSpacing {
    fn axis(&self, start: f64, stop: f64, num: usize) -> Vec<f64> {
        // Mix the bounds into the seed so the three axes differ.
        let mix = self.seed ^ start.to_bits().rotate_left(17) ^ stop.to_bits().rotate_left(41);
        let mut rng = StdRng::seed_from_u64(mix ^ num as u64);
        let (lo, hi) = if start <= stop { (start, stop) } else { (stop, start) };
        let mut v: Vec<f64> = (0..num)
            .map(|_| if hi > lo { rng.gen_range(lo..hi) } else { lo })
            .collect();
        v.sort_by(|a, b| a.total_cmp(b));
        v
    }
}

// -------------------------
// start / stop / count arguments
// -------------------------

/// Start or stop value of one dimension; a plain number borrows its unit
/// from the other end (or defaults to metres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl From<f64> for Endpoint {
    fn from(value: f64) -> Self {
        Self { value, unit: None }
    }
}

impl From<Scalar> for Endpoint {
    fn from(s: Scalar) -> Self {
        Self {
            value: s.value,
            unit: Some(s.unit),
        }
    }
}

/// One value per dimension; a single value is broadcast to all three.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerAxis<T>(pub [T; 3]);

impl<T: Copy> PerAxis<T> {
    pub fn splat(v: T) -> Self {
        Self([v; 3])
    }
}

impl From<f64> for PerAxis<Endpoint> {
    fn from(v: f64) -> Self {
        PerAxis::splat(v.into())
    }
}

impl From<Scalar> for PerAxis<Endpoint> {
    fn from(v: Scalar) -> Self {
        PerAxis::splat(v.into())
    }
}

impl From<[f64; 3]> for PerAxis<Endpoint> {
    fn from(v: [f64; 3]) -> Self {
        PerAxis(v.map(Endpoint::from))
    }
}

impl From<[Scalar; 3]> for PerAxis<Endpoint> {
    fn from(v: [Scalar; 3]) -> Self {
        PerAxis(v.map(Endpoint::from))
    }
}

impl From<[Endpoint; 3]> for PerAxis<Endpoint> {
    fn from(v: [Endpoint; 3]) -> Self {
        PerAxis(v)
    }
}

impl From<usize> for PerAxis<usize> {
    fn from(n: usize) -> Self {
        PerAxis::splat(n)
    }
}

impl From<[usize; 3]> for PerAxis<usize> {
    fn from(n: [usize; 3]) -> Self {
        PerAxis(n)
    }
}

/// Resolve one dimension's start/stop into plain numbers in a common unit.
pub(crate) fn resolve_bounds(start: Endpoint, stop: Endpoint) -> GridResult<(f64, f64, Unit)> {
    let unit = start.unit.or(stop.unit).unwrap_or(crate::units::METER);
    let stop_value = match stop.unit {
        Some(u) => stop.value * u.conversion_factor(&unit)?,
        None => stop.value,
    };
    let start_value = match start.unit {
        Some(u) => start.value * u.conversion_factor(&unit)?,
        None => start.value,
    };
    Ok((start_value, stop_value, unit))
}
