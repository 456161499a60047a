// src/interp.rs
//
// Field sampling on uniform grids.
//
// `NearestIndexInterpolator` maps an SI position to the nearest vertex index
// along each axis independently (a separable lattice lookup, not the nearest
// vertex in Euclidean distance). Positions outside the axis range, or
// non-finite, give `None`.
//
// On top of it the grid offers:
//  - nearest-neighbour sampling (value at the nearest vertex),
//  - volume-weighted (trilinear) sampling, Cartesian grids only: each of the
//    8 corners of the bracketing cell is weighted by the volume of the
//    opposite sub-box divided by the cell volume.
//
// Out-of-bounds query points come back as NaN, the rest of the batch is
// unaffected.

use std::borrow::Cow;

use log::trace;
use ndarray::ArrayViewD;
use rayon::prelude::*;

use crate::error::{GridError, GridResult};
use crate::geometry::CoordinateSystem;
use crate::grid::{mean_step, Grid};
use crate::units::{Quantity, Unit};

// -------------------------
// Index lookup
// -------------------------

#[derive(Debug, Clone, PartialEq)]
struct AxisLookup {
    coords: Vec<f64>,
    ascending: bool,
    step: f64,
}

impl AxisLookup {
    fn new(coords: Vec<f64>) -> Self {
        let ascending = coords.len() < 2 || coords[coords.len() - 1] >= coords[0];
        let step = mean_step(&coords);
        Self {
            coords,
            ascending,
            step,
        }
    }

    fn nearest(&self, x: f64) -> Option<usize> {
        let c = &self.coords;
        let n = c.len();
        if n == 0 {
            return None;
        }
        let (lo, hi) = if self.ascending {
            (c[0], c[n - 1])
        } else {
            (c[n - 1], c[0])
        };
        // NaN fails both comparisons.
        if !(x >= lo && x <= hi) {
            return None;
        }

        let p = if self.ascending {
            c.partition_point(|&v| v < x)
        } else {
            c.partition_point(|&v| v > x)
        };
        if p == 0 {
            return Some(0);
        }
        if p >= n {
            return Some(n - 1);
        }
        let d_prev = (x - c[p - 1]).abs();
        let d_next = (c[p] - x).abs();
        // Ties go to the lower index.
        Some(if d_prev <= d_next { p - 1 } else { p })
    }

    /// Coordinate of lattice index `k`, extrapolated one step past either end.
    fn coord(&self, k: isize) -> f64 {
        let n = self.coords.len() as isize;
        if k < 0 {
            self.coords[0] + self.step * k as f64
        } else if k >= n {
            self.coords[(n - 1) as usize] + self.step * (k - n + 1) as f64
        } else {
            self.coords[k as usize]
        }
    }

    /// Lower index of the pair of vertices bracketing `x`, given its nearest index.
    fn lower_bracket(&self, x: f64, nearest: usize) -> isize {
        let beyond = if self.ascending {
            x > self.coords[nearest]
        } else {
            x < self.coords[nearest]
        };
        if beyond {
            nearest as isize
        } else {
            nearest as isize - 1
        }
    }
}

/// One corner of the cell bracketing a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Lattice index; may be -1 or n on an axis, in which case `weight` is 0.
    pub index: [isize; 3],
    pub weight: f64,
}

impl Corner {
    /// Index if the corner lies on the grid.
    pub fn on_grid(&self, shape: [usize; 3]) -> Option<[usize; 3]> {
        let mut out = [0usize; 3];
        for a in 0..3 {
            let k = self.index[a];
            if k < 0 || k as usize >= shape[a] {
                return None;
            }
            out[a] = k as usize;
        }
        Some(out)
    }
}

/// Position → nearest vertex index on a separable (uniform) lattice, SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestIndexInterpolator {
    axes: [AxisLookup; 3],
}

impl NearestIndexInterpolator {
    /// `axes_si` must each be strictly monotonic.
    pub fn from_axes(axes_si: [Vec<f64>; 3]) -> Self {
        Self {
            axes: axes_si.map(AxisLookup::new),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| self.axes[a].coords.len())
    }

    pub fn axis(&self, a: usize) -> &[f64] {
        &self.axes[a].coords
    }

    /// Cell volume from the mean step of each axis (SI).
    pub fn cell_volume(&self) -> f64 {
        (self.axes[0].step * self.axes[1].step * self.axes[2].step).abs()
    }

    /// Nearest index along each axis, or `None` outside the grid.
    pub fn nearest(&self, position: [f64; 3]) -> Option<[usize; 3]> {
        Some([
            self.axes[0].nearest(position[0])?,
            self.axes[1].nearest(position[1])?,
            self.axes[2].nearest(position[2])?,
        ])
    }

    /// The 8 corners of the cell around `position` with their volume weights.
    /// Corners off the grid carry zero weight. `None` outside the grid.
    pub fn corner_weights(&self, position: [f64; 3]) -> Option<[Corner; 8]> {
        let nearest = self.nearest(position)?;
        let lower: [isize; 3] =
            [0, 1, 2].map(|a| self.axes[a].lower_bracket(position[a], nearest[a]));
        let shape = self.shape();
        let vol = self.cell_volume();

        let mut corners = [Corner {
            index: [0; 3],
            weight: 0.0,
        }; 8];
        for (c, corner) in corners.iter_mut().enumerate() {
            let bits = [(c >> 2) & 1, (c >> 1) & 1, c & 1];
            let mut index = [0isize; 3];
            let mut w = 1.0;
            for a in 0..3 {
                index[a] = lower[a] + bits[a] as isize;
                let opposite = lower[a] + (1 - bits[a]) as isize;
                w *= (position[a] - self.axes[a].coord(opposite)).abs();
            }
            let inside = (0..3).all(|a| index[a] >= 0 && (index[a] as usize) < shape[a]);
            *corner = Corner {
                index,
                weight: if inside && vol > 0.0 { w / vol } else { 0.0 },
            };
        }
        Some(corners)
    }
}

// -------------------------
// Query positions
// -------------------------

/// Query points, either plain numbers in the grid's per-axis units or
/// values carrying a unit.
#[derive(Debug, Clone)]
pub enum Positions<'a> {
    Plain(Cow<'a, [[f64; 3]]>),
    WithUnit(Cow<'a, [[f64; 3]]>, Unit),
}

impl<'a> Positions<'a> {
    /// From an array of shape (n, 3), or a single point of shape (3,).
    pub fn from_array(a: ArrayViewD<'_, f64>, unit: Option<Unit>) -> GridResult<Positions<'static>> {
        let pts: Vec<[f64; 3]> = match a.shape() {
            [3] => vec![[a[&[0][..]], a[&[1][..]], a[&[2][..]]]],
            [_, 3] => a
                .outer_iter()
                .map(|row| [row[&[0][..]], row[&[1][..]], row[&[2][..]]])
                .collect(),
            other => {
                return Err(GridError::shape_mismatch("query positions", &[0, 3], other));
            }
        };
        Ok(match unit {
            Some(u) => Positions::WithUnit(Cow::Owned(pts), u),
            None => Positions::Plain(Cow::Owned(pts)),
        })
    }

    pub fn len(&self) -> usize {
        self.points().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    fn points(&self) -> &[[f64; 3]] {
        match self {
            Positions::Plain(p) | Positions::WithUnit(p, _) => p,
        }
    }

    /// Convert to SI. Plain numbers use each axis's unit; unit-bearing
    /// positions must be compatible with every axis unit.
    pub fn to_si(&self, axis_units: &[Unit; 3]) -> GridResult<Vec<[f64; 3]>> {
        let scale: [f64; 3] = match self {
            Positions::Plain(_) => axis_units.map(|u| u.scale_to_si),
            Positions::WithUnit(_, unit) => {
                for (a, au) in axis_units.iter().enumerate() {
                    if !unit.is_compatible(au) {
                        return Err(GridError::UnitMismatch(format!(
                            "position unit '{}' is not compatible with axis {} unit '{}'",
                            unit, a, au
                        )));
                    }
                }
                [unit.scale_to_si; 3]
            }
        };
        Ok(self
            .points()
            .iter()
            .map(|p| [p[0] * scale[0], p[1] * scale[1], p[2] * scale[2]])
            .collect())
    }
}

impl From<[f64; 3]> for Positions<'static> {
    fn from(p: [f64; 3]) -> Self {
        Positions::Plain(Cow::Owned(vec![p]))
    }
}

impl From<Vec<[f64; 3]>> for Positions<'static> {
    fn from(p: Vec<[f64; 3]>) -> Self {
        Positions::Plain(Cow::Owned(p))
    }
}

impl<'a> From<&'a [[f64; 3]]> for Positions<'a> {
    fn from(p: &'a [[f64; 3]]) -> Self {
        Positions::Plain(Cow::Borrowed(p))
    }
}

impl<'a> From<&'a Vec<[f64; 3]>> for Positions<'a> {
    fn from(p: &'a Vec<[f64; 3]>) -> Self {
        Positions::Plain(Cow::Borrowed(p.as_slice()))
    }
}

impl From<([f64; 3], Unit)> for Positions<'static> {
    fn from((p, u): ([f64; 3], Unit)) -> Self {
        Positions::WithUnit(Cow::Owned(vec![p]), u)
    }
}

impl From<(Vec<[f64; 3]>, Unit)> for Positions<'static> {
    fn from((p, u): (Vec<[f64; 3]>, Unit)) -> Self {
        Positions::WithUnit(Cow::Owned(p), u)
    }
}

impl<'a> From<(&'a [[f64; 3]], Unit)> for Positions<'a> {
    fn from((p, u): (&'a [[f64; 3]], Unit)) -> Self {
        Positions::WithUnit(Cow::Borrowed(p), u)
    }
}

// -------------------------
// Sampling
// -------------------------

fn map_points<T, F>(points: &[[f64; 3]], par_threshold: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn([f64; 3]) -> T + Sync + Send,
{
    if points.len() >= par_threshold {
        points.par_iter().map(|p| f(*p)).collect()
    } else {
        points.iter().map(|p| f(*p)).collect()
    }
}

#[inline]
fn value_at(q: &Quantity, idx: [usize; 3]) -> f64 {
    q.values()[&idx[..]]
}

impl<S: CoordinateSystem> Grid<S> {
    /// Nearest vertex index per query point; `None` for points off the grid.
    pub fn interpolate_indices<'a>(
        &self,
        positions: impl Into<Positions<'a>>,
    ) -> GridResult<Vec<Option<[usize; 3]>>> {
        let positions = positions.into();
        let interp = self.interpolator()?;
        let si = positions.to_si(self.units())?;
        Ok(map_points(&si, self.config().par_threshold, |p| interp.nearest(p)))
    }

    /// Values of each named quantity at the nearest vertex of every point.
    /// Returns one `Quantity` of shape (n,) per name; NaN off the grid.
    pub fn nearest_neighbor_sample<'a>(
        &self,
        positions: impl Into<Positions<'a>>,
        names: &[&str],
    ) -> GridResult<Vec<Quantity>> {
        self.require_quantities(names)?;
        let indices = self.interpolate_indices(positions)?;
        trace!(
            "nearest-neighbour sampling {} points for {:?}",
            indices.len(),
            names
        );

        names
            .iter()
            .map(|name| {
                let q = self.quantity(name)?;
                let values = indices
                    .iter()
                    .map(|idx| idx.map_or(f64::NAN, |i| value_at(q, i)))
                    .collect();
                Ok(Quantity::from_vec(values, q.unit()))
            })
            .collect()
    }

    /// Single-quantity form of [`Grid::nearest_neighbor_sample`].
    pub fn nearest_neighbor_sample_one<'a>(
        &self,
        positions: impl Into<Positions<'a>>,
        name: &str,
    ) -> GridResult<Quantity> {
        let mut out = self.nearest_neighbor_sample(positions, &[name])?;
        Ok(out.remove(0))
    }

    /// Trilinear, inverse-volume weighted sampling. Cartesian grids only.
    pub fn volume_averaged_sample<'a>(
        &self,
        positions: impl Into<Positions<'a>>,
        names: &[&str],
    ) -> GridResult<Vec<Quantity>> {
        if !self.system().supports_volume_average() {
            return Err(GridError::UnsupportedOperation(format!(
                "volume-averaged interpolation is not implemented for {} grids",
                self.system().name()
            )));
        }
        self.require_quantities(names)?;

        let positions = positions.into();
        let interp = self.interpolator()?;
        let si = positions.to_si(self.units())?;
        let shape = interp.shape();
        let corners = map_points(&si, self.config().par_threshold, |p| interp.corner_weights(p));
        trace!(
            "volume-weighted sampling {} points for {:?}",
            corners.len(),
            names
        );

        names
            .iter()
            .map(|name| {
                let q = self.quantity(name)?;
                let values = corners
                    .iter()
                    .map(|cell| match cell {
                        None => f64::NAN,
                        Some(cs) => cs
                            .iter()
                            .filter(|c| c.weight != 0.0)
                            .filter_map(|c| c.on_grid(shape).map(|i| c.weight * value_at(q, i)))
                            .sum::<f64>(),
                    })
                    .collect();
                Ok(Quantity::from_vec(values, q.unit()))
            })
            .collect()
    }

    /// Single-quantity form of [`Grid::volume_averaged_sample`].
    pub fn volume_averaged_sample_one<'a>(
        &self,
        positions: impl Into<Positions<'a>>,
        name: &str,
    ) -> GridResult<Quantity> {
        let mut out = self.volume_averaged_sample(positions, &[name])?;
        Ok(out.remove(0))
    }
}
