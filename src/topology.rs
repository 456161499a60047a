// src/topology.rs
//
// Uniform / non-uniform classification of a 3D coordinate field.
//
// For axis a we take the numerical gradient of pts_a along array dimension a
// (central differences inside, one-sided at the two ends, unit sample spacing)
// and look at std/mean of all those steps. The grid is uniform iff all three
// ratios are within `tol` of zero.
//
// A (near) zero mean step makes the ratio meaningless. `detect_is_uniform`
// reports that as `DomainDegenerate`; `classify` (used when loading a grid)
// treats it as non-uniform.

use log::warn;
use ndarray::{Array3, ArrayView1, Axis};

use crate::error::{GridError, GridResult};

/// Per-axis relative step spread (std/mean).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformityReport {
    pub ratios: [f64; 3],
}

impl UniformityReport {
    pub fn is_uniform(&self, tol: f64) -> bool {
        self.ratios.iter().all(|r| r.abs() <= tol)
    }
}

/// Running mean/variance (Welford).
#[derive(Default)]
struct StepStats {
    n: usize,
    mean: f64,
    m2: f64,
    max_abs_coord: f64,
}

impl StepStats {
    #[inline]
    fn push(&mut self, step: f64) {
        self.n += 1;
        let delta = step - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (step - self.mean);
    }

    fn std(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        (self.m2 / self.n as f64).sqrt()
    }
}

fn accumulate_lane(lane: ArrayView1<f64>, stats: &mut StepStats) {
    let n = lane.len();
    for &v in lane.iter() {
        stats.max_abs_coord = stats.max_abs_coord.max(v.abs());
    }
    if n < 2 {
        return;
    }
    stats.push(lane[1] - lane[0]);
    for i in 1..n - 1 {
        stats.push(0.5 * (lane[i + 1] - lane[i - 1]));
    }
    stats.push(lane[n - 1] - lane[n - 2]);
}

/// std/mean of the steps of `pts` along `axis`.
pub fn axis_step_ratio(pts: &Array3<f64>, axis: usize) -> GridResult<f64> {
    let mut stats = StepStats::default();
    for lane in pts.lanes(Axis(axis)) {
        accumulate_lane(lane, &mut stats);
    }

    let floor = f64::EPSILON * stats.max_abs_coord;
    if stats.n == 0 || !stats.mean.is_finite() || stats.mean.abs() <= floor {
        return Err(GridError::DomainDegenerate {
            axis,
            mean_step: stats.mean,
        });
    }
    Ok(stats.std() / stats.mean)
}

fn check_shapes(pts0: &Array3<f64>, pts1: &Array3<f64>, pts2: &Array3<f64>) -> GridResult<()> {
    for (name, p) in [("pts1", pts1), ("pts2", pts2)] {
        if p.shape() != pts0.shape() {
            return Err(GridError::shape_mismatch(
                format!("coordinate array {name} vs pts0"),
                pts0.shape(),
                p.shape(),
            ));
        }
    }
    Ok(())
}

pub fn uniformity_report(
    pts0: &Array3<f64>,
    pts1: &Array3<f64>,
    pts2: &Array3<f64>,
) -> GridResult<UniformityReport> {
    check_shapes(pts0, pts1, pts2)?;
    Ok(UniformityReport {
        ratios: [
            axis_step_ratio(pts0, 0)?,
            axis_step_ratio(pts1, 1)?,
            axis_step_ratio(pts2, 2)?,
        ],
    })
}

/// Strict check: a degenerate axis is an error.
pub fn detect_is_uniform(
    pts0: &Array3<f64>,
    pts1: &Array3<f64>,
    pts2: &Array3<f64>,
    tol: f64,
) -> GridResult<bool> {
    Ok(uniformity_report(pts0, pts1, pts2)?.is_uniform(tol))
}

/// Classification used at grid load time: degenerate axes make the grid
/// non-uniform instead of failing. Shape errors still propagate.
pub fn classify(
    pts0: &Array3<f64>,
    pts1: &Array3<f64>,
    pts2: &Array3<f64>,
    tol: f64,
) -> GridResult<bool> {
    match detect_is_uniform(pts0, pts1, pts2, tol) {
        Ok(uniform) => Ok(uniform),
        Err(GridError::DomainDegenerate { axis, mean_step }) => {
            warn!(
                "axis {} has degenerate mean step {:e}; treating grid as non-uniform",
                axis, mean_step
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn meshgrid(ax0: &[f64], ax1: &[f64], ax2: &[f64]) -> (Array3<f64>, Array3<f64>, Array3<f64>) {
        let shape = (ax0.len(), ax1.len(), ax2.len());
        (
            Array3::from_shape_fn(shape, |(i, _, _)| ax0[i]),
            Array3::from_shape_fn(shape, |(_, j, _)| ax1[j]),
            Array3::from_shape_fn(shape, |(_, _, k)| ax2[k]),
        )
    }

    fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| a + (b - a) * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn linear_axes_are_uniform() {
        let (p0, p1, p2) = meshgrid(
            &linspace(-1.0, 1.0, 7),
            &linspace(0.0, 3.0, 5),
            &linspace(10.0, 20.0, 9),
        );
        assert!(detect_is_uniform(&p0, &p1, &p2, 1e-6).unwrap());
        let r = uniformity_report(&p0, &p1, &p2).unwrap();
        assert!(r.ratios.iter().all(|x| x.abs() < 1e-12), "{:?}", r);
    }

    #[test]
    fn decreasing_axis_is_still_uniform() {
        let (p0, p1, p2) = meshgrid(
            &linspace(1.0, 0.0, 6),
            &linspace(0.0, 1.0, 6),
            &linspace(0.0, 1.0, 6),
        );
        assert!(detect_is_uniform(&p0, &p1, &p2, 1e-6).unwrap());
    }

    #[test]
    fn perturbed_axes_are_non_uniform() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut ax = linspace(0.0, 1.0, 12);
        for v in ax.iter_mut().skip(1) {
            *v += rng.gen_range(-1e-3..1e-3);
        }
        let (p0, p1, p2) = meshgrid(&ax, &linspace(0.0, 1.0, 4), &linspace(0.0, 1.0, 4));
        assert!(!detect_is_uniform(&p0, &p1, &p2, 1e-6).unwrap());
    }

    #[test]
    fn single_point_axis_is_degenerate() {
        let (p0, p1, p2) = meshgrid(&[0.5], &linspace(0.0, 1.0, 4), &linspace(0.0, 1.0, 4));
        let err = detect_is_uniform(&p0, &p1, &p2, 1e-6).unwrap_err();
        assert!(matches!(err, GridError::DomainDegenerate { axis: 0, .. }));
        assert!(!classify(&p0, &p1, &p2, 1e-6).unwrap());
    }

    #[test]
    fn constant_axis_is_degenerate() {
        let (p0, p1, p2) = meshgrid(&[2.0, 2.0, 2.0], &linspace(0.0, 1.0, 4), &linspace(0.0, 1.0, 4));
        assert!(matches!(
            detect_is_uniform(&p0, &p1, &p2, 1e-6),
            Err(GridError::DomainDegenerate { axis: 0, .. })
        ));
    }

    #[test]
    fn unequal_shapes_are_rejected() {
        let (p0, p1, _) = meshgrid(&linspace(0.0, 1.0, 3), &linspace(0.0, 1.0, 3), &linspace(0.0, 1.0, 3));
        let p2 = Array3::zeros((3, 3, 2));
        assert!(matches!(
            classify(&p0, &p1, &p2, 1e-6),
            Err(GridError::ShapeMismatch { .. })
        ));
    }
}
