// src/grid.rs
//
// 3D grid of vertex positions plus named quantities defined on those vertices.
//
// Backing storage is a tagged variant:
//  - Uniform:    three strictly monotonic 1D axes; the vertex field is their
//                outer product, quantities are (n0, n1, n2) arrays.
//  - NonUniform: an unstructured (n, 3) point set; quantities are flat (n,).
//
// The variant is fixed when the grid is loaded. The coordinate system
// (Generic / Cartesian) is a type parameter and decides which units are
// accepted and whether volume-weighted sampling is available.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;
use ndarray::{Array1, Array2, Array3, Array4, ArrayD, ArrayView1, Axis, Ix3};

use crate::config::NumericsConfig;
use crate::error::{GridError, GridResult};
use crate::geometry::{
    resolve_bounds, Cartesian, CoordinateSystem, Endpoint, Generic, LinearSpacing, MeshGenerator,
    PerAxis,
};
use crate::interp::NearestIndexInterpolator;
use crate::topology;
use crate::units::{Quantity, Unit};

/// Coordinate storage of a grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridGeometry {
    Uniform { axes: [Array1<f64>; 3] },
    NonUniform { points: Array2<f64> },
}

/// What the samplers need to know about a grid's layout.
pub trait GridShape {
    fn shape(&self) -> Vec<usize>;
    fn is_uniform(&self) -> bool;
    fn axes(&self) -> Option<&[Array1<f64>; 3]>;
    fn points(&self) -> Option<&Array2<f64>>;

    /// Total number of vertices.
    fn n_points(&self) -> usize {
        self.shape().iter().product()
    }
}

impl GridShape for GridGeometry {
    fn shape(&self) -> Vec<usize> {
        match self {
            GridGeometry::Uniform { axes } => axes.iter().map(|a| a.len()).collect(),
            GridGeometry::NonUniform { points } => vec![points.nrows()],
        }
    }

    fn is_uniform(&self) -> bool {
        matches!(self, GridGeometry::Uniform { .. })
    }

    fn axes(&self) -> Option<&[Array1<f64>; 3]> {
        match self {
            GridGeometry::Uniform { axes } => Some(axes),
            GridGeometry::NonUniform { .. } => None,
        }
    }

    fn points(&self) -> Option<&Array2<f64>> {
        match self {
            GridGeometry::Uniform { .. } => None,
            GridGeometry::NonUniform { points } => Some(points),
        }
    }
}

/// Mean of the numerical gradient of a 1D axis (np.gradient-style edges).
pub(crate) fn mean_step(axis: &[f64]) -> f64 {
    let n = axis.len();
    if n < 2 {
        return 0.0;
    }
    let mut sum = (axis[1] - axis[0]) + (axis[n - 1] - axis[n - 2]);
    for i in 1..n - 1 {
        sum += 0.5 * (axis[i + 1] - axis[i - 1]);
    }
    sum / n as f64
}

#[derive(Debug, Clone)]
pub struct Grid<S: CoordinateSystem = Cartesian> {
    system: S,
    geometry: GridGeometry,
    units: [Unit; 3],
    quantities: BTreeMap<String, Quantity>,
    config: NumericsConfig,
    interpolator: OnceLock<NearestIndexInterpolator>,
}

pub type CartesianGrid = Grid<Cartesian>;
pub type GenericGrid = Grid<Generic>;

fn as_coordinate_array(q: &Quantity, name: &str) -> GridResult<Array3<f64>> {
    q.values()
        .view()
        .into_dimensionality::<Ix3>()
        .map(|v| v.to_owned())
        .map_err(|_| {
            GridError::shape_mismatch(format!("coordinate array {name} (must be 3D)"), &[0, 0, 0], q.shape())
        })
}

impl<S: CoordinateSystem> Grid<S> {
    // -------------------------
    // Construction
    // -------------------------

    /// Load a grid from three coordinate arrays of identical 3D shape.
    pub fn from_coordinates(
        system: S,
        pts0: &Quantity,
        pts1: &Quantity,
        pts2: &Quantity,
    ) -> GridResult<Self> {
        Self::from_coordinates_with_config(system, pts0, pts1, pts2, *NumericsConfig::global())
    }

    pub fn from_coordinates_with_config(
        system: S,
        pts0: &Quantity,
        pts1: &Quantity,
        pts2: &Quantity,
        config: NumericsConfig,
    ) -> GridResult<Self> {
        if pts0.shape() != pts1.shape() || pts0.shape() != pts2.shape() {
            let found = if pts0.shape() != pts1.shape() {
                pts1.shape()
            } else {
                pts2.shape()
            };
            return Err(GridError::shape_mismatch(
                "grid coordinate arrays (pts0, pts1, pts2)",
                pts0.shape(),
                found,
            ));
        }
        let p0 = as_coordinate_array(pts0, "pts0")?;
        let p1 = as_coordinate_array(pts1, "pts1")?;
        let p2 = as_coordinate_array(pts2, "pts2")?;

        let uniform = topology::classify(&p0, &p1, &p2, config.uniform_tol)?;

        let geometry = if uniform {
            GridGeometry::Uniform {
                axes: [
                    p0.slice(ndarray::s![.., 0, 0]).to_owned(),
                    p1.slice(ndarray::s![0, .., 0]).to_owned(),
                    p2.slice(ndarray::s![0, 0, ..]).to_owned(),
                ],
            }
        } else {
            let n = p0.len();
            let mut points = Array2::<f64>::zeros((n, 3));
            for (col, p) in [&p0, &p1, &p2].into_iter().enumerate() {
                for (row, &v) in p.iter().enumerate() {
                    points[[row, col]] = v;
                }
            }
            GridGeometry::NonUniform { points }
        };

        let units = [pts0.unit(), pts1.unit(), pts2.unit()];
        system.validate_units(&units)?;

        debug!(
            "loaded {} grid: shape={:?} uniform={} units=[{}, {}, {}]",
            system.name(),
            geometry.shape(),
            uniform,
            units[0],
            units[1],
            units[2]
        );

        Ok(Self {
            system,
            geometry,
            units,
            quantities: BTreeMap::new(),
            config,
            interpolator: OnceLock::new(),
        })
    }

    /// Load a grid and register quantities in one go.
    pub fn with_quantities<I, K>(
        system: S,
        pts0: &Quantity,
        pts1: &Quantity,
        pts2: &Quantity,
        quantities: I,
    ) -> GridResult<Self>
    where
        I: IntoIterator<Item = (K, Quantity)>,
        K: Into<String>,
    {
        let mut grid = Self::from_coordinates(system, pts0, pts1, pts2)?;
        for (name, q) in quantities {
            grid.add_quantity(name, q)?;
        }
        Ok(grid)
    }

    /// Build a grid from per-dimension start/stop values and point counts.
    ///
    /// Single values broadcast to all three dimensions. Each dimension takes
    /// the unit of its start value (plain numbers borrow the stop's unit, or
    /// default to metres); the stop is converted into it.
    pub fn from_bounds<M: MeshGenerator>(
        system: S,
        start: impl Into<PerAxis<Endpoint>>,
        stop: impl Into<PerAxis<Endpoint>>,
        num: impl Into<PerAxis<usize>>,
        mesh: &M,
    ) -> GridResult<Self> {
        let start = start.into().0;
        let stop = stop.into().0;
        let num = num.into().0;

        let mut axes: [Vec<f64>; 3] = Default::default();
        let mut units = [crate::units::METER; 3];
        for d in 0..3 {
            if num[d] == 0 {
                return Err(GridError::InvalidArgument(format!(
                    "number of points along axis {d} must be at least 1"
                )));
            }
            let (a, b, unit) = resolve_bounds(start[d], stop[d])?;
            axes[d] = mesh.axis(a, b, num[d]);
            units[d] = unit;
        }

        let shape = (num[0], num[1], num[2]);
        let pts0 = Array3::from_shape_fn(shape, |(i, _, _)| axes[0][i]);
        let pts1 = Array3::from_shape_fn(shape, |(_, j, _)| axes[1][j]);
        let pts2 = Array3::from_shape_fn(shape, |(_, _, k)| axes[2][k]);

        Self::from_coordinates(
            system,
            &Quantity::new(pts0, units[0]),
            &Quantity::new(pts1, units[1]),
            &Quantity::new(pts2, units[2]),
        )
    }

    /// Evenly spaced grid, both end points included.
    pub fn linspace(
        system: S,
        start: impl Into<PerAxis<Endpoint>>,
        stop: impl Into<PerAxis<Endpoint>>,
        num: impl Into<PerAxis<usize>>,
    ) -> GridResult<Self> {
        Self::from_bounds(system, start, stop, num, &LinearSpacing)
    }

    // -------------------------
    // Quantities
    // -------------------------

    /// Register (or overwrite) a quantity defined on the grid vertices.
    pub fn add_quantity(&mut self, name: impl Into<String>, quantity: Quantity) -> GridResult<()> {
        let name = name.into();
        let quantity = match &self.geometry {
            GridGeometry::Uniform { .. } => quantity,
            GridGeometry::NonUniform { .. } => quantity.flattened(),
        };
        let expected = self.shape();
        if quantity.shape() != expected.as_slice() {
            return Err(GridError::shape_mismatch(
                format!("quantity '{name}' vs grid"),
                &expected,
                quantity.shape(),
            ));
        }
        let quantity = Quantity::new(
            quantity.values().as_standard_layout().into_owned(),
            quantity.unit(),
        );
        debug!("quantity '{}' [{}] added", name, quantity.unit());
        self.quantities.insert(name, quantity);
        Ok(())
    }

    pub fn quantity(&self, name: &str) -> GridResult<&Quantity> {
        self.quantities
            .get(name)
            .ok_or_else(|| GridError::NameNotFound {
                name: name.to_string(),
                available: self.quantities.keys().cloned().collect(),
            })
    }

    pub fn quantity_names(&self) -> Vec<&str> {
        self.quantities.keys().map(String::as_str).collect()
    }

    /// Fail with `NameNotFound` on the first unregistered name.
    pub(crate) fn require_quantities(&self, names: &[&str]) -> GridResult<()> {
        for name in names {
            self.quantity(name)?;
        }
        Ok(())
    }

    // -------------------------
    // Basic properties
    // -------------------------

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &NumericsConfig {
        &self.config
    }

    /// (n0, n1, n2) for uniform grids, (n,) otherwise.
    pub fn shape(&self) -> Vec<usize> {
        self.geometry.shape()
    }

    pub fn is_uniform(&self) -> bool {
        self.geometry.is_uniform()
    }

    pub fn len(&self) -> usize {
        self.geometry.n_points()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unit of each dimension.
    pub fn units(&self) -> &[Unit; 3] {
        &self.units
    }

    pub fn unit_at(&self, i: usize) -> GridResult<Unit> {
        Self::check_axis(i)?;
        Ok(self.units[i])
    }

    /// The unit of the whole grid; only defined when all three agree.
    pub fn unit(&self) -> GridResult<Unit> {
        let [u0, u1, u2] = self.units;
        if u0 == u1 && u0 == u2 {
            Ok(u0)
        } else {
            Err(GridError::UnitMismatch(format!(
                "array dimensions do not all have the same units: [{}, {}, {}]",
                u0, u1, u2
            )))
        }
    }

    fn check_axis(i: usize) -> GridResult<()> {
        if i > 2 {
            return Err(GridError::InvalidArgument(format!(
                "axis index {i} out of range (0..=2)"
            )));
        }
        Ok(())
    }

    /// 1D axis `i` (in `units()[i]`). Uniform grids only.
    pub fn ax(&self, i: usize) -> GridResult<ArrayView1<'_, f64>> {
        Self::check_axis(i)?;
        match &self.geometry {
            GridGeometry::Uniform { axes } => Ok(axes[i].view()),
            GridGeometry::NonUniform { .. } => Err(GridError::UnsupportedOperation(
                "the axis properties are only valid on uniformly spaced grids".into(),
            )),
        }
    }

    /// Step size along axis `i` (mean of the axis gradient). Uniform grids only.
    pub fn dax(&self, i: usize) -> GridResult<f64> {
        Self::check_axis(i)?;
        match &self.geometry {
            GridGeometry::Uniform { axes } => Ok(mean_step(&axes[i].to_vec())),
            GridGeometry::NonUniform { .. } => Err(GridError::UnsupportedOperation(
                "the grid step size properties are only valid on uniformly spaced grids".into(),
            )),
        }
    }

    /// Coordinate arrays of every vertex, one per dimension, with units.
    /// Shaped (n0, n1, n2) for uniform grids and (n,) otherwise.
    pub fn grids(&self) -> [Quantity; 3] {
        match &self.geometry {
            GridGeometry::Uniform { axes } => {
                let shape = (axes[0].len(), axes[1].len(), axes[2].len());
                [
                    Quantity::new(Array3::from_shape_fn(shape, |(i, _, _)| axes[0][i]), self.units[0]),
                    Quantity::new(Array3::from_shape_fn(shape, |(_, j, _)| axes[1][j]), self.units[1]),
                    Quantity::new(Array3::from_shape_fn(shape, |(_, _, k)| axes[2][k]), self.units[2]),
                ]
            }
            GridGeometry::NonUniform { points } => [0, 1, 2].map(|c| {
                Quantity::new(points.index_axis(Axis(1), c).to_owned(), self.units[c])
            }),
        }
    }

    /// Vertex positions stacked along a trailing axis of length 3:
    /// (n0, n1, n2, 3) or (n, 3). Values are in the per-axis units.
    pub fn grid_points(&self) -> ArrayD<f64> {
        match &self.geometry {
            GridGeometry::Uniform { axes } => {
                let shape = (axes[0].len(), axes[1].len(), axes[2].len(), 3);
                Array4::from_shape_fn(shape, |(i, j, k, c)| match c {
                    0 => axes[0][i],
                    1 => axes[1][j],
                    _ => axes[2][k],
                })
                .into_dyn()
            }
            GridGeometry::NonUniform { points } => points.clone().into_dyn(),
        }
    }

    // -------------------------
    // Interpolator
    // -------------------------

    /// Nearest-index lookup, built on first use and cached.
    pub fn interpolator(&self) -> GridResult<&NearestIndexInterpolator> {
        match &self.geometry {
            GridGeometry::Uniform { axes } => Ok(self.interpolator.get_or_init(|| {
                let si = [0, 1, 2].map(|d| {
                    let f = self.units[d].scale_to_si;
                    axes[d].iter().map(|v| v * f).collect::<Vec<f64>>()
                });
                debug!("building nearest-index interpolator for shape {:?}", self.shape());
                NearestIndexInterpolator::from_axes(si)
            })),
            GridGeometry::NonUniform { .. } => Err(GridError::UnsupportedOperation(
                "interpolation on non-uniform grids is not currently supported".into(),
            )),
        }
    }
}
