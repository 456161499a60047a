// src/error.rs
//
// Error taxonomy shared by grids, samplers and the checked pusher entry point.
// Out-of-bounds sample positions are not errors: they come back as `None`
// indices / NaN values per point.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type GridResult<T> = Result<T, GridError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// Coordinate, quantity or particle arrays of inconsistent shape.
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Incompatible or missing physical units.
    #[error("unit mismatch: {0}")]
    UnitMismatch(String),

    /// Capability not available for this grid flavour or kernel.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Sampling asked for a quantity that was never registered.
    #[error("quantity '{name}' not found; registered quantities are {available:?}")]
    NameNotFound { name: String, available: Vec<String> },

    /// Uniformity detection hit a (near) zero mean step along an axis.
    #[error("degenerate axis {axis}: mean coordinate step {mean_step:e} is too close to zero")]
    DomainDegenerate { axis: usize, mean_step: f64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl GridError {
    pub(crate) fn shape_mismatch(
        context: impl Into<String>,
        expected: &[usize],
        found: &[usize],
    ) -> Self {
        GridError::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}
