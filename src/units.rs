// src/units.rs
//
// Minimal "value with unit" support.
//
// A `Unit` is a scale factor to SI plus integer exponents of the base
// dimensions we care about (length, mass, time, current, angle). This is
// enough to:
//  - check that start/stop values and axis units are compatible,
//  - convert query positions to SI before index lookup,
//  - carry a unit alongside every stored and sampled quantity.
//
// Anything richer (compound-unit algebra, parsing, pretty printing) belongs to
// the caller.

use std::fmt;

use ndarray::{Array1, ArrayD};

use crate::error::{GridError, GridResult};

/// Exponents of the base dimensions: [length, mass, time, current, angle].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension(pub [i8; 5]);

impl Dimension {
    pub const NONE: Dimension = Dimension([0, 0, 0, 0, 0]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0]);
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0]);
    pub const ANGLE: Dimension = Dimension([0, 0, 0, 0, 1]);
}

#[derive(Debug, Clone, Copy)]
pub struct Unit {
    pub symbol: &'static str,
    pub scale_to_si: f64,
    pub dimension: Dimension,
}

pub const DIMENSIONLESS: Unit = Unit::new("", 1.0, Dimension::NONE);
pub const METER: Unit = Unit::new("m", 1.0, Dimension::LENGTH);
pub const CENTIMETER: Unit = Unit::new("cm", 1e-2, Dimension::LENGTH);
pub const MILLIMETER: Unit = Unit::new("mm", 1e-3, Dimension::LENGTH);
pub const KILOMETER: Unit = Unit::new("km", 1e3, Dimension::LENGTH);
pub const RADIAN: Unit = Unit::new("rad", 1.0, Dimension::ANGLE);
pub const DEGREE: Unit = Unit::new("deg", std::f64::consts::PI / 180.0, Dimension::ANGLE);
pub const SECOND: Unit = Unit::new("s", 1.0, Dimension::TIME);
pub const KILOGRAM: Unit = Unit::new("kg", 1.0, Dimension::MASS);
pub const COULOMB: Unit = Unit::new("C", 1.0, Dimension([0, 0, 1, 1, 0]));
pub const TESLA: Unit = Unit::new("T", 1.0, Dimension([0, 1, -2, -1, 0]));
pub const GAUSS: Unit = Unit::new("G", 1e-4, Dimension([0, 1, -2, -1, 0]));
pub const VOLT_PER_METER: Unit = Unit::new("V / m", 1.0, Dimension([1, 1, -3, -1, 0]));
pub const METER_PER_SECOND: Unit = Unit::new("m / s", 1.0, Dimension([1, 0, -1, 0, 0]));
pub const PER_CUBIC_METER: Unit = Unit::new("1 / m3", 1.0, Dimension([-3, 0, 0, 0, 0]));

impl Unit {
    pub const fn new(symbol: &'static str, scale_to_si: f64, dimension: Dimension) -> Self {
        Self {
            symbol,
            scale_to_si,
            dimension,
        }
    }

    /// Attach this unit to a plain number.
    pub fn of(self, value: f64) -> Scalar {
        Scalar { value, unit: self }
    }

    #[inline]
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    #[inline]
    pub fn is_length(&self) -> bool {
        self.dimension == Dimension::LENGTH
    }

    /// Factor `f` such that `value_in_self * f == value_in_to`.
    pub fn conversion_factor(&self, to: &Unit) -> GridResult<f64> {
        if !self.is_compatible(to) {
            return Err(GridError::UnitMismatch(format!(
                "units '{}' and '{}' are not compatible",
                self, to
            )));
        }
        Ok(self.scale_to_si / to.scale_to_si)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension && self.scale_to_si == other.scale_to_si
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbol.is_empty() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", self.symbol)
        }
    }
}

/// A single number with a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar {
    pub value: f64,
    pub unit: Unit,
}

impl Scalar {
    pub fn to_unit(&self, unit: Unit) -> GridResult<Scalar> {
        Ok(Scalar {
            value: self.value * self.unit.conversion_factor(&unit)?,
            unit,
        })
    }

    pub fn si(&self) -> f64 {
        self.value * self.unit.scale_to_si
    }
}

/// An n-dimensional array of values sharing one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    values: ArrayD<f64>,
    unit: Unit,
}

impl Quantity {
    pub fn new<D: ndarray::Dimension>(values: ndarray::Array<f64, D>, unit: Unit) -> Self {
        Self {
            values: values.into_dyn(),
            unit,
        }
    }

    /// One-dimensional quantity from a plain vector.
    pub fn from_vec(values: Vec<f64>, unit: Unit) -> Self {
        Self {
            values: Array1::from(values).into_dyn(),
            unit,
        }
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    #[inline]
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn into_values(self) -> ArrayD<f64> {
        self.values
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_unit(&self, unit: Unit) -> GridResult<Quantity> {
        let f = self.unit.conversion_factor(&unit)?;
        Ok(Quantity {
            values: self.values.mapv(|v| v * f),
            unit,
        })
    }

    /// Plain SI values.
    pub fn to_si(&self) -> ArrayD<f64> {
        let f = self.unit.scale_to_si;
        self.values.mapv(|v| v * f)
    }

    pub(crate) fn flattened(&self) -> Quantity {
        let flat: Vec<f64> = self.values.iter().copied().collect();
        Quantity::from_vec(flat, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn length_units_convert() {
        let f = CENTIMETER.conversion_factor(&METER).unwrap();
        assert!((f - 1e-2).abs() < 1e-15);
        let s = KILOMETER.of(2.0).to_unit(METER).unwrap();
        assert!((s.value - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn incompatible_units_are_rejected() {
        let err = METER.conversion_factor(&SECOND).unwrap_err();
        assert!(matches!(err, GridError::UnitMismatch(_)));
        assert!(!RADIAN.is_length());
        assert!(DEGREE.is_compatible(&RADIAN));
    }

    #[test]
    fn equality_ignores_symbol() {
        let metre_alias = Unit::new("meter", 1.0, Dimension::LENGTH);
        assert_eq!(metre_alias, METER);
        assert_ne!(CENTIMETER, METER);
        assert!((TESLA.of(1.0).si() - GAUSS.of(1e4).si()).abs() < 1e-12);
    }

    #[test]
    fn quantity_keeps_unit_through_conversion() {
        let q = Quantity::new(array![1.0, 2.0, 3.0], CENTIMETER);
        let m = q.to_unit(METER).unwrap();
        assert_eq!(m.unit(), METER);
        assert!((m.values()[&[2][..]] - 0.03).abs() < 1e-15);
        assert_eq!(&q.to_si(), m.values());
    }
}
