//! Numeric Model
//!
//! Integers stay integers until an operation leaves the `i64` range or mixes
//! in a float. Division and square roots always produce floats.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde_json::Value;

use crate::error::{CalcError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Read a named argument. Numeric strings are accepted.
    pub fn from_argument(arguments: &Value, name: &str) -> Result<Self> {
        let value = arguments
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| CalcError::MissingArgument(name.to_string()))?;

        let not_a_number = || CalcError::NotANumber {
            name: name.to_string(),
            got: value.to_string(),
        };

        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(not_a_number),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Self::Int)
                    .or_else(|_| s.parse::<f64>().map(Self::Float))
                    .map_err(|_| not_a_number())
            }
            _ => Err(not_a_number()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Self::Int(i) => i < 0,
            Self::Float(f) => f < 0.0,
        }
    }

    /// True division
    pub fn divide(self, divisor: Self) -> Result<Self> {
        if divisor.is_zero() {
            return Err(CalcError::DivideByZero);
        }
        Ok(Self::Float(self.as_f64() / divisor.as_f64()))
    }

    pub fn pow(self, exponent: Self) -> Result<Self> {
        if let (Self::Int(base), Self::Int(exp)) = (self, exponent) {
            if let Some(value) = u32::try_from(exp).ok().and_then(|exp| base.checked_pow(exp)) {
                return Ok(Self::Int(value));
            }
        }
        if self.is_zero() && exponent.is_negative() {
            return Err(CalcError::DivideByZero);
        }

        let value = self.as_f64().powf(exponent.as_f64());
        if value.is_nan() {
            return Err(CalcError::NotReal);
        }
        Ok(Self::Float(value))
    }

    pub fn sqrt(self) -> Result<Self> {
        if self.is_negative() {
            return Err(CalcError::NegativeSqrt);
        }
        Ok(Self::Float(self.as_f64().sqrt()))
    }

    fn checked(
        self,
        rhs: Self,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Self {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => int_op(a, b).map_or_else(
                || Self::Float(float_op(self.as_f64(), rhs.as_f64())),
                Self::Int,
            ),
            _ => Self::Float(float_op(self.as_f64(), rhs.as_f64())),
        }
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked(rhs, i64::checked_add, |a, b| a + b)
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.checked(rhs, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.checked(rhs, i64::checked_mul, |a, b| a * b)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write_float(f, x),
        }
    }
}

/// Shortest round-trip digits. Positional notation for 1e-4 <= |x| < 1e16
/// (whole values keep a trailing ".0"), otherwise `1e+16` / `1.5e-07` style.
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("nan");
    }
    if x.is_infinite() {
        return f.write_str(if x < 0.0 { "-inf" } else { "inf" });
    }
    if x == 0.0 {
        return write!(f, "{x:.1}");
    }

    let scientific = format!("{x:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.write_str(&scientific);
    };
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;

    if (-4..16).contains(&exponent) {
        if x.fract() == 0.0 {
            write!(f, "{x:.1}")
        } else {
            write!(f, "{x}")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{mantissa}e{sign}{:02}", exponent.abs())
    }
}
