//! # Operators and Evaluation
//!
//! A [`MathRequest`](crate::proto::MathRequest) carries its operator as a
//! short string. This module parses that string into an [`Operator`] and
//! applies it to the two operands.
//!
//! ## Division by zero
//!
//! Results follow IEEE-754: `x / 0.0` is `inf`, `-inf`, or `NaN`. This is a
//! value, not an error, and is forwarded to the client unchanged.
//!
//! ## Unknown operators
//!
//! [`OperatorPolicy`] decides what happens when the operator is not one of
//! `+ - * /`:
//!
//! - [`OperatorPolicy::Reject`] returns [`Error::UnsupportedOperator`].
//! - [`OperatorPolicy::Zero`] answers `0.0`, matching the historical service.

use crate::{Error, Result};
use core::{fmt, str::FromStr};

/// One of the four arithmetic operators understood by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    /// The wire symbol for this operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    /// Computes `lhs <op> rhs`.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Sub),
            "*" => Ok(Self::Mul),
            "/" => Ok(Self::Div),
            other => Err(Error::UnsupportedOperator {
                operator: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Evaluates `lhs <operator> rhs`, rejecting unknown operators.
pub fn evaluate(lhs: f64, rhs: f64, operator: &str) -> Result<f64> {
    OperatorPolicy::Reject.evaluate(lhs, rhs, operator)
}

/// How the service treats an operator it does not recognise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperatorPolicy {
    /// Fail the stream with [`Error::UnsupportedOperator`].
    #[default]
    Reject,
    /// Answer `0.0`.
    Zero,
}

impl OperatorPolicy {
    pub fn evaluate(self, lhs: f64, rhs: f64, operator: &str) -> Result<f64> {
        match (operator.parse::<Operator>(), self) {
            (Ok(op), _) => Ok(op.apply(lhs, rhs)),
            (Err(_), Self::Zero) => Ok(0.0),
            (Err(e), Self::Reject) => Err(e),
        }
    }
}

impl FromStr for OperatorPolicy {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "zero" => Ok(Self::Zero),
            other => Err(format!(
                "unknown operator policy {other:?} (expected `reject` or `zero`)"
            )),
        }
    }
}

impl fmt::Display for OperatorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Zero => f.write_str("zero"),
        }
    }
}
