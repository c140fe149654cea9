/*
    satplan, satellite tasking as a Markov decision process
    Copyright (C) 2023 The satplan developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{ModelError, UnboundParameterSnafu};
use snafu::prelude::*;
use std::fmt;

/// Values of the symbolic detection constants, `P1` being the first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    values: Vec<f64>,
}

impl Bindings {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of `Pk`, where `k` is one-based.
    pub fn get(&self, k: usize) -> Option<f64> {
        k.checked_sub(1).and_then(|i| self.values.get(i)).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(k, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| (i + 1, *v))
    }
}

/// Exact probability expression over the detection constants.
///
/// Constructors keep the tree in a simplified form: products are flat, never hold `One`, and collapse to `Zero`
/// as soon as one factor is `Zero`; complements of literals and double complements are folded.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbExpr {
    Zero,
    One,
    /// Reference to the constant `Pk`.
    Param(usize),
    /// `1 - e`
    Complement(Box<ProbExpr>),
    Product(Vec<ProbExpr>),
}

impl ProbExpr {
    pub fn complement(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
            Self::Complement(inner) => *inner,
            other => Self::Complement(Box::new(other)),
        }
    }

    pub fn product<I>(factors: I) -> Self
    where
        I: IntoIterator<Item = ProbExpr>,
    {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                Self::One => {}
                Self::Zero => return Self::Zero,
                Self::Product(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Self::One,
            1 => flat.remove(0),
            _ => Self::Product(flat),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Zero)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Self::One)
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, ModelError> {
        match self {
            Self::Zero => Ok(0.0),
            Self::One => Ok(1.0),
            Self::Param(k) => bindings.get(*k).context(UnboundParameterSnafu { k: *k }),
            Self::Complement(inner) => Ok(1.0 - inner.evaluate(bindings)?),
            Self::Product(factors) => factors
                .iter()
                .try_fold(1.0, |acc, f| -> Result<f64, ModelError> {
                    Ok(acc * f.evaluate(bindings)?)
                }),
        }
    }

    /// Replaces this expression by the literal `Zero` or `One` when it evaluates exactly to that value.
    pub fn collapse(self, bindings: &Bindings) -> Result<Self, ModelError> {
        let value = self.evaluate(bindings)?;
        Ok(if value == 0.0 {
            Self::Zero
        } else if value == 1.0 {
            Self::One
        } else {
            self
        })
    }

    fn is_atomic(&self) -> bool {
        matches!(self, Self::Zero | Self::One | Self::Param(_))
    }
}

/// Renders in the syntax of the model checker, e.g. `(1-P1)*(1-P3)`.
impl fmt::Display for ProbExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "0"),
            Self::One => write!(f, "1"),
            Self::Param(k) => write!(f, "P{k}"),
            Self::Complement(inner) if inner.is_atomic() => write!(f, "1-{inner}"),
            Self::Complement(inner) => write!(f, "1-({inner})"),
            Self::Product(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    if factor.is_atomic() {
                        write!(f, "{factor}")?;
                    } else {
                        write!(f, "({factor})")?;
                    }
                }
                Ok(())
            }
        }
    }
}
